//! # Scene Backend Abstraction
//!
//! The renderer core sequences a frame; a [`SceneBackend`] produces the
//! pixels. One implementation exists per GPU backend and is injected when the
//! [`SceneRenderer`](crate::render::SceneRenderer) is constructed.

use crate::foundation::math::Mat4;
use crate::render::atlas::AtlasManager;
use crate::render::environment::EnvironmentManager;
use crate::render::handles::{
    EnvironmentHandle, LightInstanceHandle, ReflectionAtlasHandle, ReflectionProbeInstanceHandle,
    ShadowAtlasHandle,
};
use crate::render::instances::InstanceManager;
use crate::render::render_buffers::RenderBufferData;
use crate::render::sky::SkyManager;
use crate::render::RenderResult;

/// Camera a scene is rendered from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Camera world transform
    pub transform: Mat4,
    /// Projection matrix
    pub projection: Mat4,
    /// Orthogonal projection
    pub orthogonal: bool,
}

impl CameraState {
    /// Perspective camera
    pub fn perspective(transform: Mat4, projection: Mat4) -> Self {
        Self {
            transform,
            projection,
            orthogonal: false,
        }
    }

    /// Orthogonal camera
    pub fn orthogonal(transform: Mat4, projection: Mat4) -> Self {
        Self {
            transform,
            projection,
            orthogonal: true,
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::perspective(Mat4::identity(), Mat4::identity())
    }
}

/// Everything one `render_scene` call hands to the backend
///
/// The culled slices come from an external culling stage and are passed
/// through untouched.
#[derive(Debug)]
pub struct SceneRenderData<'a, I> {
    /// Camera parameters
    pub camera: CameraState,

    /// Visible geometry instances
    pub instances: &'a [I],

    /// Visible lights
    pub lights: &'a [LightInstanceHandle],

    /// Visible reflection probes
    pub reflection_probes: &'a [ReflectionProbeInstanceHandle],

    /// Environment to render with, may be null
    pub environment: EnvironmentHandle,

    /// Shadow atlas to read shadows from, may be null
    pub shadow_atlas: ShadowAtlasHandle,

    /// Reflection atlas to read reflections from, may be null
    pub reflection_atlas: ReflectionAtlasHandle,

    /// Probe being captured by this render, null for a regular render
    pub reflection_probe: ReflectionProbeInstanceHandle,

    /// Cube face of the probe being captured
    pub reflection_probe_pass: u32,
}

impl<'a, I> SceneRenderData<'a, I> {
    /// Render data for a camera with nothing culled in
    pub fn new(camera: CameraState) -> Self {
        Self {
            camera,
            instances: &[],
            lights: &[],
            reflection_probes: &[],
            environment: EnvironmentHandle::default(),
            shadow_atlas: ShadowAtlasHandle::default(),
            reflection_atlas: ReflectionAtlasHandle::default(),
            reflection_probe: ReflectionProbeInstanceHandle::default(),
            reflection_probe_pass: 0,
        }
    }

    /// Set the visible instances
    pub fn with_instances(mut self, instances: &'a [I]) -> Self {
        self.instances = instances;
        self
    }

    /// Set the visible lights
    pub fn with_lights(mut self, lights: &'a [LightInstanceHandle]) -> Self {
        self.lights = lights;
        self
    }

    /// Set the visible reflection probes
    pub fn with_reflection_probes(mut self, probes: &'a [ReflectionProbeInstanceHandle]) -> Self {
        self.reflection_probes = probes;
        self
    }

    /// Set the environment
    pub fn with_environment(mut self, environment: EnvironmentHandle) -> Self {
        self.environment = environment;
        self
    }

    /// Set the shadow and reflection atlases
    pub fn with_atlases(mut self, shadow: ShadowAtlasHandle, reflection: ReflectionAtlasHandle) -> Self {
        self.shadow_atlas = shadow;
        self.reflection_atlas = reflection;
        self
    }

    /// Render into a reflection probe face instead of a viewport
    pub fn with_reflection_probe(mut self, probe: ReflectionProbeInstanceHandle, pass: u32) -> Self {
        self.reflection_probe = probe;
        self.reflection_probe_pass = pass;
        self
    }
}

/// Read access to renderer state while a backend renders
#[derive(Debug, Clone, Copy)]
pub struct SceneResources<'a> {
    /// All environments
    pub environments: &'a EnvironmentManager,
    /// All skies, radiance up to date
    pub skies: &'a SkyManager,
    /// Shadow and reflection atlases
    pub atlases: &'a AtlasManager,
    /// Light and probe instances
    pub instances: &'a InstanceManager,
}

/// Backend render step and render buffer factory
pub trait SceneBackend {
    /// Backend storage owned by each render buffers entity
    type BufferData: RenderBufferData;

    /// Geometry instance type produced by the culling stage
    type Instance;

    /// Produce storage for newly configured render buffers
    fn create_render_buffer_data(&mut self) -> RenderResult<Self::BufferData>;

    /// Render a scene into `buffers`
    fn render_scene(
        &mut self,
        buffers: &mut Self::BufferData,
        data: &SceneRenderData<'_, Self::Instance>,
        resources: &SceneResources<'_>,
    ) -> RenderResult<()>;
}
