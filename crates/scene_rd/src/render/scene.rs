//! # Scene Render Orchestrator
//!
//! [`SceneRenderer`] owns every renderer-side registry together with the
//! storage and backend it was constructed with, and exposes the per-frame
//! entry point [`SceneRenderer::render_scene`].
//!
//! A render runs three steps, strictly in order:
//!
//! 1. resolve the render buffers (unknown or unconfigured buffers are errors)
//! 2. flush every pending sky update
//! 3. hand the buffers, camera, culled lists and handles to the backend
//!
//! The orchestrator does no shading itself.

use crate::core::SceneRendererConfig;
use crate::render::atlas::AtlasManager;
use crate::render::backend::{SceneBackend, SceneRenderData, SceneResources};
use crate::render::environment::EnvironmentManager;
use crate::render::handles::{
    EnvironmentHandle, GiProbeInstanceHandle, LightInstanceHandle, ReflectionAtlasHandle,
    ReflectionProbeInstanceHandle, RenderBuffersHandle, RenderTargetHandle, ShadowAtlasHandle, SkyHandle,
    TextureHandle,
};
use crate::render::instances::InstanceManager;
use crate::render::render_buffers::{RenderBuffersManager, ViewportMsaa};
use crate::render::sky::{SkyManager, SkyMode};
use crate::render::storage::RenderStorage;
use crate::render::{RenderError, RenderResult};

/// Any renderer-owned resource, for [`SceneRenderer::free`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneResource {
    /// A sky
    Sky(SkyHandle),
    /// An environment
    Environment(EnvironmentHandle),
    /// Render buffers
    RenderBuffers(RenderBuffersHandle),
    /// A shadow atlas
    ShadowAtlas(ShadowAtlasHandle),
    /// A reflection atlas
    ReflectionAtlas(ReflectionAtlasHandle),
    /// A light instance
    LightInstance(LightInstanceHandle),
    /// A reflection probe instance
    ReflectionProbeInstance(ReflectionProbeInstanceHandle),
    /// A GI probe instance
    GiProbeInstance(GiProbeInstanceHandle),
}

macro_rules! scene_resource_from {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handle> for SceneResource {
                fn from(handle: $handle) -> Self {
                    Self::$variant(handle)
                }
            }
        )*
    };
}

scene_resource_from! {
    SkyHandle => Sky,
    EnvironmentHandle => Environment,
    RenderBuffersHandle => RenderBuffers,
    ShadowAtlasHandle => ShadowAtlas,
    ReflectionAtlasHandle => ReflectionAtlas,
    LightInstanceHandle => LightInstance,
    ReflectionProbeInstanceHandle => ReflectionProbeInstance,
    GiProbeInstanceHandle => GiProbeInstance,
}

/// Scene renderer core
///
/// Generic over the backend that renders and the storage that holds GPU
/// resources. Both are fixed at construction; storage capabilities are read
/// once and decide the radiance layout for the renderer's lifetime.
pub struct SceneRenderer<B: SceneBackend, S: RenderStorage> {
    backend: B,
    storage: S,
    config: SceneRendererConfig,
    skies: SkyManager,
    environments: EnvironmentManager,
    render_buffers: RenderBuffersManager<B::BufferData>,
    atlases: AtlasManager,
    instances: InstanceManager,
}

impl<B: SceneBackend, S: RenderStorage> SceneRenderer<B, S> {
    /// Create a renderer over `backend` and `storage`
    pub fn new(backend: B, storage: S, config: SceneRendererConfig) -> RenderResult<Self> {
        config.validate()?;

        let capabilities = storage.capabilities();
        let skies = SkyManager::new(config.sky.clone(), capabilities);

        log::info!(
            "Scene renderer initialized: {} roughness layers, cubemap array {}",
            skies.roughness_layers(),
            if skies.is_using_cubemap_array() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            backend,
            storage,
            config,
            skies,
            environments: EnvironmentManager::new(),
            render_buffers: RenderBuffersManager::new(),
            atlases: AtlasManager::new(),
            instances: InstanceManager::new(),
        })
    }

    /// Configuration the renderer was created with
    pub fn config(&self) -> &SceneRendererConfig {
        &self.config
    }

    /// Number of GGX roughness levels in each radiance map
    pub fn get_roughness_layers(&self) -> u32 {
        self.skies.roughness_layers()
    }

    /// Whether radiance maps are stored as cubemap arrays
    pub fn is_using_radiance_cubemap_array(&self) -> bool {
        self.skies.is_using_cubemap_array()
    }

    /// Render one scene into `render_buffers`
    ///
    /// Pending sky edits are applied before the backend runs, so changes made
    /// earlier in the frame are visible in this render. The backend is called
    /// exactly once per successful call.
    pub fn render_scene(
        &mut self,
        render_buffers: RenderBuffersHandle,
        data: &SceneRenderData<'_, B::Instance>,
    ) -> RenderResult<()> {
        let Some(buffers) = self.render_buffers.get_mut(render_buffers) else {
            log::error!("Rendering into invalid render buffers {:?}", render_buffers);
            return Err(RenderError::invalid_handle("render buffers"));
        };

        let Some(buffer_data) = buffers.data_mut() else {
            log::error!("Rendering into unconfigured render buffers {:?}", render_buffers);
            return Err(RenderError::UnconfiguredRenderBuffers);
        };

        self.skies.flush_dirty(&mut self.storage)?;

        let resources = SceneResources {
            environments: &self.environments,
            skies: &self.skies,
            atlases: &self.atlases,
            instances: &self.instances,
        };

        self.backend.render_scene(buffer_data, data, &resources)
    }

    /// Per-frame housekeeping: apply sky edits and reset light visibility
    ///
    /// Returns the number of skies regenerated.
    pub fn update(&mut self) -> RenderResult<usize> {
        let regenerated = self.skies.flush_dirty(&mut self.storage)?;
        self.instances.clear_visibility();
        Ok(regenerated)
    }

    /// Destroy any renderer-owned resource
    ///
    /// Returns `false` if the handle did not refer to a live resource.
    pub fn free(&mut self, resource: impl Into<SceneResource>) -> bool {
        match resource.into() {
            SceneResource::Sky(sky) => self.skies.free(sky, &mut self.storage),
            SceneResource::Environment(environment) => self.environments.free(environment),
            SceneResource::RenderBuffers(buffers) => self.render_buffers.free(buffers),
            SceneResource::ShadowAtlas(atlas) => self.atlases.shadow_atlas_free(atlas),
            SceneResource::ReflectionAtlas(atlas) => self.atlases.reflection_atlas_free(atlas),
            SceneResource::LightInstance(light) => {
                self.atlases.forget_light(light);
                self.instances.light_instance_free(light)
            }
            SceneResource::ReflectionProbeInstance(probe) => match self.instances.reflection_probe_instance_free(probe) {
                Some(instance) => {
                    if let Some((atlas, slot)) = instance.atlas_slot() {
                        self.release_reflection_slot(atlas, slot, probe);
                    }
                    true
                }
                None => false,
            },
            SceneResource::GiProbeInstance(probe) => self.instances.gi_probe_instance_free(probe),
        }
    }

    // Skies

    /// Create a sky
    pub fn sky_create(&mut self) -> SkyHandle {
        self.skies.create()
    }

    /// Set a sky's radiance size
    pub fn sky_set_radiance_size(&mut self, sky: SkyHandle, size: u32) -> RenderResult<()> {
        self.skies.set_radiance_size(sky, size)
    }

    /// Set a sky's convolution quality
    pub fn sky_set_mode(&mut self, sky: SkyHandle, mode: SkyMode) -> RenderResult<()> {
        self.skies.set_mode(sky, mode)
    }

    /// Set a sky's source panorama
    pub fn sky_set_texture(&mut self, sky: SkyHandle, panorama: TextureHandle) -> RenderResult<()> {
        self.skies.set_texture(sky, panorama)
    }

    /// Source panorama of a sky
    pub fn sky_get_panorama_texture(&self, sky: SkyHandle) -> TextureHandle {
        self.skies.panorama_texture(sky)
    }

    /// Radiance texture of a sky, invalid until the sky has been flushed
    pub fn sky_get_radiance_texture(&self, sky: SkyHandle) -> TextureHandle {
        self.skies.radiance_texture(sky)
    }

    /// Sky manager
    pub fn skies(&self) -> &SkyManager {
        &self.skies
    }

    // Environments

    /// Create an environment
    pub fn environment_create(&mut self) -> EnvironmentHandle {
        self.environments.create()
    }

    /// Whether `environment` is a live environment
    pub fn is_environment(&self, environment: EnvironmentHandle) -> bool {
        self.environments.is_environment(environment)
    }

    /// Environment manager, for getters
    pub fn environments(&self) -> &EnvironmentManager {
        &self.environments
    }

    /// Environment manager, for setters
    pub fn environments_mut(&mut self) -> &mut EnvironmentManager {
        &mut self.environments
    }

    // Render buffers

    /// Create unconfigured render buffers
    pub fn render_buffers_create(&mut self) -> RenderBuffersHandle {
        self.render_buffers.create()
    }

    /// Configure render buffers, creating the backend storage on first use
    pub fn render_buffers_configure(
        &mut self,
        render_buffers: RenderBuffersHandle,
        render_target: RenderTargetHandle,
        width: u32,
        height: u32,
        msaa: ViewportMsaa,
    ) -> RenderResult<()> {
        let backend = &mut self.backend;

        self.render_buffers
            .configure(render_buffers, render_target, width, height, msaa, || {
                backend.create_render_buffer_data()
            })
    }

    /// Render buffers manager
    pub fn render_buffers(&self) -> &RenderBuffersManager<B::BufferData> {
        &self.render_buffers
    }

    // Atlases and instances

    /// Atlas manager, for getters
    pub fn atlases(&self) -> &AtlasManager {
        &self.atlases
    }

    /// Atlas manager, for setters
    pub fn atlases_mut(&mut self) -> &mut AtlasManager {
        &mut self.atlases
    }

    /// Instance manager, for getters
    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    /// Instance manager, for setters
    pub fn instances_mut(&mut self) -> &mut InstanceManager {
        &mut self.instances
    }

    /// Start rendering a reflection probe into `atlas`
    ///
    /// Keeps the probe's slot if it already owns one in `atlas`, otherwise
    /// claims a free one. Returns `false` when the atlas is full.
    pub fn reflection_probe_instance_begin_render(
        &mut self,
        probe: ReflectionProbeInstanceHandle,
        atlas: ReflectionAtlasHandle,
    ) -> RenderResult<bool> {
        let Some(instance) = self.instances.reflection_probe_instance(probe) else {
            log::error!("Rendering invalid reflection probe instance {:?}", probe);
            return Err(RenderError::invalid_handle("reflection probe instance"));
        };
        let current = instance.atlas_slot();

        if self.atlases.reflection_atlas(atlas).is_none() {
            log::error!("Rendering into invalid reflection atlas {:?}", atlas);
            return Err(RenderError::invalid_handle("reflection atlas"));
        }

        let kept = current.filter(|&(owner_atlas, slot)| {
            owner_atlas == atlas
                && self
                    .atlases
                    .reflection_atlas(atlas)
                    .is_some_and(|reflection| reflection.slot_owner(slot) == Some(probe))
        });

        let slot = match (kept, current) {
            (Some((_, slot)), _) => slot,
            (None, previous) => {
                if let Some((old_atlas, old_slot)) = previous {
                    self.release_reflection_slot(old_atlas, old_slot, probe);
                }

                let claimed = self
                    .atlases
                    .reflection_atlas_mut(atlas)
                    .and_then(|reflection| reflection.claim_slot(probe));

                match claimed {
                    Some(slot) => slot,
                    None => {
                        log::warn!("Reflection atlas {:?} has no free slot for {:?}", atlas, probe);
                        return Ok(false);
                    }
                }
            }
        };

        self.instances.reflection_probe_instance_begin_render(probe, atlas, slot)?;
        Ok(true)
    }

    /// Advance filtering of a rendered probe, one roughness level per step
    pub fn reflection_probe_instance_postprocess_step(&mut self, probe: ReflectionProbeInstanceHandle) -> RenderResult<bool> {
        let steps = self.skies.roughness_layers();
        self.instances.reflection_probe_instance_postprocess_step(probe, steps)
    }

    /// Detach a probe from its reflection atlas slot
    pub fn reflection_probe_release_atlas_index(&mut self, probe: ReflectionProbeInstanceHandle) -> RenderResult<()> {
        if let Some((atlas, slot)) = self.instances.reflection_probe_release_atlas_index(probe)? {
            self.release_reflection_slot(atlas, slot, probe);
        }
        Ok(())
    }

    // Collaborators

    /// Storage the renderer allocates GPU resources from
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable storage, for registering external textures
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Backend the renderer draws with
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn release_reflection_slot(&mut self, atlas: ReflectionAtlasHandle, slot: u32, probe: ReflectionProbeInstanceHandle) {
        if let Some(reflection) = self.atlases.reflection_atlas_mut(atlas) {
            reflection.release_slot(slot, probe);
        }
    }
}

impl<B: SceneBackend, S: RenderStorage> Drop for SceneRenderer<B, S> {
    fn drop(&mut self) {
        self.render_buffers.free_all();
        self.skies.free_all(&mut self.storage);
        self.instances.clear();
        log::debug!("Scene renderer destroyed");
    }
}

impl<B: SceneBackend, S: RenderStorage> std::fmt::Debug for SceneRenderer<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("skies", &self.skies)
            .field("environments", &self.environments)
            .field("render_buffers", &self.render_buffers.len())
            .field("atlases", &self.atlases)
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}
