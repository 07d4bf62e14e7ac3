//! # Scene Rendering Core
//!
//! Resource lifecycle and frame sequencing for a real-time scene renderer.
//!
//! ## Architecture
//!
//! - **Sky**: sky probes with a dirty queue; radiance maps are regenerated
//!   lazily, once per frame, for every sky edited since the last flush
//! - **Environment**: background, ambient, tonemap and post-process settings
//! - **Render Buffers**: per-viewport storage created by the backend
//! - **Atlases / Instances**: stored configuration for shadows, reflection
//!   probes and GI probes
//! - **Scene**: the `render_scene` entry point tying it all together
//!
//! GPU objects are created through a [`RenderStorage`]; pixels are produced
//! by a [`SceneBackend`]. Both are supplied by the application.

pub mod atlas;
pub mod backend;
pub mod environment;
pub mod handles;
pub mod instances;
pub mod render_buffers;
pub mod scene;
pub mod sky;
pub mod storage;

mod error;

pub use error::{RenderError, RenderResult};

pub use atlas::{AtlasManager, ReflectionAtlas, ShadowAtlas};
pub use backend::{CameraState, SceneBackend, SceneRenderData, SceneResources};
pub use environment::{
    AmbientLight, AmbientSource, Environment, EnvironmentBackground, EnvironmentManager, ReflectionSource,
    ToneMapper, Tonemap, TonemapUniform,
};
pub use handles::{
    EnvironmentHandle, FramebufferHandle, GiProbeHandle, GiProbeInstanceHandle, LightHandle, LightInstanceHandle,
    ReflectionAtlasHandle, ReflectionProbeHandle, ReflectionProbeInstanceHandle, RenderBuffersHandle,
    RenderTargetHandle, ShadowAtlasHandle, SkyHandle, TextureHandle,
};
pub use instances::InstanceManager;
pub use render_buffers::{RenderBufferData, RenderBuffers, RenderBuffersManager, ViewportMsaa};
pub use scene::{SceneRenderer, SceneResource};
pub use sky::{Sky, SkyManager, SkyMode};
pub use storage::{HeadlessStorage, RenderStorage, StorageCapabilities};
