//! # Scene RD
//!
//! Resource core of a real-time scene renderer: sky probes with deferred
//! radiance convolution, environment configuration, per-viewport render
//! buffers and the `render_scene` entry point that sequences a frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_rd::prelude::*;
//!
//! fn setup<B: SceneBackend>(backend: B) -> RenderResult<()> {
//!     let storage = HeadlessStorage::new();
//!     let mut renderer = SceneRenderer::new(backend, storage, SceneRendererConfig::default())?;
//!
//!     let sky = renderer.sky_create();
//!     renderer.sky_set_mode(sky, SkyMode::Quality)?;
//!     renderer.sky_set_radiance_size(sky, 512)?;
//!
//!     let env = renderer.environment_create();
//!     renderer.environments_mut().set_sky(env, sky)?;
//!
//!     let buffers = renderer.render_buffers_create();
//!     renderer.render_buffers_configure(buffers, RenderTargetHandle(1), 1280, 720, ViewportMsaa::Disabled)?;
//!
//!     let frame = SceneRenderData::new(CameraState::default()).with_environment(env);
//!     renderer.render_scene(buffers, &frame)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        core::config::{Config, SceneRendererConfig, SkyConfig},
        foundation::math::{Color, Mat3, Mat4, Vec3},
        render::{
            CameraState, EnvironmentBackground, EnvironmentHandle, HeadlessStorage, RenderBufferData,
            RenderBuffersHandle, RenderError, RenderResult, RenderStorage, RenderTargetHandle, SceneBackend,
            SceneRenderData, SceneRenderer, SceneResources, SkyHandle, SkyMode, TextureHandle, ViewportMsaa,
        },
    };
}
