//! Opaque handle types
//!
//! Entities owned by the renderer core are keyed by generation-tagged slot
//! map keys. Resources owned by external collaborators (GPU storage, the
//! viewport system, the light/probe servers) are plain 64-bit identifiers
//! where `0` is reserved for "no resource".

use serde::{Deserialize, Serialize};

use crate::foundation::collections::new_key_type;

new_key_type! {
    /// Handle to a sky owned by the sky manager
    pub struct SkyHandle;

    /// Handle to an environment owned by the environment manager
    pub struct EnvironmentHandle;

    /// Handle to per-viewport render buffers
    pub struct RenderBuffersHandle;

    /// Handle to a shadow atlas configuration
    pub struct ShadowAtlasHandle;

    /// Handle to a reflection atlas configuration
    pub struct ReflectionAtlasHandle;

    /// Handle to a light instance
    pub struct LightInstanceHandle;

    /// Handle to a reflection probe instance
    pub struct ReflectionProbeInstanceHandle;

    /// Handle to a GI probe instance
    pub struct GiProbeInstanceHandle;
}

macro_rules! external_handle {
    ($( $(#[$meta:meta])* $name:ident ),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl $name {
                /// The reserved "no resource" value
                pub const INVALID: Self = Self(0);

                /// Whether this handle names a resource at all
                pub const fn is_valid(self) -> bool {
                    self.0 != 0
                }
            }
        )*
    };
}

external_handle![
    /// Handle to a GPU texture or texture view in storage
    TextureHandle,
    /// Handle to a GPU framebuffer in storage
    FramebufferHandle,
    /// Handle to a render target owned by the viewport system
    RenderTargetHandle,
    /// Handle to a light owned by the light storage
    LightHandle,
    /// Handle to a reflection probe owned by the probe storage
    ReflectionProbeHandle,
    /// Handle to a GI probe owned by the probe storage
    GiProbeHandle,
];
