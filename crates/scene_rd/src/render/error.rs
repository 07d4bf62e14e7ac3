//! Rendering error types

use thiserror::Error;

use crate::config::ConfigError;

/// High-level rendering error types
///
/// Mutating calls report programming errors (stale handles, unconfigured
/// render buffers, out-of-domain arguments) through these variants instead of
/// silently ignoring them. None of them are retried by the renderer core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A handle did not resolve to a live entity
    ///
    /// Raised when a caller passes an unknown or already freed handle to a
    /// mutating operation or to `render_scene`.
    #[error("Invalid {kind} handle")]
    InvalidHandle {
        /// Entity kind the handle was expected to reference
        kind: &'static str,
    },

    /// A render pass targeted render buffers that were never configured
    #[error("Render buffers have not been configured")]
    UnconfiguredRenderBuffers,

    /// An argument was outside its documented domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Resource creation or management failed
    ///
    /// Occurs when the storage layer cannot create GPU textures, views or
    /// framebuffers.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Renderer configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend-specific error occurred
    ///
    /// Wraps errors raised by a backend render step in a generic form.
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl RenderError {
    /// Shorthand for [`RenderError::InvalidHandle`]
    pub const fn invalid_handle(kind: &'static str) -> Self {
        Self::InvalidHandle { kind }
    }
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
