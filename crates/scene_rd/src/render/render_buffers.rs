//! # Per-Viewport Render Buffers
//!
//! A [`RenderBuffers`] entity records the size, multisampling and target of
//! one viewport and owns the backend's storage for it. The storage itself is
//! opaque to the renderer core: it is produced by the backend on first
//! configure and reconfigured in place on every later call (resizes keep the
//! same object).

use serde::{Deserialize, Serialize};

use crate::foundation::collections::Registry;
use crate::render::handles::{RenderBuffersHandle, RenderTargetHandle};
use crate::render::{RenderError, RenderResult};

/// Multisample level of a viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportMsaa {
    /// Single sample
    #[default]
    Disabled,
    /// 2x MSAA
    X2,
    /// 4x MSAA
    X4,
    /// 8x MSAA
    X8,
    /// 16x MSAA
    X16,
}

impl ViewportMsaa {
    /// Samples per pixel
    pub const fn sample_count(self) -> u32 {
        match self {
            Self::Disabled => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// Backend storage behind a [`RenderBuffers`] entity
///
/// Implementations own whatever images and attachments the backend renders
/// into. `configure` may be called any number of times and must leave the
/// object matching the most recent arguments.
pub trait RenderBufferData {
    /// (Re)build the storage for the given target and size
    fn configure(
        &mut self,
        render_target: RenderTargetHandle,
        width: u32,
        height: u32,
        msaa: ViewportMsaa,
    ) -> RenderResult<()>;

    /// Release backend resources before the owner is destroyed
    fn release(&mut self) {}
}

/// Render buffers of one viewport
#[derive(Debug)]
pub struct RenderBuffers<D> {
    render_target: RenderTargetHandle,
    width: u32,
    height: u32,
    msaa: ViewportMsaa,
    data: Option<D>,
}

impl<D> RenderBuffers<D> {
    fn new() -> Self {
        Self {
            render_target: RenderTargetHandle::INVALID,
            width: 0,
            height: 0,
            msaa: ViewportMsaa::Disabled,
            data: None,
        }
    }

    /// Target the buffers resolve into
    pub fn render_target(&self) -> RenderTargetHandle {
        self.render_target
    }

    /// Width in pixels, 0 until configured
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, 0 until configured
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Multisample level
    pub fn msaa(&self) -> ViewportMsaa {
        self.msaa
    }

    /// Whether `configure` has succeeded at least once
    pub fn is_configured(&self) -> bool {
        self.data.is_some()
    }

    /// Backend storage, present once configured
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// Mutable backend storage, present once configured
    pub fn data_mut(&mut self) -> Option<&mut D> {
        self.data.as_mut()
    }
}

/// Owner of all render buffers
#[derive(Debug)]
pub struct RenderBuffersManager<D: RenderBufferData> {
    buffers: Registry<RenderBuffersHandle, RenderBuffers<D>>,
}

impl<D: RenderBufferData> RenderBuffersManager<D> {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            buffers: Registry::new("render buffers"),
        }
    }

    /// Create unconfigured render buffers
    pub fn create(&mut self) -> RenderBuffersHandle {
        let handle = self.buffers.allocate(RenderBuffers::new());
        log::debug!("Created render buffers {:?}", handle);
        handle
    }

    /// Look up render buffers
    pub fn get(&self, handle: RenderBuffersHandle) -> Option<&RenderBuffers<D>> {
        self.buffers.resolve(handle)
    }

    /// Look up render buffers mutably
    pub fn get_mut(&mut self, handle: RenderBuffersHandle) -> Option<&mut RenderBuffers<D>> {
        self.buffers.resolve_mut(handle)
    }

    /// Whether `handle` refers to live render buffers
    pub fn contains(&self, handle: RenderBuffersHandle) -> bool {
        self.buffers.contains(handle)
    }

    /// Number of live render buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no render buffers exist
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Configure render buffers for a target and size
    ///
    /// The backend storage is produced by `create_data` on the first call
    /// only; later calls reconfigure the existing object. Stored attributes
    /// are updated only when the backend accepts the new configuration.
    pub fn configure(
        &mut self,
        handle: RenderBuffersHandle,
        render_target: RenderTargetHandle,
        width: u32,
        height: u32,
        msaa: ViewportMsaa,
        create_data: impl FnOnce() -> RenderResult<D>,
    ) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidParameter(format!(
                "render buffers size {}x{} must be non-zero",
                width, height
            )));
        }

        let kind = self.buffers.kind();
        let Some(buffers) = self.buffers.resolve_mut(handle) else {
            log::error!("Configuring invalid render buffers {:?}", handle);
            return Err(RenderError::invalid_handle(kind));
        };

        match buffers.data.as_mut() {
            Some(data) => data.configure(render_target, width, height, msaa)?,
            None => {
                let mut data = create_data()?;
                data.configure(render_target, width, height, msaa)?;
                buffers.data = Some(data);
            }
        }

        buffers.render_target = render_target;
        buffers.width = width;
        buffers.height = height;
        buffers.msaa = msaa;

        log::debug!(
            "Configured render buffers {:?}: {}x{} {:?} -> {:?}",
            handle,
            width,
            height,
            msaa,
            render_target
        );
        Ok(())
    }

    /// Destroy render buffers, releasing the backend storage first
    pub fn free(&mut self, handle: RenderBuffersHandle) -> bool {
        match self.buffers.take(handle) {
            Some(mut buffers) => {
                if let Some(data) = buffers.data.as_mut() {
                    data.release();
                }
                log::debug!("Freed render buffers {:?}", handle);
                true
            }
            None => false,
        }
    }

    /// Destroy every render buffers entity
    pub fn free_all(&mut self) {
        for (_, mut buffers) in self.buffers.drain() {
            if let Some(data) = buffers.data.as_mut() {
                data.release();
            }
        }
    }
}

impl<D: RenderBufferData> Default for RenderBuffersManager<D> {
    fn default() -> Self {
        Self::new()
    }
}
