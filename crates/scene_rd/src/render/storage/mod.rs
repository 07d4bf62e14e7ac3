//! GPU storage abstraction
//!
//! The renderer core never talks to a graphics API directly. Texture, view
//! and framebuffer creation as well as the radiance convolution passes are
//! delegated to a [`RenderStorage`] implementation supplied by the backend.

mod headless;

pub use headless::{HeadlessStorage, StorageCommand};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::render::handles::{FramebufferHandle, TextureHandle};
use crate::render::RenderResult;

bitflags! {
    /// Optional features reported by a storage implementation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u32 {
        /// Cubemap arrays can be created and sampled
        const CUBEMAP_ARRAY = 1 << 0;
    }
}

/// Static capabilities of a storage implementation
///
/// Read once when the scene renderer is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCapabilities {
    /// Number of GGX roughness levels stored in a radiance map
    pub roughness_layers: u32,
    /// Optional features
    pub flags: CapabilityFlags,
}

impl Default for StorageCapabilities {
    fn default() -> Self {
        Self {
            roughness_layers: 8,
            flags: CapabilityFlags::CUBEMAP_ARRAY,
        }
    }
}

/// Layout of a radiance cubemap (or cubemap array) to allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadianceTextureDesc {
    /// Face size of mip 0, in texels
    pub size: u32,
    /// Mip levels per layer
    pub mipmaps: u32,
    /// Cubemap layers (1 unless `cubemap_array` is set)
    pub layers: u32,
    /// Allocate as a cubemap array
    pub cubemap_array: bool,
}

/// Sub-resource selected by a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureViewDesc {
    /// Cubemap layer
    pub layer: u32,
    /// Mip level
    pub mipmap: u32,
    /// Single cube face, or `None` for the whole cube
    pub face: Option<u32>,
}

/// Parameters of one GGX radiance filtering pass, laid out for upload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RadianceFilterParams {
    /// Cube face being written (0..6)
    pub face: u32,
    /// Cubemap layer being written
    pub layer: u32,
    /// Mip level being written
    pub mip_level: u32,
    /// Importance samples per texel
    pub sample_count: u32,
    /// GGX roughness for this level, in [0, 1]
    pub roughness: f32,
    /// Face size of the target, in texels
    pub face_size: u32,
    /// Padding to a 16-byte multiple
    pub padding: [u32; 2],
}

/// Storage and capability provider for the renderer core
pub trait RenderStorage {
    /// Static capabilities of this storage
    fn capabilities(&self) -> StorageCapabilities;

    /// Whether `texture` refers to a live texture
    fn texture_is_valid(&self, texture: TextureHandle) -> bool;

    /// Allocate a radiance cubemap or cubemap array
    fn radiance_create(&mut self, desc: &RadianceTextureDesc) -> RenderResult<TextureHandle>;

    /// Create a view onto a sub-resource of `texture`
    fn texture_create_view(&mut self, texture: TextureHandle, desc: &TextureViewDesc) -> RenderResult<TextureHandle>;

    /// Create a framebuffer rendering into a single-face view
    fn framebuffer_create(&mut self, attachment: TextureHandle) -> RenderResult<FramebufferHandle>;

    /// Project an equirectangular panorama onto six cube faces
    fn copy_panorama_to_cubemap(
        &mut self,
        panorama: TextureHandle,
        faces: &[FramebufferHandle; 6],
        face_size: u32,
    ) -> RenderResult<()>;

    /// Run one GGX convolution pass from `source` into `target`
    fn filter_radiance(
        &mut self,
        source: TextureHandle,
        target: FramebufferHandle,
        params: &RadianceFilterParams,
    ) -> RenderResult<()>;

    /// Release a texture or texture view
    fn texture_free(&mut self, texture: TextureHandle);

    /// Release a framebuffer
    fn framebuffer_free(&mut self, framebuffer: FramebufferHandle);
}
