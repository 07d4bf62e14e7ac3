//! In-memory storage implementation
//!
//! Hands out handles without touching a GPU and records every command it
//! receives. Used to run the renderer core headless (tools, tests).

use std::collections::{HashMap, HashSet};

use super::{
    CapabilityFlags, RadianceFilterParams, RadianceTextureDesc, RenderStorage, StorageCapabilities,
    TextureViewDesc,
};
use crate::render::handles::{FramebufferHandle, TextureHandle};
use crate::render::{RenderError, RenderResult};

/// A command received by [`HeadlessStorage`]
#[derive(Debug, Clone, PartialEq)]
pub enum StorageCommand {
    /// Radiance texture allocated
    CreateRadiance {
        /// New texture
        texture: TextureHandle,
        /// Requested layout
        desc: RadianceTextureDesc,
    },
    /// Texture view created
    CreateView {
        /// New view
        view: TextureHandle,
        /// Viewed texture
        texture: TextureHandle,
        /// Selected sub-resource
        desc: TextureViewDesc,
    },
    /// Framebuffer created
    CreateFramebuffer {
        /// New framebuffer
        framebuffer: FramebufferHandle,
        /// Attached view
        attachment: TextureHandle,
    },
    /// Panorama projected onto the base cube faces
    CopyPanorama {
        /// Source panorama
        panorama: TextureHandle,
        /// Face size written
        face_size: u32,
    },
    /// GGX filtering pass
    FilterRadiance {
        /// Sampled cubemap
        source: TextureHandle,
        /// Written framebuffer
        target: FramebufferHandle,
        /// Pass parameters
        params: RadianceFilterParams,
    },
    /// Texture or view released
    FreeTexture(TextureHandle),
    /// Framebuffer released
    FreeFramebuffer(FramebufferHandle),
}

#[derive(Debug, Clone, Copy)]
enum TextureRecord {
    External { width: u32, height: u32 },
    Radiance(RadianceTextureDesc),
    View { texture: TextureHandle },
}

/// Storage that keeps everything in host memory
#[derive(Debug)]
pub struct HeadlessStorage {
    capabilities: StorageCapabilities,
    textures: HashMap<TextureHandle, TextureRecord>,
    framebuffers: HashSet<FramebufferHandle>,
    commands: Vec<StorageCommand>,
    next_id: u64,
}

impl HeadlessStorage {
    /// Create a headless storage with default capabilities
    pub fn new() -> Self {
        Self::with_capabilities(StorageCapabilities::default())
    }

    /// Create a headless storage reporting the given capabilities
    pub fn with_capabilities(capabilities: StorageCapabilities) -> Self {
        Self {
            capabilities,
            textures: HashMap::new(),
            framebuffers: HashSet::new(),
            commands: Vec::new(),
            next_id: 1, // 0 is the invalid handle
        }
    }

    /// Register an externally created 2D texture, such as a sky panorama
    pub fn texture_register(&mut self, width: u32, height: u32) -> TextureHandle {
        let texture = TextureHandle(self.next_id());
        self.textures.insert(texture, TextureRecord::External { width, height });
        texture
    }

    /// Dimensions of a registered texture, radiance map or view target
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        match *self.textures.get(&texture)? {
            TextureRecord::External { width, height } => Some((width, height)),
            TextureRecord::Radiance(desc) => Some((desc.size, desc.size)),
            TextureRecord::View { texture } => self.texture_size(texture),
        }
    }

    /// Layout a radiance texture was created with
    pub fn radiance_desc(&self, texture: TextureHandle) -> Option<RadianceTextureDesc> {
        match self.textures.get(&texture)? {
            TextureRecord::Radiance(desc) => Some(*desc),
            _ => None,
        }
    }

    /// All commands received so far
    pub fn commands(&self) -> &[StorageCommand] {
        &self.commands
    }

    /// Forget recorded commands, keeping live resources
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Parameters of every filtering pass received so far
    pub fn filter_passes(&self) -> impl Iterator<Item = &RadianceFilterParams> {
        self.commands.iter().filter_map(|command| match command {
            StorageCommand::FilterRadiance { params, .. } => Some(params),
            _ => None,
        })
    }

    /// Number of live textures and views
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live framebuffers
    pub fn live_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for HeadlessStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStorage for HeadlessStorage {
    fn capabilities(&self) -> StorageCapabilities {
        self.capabilities
    }

    fn texture_is_valid(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    fn radiance_create(&mut self, desc: &RadianceTextureDesc) -> RenderResult<TextureHandle> {
        if desc.cubemap_array && !self.capabilities.flags.contains(CapabilityFlags::CUBEMAP_ARRAY) {
            return Err(RenderError::ResourceCreationFailed(
                "cubemap arrays are not supported by this storage".to_string(),
            ));
        }

        if desc.size == 0 || desc.mipmaps == 0 || desc.layers == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "empty radiance texture requested: {desc:?}"
            )));
        }

        let texture = TextureHandle(self.next_id());
        self.textures.insert(texture, TextureRecord::Radiance(*desc));
        self.commands.push(StorageCommand::CreateRadiance { texture, desc: *desc });

        Ok(texture)
    }

    fn texture_create_view(&mut self, texture: TextureHandle, desc: &TextureViewDesc) -> RenderResult<TextureHandle> {
        let Some(TextureRecord::Radiance(radiance)) = self.textures.get(&texture).copied() else {
            return Err(RenderError::ResourceCreationFailed(format!(
                "cannot create a view of {texture:?}"
            )));
        };

        if desc.layer >= radiance.layers || desc.mipmap >= radiance.mipmaps || desc.face.is_some_and(|face| face >= 6) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "view {desc:?} is outside {radiance:?}"
            )));
        }

        let view = TextureHandle(self.next_id());
        self.textures.insert(view, TextureRecord::View { texture });
        self.commands.push(StorageCommand::CreateView { view, texture, desc: *desc });

        Ok(view)
    }

    fn framebuffer_create(&mut self, attachment: TextureHandle) -> RenderResult<FramebufferHandle> {
        if !self.texture_is_valid(attachment) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "framebuffer attachment {attachment:?} does not exist"
            )));
        }

        let framebuffer = FramebufferHandle(self.next_id());
        self.framebuffers.insert(framebuffer);
        self.commands.push(StorageCommand::CreateFramebuffer { framebuffer, attachment });

        Ok(framebuffer)
    }

    fn copy_panorama_to_cubemap(
        &mut self,
        panorama: TextureHandle,
        faces: &[FramebufferHandle; 6],
        face_size: u32,
    ) -> RenderResult<()> {
        if faces.iter().any(|face| !self.framebuffers.contains(face)) {
            return Err(RenderError::ResourceCreationFailed("cube face framebuffer missing".to_string()));
        }

        self.commands.push(StorageCommand::CopyPanorama { panorama, face_size });
        Ok(())
    }

    fn filter_radiance(
        &mut self,
        source: TextureHandle,
        target: FramebufferHandle,
        params: &RadianceFilterParams,
    ) -> RenderResult<()> {
        if !self.framebuffers.contains(&target) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "filter target {target:?} does not exist"
            )));
        }

        self.commands.push(StorageCommand::FilterRadiance { source, target, params: *params });
        Ok(())
    }

    fn texture_free(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.commands.push(StorageCommand::FreeTexture(texture));
        } else {
            log::warn!("Freeing unknown texture {:?}", texture);
        }
    }

    fn framebuffer_free(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer) {
            self.commands.push(StorageCommand::FreeFramebuffer(framebuffer));
        } else {
            log::warn!("Freeing unknown framebuffer {:?}", framebuffer);
        }
    }
}
