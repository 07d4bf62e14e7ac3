//! # Sky Radiance Management
//!
//! Skies own a radiance cubemap convolved from a source panorama. Convolution
//! is expensive, so property edits never touch the GPU directly: they mark the
//! sky dirty and queue it, and [`SkyManager::flush_dirty`] regenerates every
//! queued sky once. The scene renderer flushes at the start of each
//! `render_scene`, so any number of edits between two frames costs a single
//! regeneration per sky.
//!
//! ## State machine
//!
//! ```text
//! Clean --(setter changes a value)--> Dirty(queued) --(flush)--> Clean
//! ```
//!
//! A sky is in the queue exactly when its dirty flag is set, and at most once.

use serde::{Deserialize, Serialize};

use crate::core::config::SkyConfig;
use crate::foundation::collections::Registry;
use crate::foundation::math::utils;
use crate::render::handles::{FramebufferHandle, SkyHandle, TextureHandle};
use crate::render::storage::{
    CapabilityFlags, RadianceFilterParams, RadianceTextureDesc, RenderStorage, StorageCapabilities,
    TextureViewDesc,
};
use crate::render::{RenderError, RenderResult};

/// Number of faces of a cubemap
pub const CUBE_FACES: usize = 6;

/// Convolution quality of a sky
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkyMode {
    /// Slow, high sample count convolution for static skies
    #[default]
    Quality,
    /// Fast, low sample count convolution for skies edited every frame
    Realtime,
}

/// Render target for one face of one radiance mip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadianceFace {
    /// Single-face view of the radiance texture
    pub view: TextureHandle,
    /// Framebuffer writing into `view`
    pub framebuffer: FramebufferHandle,
}

/// All faces of one radiance mip level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadianceMipmap {
    /// Per-face render targets
    pub faces: [RadianceFace; CUBE_FACES],
    /// Face size in texels
    pub size: u32,
}

/// Mip chain of one radiance cubemap layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadianceLayer {
    /// Mip levels, largest first
    pub mipmaps: Vec<RadianceMipmap>,
}

/// A sky probe
#[derive(Debug, Clone)]
pub struct Sky {
    radiance_size: u32,
    mode: SkyMode,
    panorama: TextureHandle,
    radiance: TextureHandle,
    radiance_base_cubemap: TextureHandle,
    layers: Vec<RadianceLayer>,
    radiance_samples: u32,
    dirty: bool,
}

impl Sky {
    fn new(radiance_size: u32) -> Self {
        Self {
            radiance_size,
            mode: SkyMode::default(),
            panorama: TextureHandle::INVALID,
            radiance: TextureHandle::INVALID,
            radiance_base_cubemap: TextureHandle::INVALID,
            layers: Vec::new(),
            radiance_samples: 0,
            dirty: false,
        }
    }

    /// Face size of the largest radiance mip
    pub fn radiance_size(&self) -> u32 {
        self.radiance_size
    }

    /// Convolution quality
    pub fn mode(&self) -> SkyMode {
        self.mode
    }

    /// Source panorama, [`TextureHandle::INVALID`] if none was set
    pub fn panorama(&self) -> TextureHandle {
        self.panorama
    }

    /// Radiance texture, invalid while the sky waits for a flush
    pub fn radiance(&self) -> TextureHandle {
        if self.dirty {
            TextureHandle::INVALID
        } else {
            self.radiance
        }
    }

    /// Whole-cube view of layer 0, mip 0, invalid while the sky is dirty
    pub fn radiance_base_cubemap(&self) -> TextureHandle {
        if self.dirty {
            TextureHandle::INVALID
        } else {
            self.radiance_base_cubemap
        }
    }

    /// Render targets of every radiance layer and mip
    pub fn radiance_layers(&self) -> &[RadianceLayer] {
        &self.layers
    }

    /// GGX sample count used by the last regeneration, 0 if never generated
    pub fn radiance_samples(&self) -> u32 {
        self.radiance_samples
    }

    /// Whether the sky is waiting for the next flush
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Owner of all skies and of the dirty queue
#[derive(Debug)]
pub struct SkyManager {
    skies: Registry<SkyHandle, Sky>,
    dirty: Vec<SkyHandle>,
    config: SkyConfig,
    roughness_layers: u32,
    use_cubemap_array: bool,
}

impl SkyManager {
    /// Create a sky manager for storage with the given capabilities
    pub fn new(config: SkyConfig, capabilities: StorageCapabilities) -> Self {
        let use_cubemap_array =
            config.prefer_cubemap_array && capabilities.flags.contains(CapabilityFlags::CUBEMAP_ARRAY);

        Self {
            skies: Registry::new("sky"),
            dirty: Vec::new(),
            config,
            roughness_layers: capabilities.roughness_layers.max(1),
            use_cubemap_array,
        }
    }

    /// Number of GGX roughness levels stored per radiance map
    pub fn roughness_layers(&self) -> u32 {
        self.roughness_layers
    }

    /// Whether radiance maps are stored as cubemap arrays
    pub fn is_using_cubemap_array(&self) -> bool {
        self.use_cubemap_array
    }

    /// GGX sample count applied to skies in `mode`
    pub fn samples_for(&self, mode: SkyMode) -> u32 {
        match mode {
            SkyMode::Quality => self.config.ggx_samples_quality,
            SkyMode::Realtime => self.config.ggx_samples_realtime,
        }
    }

    /// Create a sky with default properties; it is not queued
    pub fn create(&mut self) -> SkyHandle {
        let handle = self.skies.allocate(Sky::new(self.config.default_radiance_size));
        log::debug!("Created sky {:?}", handle);
        handle
    }

    /// Look up a sky
    pub fn get(&self, handle: SkyHandle) -> Option<&Sky> {
        self.skies.resolve(handle)
    }

    /// Whether `handle` refers to a live sky
    pub fn contains(&self, handle: SkyHandle) -> bool {
        self.skies.contains(handle)
    }

    /// Number of live skies
    pub fn len(&self) -> usize {
        self.skies.len()
    }

    /// Whether no skies exist
    pub fn is_empty(&self) -> bool {
        self.skies.is_empty()
    }

    /// Set the radiance cubemap size
    ///
    /// The size must be a power of two no smaller than the configured minimum.
    pub fn set_radiance_size(&mut self, handle: SkyHandle, size: u32) -> RenderResult<()> {
        if !utils::is_power_of_two(size) || size < self.config.min_radiance_size {
            return Err(RenderError::InvalidParameter(format!(
                "radiance size must be a power of two of at least {}, got {size}",
                self.config.min_radiance_size
            )));
        }

        self.modify(handle, |sky| {
            let changed = sky.radiance_size != size;
            sky.radiance_size = size;
            changed
        })
    }

    /// Set the convolution quality
    pub fn set_mode(&mut self, handle: SkyHandle, mode: SkyMode) -> RenderResult<()> {
        self.modify(handle, |sky| {
            let changed = sky.mode != mode;
            sky.mode = mode;
            changed
        })
    }

    /// Set the source panorama
    pub fn set_texture(&mut self, handle: SkyHandle, panorama: TextureHandle) -> RenderResult<()> {
        self.modify(handle, |sky| {
            let changed = sky.panorama != panorama;
            sky.panorama = panorama;
            changed
        })
    }

    /// Source panorama of a sky, invalid for unknown skies
    pub fn panorama_texture(&self, handle: SkyHandle) -> TextureHandle {
        self.read(handle, Sky::panorama)
    }

    /// Radiance texture of a sky
    ///
    /// Invalid for unknown skies and for skies with edits pending a flush.
    pub fn radiance_texture(&self, handle: SkyHandle) -> TextureHandle {
        self.read(handle, Sky::radiance)
    }

    /// Whether a sky is queued for regeneration
    pub fn is_dirty(&self, handle: SkyHandle) -> bool {
        self.skies.resolve(handle).is_some_and(Sky::is_dirty)
    }

    /// Number of queued skies
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Regenerate every queued sky and empty the queue
    ///
    /// Returns the number of skies regenerated. A sky that fails to
    /// regenerate stays dirty and is queued again for the next flush; the
    /// remaining skies are still regenerated and the first error is returned.
    pub fn flush_dirty<S: RenderStorage + ?Sized>(&mut self, storage: &mut S) -> RenderResult<usize> {
        let queued = std::mem::take(&mut self.dirty);
        let mut regenerated = 0;
        let mut failure = None;

        for handle in queued {
            let layout = RadianceLayout::new(self, handle);
            let (Some(sky), Some(layout)) = (self.skies.resolve_mut(handle), layout) else {
                continue;
            };

            match layout.regenerate(sky, storage) {
                Ok(()) => {
                    sky.dirty = false;
                    regenerated += 1;
                }
                Err(err) => {
                    log::error!("Failed to regenerate sky {:?}: {}", handle, err);
                    self.dirty.push(handle);
                    failure.get_or_insert(err);
                }
            }
        }

        if regenerated > 0 {
            log::debug!("Flushed {} dirty sky(s)", regenerated);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(regenerated),
        }
    }

    /// Destroy a sky and its radiance resources
    ///
    /// The sky is taken out of the dirty queue first, so a pending flush never
    /// sees it. Returns `false` for unknown handles.
    pub fn free<S: RenderStorage + ?Sized>(&mut self, handle: SkyHandle, storage: &mut S) -> bool {
        let Some(mut sky) = self.skies.take(handle) else {
            return false;
        };

        if sky.dirty {
            self.dirty.retain(|&queued| queued != handle);
        }

        release_radiance(&mut sky, storage);
        log::debug!("Freed sky {:?}", handle);
        true
    }

    /// Destroy every sky
    pub fn free_all<S: RenderStorage + ?Sized>(&mut self, storage: &mut S) {
        self.dirty.clear();

        for (_, mut sky) in self.skies.drain() {
            release_radiance(&mut sky, storage);
        }
    }

    fn read(&self, handle: SkyHandle, field: impl FnOnce(&Sky) -> TextureHandle) -> TextureHandle {
        match self.skies.resolve(handle) {
            Some(sky) => field(sky),
            None => {
                log::warn!("Reading from invalid sky {:?}", handle);
                TextureHandle::INVALID
            }
        }
    }

    /// Apply `update` and queue the sky if it reports a change
    fn modify(&mut self, handle: SkyHandle, update: impl FnOnce(&mut Sky) -> bool) -> RenderResult<()> {
        let Some(sky) = self.skies.resolve_mut(handle) else {
            log::error!("Modifying invalid sky {:?}", handle);
            return Err(RenderError::invalid_handle(self.skies.kind()));
        };

        if update(sky) {
            invalidate(&mut self.dirty, handle, sky);
        }

        Ok(())
    }
}

/// Mark a sky dirty and queue it, unless it is queued already
fn invalidate(queue: &mut Vec<SkyHandle>, handle: SkyHandle, sky: &mut Sky) {
    if sky.dirty {
        return;
    }

    sky.dirty = true;
    queue.push(handle);
}

/// Release every derived GPU resource of a sky
fn release_radiance<S: RenderStorage + ?Sized>(sky: &mut Sky, storage: &mut S) {
    for layer in sky.layers.drain(..) {
        for mipmap in layer.mipmaps {
            for face in mipmap.faces {
                if face.framebuffer.is_valid() {
                    storage.framebuffer_free(face.framebuffer);
                }

                if face.view.is_valid() {
                    storage.texture_free(face.view);
                }
            }
        }
    }

    for texture in [&mut sky.radiance_base_cubemap, &mut sky.radiance] {
        if texture.is_valid() {
            storage.texture_free(*texture);
        }

        *texture = TextureHandle::INVALID;
    }

    sky.radiance_samples = 0;
}

/// Shape of the radiance texture for one sky
#[derive(Debug, Clone, Copy)]
struct RadianceLayout {
    layers: u32,
    mipmaps: u32,
    cubemap_array: bool,
    samples: u32,
}

impl RadianceLayout {
    fn new(manager: &SkyManager, handle: SkyHandle) -> Option<Self> {
        let sky = manager.skies.resolve(handle)?;
        let chain = utils::mip_chain_length(sky.radiance_size, manager.config.min_mip_size).max(1);

        let (layers, mipmaps) = if manager.use_cubemap_array {
            (manager.roughness_layers, chain)
        } else {
            (1, chain.min(manager.roughness_layers))
        };

        Some(Self {
            layers,
            mipmaps,
            cubemap_array: manager.use_cubemap_array,
            samples: manager.samples_for(sky.mode),
        })
    }

    /// Roughness level written by a given layer and mip
    ///
    /// Cubemap arrays store one roughness per layer; single cubemaps store
    /// one roughness per mip.
    fn roughness(&self, layer: u32, mip: u32) -> f32 {
        let (level, levels) = if self.cubemap_array {
            (layer, self.layers)
        } else {
            (mip, self.mipmaps)
        };

        if levels <= 1 {
            0.0
        } else {
            level as f32 / (levels - 1) as f32
        }
    }

    fn regenerate<S: RenderStorage + ?Sized>(&self, sky: &mut Sky, storage: &mut S) -> RenderResult<()> {
        release_radiance(sky, storage);

        sky.radiance = storage.radiance_create(&RadianceTextureDesc {
            size: sky.radiance_size,
            mipmaps: self.mipmaps,
            layers: self.layers,
            cubemap_array: self.cubemap_array,
        })?;

        let radiance = sky.radiance;

        for layer in 0..self.layers {
            let slot = sky.layers.len();
            sky.layers.push(RadianceLayer::default());

            for mip in 0..self.mipmaps {
                let mipmaps = &mut sky.layers[slot].mipmaps;
                mipmaps.push(RadianceMipmap {
                    faces: [RadianceFace::default(); CUBE_FACES],
                    size: sky.radiance_size >> mip,
                });

                let faces = &mut mipmaps[mip as usize].faces;

                for (face_index, face) in (0u32..).zip(faces.iter_mut()) {
                    face.view = storage.texture_create_view(
                        radiance,
                        &TextureViewDesc { layer, mipmap: mip, face: Some(face_index) },
                    )?;
                    face.framebuffer = storage.framebuffer_create(face.view)?;
                }
            }
        }

        sky.radiance_base_cubemap = storage.texture_create_view(
            sky.radiance,
            &TextureViewDesc { layer: 0, mipmap: 0, face: None },
        )?;

        if storage.texture_is_valid(sky.panorama) {
            self.convolve(sky, storage)?;
        } else {
            log::debug!("Sky has no valid panorama, radiance left cleared");
        }

        sky.radiance_samples = self.samples;

        log::debug!(
            "Regenerated sky radiance: size {}, {} layer(s) x {} mip(s), {} GGX samples",
            sky.radiance_size, self.layers, self.mipmaps, self.samples
        );

        Ok(())
    }

    fn convolve<S: RenderStorage + ?Sized>(&self, sky: &Sky, storage: &mut S) -> RenderResult<()> {
        let base = &sky.layers[0].mipmaps[0];
        let base_faces = base.faces.map(|face| face.framebuffer);

        storage.copy_panorama_to_cubemap(sky.panorama, &base_faces, base.size)?;

        for (layer_index, layer) in (0u32..).zip(&sky.layers) {
            for (mip_index, mipmap) in (0u32..).zip(&layer.mipmaps) {
                if layer_index == 0 && mip_index == 0 {
                    continue; // written by the panorama copy
                }

                for (face_index, face) in (0u32..).zip(&mipmap.faces) {
                    let params = RadianceFilterParams {
                        face: face_index,
                        layer: layer_index,
                        mip_level: mip_index,
                        sample_count: self.samples,
                        roughness: self.roughness(layer_index, mip_index),
                        face_size: mipmap.size,
                        padding: [0; 2],
                    };

                    storage.filter_radiance(sky.radiance_base_cubemap, face.framebuffer, &params)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::storage::{HeadlessStorage, StorageCommand};

    fn single_cubemap_capabilities() -> StorageCapabilities {
        StorageCapabilities {
            roughness_layers: 6,
            flags: CapabilityFlags::empty(),
        }
    }

    fn manager() -> (SkyManager, HeadlessStorage) {
        let capabilities = single_cubemap_capabilities();
        (
            SkyManager::new(SkyConfig::default(), capabilities),
            HeadlessStorage::with_capabilities(capabilities),
        )
    }

    #[test]
    fn test_create_is_clean_with_defaults() {
        let (mut skies, _) = manager();
        let sky = skies.create();

        assert!(!skies.is_dirty(sky));
        assert_eq!(skies.dirty_count(), 0);

        let state = skies.get(sky).unwrap();
        assert_eq!(state.radiance_size(), 256);
        assert_eq!(state.mode(), SkyMode::Quality);
        assert!(!state.panorama().is_valid());
        assert!(!state.radiance().is_valid());
    }

    #[test]
    fn test_flush_builds_six_faces_per_mip() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();

        skies.set_radiance_size(sky, 128).unwrap();
        assert_eq!(skies.flush_dirty(&mut storage).unwrap(), 1);
        assert!(!skies.is_dirty(sky));

        let state = skies.get(sky).unwrap();
        let layers = state.radiance_layers();
        assert_eq!(layers.len(), 1);

        // 128 down to the 4 texel minimum is 6 levels, capped by 6 roughness layers
        let mipmaps = &layers[0].mipmaps;
        assert_eq!(mipmaps.len(), 6);
        assert_eq!(mipmaps[0].size, 128);
        assert_eq!(mipmaps.last().unwrap().size, 4);

        for (level, mipmap) in mipmaps.iter().enumerate() {
            assert_eq!(mipmap.size, 128 >> level);
            assert_eq!(mipmap.faces.len(), CUBE_FACES);
            assert!(mipmap.faces.iter().all(|face| face.view.is_valid() && face.framebuffer.is_valid()));
        }

        assert!(state.radiance().is_valid());
        assert!(state.radiance_base_cubemap().is_valid());
        assert_eq!(storage.radiance_desc(state.radiance()).unwrap().size, 128);
    }

    #[test]
    fn test_two_setters_queue_once() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();

        skies.set_radiance_size(sky, 512).unwrap();
        skies.set_mode(sky, SkyMode::Realtime).unwrap();

        assert_eq!(skies.dirty_count(), 1);
        assert_eq!(skies.flush_dirty(&mut storage).unwrap(), 1);

        let creations = storage
            .commands()
            .iter()
            .filter(|command| matches!(command, StorageCommand::CreateRadiance { .. }))
            .count();
        assert_eq!(creations, 1);
    }

    #[test]
    fn test_setting_current_value_does_not_queue() {
        let (mut skies, _) = manager();
        let sky = skies.create();

        skies.set_radiance_size(sky, 256).unwrap();
        skies.set_mode(sky, SkyMode::Quality).unwrap();
        skies.set_texture(sky, TextureHandle::INVALID).unwrap();

        assert!(!skies.is_dirty(sky));
        assert_eq!(skies.dirty_count(), 0);
    }

    #[test]
    fn test_second_flush_is_noop() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();
        skies.set_radiance_size(sky, 64).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        let radiance = skies.radiance_texture(sky);
        storage.clear_commands();

        assert_eq!(skies.flush_dirty(&mut storage).unwrap(), 0);
        assert!(storage.commands().is_empty());
        assert_eq!(skies.radiance_texture(sky), radiance);
    }

    #[test]
    fn test_rejects_invalid_radiance_sizes() {
        let (mut skies, _) = manager();
        let sky = skies.create();

        for size in [0, 16, 100, 300] {
            assert!(matches!(
                skies.set_radiance_size(sky, size),
                Err(RenderError::InvalidParameter(_))
            ));
        }

        assert_eq!(skies.get(sky).unwrap().radiance_size(), 256);
        assert!(!skies.is_dirty(sky));
    }

    #[test]
    fn test_mode_selects_sample_count() {
        let (mut skies, mut storage) = manager();
        let panorama = storage.texture_register(512, 256);
        let sky = skies.create();

        skies.set_texture(sky, panorama).unwrap();
        skies.set_mode(sky, SkyMode::Realtime).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        assert_eq!(skies.get(sky).unwrap().radiance_samples(), 128);
        assert!(storage.filter_passes().all(|pass| pass.sample_count == 128));

        storage.clear_commands();
        skies.set_mode(sky, SkyMode::Quality).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        assert_eq!(skies.get(sky).unwrap().radiance_samples(), 1024);
        assert!(storage.filter_passes().count() > 0);
        assert!(storage.filter_passes().all(|pass| pass.sample_count == 1024));
    }

    #[test]
    fn test_convolution_skips_base_level_and_ramps_roughness() {
        let (mut skies, mut storage) = manager();
        let panorama = storage.texture_register(512, 256);
        let sky = skies.create();

        skies.set_texture(sky, panorama).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        let copies = storage
            .commands()
            .iter()
            .filter(|command| matches!(command, StorageCommand::CopyPanorama { face_size: 256, .. }))
            .count();
        assert_eq!(copies, 1);

        // 6 mips, the first is copied, the remaining 5 are filtered per face
        let passes: Vec<_> = storage.filter_passes().copied().collect();
        assert_eq!(passes.len(), 5 * CUBE_FACES);
        assert!(passes.iter().all(|pass| pass.mip_level > 0));
        assert!(passes.iter().any(|pass| (pass.roughness - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_without_panorama_nothing_is_filtered() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();

        skies.set_mode(sky, SkyMode::Realtime).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        assert!(skies.radiance_texture(sky).is_valid());
        assert_eq!(storage.filter_passes().count(), 0);
    }

    #[test]
    fn test_cubemap_array_layout() {
        let capabilities = StorageCapabilities {
            roughness_layers: 4,
            flags: CapabilityFlags::CUBEMAP_ARRAY,
        };
        let mut skies = SkyManager::new(SkyConfig::default(), capabilities);
        let mut storage = HeadlessStorage::with_capabilities(capabilities);
        assert!(skies.is_using_cubemap_array());

        let sky = skies.create();
        skies.set_radiance_size(sky, 32).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        let layers = skies.get(sky).unwrap().radiance_layers();
        assert_eq!(layers.len(), 4);
        assert!(layers.iter().all(|layer| layer.mipmaps.len() == 4)); // 32, 16, 8, 4

        let desc = storage.radiance_desc(skies.radiance_texture(sky)).unwrap();
        assert!(desc.cubemap_array);
        assert_eq!(desc.layers, 4);
    }

    #[test]
    fn test_regeneration_releases_previous_resources() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();

        skies.set_radiance_size(sky, 64).unwrap();
        skies.flush_dirty(&mut storage).unwrap();
        let textures = storage.live_texture_count();
        let framebuffers = storage.live_framebuffer_count();

        skies.set_mode(sky, SkyMode::Realtime).unwrap();
        skies.flush_dirty(&mut storage).unwrap();

        assert_eq!(storage.live_texture_count(), textures);
        assert_eq!(storage.live_framebuffer_count(), framebuffers);
    }

    #[test]
    fn test_free_removes_from_queue_and_releases() {
        let (mut skies, mut storage) = manager();
        let kept = skies.create();
        let freed = skies.create();

        skies.set_radiance_size(kept, 64).unwrap();
        skies.flush_dirty(&mut storage).unwrap();
        skies.set_radiance_size(freed, 64).unwrap();
        skies.set_mode(kept, SkyMode::Realtime).unwrap();
        assert_eq!(skies.dirty_count(), 2);

        assert!(skies.free(freed, &mut storage));
        assert_eq!(skies.dirty_count(), 1);
        assert!(!skies.free(freed, &mut storage));

        assert_eq!(skies.flush_dirty(&mut storage).unwrap(), 1);

        skies.free(kept, &mut storage);
        assert_eq!(storage.live_texture_count(), 0);
        assert_eq!(storage.live_framebuffer_count(), 0);
    }

    #[test]
    fn test_invalid_handle_policy() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();
        skies.free(sky, &mut storage);

        assert_eq!(
            skies.set_mode(sky, SkyMode::Realtime),
            Err(RenderError::invalid_handle("sky"))
        );
        assert!(!skies.panorama_texture(sky).is_valid());
        assert!(!skies.radiance_texture(sky).is_valid());
        assert!(!skies.is_dirty(sky));
    }

    #[test]
    fn test_radiance_invalid_while_pending() {
        let (mut skies, mut storage) = manager();
        let sky = skies.create();

        skies.set_radiance_size(sky, 64).unwrap();
        skies.flush_dirty(&mut storage).unwrap();
        assert!(skies.radiance_texture(sky).is_valid());

        skies.set_radiance_size(sky, 512).unwrap();
        assert!(!skies.radiance_texture(sky).is_valid());
        assert!(!skies.get(sky).unwrap().radiance().is_valid());
        assert!(!skies.get(sky).unwrap().radiance_base_cubemap().is_valid());

        skies.flush_dirty(&mut storage).unwrap();
        let radiance = skies.radiance_texture(sky);
        assert!(radiance.is_valid());
        assert_eq!(storage.radiance_desc(radiance).unwrap().size, 512);
    }

    /// Headless storage that refuses radiance maps of one size
    struct RejectingStorage {
        inner: HeadlessStorage,
        rejected_size: u32,
    }

    impl RenderStorage for RejectingStorage {
        fn capabilities(&self) -> StorageCapabilities {
            self.inner.capabilities()
        }

        fn texture_is_valid(&self, texture: TextureHandle) -> bool {
            self.inner.texture_is_valid(texture)
        }

        fn radiance_create(&mut self, desc: &RadianceTextureDesc) -> RenderResult<TextureHandle> {
            if desc.size == self.rejected_size {
                return Err(RenderError::ResourceCreationFailed("out of memory".to_string()));
            }
            self.inner.radiance_create(desc)
        }

        fn texture_create_view(&mut self, texture: TextureHandle, desc: &TextureViewDesc) -> RenderResult<TextureHandle> {
            self.inner.texture_create_view(texture, desc)
        }

        fn framebuffer_create(&mut self, attachment: TextureHandle) -> RenderResult<FramebufferHandle> {
            self.inner.framebuffer_create(attachment)
        }

        fn copy_panorama_to_cubemap(
            &mut self,
            panorama: TextureHandle,
            faces: &[FramebufferHandle; 6],
            face_size: u32,
        ) -> RenderResult<()> {
            self.inner.copy_panorama_to_cubemap(panorama, faces, face_size)
        }

        fn filter_radiance(
            &mut self,
            source: TextureHandle,
            target: FramebufferHandle,
            params: &RadianceFilterParams,
        ) -> RenderResult<()> {
            self.inner.filter_radiance(source, target, params)
        }

        fn texture_free(&mut self, texture: TextureHandle) {
            self.inner.texture_free(texture)
        }

        fn framebuffer_free(&mut self, framebuffer: FramebufferHandle) {
            self.inner.framebuffer_free(framebuffer)
        }
    }

    #[test]
    fn test_failed_sky_does_not_block_queue() {
        let (mut skies, inner) = manager();
        let mut storage = RejectingStorage { inner, rejected_size: 512 };

        let failing = skies.create();
        let healthy = skies.create();
        skies.set_radiance_size(failing, 512).unwrap();
        skies.set_radiance_size(healthy, 64).unwrap();

        let result = skies.flush_dirty(&mut storage);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert!(!skies.is_dirty(healthy));
        assert!(skies.radiance_texture(healthy).is_valid());
        assert!(skies.is_dirty(failing));
        assert_eq!(skies.dirty_count(), 1);

        // Still failing: retried, healthy sky untouched
        assert!(skies.flush_dirty(&mut storage).is_err());
        assert_eq!(skies.dirty_count(), 1);

        skies.set_radiance_size(failing, 128).unwrap();
        assert_eq!(skies.dirty_count(), 1);
        assert_eq!(skies.flush_dirty(&mut storage).unwrap(), 1);
        assert!(!skies.is_dirty(failing));
        assert_eq!(skies.dirty_count(), 0);
        assert_eq!(storage.inner.radiance_desc(skies.radiance_texture(failing)).unwrap().size, 128);
    }
}
