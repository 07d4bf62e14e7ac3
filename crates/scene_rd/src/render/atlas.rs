//! Shadow and reflection atlas configuration
//!
//! Atlases are stored configuration only: their size and how they are carved
//! into slots. Packing shadows or reflections into them is up to the backend.

use std::collections::HashMap;

use crate::foundation::collections::Registry;
use crate::render::handles::{LightInstanceHandle, ReflectionAtlasHandle, ReflectionProbeInstanceHandle, ShadowAtlasHandle};
use crate::render::{RenderError, RenderResult};

/// Quadrants per shadow atlas
pub const SHADOW_ATLAS_QUADRANTS: usize = 4;

/// Largest number of shadows a single quadrant can be split into
pub const MAX_QUADRANT_SUBDIVISION: u32 = 256;

/// Round a requested quadrant subdivision to a square power-of-two grid
///
/// `0` disables the quadrant; anything else becomes one of 1, 4, 16, 64 or
/// 256 cells.
pub fn quadrant_subdivision(requested: u32) -> u32 {
    if requested == 0 {
        return 0;
    }

    let requested = requested.min(MAX_QUADRANT_SUBDIVISION);
    let side = (requested as f64).sqrt().ceil() as u32;
    let side = side.next_power_of_two();
    side * side
}

/// Last state recorded for a light in a shadow atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowRecord {
    /// Screen coverage reported with the last update
    pub coverage: f32,
    /// Light version the shadow was last drawn for
    pub version: u64,
}

/// Shadow atlas layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowAtlas {
    size: u32,
    quadrants: [u32; SHADOW_ATLAS_QUADRANTS],
    lights: HashMap<LightInstanceHandle, ShadowRecord>,
}

impl ShadowAtlas {
    /// Atlas size in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Cell count of each quadrant
    pub fn quadrants(&self) -> [u32; SHADOW_ATLAS_QUADRANTS] {
        self.quadrants
    }

    /// Recorded state for a light, if it has a shadow here
    pub fn light(&self, light: LightInstanceHandle) -> Option<&ShadowRecord> {
        self.lights.get(&light)
    }
}

/// Reflection atlas layout and slot ownership
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionAtlas {
    size: u32,
    slots: Vec<Option<ReflectionProbeInstanceHandle>>,
}

impl Default for ReflectionAtlas {
    fn default() -> Self {
        Self {
            size: 0,
            slots: vec![None],
        }
    }
}

impl ReflectionAtlas {
    /// Atlas size in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of reflections the atlas holds
    pub fn subdivision(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Owner of a slot
    pub fn slot_owner(&self, index: u32) -> Option<ReflectionProbeInstanceHandle> {
        self.slots.get(index as usize).copied().flatten()
    }

    /// Assign the first free slot to `owner`
    pub fn claim_slot(&mut self, owner: ReflectionProbeInstanceHandle) -> Option<u32> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(owner);
        Some(index as u32)
    }

    /// Give a slot back, if `owner` still holds it
    pub fn release_slot(&mut self, index: u32, owner: ReflectionProbeInstanceHandle) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            if *slot == Some(owner) {
                *slot = None;
            }
        }
    }
}

/// Owner of all shadow and reflection atlases
#[derive(Debug)]
pub struct AtlasManager {
    shadow_atlases: Registry<ShadowAtlasHandle, ShadowAtlas>,
    reflection_atlases: Registry<ReflectionAtlasHandle, ReflectionAtlas>,
    directional_shadow_count: u32,
}

impl AtlasManager {
    /// Create an empty atlas manager
    pub fn new() -> Self {
        Self {
            shadow_atlases: Registry::new("shadow atlas"),
            reflection_atlases: Registry::new("reflection atlas"),
            directional_shadow_count: 0,
        }
    }

    /// Create an empty shadow atlas
    pub fn shadow_atlas_create(&mut self) -> ShadowAtlasHandle {
        self.shadow_atlases.allocate(ShadowAtlas::default())
    }

    /// Look up a shadow atlas
    pub fn shadow_atlas(&self, handle: ShadowAtlasHandle) -> Option<&ShadowAtlas> {
        self.shadow_atlases.resolve(handle)
    }

    /// Resize a shadow atlas; recorded lights are dropped since their cells
    /// no longer exist
    pub fn shadow_atlas_set_size(&mut self, handle: ShadowAtlasHandle, size: u32) -> RenderResult<()> {
        let atlas = Self::resolve_shadow_atlas(&mut self.shadow_atlases, handle)?;

        if atlas.size != size {
            atlas.size = size;
            atlas.lights.clear();
        }
        Ok(())
    }

    /// Set how many cells a quadrant is split into
    pub fn shadow_atlas_set_quadrant_subdivision(
        &mut self,
        handle: ShadowAtlasHandle,
        quadrant: usize,
        subdivision: u32,
    ) -> RenderResult<()> {
        if quadrant >= SHADOW_ATLAS_QUADRANTS {
            return Err(RenderError::InvalidParameter(format!(
                "shadow atlas quadrant {} out of range",
                quadrant
            )));
        }

        let atlas = Self::resolve_shadow_atlas(&mut self.shadow_atlases, handle)?;
        let subdivision = quadrant_subdivision(subdivision);

        if atlas.quadrants[quadrant] != subdivision {
            atlas.quadrants[quadrant] = subdivision;
            atlas.lights.clear();
        }
        Ok(())
    }

    /// Record a light's shadow in an atlas
    ///
    /// Returns `true` when the shadow has to be redrawn: the light is new to
    /// the atlas or its version changed since the last update.
    pub fn shadow_atlas_update_light(
        &mut self,
        handle: ShadowAtlasHandle,
        light: LightInstanceHandle,
        coverage: f32,
        version: u64,
    ) -> RenderResult<bool> {
        let atlas = Self::resolve_shadow_atlas(&mut self.shadow_atlases, handle)?;
        let record = ShadowRecord { coverage, version };

        Ok(match atlas.lights.insert(light, record) {
            Some(previous) => previous.version != version,
            None => true,
        })
    }

    /// Set the number of directional shadows rendered per frame
    pub fn set_directional_shadow_count(&mut self, count: u32) {
        self.directional_shadow_count = count;
    }

    /// Number of directional shadows rendered per frame
    pub fn directional_shadow_count(&self) -> u32 {
        self.directional_shadow_count
    }

    /// Create a reflection atlas with a single slot
    pub fn reflection_atlas_create(&mut self) -> ReflectionAtlasHandle {
        self.reflection_atlases.allocate(ReflectionAtlas::default())
    }

    /// Look up a reflection atlas
    pub fn reflection_atlas(&self, handle: ReflectionAtlasHandle) -> Option<&ReflectionAtlas> {
        self.reflection_atlases.resolve(handle)
    }

    /// Look up a reflection atlas mutably
    pub fn reflection_atlas_mut(&mut self, handle: ReflectionAtlasHandle) -> Option<&mut ReflectionAtlas> {
        self.reflection_atlases.resolve_mut(handle)
    }

    /// Resize a reflection atlas
    pub fn reflection_atlas_set_size(&mut self, handle: ReflectionAtlasHandle, size: u32) -> RenderResult<()> {
        let kind = self.reflection_atlases.kind();
        let atlas = self
            .reflection_atlases
            .resolve_mut(handle)
            .ok_or(RenderError::invalid_handle(kind))?;

        atlas.size = size;
        Ok(())
    }

    /// Set how many reflections an atlas holds; existing slots are emptied
    pub fn reflection_atlas_set_subdivision(
        &mut self,
        handle: ReflectionAtlasHandle,
        subdivision: u32,
    ) -> RenderResult<()> {
        if subdivision == 0 {
            return Err(RenderError::InvalidParameter(
                "reflection atlas subdivision must be at least 1".into(),
            ));
        }

        let kind = self.reflection_atlases.kind();
        let atlas = self
            .reflection_atlases
            .resolve_mut(handle)
            .ok_or(RenderError::invalid_handle(kind))?;

        atlas.slots = vec![None; subdivision as usize];
        Ok(())
    }

    /// Destroy a shadow atlas
    pub fn shadow_atlas_free(&mut self, handle: ShadowAtlasHandle) -> bool {
        self.shadow_atlases.free(handle)
    }

    /// Destroy a reflection atlas
    pub fn reflection_atlas_free(&mut self, handle: ReflectionAtlasHandle) -> bool {
        self.reflection_atlases.free(handle)
    }

    /// Drop every shadow record of a light
    pub fn forget_light(&mut self, light: LightInstanceHandle) {
        for (_, atlas) in self.shadow_atlases.iter_mut() {
            atlas.lights.remove(&light);
        }
    }

    fn resolve_shadow_atlas(
        atlases: &mut Registry<ShadowAtlasHandle, ShadowAtlas>,
        handle: ShadowAtlasHandle,
    ) -> RenderResult<&mut ShadowAtlas> {
        let kind = atlases.kind();
        atlases.resolve_mut(handle).ok_or_else(|| {
            log::error!("Modifying invalid shadow atlas {:?}", handle);
            RenderError::invalid_handle(kind)
        })
    }
}

impl Default for AtlasManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;

    #[test]
    fn test_quadrant_subdivision_rounding() {
        assert_eq!(quadrant_subdivision(0), 0);
        assert_eq!(quadrant_subdivision(1), 1);
        assert_eq!(quadrant_subdivision(3), 4);
        assert_eq!(quadrant_subdivision(5), 16);
        assert_eq!(quadrant_subdivision(16), 16);
        assert_eq!(quadrant_subdivision(17), 64);
        assert_eq!(quadrant_subdivision(100), 256);
        assert_eq!(quadrant_subdivision(10_000), 256);
        assert_eq!(quadrant_subdivision((1 << 30) + 1), 256);
        assert_eq!(quadrant_subdivision(u32::MAX), 256);
    }

    #[test]
    fn test_update_light_tracks_versions() {
        let mut atlases = AtlasManager::new();
        let atlas = atlases.shadow_atlas_create();
        let mut lights = SlotMap::<LightInstanceHandle, ()>::with_key();
        let light = lights.insert(());

        assert!(atlases.shadow_atlas_update_light(atlas, light, 0.5, 1).unwrap());
        assert!(!atlases.shadow_atlas_update_light(atlas, light, 0.25, 1).unwrap());
        assert!(atlases.shadow_atlas_update_light(atlas, light, 0.25, 2).unwrap());

        atlases.shadow_atlas_set_size(atlas, 4096).unwrap();
        assert!(atlases.shadow_atlas(atlas).unwrap().light(light).is_none());
        assert!(atlases.shadow_atlas_update_light(atlas, light, 0.25, 2).unwrap());
    }

    #[test]
    fn test_quadrant_out_of_range() {
        let mut atlases = AtlasManager::new();
        let atlas = atlases.shadow_atlas_create();

        atlases.shadow_atlas_set_quadrant_subdivision(atlas, 2, 10).unwrap();
        assert_eq!(atlases.shadow_atlas(atlas).unwrap().quadrants(), [0, 0, 16, 0]);
        assert!(matches!(
            atlases.shadow_atlas_set_quadrant_subdivision(atlas, 4, 1),
            Err(RenderError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_reflection_slots() {
        let mut atlases = AtlasManager::new();
        let atlas = atlases.reflection_atlas_create();
        atlases.reflection_atlas_set_subdivision(atlas, 2).unwrap();

        let mut probes = SlotMap::<ReflectionProbeInstanceHandle, ()>::with_key();
        let (a, b, c) = (probes.insert(()), probes.insert(()), probes.insert(()));

        let reflection = atlases.reflection_atlas_mut(atlas).unwrap();
        assert_eq!(reflection.claim_slot(a), Some(0));
        assert_eq!(reflection.claim_slot(b), Some(1));
        assert_eq!(reflection.claim_slot(c), None);

        reflection.release_slot(0, b);
        assert_eq!(reflection.slot_owner(0), Some(a));
        reflection.release_slot(0, a);
        assert_eq!(reflection.claim_slot(c), Some(0));
    }

    #[test]
    fn test_invalid_atlas() {
        let mut atlases = AtlasManager::new();
        let atlas = atlases.shadow_atlas_create();
        assert!(atlases.shadow_atlas_free(atlas));

        assert_eq!(
            atlases.shadow_atlas_set_size(atlas, 1024),
            Err(RenderError::invalid_handle("shadow atlas"))
        );
        assert_eq!(atlases.directional_shadow_count(), 0);
    }
}
