//! Per-scene instances of externally owned lights and probes
//!
//! The light and probe servers own the lights and probes themselves. The
//! renderer core keeps the per-instance state a backend needs while drawing:
//! transforms, shadow passes, visibility, and reflection atlas placement.

use crate::foundation::collections::{Key, Registry};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::handles::{
    GiProbeHandle, GiProbeInstanceHandle, LightHandle, LightInstanceHandle, ReflectionAtlasHandle,
    ReflectionProbeHandle, ReflectionProbeInstanceHandle,
};
use crate::render::{RenderError, RenderResult};

/// Shadow passes a light can render (directional split count or omni faces)
pub const MAX_SHADOW_PASSES: usize = 4;

/// One shadow pass of a light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowTransform {
    /// Light camera projection
    pub projection: Mat4,
    /// Light camera transform
    pub transform: Mat4,
    /// Far plane
    pub far: f32,
    /// Split distance of this pass
    pub split: f32,
    /// Depth bias multiplier
    pub bias_scale: f32,
}

impl Default for ShadowTransform {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            transform: Mat4::identity(),
            far: 0.0,
            split: 0.0,
            bias_scale: 1.0,
        }
    }
}

/// Scene instance of a light
#[derive(Debug, Clone, PartialEq)]
pub struct LightInstance {
    /// Light this instance places in the scene
    pub light: LightHandle,
    /// World transform
    pub transform: Mat4,
    /// Shadow passes
    pub shadow_transforms: [ShadowTransform; MAX_SHADOW_PASSES],
    /// Seen by a camera since the last frame update
    pub visible: bool,
}

/// Scene instance of a reflection probe
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionProbeInstance {
    /// Probe this instance places in the scene
    pub probe: ReflectionProbeHandle,
    /// World transform
    pub transform: Mat4,
    atlas: Option<(ReflectionAtlasHandle, u32)>,
    dirty: bool,
    has_reflection: bool,
    processing_step: Option<u32>,
}

impl ReflectionProbeInstance {
    /// Atlas and slot this probe renders into
    pub fn atlas_slot(&self) -> Option<(ReflectionAtlasHandle, u32)> {
        self.atlas
    }

    /// Whether the probe is being rendered or filtered
    pub fn is_rendering(&self) -> bool {
        self.processing_step.is_some()
    }
}

/// Scene instance of a GI probe
#[derive(Debug, Clone, PartialEq)]
pub struct GiProbeInstance {
    /// Probe providing the light data
    pub base: GiProbeHandle,
    /// Baked data the probe samples
    pub data: GiProbeHandle,
    /// World to probe data transform
    pub transform_to_data: Mat4,
    /// Probe extents
    pub bounds: Vec3,
}

impl Default for GiProbeInstance {
    fn default() -> Self {
        Self {
            base: GiProbeHandle::INVALID,
            data: GiProbeHandle::INVALID,
            transform_to_data: Mat4::identity(),
            bounds: Vec3::zeros(),
        }
    }
}

fn resolve<'a, K: Key, T>(registry: &'a mut Registry<K, T>, handle: K) -> RenderResult<&'a mut T> {
    let kind = registry.kind();
    registry.resolve_mut(handle).ok_or_else(|| {
        log::error!("Modifying invalid {} {:?}", kind, handle);
        RenderError::invalid_handle(kind)
    })
}

/// Owner of all light and probe instances
#[derive(Debug)]
pub struct InstanceManager {
    lights: Registry<LightInstanceHandle, LightInstance>,
    reflection_probes: Registry<ReflectionProbeInstanceHandle, ReflectionProbeInstance>,
    gi_probes: Registry<GiProbeInstanceHandle, GiProbeInstance>,
}

impl InstanceManager {
    /// Create an empty instance manager
    pub fn new() -> Self {
        Self {
            lights: Registry::new("light instance"),
            reflection_probes: Registry::new("reflection probe instance"),
            gi_probes: Registry::new("GI probe instance"),
        }
    }

    // Lights

    /// Create an instance of `light`
    pub fn light_instance_create(&mut self, light: LightHandle) -> LightInstanceHandle {
        self.lights.allocate(LightInstance {
            light,
            transform: Mat4::identity(),
            shadow_transforms: [ShadowTransform::default(); MAX_SHADOW_PASSES],
            visible: false,
        })
    }

    /// Look up a light instance
    pub fn light_instance(&self, handle: LightInstanceHandle) -> Option<&LightInstance> {
        self.lights.resolve(handle)
    }

    /// Set a light instance's world transform
    pub fn light_instance_set_transform(&mut self, handle: LightInstanceHandle, transform: Mat4) -> RenderResult<()> {
        resolve(&mut self.lights, handle)?.transform = transform;
        Ok(())
    }

    /// Set the camera of one shadow pass
    pub fn light_instance_set_shadow_transform(
        &mut self,
        handle: LightInstanceHandle,
        pass: usize,
        shadow: ShadowTransform,
    ) -> RenderResult<()> {
        if pass >= MAX_SHADOW_PASSES {
            return Err(RenderError::InvalidParameter(format!("shadow pass {} out of range", pass)));
        }

        resolve(&mut self.lights, handle)?.shadow_transforms[pass] = shadow;
        Ok(())
    }

    /// Flag a light instance as visible this frame
    pub fn light_instance_mark_visible(&mut self, handle: LightInstanceHandle) -> RenderResult<()> {
        resolve(&mut self.lights, handle)?.visible = true;
        Ok(())
    }

    /// Destroy a light instance
    pub fn light_instance_free(&mut self, handle: LightInstanceHandle) -> bool {
        self.lights.free(handle)
    }

    /// Reset per-frame visibility
    pub fn clear_visibility(&mut self) {
        for (_, light) in self.lights.iter_mut() {
            light.visible = false;
        }
    }

    // Reflection probes

    /// Create an instance of `probe`, initially needing a redraw
    pub fn reflection_probe_instance_create(&mut self, probe: ReflectionProbeHandle) -> ReflectionProbeInstanceHandle {
        self.reflection_probes.allocate(ReflectionProbeInstance {
            probe,
            transform: Mat4::identity(),
            atlas: None,
            dirty: true,
            has_reflection: false,
            processing_step: None,
        })
    }

    /// Look up a reflection probe instance
    pub fn reflection_probe_instance(&self, handle: ReflectionProbeInstanceHandle) -> Option<&ReflectionProbeInstance> {
        self.reflection_probes.resolve(handle)
    }

    /// Move a reflection probe; its reflection has to be redrawn
    pub fn reflection_probe_instance_set_transform(
        &mut self,
        handle: ReflectionProbeInstanceHandle,
        transform: Mat4,
    ) -> RenderResult<()> {
        let probe = resolve(&mut self.reflection_probes, handle)?;
        probe.transform = transform;
        probe.dirty = true;
        Ok(())
    }

    /// Whether the probe's reflection is out of date
    pub fn reflection_probe_instance_needs_redraw(&self, handle: ReflectionProbeInstanceHandle) -> bool {
        self.reflection_probes.resolve(handle).is_some_and(|probe| probe.dirty)
    }

    /// Whether the probe holds a finished reflection
    pub fn reflection_probe_instance_has_reflection(&self, handle: ReflectionProbeInstanceHandle) -> bool {
        self.reflection_probes.resolve(handle).is_some_and(|probe| probe.has_reflection)
    }

    /// Detach a probe from its atlas slot, returning the slot it held
    pub fn reflection_probe_release_atlas_index(
        &mut self,
        handle: ReflectionProbeInstanceHandle,
    ) -> RenderResult<Option<(ReflectionAtlasHandle, u32)>> {
        let probe = resolve(&mut self.reflection_probes, handle)?;
        probe.has_reflection = false;
        probe.dirty = true;
        probe.processing_step = None;
        Ok(probe.atlas.take())
    }

    /// Start rendering a probe into an atlas slot
    pub fn reflection_probe_instance_begin_render(
        &mut self,
        handle: ReflectionProbeInstanceHandle,
        atlas: ReflectionAtlasHandle,
        slot: u32,
    ) -> RenderResult<()> {
        let probe = resolve(&mut self.reflection_probes, handle)?;
        probe.atlas = Some((atlas, slot));
        probe.processing_step = Some(0);
        Ok(())
    }

    /// Advance post-processing of a rendered probe by one step
    ///
    /// Returns `true` once all `steps` are done; the probe then holds a
    /// reflection and no longer needs a redraw. Probes that are not being
    /// rendered report `true` immediately.
    pub fn reflection_probe_instance_postprocess_step(
        &mut self,
        handle: ReflectionProbeInstanceHandle,
        steps: u32,
    ) -> RenderResult<bool> {
        let probe = resolve(&mut self.reflection_probes, handle)?;

        let Some(step) = probe.processing_step else {
            return Ok(true);
        };

        let step = step + 1;
        if step < steps {
            probe.processing_step = Some(step);
            return Ok(false);
        }

        probe.processing_step = None;
        probe.has_reflection = true;
        probe.dirty = false;
        Ok(true)
    }

    /// Destroy a reflection probe instance, handing it back so its atlas
    /// slot can be released
    pub fn reflection_probe_instance_free(
        &mut self,
        handle: ReflectionProbeInstanceHandle,
    ) -> Option<ReflectionProbeInstance> {
        self.reflection_probes.take(handle)
    }

    // GI probes

    /// Create an empty GI probe instance
    pub fn gi_probe_instance_create(&mut self) -> GiProbeInstanceHandle {
        self.gi_probes.allocate(GiProbeInstance::default())
    }

    /// Look up a GI probe instance
    pub fn gi_probe_instance(&self, handle: GiProbeInstanceHandle) -> Option<&GiProbeInstance> {
        self.gi_probes.resolve(handle)
    }

    /// Set the probe and baked data a GI probe instance samples
    pub fn gi_probe_instance_set_light_data(
        &mut self,
        handle: GiProbeInstanceHandle,
        base: GiProbeHandle,
        data: GiProbeHandle,
    ) -> RenderResult<()> {
        let probe = resolve(&mut self.gi_probes, handle)?;
        probe.base = base;
        probe.data = data;
        Ok(())
    }

    /// Set the world to probe data transform
    pub fn gi_probe_instance_set_transform_to_data(
        &mut self,
        handle: GiProbeInstanceHandle,
        transform: Mat4,
    ) -> RenderResult<()> {
        resolve(&mut self.gi_probes, handle)?.transform_to_data = transform;
        Ok(())
    }

    /// Set the probe extents
    pub fn gi_probe_instance_set_bounds(&mut self, handle: GiProbeInstanceHandle, bounds: Vec3) -> RenderResult<()> {
        resolve(&mut self.gi_probes, handle)?.bounds = bounds;
        Ok(())
    }

    /// Destroy a GI probe instance
    pub fn gi_probe_instance_free(&mut self, handle: GiProbeInstanceHandle) -> bool {
        self.gi_probes.free(handle)
    }

    /// Destroy every instance
    pub fn clear(&mut self) {
        self.lights.drain().for_each(drop);
        self.reflection_probes.drain().for_each(drop);
        self.gi_probes.drain().for_each(drop);
    }
}

impl Default for InstanceManager {
    fn default() -> Self {
        Self::new()
    }
}
