//! # Environment Configuration
//!
//! Environments are plain value objects: background selection, ambient
//! lighting, tonemapping and a set of post-process blocks that backends read
//! when they render. Nothing here owns GPU resources, so setters have no side
//! effects beyond the environment they write to.
//!
//! The sky an environment points at is a weak reference. It is not checked
//! when written and may go stale; readers resolve it through the sky manager
//! when they need it (see [`EnvironmentManager::sky_radiance`]).

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::foundation::collections::Registry;
use crate::foundation::math::{Color, Mat3};
use crate::render::handles::{EnvironmentHandle, SkyHandle, TextureHandle};
use crate::render::sky::SkyManager;
use crate::render::{RenderError, RenderResult};

/// Smallest exposure and white point an environment stores
pub const MIN_EXPOSURE: f32 = 1e-4;

/// What is drawn behind the scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentBackground {
    /// The viewport clear color
    #[default]
    ClearColor,
    /// A custom solid color
    Color,
    /// The environment's sky
    Sky,
    /// A canvas layer range
    Canvas,
    /// Leave the previous contents untouched
    Keep,
    /// A camera feed
    CameraFeed,
}

/// Where ambient light comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbientSource {
    /// Follow the background
    #[default]
    Background,
    /// No ambient light
    Disabled,
    /// The ambient color
    Color,
    /// The sky radiance
    Sky,
}

/// Where specular reflections come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReflectionSource {
    /// Follow the background
    #[default]
    Background,
    /// No reflections
    Disabled,
    /// The sky radiance
    Sky,
}

/// Tonemapping operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneMapper {
    /// Linear, clipped
    #[default]
    Linear,
    /// Reinhard
    Reinhard,
    /// Filmic curve
    Filmic,
    /// ACES fitted curve
    Aces,
}

impl ToneMapper {
    fn index(self) -> u32 {
        match self {
            Self::Linear => 0,
            Self::Reinhard => 1,
            Self::Filmic => 2,
            Self::Aces => 3,
        }
    }
}

/// Ambient lighting settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    /// Ambient color
    pub color: Color,
    /// Source of ambient light
    pub source: AmbientSource,
    /// Ambient energy multiplier
    pub energy: f32,
    /// Fraction of ambient light taken from the sky, in [0, 1]
    pub sky_contribution: f32,
    /// Source of reflections
    pub reflection_source: ReflectionSource,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            source: AmbientSource::Background,
            energy: 1.0,
            sky_contribution: 1.0,
            reflection_source: ReflectionSource::Background,
        }
    }
}

/// Tonemapping and exposure settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tonemap {
    /// Operator
    pub tone_mapper: ToneMapper,
    /// Exposure multiplier, at least [`MIN_EXPOSURE`]
    pub exposure: f32,
    /// White point, at least [`MIN_EXPOSURE`]
    pub white: f32,
    /// Adapt exposure to scene luminance
    pub auto_exposure: bool,
    /// Lowest adapted luminance
    pub min_luminance: f32,
    /// Highest adapted luminance, never below `min_luminance`
    pub max_luminance: f32,
    /// Adaptation speed
    pub auto_exposure_speed: f32,
    /// Adaptation scale
    pub auto_exposure_scale: f32,
}

impl Default for Tonemap {
    fn default() -> Self {
        Self {
            tone_mapper: ToneMapper::Linear,
            exposure: 1.0,
            white: 1.0,
            auto_exposure: false,
            min_luminance: 0.2,
            max_luminance: 8.0,
            auto_exposure_speed: 0.2,
            auto_exposure_scale: 0.5,
        }
    }
}

impl Tonemap {
    /// Clamp values into their stored domain
    fn sanitized(mut self) -> Self {
        self.exposure = self.exposure.max(MIN_EXPOSURE);
        self.white = self.white.max(MIN_EXPOSURE);
        self.min_luminance = self.min_luminance.max(0.0);
        self.max_luminance = self.max_luminance.max(self.min_luminance);
        self
    }
}

/// Tonemap parameters in the layout backends upload to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TonemapUniform {
    /// Exposure multiplier
    pub exposure: f32,
    /// White point
    pub white: f32,
    /// Lowest adapted luminance
    pub min_luminance: f32,
    /// Highest adapted luminance
    pub max_luminance: f32,
    /// Adaptation speed
    pub auto_exposure_speed: f32,
    /// Adaptation scale
    pub auto_exposure_scale: f32,
    /// 1 if auto exposure is enabled
    pub auto_exposure: u32,
    /// Operator index (linear, reinhard, filmic, aces)
    pub tone_mapper: u32,
}

/// Depth-of-field blur quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DofBlurQuality {
    /// Few samples
    Low,
    /// Balanced
    #[default]
    Medium,
    /// Many samples
    High,
}

/// Depth-of-field blur for one side of the focal plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DofBlur {
    /// Blur enabled
    pub enabled: bool,
    /// Distance where blur starts
    pub distance: f32,
    /// Length of the transition into full blur
    pub transition: f32,
    /// Blur amount
    pub amount: f32,
    /// Blur quality
    pub quality: DofBlurQuality,
}

impl Default for DofBlur {
    fn default() -> Self {
        Self {
            enabled: false,
            distance: 10.0,
            transition: 5.0,
            amount: 0.1,
            quality: DofBlurQuality::Medium,
        }
    }
}

/// How glow is blended onto the image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlowBlendMode {
    /// Additive
    Additive,
    /// Screen
    Screen,
    /// Soft light
    #[default]
    SoftLight,
    /// Replace
    Replace,
}

/// Glow (bloom) settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    /// Glow enabled
    pub enabled: bool,
    /// Bit mask of the blur levels that contribute
    pub level_flags: u32,
    /// Glow intensity
    pub intensity: f32,
    /// Glow strength
    pub strength: f32,
    /// Bloom threshold
    pub bloom_threshold: f32,
    /// Blend mode
    pub blend_mode: GlowBlendMode,
    /// Luminance above which pixels bleed
    pub hdr_bleed_threshold: f32,
    /// Bleed scale
    pub hdr_bleed_scale: f32,
    /// Luminance cap
    pub hdr_luminance_cap: f32,
    /// Bicubic upscaling of blur levels
    pub bicubic_upscale: bool,
}

impl Default for Glow {
    fn default() -> Self {
        Self {
            enabled: false,
            level_flags: 0b0000_0100,
            intensity: 0.8,
            strength: 1.0,
            bloom_threshold: 0.0,
            blend_mode: GlowBlendMode::SoftLight,
            hdr_bleed_threshold: 1.0,
            hdr_bleed_scale: 2.0,
            hdr_luminance_cap: 12.0,
            bicubic_upscale: false,
        }
    }
}

/// Fog color settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    /// Fog enabled
    pub enabled: bool,
    /// Fog color
    pub color: Color,
    /// Color toward the sun
    pub sun_color: Color,
    /// Sun color influence
    pub sun_amount: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::rgb(0.5, 0.6, 0.7),
            sun_color: Color::rgb(1.0, 0.9, 0.7),
            sun_amount: 0.0,
        }
    }
}

/// Depth fog settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogDepth {
    /// Depth fog enabled
    pub enabled: bool,
    /// Distance where fog starts
    pub begin: f32,
    /// Distance of full fog
    pub end: f32,
    /// Falloff curve exponent
    pub curve: f32,
    /// Transmit light through fog
    pub transmit: bool,
    /// Transmission curve exponent
    pub transmit_curve: f32,
}

impl Default for FogDepth {
    fn default() -> Self {
        Self {
            enabled: false,
            begin: 10.0,
            end: 100.0,
            curve: 1.0,
            transmit: false,
            transmit_curve: 1.0,
        }
    }
}

/// Height fog settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogHeight {
    /// Height fog enabled
    pub enabled: bool,
    /// Height of full fog
    pub min_height: f32,
    /// Height where fog ends
    pub max_height: f32,
    /// Falloff curve exponent
    pub curve: f32,
}

impl Default for FogHeight {
    fn default() -> Self {
        Self {
            enabled: false,
            min_height: 10.0,
            max_height: 0.0,
            curve: 1.0,
        }
    }
}

/// Screen-space reflection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ssr {
    /// SSR enabled
    pub enabled: bool,
    /// Ray march steps
    pub max_steps: u32,
    /// Fade-in distance
    pub fade_in: f32,
    /// Fade-out distance
    pub fade_out: f32,
    /// Depth tolerance of hits
    pub depth_tolerance: f32,
    /// Blur reflections by roughness
    pub roughness: bool,
}

impl Default for Ssr {
    fn default() -> Self {
        Self {
            enabled: false,
            max_steps: 64,
            fade_in: 0.15,
            fade_out: 2.0,
            depth_tolerance: 0.2,
            roughness: true,
        }
    }
}

/// Ambient occlusion sample quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsaoQuality {
    /// Few samples
    Low,
    /// Balanced
    #[default]
    Medium,
    /// Many samples
    High,
}

/// Ambient occlusion blur kernel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsaoBlur {
    /// No blur
    Disabled,
    /// 1x1
    Blur1x1,
    /// 2x2
    Blur2x2,
    /// 3x3
    #[default]
    Blur3x3,
}

/// Screen-space ambient occlusion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ssao {
    /// SSAO enabled
    pub enabled: bool,
    /// Primary radius
    pub radius: f32,
    /// Primary intensity
    pub intensity: f32,
    /// Secondary radius
    pub radius2: f32,
    /// Secondary intensity
    pub intensity2: f32,
    /// Depth bias
    pub bias: f32,
    /// Influence on direct light
    pub light_affect: f32,
    /// Influence of material AO channels
    pub ao_channel_affect: f32,
    /// Occlusion color
    pub color: Color,
    /// Sample quality
    pub quality: SsaoQuality,
    /// Blur kernel
    pub blur: SsaoBlur,
    /// Bilateral blur edge sharpness
    pub bilateral_sharpness: f32,
}

impl Default for Ssao {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 1.0,
            intensity: 1.0,
            radius2: 0.0,
            intensity2: 1.0,
            bias: 0.01,
            light_affect: 0.0,
            ao_channel_affect: 0.0,
            color: Color::BLACK,
            quality: SsaoQuality::Medium,
            blur: SsaoBlur::Blur3x3,
            bilateral_sharpness: 4.0,
        }
    }
}

/// Final color adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Adjustment enabled
    pub enabled: bool,
    /// Brightness multiplier
    pub brightness: f32,
    /// Contrast multiplier
    pub contrast: f32,
    /// Saturation multiplier
    pub saturation: f32,
    /// Optional color correction ramp
    pub color_correction: TextureHandle,
}

impl Default for Adjustment {
    fn default() -> Self {
        Self {
            enabled: false,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            color_correction: TextureHandle::INVALID,
        }
    }
}

/// Post-process configuration stored for backends
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PostProcess {
    /// Near depth-of-field blur
    pub dof_blur_near: DofBlur,
    /// Far depth-of-field blur
    pub dof_blur_far: DofBlur,
    /// Glow
    pub glow: Glow,
    /// Fog color
    pub fog: Fog,
    /// Depth fog
    pub fog_depth: FogDepth,
    /// Height fog
    pub fog_height: FogHeight,
    /// Screen-space reflections
    pub ssr: Ssr,
    /// Screen-space ambient occlusion
    pub ssao: Ssao,
    /// Color adjustment
    pub adjustment: Adjustment,
}

/// A rendering environment
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// Background mode
    pub background: EnvironmentBackground,
    /// Weak reference to the sky, may be stale
    pub sky: SkyHandle,
    /// Sky field of view override in degrees, 0 to use the camera's
    pub sky_custom_fov: f32,
    /// Sky orientation basis
    pub sky_orientation: Mat3,
    /// Background color
    pub bg_color: Color,
    /// Background energy multiplier
    pub bg_energy: f32,
    /// Highest canvas layer drawn as background
    pub canvas_max_layer: i32,
    /// Ambient lighting
    pub ambient: AmbientLight,
    /// Tonemapping
    pub tonemap: Tonemap,
    /// Post-process configuration
    pub post_process: PostProcess,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            background: EnvironmentBackground::ClearColor,
            sky: SkyHandle::default(),
            sky_custom_fov: 0.0,
            sky_orientation: Mat3::identity(),
            bg_color: Color::BLACK,
            bg_energy: 1.0,
            canvas_max_layer: 0,
            ambient: AmbientLight::default(),
            tonemap: Tonemap::default(),
            post_process: PostProcess::default(),
        }
    }
}

impl Environment {
    /// Tonemap parameters packed for upload
    pub fn tonemap_uniform(&self) -> TonemapUniform {
        let tonemap = &self.tonemap;

        TonemapUniform {
            exposure: tonemap.exposure,
            white: tonemap.white,
            min_luminance: tonemap.min_luminance,
            max_luminance: tonemap.max_luminance,
            auto_exposure_speed: tonemap.auto_exposure_speed,
            auto_exposure_scale: tonemap.auto_exposure_scale,
            auto_exposure: u32::from(tonemap.auto_exposure),
            tone_mapper: tonemap.tone_mapper.index(),
        }
    }
}

/// Generates a getter returning the stored value, or the default
/// environment's value for invalid handles
macro_rules! environment_getters {
    ($( $(#[$meta:meta])* $name:ident -> $ty:ty => |$env:ident| $read:expr ),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, handle: EnvironmentHandle) -> $ty {
                let read = |$env: &Environment| -> $ty { $read };

                match self.environments.resolve(handle) {
                    Some(environment) => read(environment),
                    None => {
                        log::warn!("Reading from invalid environment {:?}", handle);
                        read(&self.fallback)
                    }
                }
            }
        )*
    };
}

/// Owner of all environments
#[derive(Debug)]
pub struct EnvironmentManager {
    environments: Registry<EnvironmentHandle, Environment>,
    fallback: Environment,
}

impl EnvironmentManager {
    /// Create an empty environment manager
    pub fn new() -> Self {
        Self {
            environments: Registry::new("environment"),
            fallback: Environment::default(),
        }
    }

    /// Create an environment with default settings
    pub fn create(&mut self) -> EnvironmentHandle {
        let handle = self.environments.allocate(Environment::default());
        log::debug!("Created environment {:?}", handle);
        handle
    }

    /// Destroy an environment, returning `false` for unknown handles
    pub fn free(&mut self, handle: EnvironmentHandle) -> bool {
        let freed = self.environments.free(handle);

        if freed {
            log::debug!("Freed environment {:?}", handle);
        }

        freed
    }

    /// Whether `handle` refers to a live environment
    pub fn is_environment(&self, handle: EnvironmentHandle) -> bool {
        self.environments.contains(handle)
    }

    /// Look up an environment
    pub fn get(&self, handle: EnvironmentHandle) -> Option<&Environment> {
        self.environments.resolve(handle)
    }

    /// Number of live environments
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    /// Whether no environments exist
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Set the background mode
    pub fn set_background(&mut self, handle: EnvironmentHandle, background: EnvironmentBackground) -> RenderResult<()> {
        self.modify(handle, |env| env.background = background)
    }

    /// Set the sky; the handle is not checked for validity
    pub fn set_sky(&mut self, handle: EnvironmentHandle, sky: SkyHandle) -> RenderResult<()> {
        self.modify(handle, |env| env.sky = sky)
    }

    /// Set the sky field of view override, in degrees
    pub fn set_sky_custom_fov(&mut self, handle: EnvironmentHandle, fov: f32) -> RenderResult<()> {
        self.modify(handle, |env| env.sky_custom_fov = fov)
    }

    /// Set the sky orientation basis
    pub fn set_sky_orientation(&mut self, handle: EnvironmentHandle, orientation: Mat3) -> RenderResult<()> {
        self.modify(handle, |env| env.sky_orientation = orientation)
    }

    /// Set the background color
    pub fn set_bg_color(&mut self, handle: EnvironmentHandle, color: Color) -> RenderResult<()> {
        self.modify(handle, |env| env.bg_color = color)
    }

    /// Set the background energy
    pub fn set_bg_energy(&mut self, handle: EnvironmentHandle, energy: f32) -> RenderResult<()> {
        self.modify(handle, |env| env.bg_energy = energy)
    }

    /// Set the highest canvas layer used as background
    pub fn set_canvas_max_layer(&mut self, handle: EnvironmentHandle, max_layer: i32) -> RenderResult<()> {
        self.modify(handle, |env| env.canvas_max_layer = max_layer)
    }

    /// Set the ambient light; the sky contribution is clamped to [0, 1]
    pub fn set_ambient_light(&mut self, handle: EnvironmentHandle, ambient: AmbientLight) -> RenderResult<()> {
        let ambient = AmbientLight {
            sky_contribution: ambient.sky_contribution.clamp(0.0, 1.0),
            ..ambient
        };

        self.modify(handle, |env| env.ambient = ambient)
    }

    /// Set the tonemapping parameters
    ///
    /// Exposure and white point are clamped to at least [`MIN_EXPOSURE`]; a
    /// zero or negative exposure is stored as the minimum. The maximum
    /// luminance is raised to the minimum luminance if it is below it.
    pub fn set_tonemap(&mut self, handle: EnvironmentHandle, tonemap: Tonemap) -> RenderResult<()> {
        let tonemap = tonemap.sanitized();
        self.modify(handle, |env| env.tonemap = tonemap)
    }

    /// Set the near depth-of-field blur
    pub fn set_dof_blur_near(&mut self, handle: EnvironmentHandle, blur: DofBlur) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.dof_blur_near = blur)
    }

    /// Set the far depth-of-field blur
    pub fn set_dof_blur_far(&mut self, handle: EnvironmentHandle, blur: DofBlur) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.dof_blur_far = blur)
    }

    /// Set the glow
    pub fn set_glow(&mut self, handle: EnvironmentHandle, glow: Glow) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.glow = glow)
    }

    /// Set the fog colors
    pub fn set_fog(&mut self, handle: EnvironmentHandle, fog: Fog) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.fog = fog)
    }

    /// Set the depth fog
    pub fn set_fog_depth(&mut self, handle: EnvironmentHandle, fog: FogDepth) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.fog_depth = fog)
    }

    /// Set the height fog
    pub fn set_fog_height(&mut self, handle: EnvironmentHandle, fog: FogHeight) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.fog_height = fog)
    }

    /// Set screen-space reflections
    pub fn set_ssr(&mut self, handle: EnvironmentHandle, ssr: Ssr) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.ssr = ssr)
    }

    /// Set screen-space ambient occlusion
    pub fn set_ssao(&mut self, handle: EnvironmentHandle, ssao: Ssao) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.ssao = ssao)
    }

    /// Set the color adjustment
    pub fn set_adjustment(&mut self, handle: EnvironmentHandle, adjustment: Adjustment) -> RenderResult<()> {
        self.modify(handle, |env| env.post_process.adjustment = adjustment)
    }

    environment_getters! {
        /// Background mode
        background -> EnvironmentBackground => |env| env.background,
        /// Sky reference, possibly stale
        sky -> SkyHandle => |env| env.sky,
        /// Sky field of view override
        sky_custom_fov -> f32 => |env| env.sky_custom_fov,
        /// Sky orientation basis
        sky_orientation -> Mat3 => |env| env.sky_orientation,
        /// Background color
        bg_color -> Color => |env| env.bg_color,
        /// Background energy
        bg_energy -> f32 => |env| env.bg_energy,
        /// Highest canvas background layer
        canvas_max_layer -> i32 => |env| env.canvas_max_layer,
        /// Ambient light color
        ambient_light_color -> Color => |env| env.ambient.color,
        /// Ambient light source
        ambient_source -> AmbientSource => |env| env.ambient.source,
        /// Ambient light energy
        ambient_energy -> f32 => |env| env.ambient.energy,
        /// Ambient sky contribution
        ambient_sky_contribution -> f32 => |env| env.ambient.sky_contribution,
        /// Reflection source
        reflection_source -> ReflectionSource => |env| env.ambient.reflection_source,
        /// Full ambient settings
        ambient_light -> AmbientLight => |env| env.ambient,
        /// Full tonemap settings
        tonemap -> Tonemap => |env| env.tonemap,
        /// Tonemapping operator
        tone_mapper -> ToneMapper => |env| env.tonemap.tone_mapper,
        /// Exposure
        exposure -> f32 => |env| env.tonemap.exposure,
        /// White point
        white -> f32 => |env| env.tonemap.white,
        /// Auto exposure enabled
        auto_exposure -> bool => |env| env.tonemap.auto_exposure,
        /// Lowest adapted luminance
        min_luminance -> f32 => |env| env.tonemap.min_luminance,
        /// Highest adapted luminance
        max_luminance -> f32 => |env| env.tonemap.max_luminance,
        /// Auto exposure adaptation speed
        auto_exposure_speed -> f32 => |env| env.tonemap.auto_exposure_speed,
        /// Auto exposure adaptation scale
        auto_exposure_scale -> f32 => |env| env.tonemap.auto_exposure_scale,
        /// Post-process configuration
        post_process -> PostProcess => |env| env.post_process,
    }

    /// Radiance texture of the environment's sky
    ///
    /// Returns `None` for an invalid environment, a stale sky reference or a
    /// sky whose radiance was not generated yet.
    pub fn sky_radiance(&self, handle: EnvironmentHandle, skies: &SkyManager) -> Option<TextureHandle> {
        let environment = self.environments.resolve(handle)?;
        let radiance = skies.get(environment.sky)?.radiance();
        radiance.is_valid().then_some(radiance)
    }

    fn modify(&mut self, handle: EnvironmentHandle, update: impl FnOnce(&mut Environment)) -> RenderResult<()> {
        match self.environments.resolve_mut(handle) {
            Some(environment) => {
                update(environment);
                Ok(())
            }
            None => {
                log::error!("Modifying invalid environment {:?}", handle);
                Err(RenderError::invalid_handle(self.environments.kind()))
            }
        }
    }
}

impl Default for EnvironmentManager {
    fn default() -> Self {
        Self::new()
    }
}
