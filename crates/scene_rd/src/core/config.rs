//! # Renderer Configuration
//!
//! Static configuration for the scene renderer core. Values here are read once
//! when a [`SceneRenderer`](crate::render::SceneRenderer) is constructed and
//! never change afterwards.
//!
//! Configuration can be stored as TOML or RON through the [`Config`] trait:
//!
//! ```toml
//! [sky]
//! ggx_samples_quality = 1024
//! ggx_samples_realtime = 128
//! default_radiance_size = 256
//! ```

use serde::{Serialize, Deserialize};

use crate::foundation::math::utils;

pub use crate::config::{Config, ConfigError};

/// # Sky Configuration
///
/// Sample counts and sizing for the sky radiance convolution. The two sample
/// counts are properties of the renderer, not of individual skies: a sky only
/// picks which of the two applies through its mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// GGX importance samples per texel for high-quality skies
    pub ggx_samples_quality: u32,
    /// GGX importance samples per texel for realtime skies
    pub ggx_samples_realtime: u32,
    /// Radiance cubemap size given to newly created skies
    pub default_radiance_size: u32,
    /// Smallest radiance size a sky may be set to
    pub min_radiance_size: u32,
    /// Smallest face size kept in a radiance mip chain
    pub min_mip_size: u32,
    /// Store radiance as a cubemap array when the storage supports it
    pub prefer_cubemap_array: bool,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            ggx_samples_quality: 1024,
            ggx_samples_realtime: 128,
            default_radiance_size: 256,
            min_radiance_size: 32,
            min_mip_size: 4,
            prefer_cubemap_array: true,
        }
    }
}

impl SkyConfig {
    /// Validate the sky configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ggx_samples_quality == 0 || self.ggx_samples_realtime == 0 {
            return Err(ConfigError::Invalid("GGX sample counts must be at least 1".to_string()));
        }

        for (name, value) in [
            ("default_radiance_size", self.default_radiance_size),
            ("min_radiance_size", self.min_radiance_size),
            ("min_mip_size", self.min_mip_size),
        ] {
            if !utils::is_power_of_two(value) {
                return Err(ConfigError::Invalid(format!("{name} must be a power of two, got {value}")));
            }
        }

        if self.default_radiance_size < self.min_radiance_size {
            return Err(ConfigError::Invalid(format!(
                "default_radiance_size {} is below min_radiance_size {}",
                self.default_radiance_size, self.min_radiance_size
            )));
        }

        if self.min_mip_size > self.min_radiance_size {
            return Err(ConfigError::Invalid(format!(
                "min_mip_size {} exceeds min_radiance_size {}",
                self.min_mip_size, self.min_radiance_size
            )));
        }

        Ok(())
    }
}

/// # Scene Renderer Configuration
///
/// Top-level configuration for the scene renderer core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneRendererConfig {
    /// Sky radiance configuration
    pub sky: SkyConfig,
}

impl SceneRendererConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GGX sample counts for quality and realtime skies
    pub fn with_ggx_samples(mut self, quality: u32, realtime: u32) -> Self {
        self.sky.ggx_samples_quality = quality;
        self.sky.ggx_samples_realtime = realtime;
        self
    }

    /// Set the radiance size given to new skies
    pub fn with_default_radiance_size(mut self, size: u32) -> Self {
        self.sky.default_radiance_size = size;
        self
    }

    /// Prefer (or refuse) cubemap-array radiance storage
    pub fn with_cubemap_array(mut self, enabled: bool) -> Self {
        self.sky.prefer_cubemap_array = enabled;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sky.validate()
    }
}

impl Config for SceneRendererConfig {}
