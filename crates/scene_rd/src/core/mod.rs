//! # Core Module
//!
//! Shared configuration types consumed when the scene renderer is built.
//!
//! ## Organization
//!
//! - **Config**: renderer configuration (sky convolution quality, radiance sizing)

pub mod config;

pub use config::{Config, ConfigError, SceneRendererConfig, SkyConfig};
