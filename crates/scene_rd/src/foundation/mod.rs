//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer core:
//! - Math types (transforms, projections, colors)
//! - Handle registries and typed handles
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
