//! Math utilities and types
//!
//! Provides the math types exchanged between the renderer core and its
//! backends. Shading math lives in the backends; these are plain carriers.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type, used as an orientation basis
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type, used for camera transforms and projections
pub type Mat4 = Matrix4<f32>;

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a color from its four channels
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Channels as an array, in RGBA order
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Integer power-of-two helpers for texture sizing
pub mod utils {
    /// Whether `value` is a positive power of two
    pub const fn is_power_of_two(value: u32) -> bool {
        value != 0 && value & (value - 1) == 0
    }

    /// Number of times `size` can be halved before dropping below `min_size`,
    /// counting the full size itself
    pub fn mip_chain_length(size: u32, min_size: u32) -> u32 {
        let min_size = min_size.max(1);
        let mut levels = 0;
        let mut current = size;

        while current >= min_size {
            levels += 1;
            current >>= 1;
        }

        levels
    }
}
