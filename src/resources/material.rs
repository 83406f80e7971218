//! Material definitions

use glam::{Vec3, Vec4};

/// Surface shading inputs shared by the forward pass and the mask pass
///
/// Only the base color is consumed on the GPU. Its alpha doubles as the
/// occupancy the mask pass writes, so a half transparent material produces a
/// half covered mask.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Vec4::ONE,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    /// Opaque material of the given color
    pub fn opaque(name: &str, color: Vec3) -> Self {
        Self::new(name).with_base_color(color.extend(1.0))
    }

    pub fn is_transparent(&self) -> bool {
        self.base_color.w < 1.0
    }
}
