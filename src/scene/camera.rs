//! Camera system

use crate::backend::types::TextureFormat;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Perspective projection of a camera
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    /// Right handed, depth 0 at the near plane and 1 at the far plane
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

/// Render target description of a camera
///
/// This is what per-camera passes derive their own targets from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub sample_count: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            color_format: TextureFormat::Rgba8UnormSrgb,
            sample_count: 1,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Width over height; 1.0 for a degenerate viewport
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    pub viewport: Viewport,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
            viewport: Viewport::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    /// Replace the viewport and keep the perspective aspect in sync
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.set_viewport(viewport);
        self
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.projection.set_aspect(viewport.aspect());
    }

    /// Resize the viewport, keeping its formats
    pub fn resize(&mut self, width: u32, height: u32) {
        self.set_viewport(Viewport {
            width,
            height,
            ..self.viewport
        });
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniformData {
        CameraUniformData {
            view_proj: self.view_projection_matrix(),
            position: self.position.extend(1.0),
        }
    }
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view_proj: Mat4,
    pub position: Vec4,
}
