//! CPU reference of the edge compositor
//!
//! Evaluates exactly what the edge shader evaluates, per pixel, on plain
//! float images. The GPU uniform is produced from the same [`EdgeKernel`], so
//! the constants cannot drift apart.

use crate::outline::config::OutlineConfiguration;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use std::f32::consts::FRAC_1_SQRT_2;

/// Tolerance of the occlusion test
pub const DEPTH_EPSILON: f32 = 0.0001;

/// Center occupancy above which the outline is fully suppressed is `1 - INWARD_BIAS`
pub const INWARD_BIAS: f32 = 0.5;

/// Uniform block of the edge shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OutlineUniform {
    pub color: Vec4,
    /// x: width, y: aspect, z: depth epsilon, w: inward bias
    pub params: Vec4,
}

/// Single channel float image
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSurface {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CpuSurface {
    pub fn new(width: u32, height: u32, fill: f32) -> Self {
        Self {
            width,
            height,
            data: vec![fill; (width * height) as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Texel fetch with coordinates clamped to the image
    pub fn fetch(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }

    /// Bilinear sample at a normalized coordinate, clamp-to-edge
    pub fn sample(&self, uv: Vec2) -> f32 {
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        let (x0, y0) = (px.floor(), py.floor());
        let (fx, fy) = (px - x0, py - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.fetch(x0, y0) * (1.0 - fx) + self.fetch(x0 + 1, y0) * fx;
        let bottom = self.fetch(x0, y0 + 1) * (1.0 - fx) + self.fetch(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Inputs of one composite
pub struct EdgeInputs<'a> {
    pub mask_alpha: &'a CpuSurface,
    pub mask_depth: &'a CpuSurface,
    pub scene_depth: &'a CpuSurface,
}

/// Occlusion-aware Sobel edge over mask occupancy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeKernel {
    pub color: Vec4,
    pub width: f32,
    /// Viewport width over height
    pub aspect: f32,
    pub depth_epsilon: f32,
    pub inward_bias: f32,
}

impl EdgeKernel {
    pub fn new(config: &OutlineConfiguration, aspect: f32) -> Self {
        Self {
            color: config.color,
            width: config.width,
            aspect,
            depth_epsilon: DEPTH_EPSILON,
            inward_bias: INWARD_BIAS,
        }
    }

    pub fn uniform(&self) -> OutlineUniform {
        OutlineUniform {
            color: self.color,
            params: Vec4::new(self.width, self.aspect, self.depth_epsilon, self.inward_bias),
        }
    }

    /// Tap offsets in N, NE, E, SE, S, SW, W, NW order.
    ///
    /// All have length `width` before the vertical aspect correction; v grows
    /// downwards so north is negative.
    pub fn offsets(&self) -> [Vec2; 8] {
        let w = self.width;
        let d = w * FRAC_1_SQRT_2;
        let a = self.aspect;
        [
            Vec2::new(0.0, -w * a),
            Vec2::new(d, -d * a),
            Vec2::new(w, 0.0),
            Vec2::new(d, d * a),
            Vec2::new(0.0, w * a),
            Vec2::new(-d, d * a),
            Vec2::new(-w, 0.0),
            Vec2::new(-d, -d * a),
        ]
    }

    /// Sobel gradient `(gx, gy)` of eight taps in `offsets` order
    pub fn gradient(taps: [f32; 8]) -> (f32, f32) {
        let [n, ne, e, se, s, sw, w, nw] = taps;
        let gx = (ne - nw) + 2.0 * (e - w) + (se - sw);
        let gy = (sw - nw) + 2.0 * (s - n) + (se - ne);
        (gx, gy)
    }

    /// Clamped gradient magnitude of the mask around `uv`
    pub fn edge_strength(&self, mask_alpha: &CpuSurface, uv: Vec2) -> f32 {
        let taps = self.offsets().map(|offset| mask_alpha.sample(uv + offset));
        let (gx, gy) = Self::gradient(taps);
        (gx.abs() + gy.abs()).clamp(0.0, 1.0)
    }

    /// True if the scene surface is in front of the masked surface
    pub fn occluded(&self, scene_depth: f32, mask_depth: f32) -> bool {
        scene_depth < mask_depth - self.depth_epsilon
    }

    /// Shade one pixel. `None` means the fragment is discarded.
    pub fn shade(&self, inputs: &EdgeInputs, x: u32, y: u32) -> Option<Vec4> {
        let scene = inputs.scene_depth.get(x, y);
        let masked = inputs.mask_depth.get(x, y);
        if self.occluded(scene, masked) {
            return None;
        }

        let size = Vec2::new(
            inputs.mask_alpha.width() as f32,
            inputs.mask_alpha.height() as f32,
        );
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;

        let edge = self.edge_strength(inputs.mask_alpha, uv);
        let center = inputs.mask_alpha.sample(uv);
        let alpha = edge * (1.0 - center - self.inward_bias).clamp(0.0, 1.0);
        Some(self.color.truncate().extend(alpha))
    }
}

/// Shade every pixel, row-major
pub fn composite(kernel: &EdgeKernel, inputs: &EdgeInputs) -> Vec<Option<Vec4>> {
    let (width, height) = (inputs.mask_alpha.width(), inputs.mask_alpha.height());
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| kernel.shade(inputs, x, y))
        .collect()
}

/// Straight alpha-over of a shaded fragment onto a destination color
pub fn blend_over(dst: Vec4, src: Option<Vec4>) -> Vec4 {
    let Some(src) = src else {
        return dst;
    };
    let a = src.w;
    (src.truncate() * a + dst.truncate() * (1.0 - a)).extend(a + dst.w * (1.0 - a))
}
