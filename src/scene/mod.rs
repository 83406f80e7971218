//! Scene snapshot read by render passes

mod camera;
mod extract;
mod transform;

pub use camera::*;
pub use extract::*;
pub use transform::*;

use crate::backend::types::ObjectUniform;
use crate::outline::OutlineVolume;
use crate::resources::{GpuMesh, Material};
use bevy_ecs::component::Component;
use glam::Vec3;

/// Rendering layer bitmask carried by every object.
///
/// Passes select objects by intersecting their own mask with this one. This is
/// independent of visibility: a hidden layer for one pass is still drawn by
/// passes that do not filter.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderingLayers(pub u32);

impl RenderingLayers {
    /// Layer 0, the layer objects carry unless tagged otherwise
    pub const DEFAULT: Self = Self(1);
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    /// Mask with a single layer enabled
    #[inline]
    pub const fn layer(layer: u8) -> Self {
        Self(1 << (layer as u32 & 31))
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn with_layer(self, layer: u8) -> Self {
        Self(self.0 | (1 << (layer as u32 & 31)))
    }

    /// True if the two masks share at least one layer
    #[inline]
    pub const fn intersects(&self, mask: u32) -> bool {
        (self.0 & mask) != 0
    }
}

impl Default for RenderingLayers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Queue range an object is drawn in by the forward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderQueue {
    #[default]
    Opaque,
    Transparent,
}

/// A renderable object in the scene
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub mesh_id: usize,
    pub material_id: usize,
    pub transform: Transform,
    pub queue: RenderQueue,
    pub rendering_layers: RenderingLayers,
}

impl RenderObject {
    pub fn new(mesh_id: usize, material_id: usize) -> Self {
        Self {
            mesh_id,
            material_id,
            transform: Transform::default(),
            queue: RenderQueue::Opaque,
            rendering_layers: RenderingLayers::DEFAULT,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_queue(mut self, queue: RenderQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_layers(mut self, layers: RenderingLayers) -> Self {
        self.rendering_layers = layers;
        self
    }
}

/// The scene containing all renderable content for one camera
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    pub objects: Vec<RenderObject>,
    pub meshes: Vec<GpuMesh>,
    pub materials: Vec<Material>,
    /// Runtime outline override, if one is active in the scene
    pub outline_volume: Option<OutlineVolume>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: GpuMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add a render object to the scene
    pub fn add_object(&mut self, object: RenderObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn mesh(&self, id: usize) -> Option<&GpuMesh> {
        self.meshes.get(id)
    }

    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Per-object uniform data; objects with a missing material get the default one
    pub fn object_uniform(&self, object: &RenderObject) -> ObjectUniform {
        let base_color = self
            .material(object.material_id)
            .map(|m| m.base_color)
            .unwrap_or_else(|| Material::default().base_color);

        ObjectUniform {
            model: object.transform.matrix(),
            normal_matrix: object.transform.normal_matrix(),
            base_color,
        }
    }

    /// Objects in one queue range, in submission order
    pub fn objects_in_queue(&self, queue: RenderQueue) -> impl Iterator<Item = &RenderObject> {
        self.objects.iter().filter(move |o| o.queue == queue)
    }
}
