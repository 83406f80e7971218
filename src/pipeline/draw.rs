//! Camera and per-object bindings shared by passes that draw scene geometry
//!
//! Layout: group 0 holds the camera uniform, group 1 the object uniform. Each
//! drawn object gets its own uniform buffer so every write of a frame lands
//! before the frame's single submission.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::scene::{RenderObject, Scene};

const CAMERA_UNIFORM_SIZE: u64 = std::mem::size_of::<crate::scene::CameraUniformData>() as u64;
const OBJECT_UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;

#[derive(Debug, Clone, Copy)]
struct UniformSlot {
    buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

impl UniformSlot {
    fn create(
        backend: &mut dyn GraphicsBackend,
        layout: BindGroupLayoutHandle,
        label: &str,
        size: u64,
    ) -> BackendResult<Self> {
        let buffer = backend.create_buffer(&BufferDescriptor {
            label: Some(label.to_string()),
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })?;
        let bind_group = backend.create_bind_group(
            layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;
        Ok(Self { buffer, bind_group })
    }

    fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_bind_group(self.bind_group);
        backend.destroy_buffer(self.buffer);
    }
}

/// Uniform buffers and bind groups for drawing scene objects
#[derive(Debug)]
pub struct SceneBindings {
    label: &'static str,
    camera_layout: Option<BindGroupLayoutHandle>,
    object_layout: Option<BindGroupLayoutHandle>,
    camera: Option<UniformSlot>,
    objects: Vec<UniformSlot>,
}

impl SceneBindings {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            camera_layout: None,
            object_layout: None,
            camera: None,
            objects: Vec::new(),
        }
    }

    /// Bind group layouts for group 0 and group 1, created on first call
    pub fn layouts(
        &mut self,
        backend: &mut dyn GraphicsBackend,
    ) -> BackendResult<[BindGroupLayoutHandle; 2]> {
        let uniform_entry = [BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            ty: BindingType::UniformBuffer,
        }];

        let camera = match self.camera_layout {
            Some(layout) => layout,
            None => *self
                .camera_layout
                .insert(backend.create_bind_group_layout(&uniform_entry)?),
        };
        let object = match self.object_layout {
            Some(layout) => layout,
            None => *self
                .object_layout
                .insert(backend.create_bind_group_layout(&uniform_entry)?),
        };
        Ok([camera, object])
    }

    /// Upload camera and object uniforms for `objects`, growing the slot pool
    /// as needed. Must run before the render pass that draws them begins.
    pub fn prepare(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
        objects: &[&RenderObject],
    ) -> BackendResult<()> {
        let [camera_layout, object_layout] = self.layouts(backend)?;

        let camera = match self.camera {
            Some(slot) => slot,
            None => {
                let label = format!("{} Camera", self.label);
                *self.camera.insert(UniformSlot::create(
                    backend,
                    camera_layout,
                    &label,
                    CAMERA_UNIFORM_SIZE,
                )?)
            }
        };
        backend.write_buffer(camera.buffer, 0, bytemuck::bytes_of(&scene.camera.uniform_data()));

        while self.objects.len() < objects.len() {
            let label = format!("{} Object {}", self.label, self.objects.len());
            let slot = UniformSlot::create(backend, object_layout, &label, OBJECT_UNIFORM_SIZE)?;
            self.objects.push(slot);
        }

        for (slot, object) in self.objects.iter().zip(objects) {
            let uniform = scene.object_uniform(object);
            backend.write_buffer(slot.buffer, 0, bytemuck::bytes_of(&uniform));
        }

        Ok(())
    }

    /// Draw `objects` with the slots filled by the last `prepare`. Objects
    /// whose mesh is missing are skipped. Returns the number of draws.
    pub fn draw(
        &self,
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
        objects: &[&RenderObject],
    ) -> usize {
        let Some(camera) = self.camera else {
            return 0;
        };
        backend.set_bind_group(0, camera.bind_group);

        let mut draws = 0;
        for (slot, object) in self.objects.iter().zip(objects) {
            let Some(mesh) = scene.mesh(object.mesh_id) else {
                log::trace!("{}: object without mesh {}", self.label, object.mesh_id);
                continue;
            };
            backend.set_bind_group(1, slot.bind_group);
            mesh.draw(backend);
            draws += 1;
        }
        draws
    }

    /// Number of per-object slots allocated so far
    pub fn object_slots(&self) -> usize {
        self.objects.len()
    }

    pub fn destroy(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(camera) = self.camera.take() {
            camera.destroy(backend);
        }
        for slot in self.objects.drain(..) {
            slot.destroy(backend);
        }
        for layout in [self.camera_layout.take(), self.object_layout.take()]
            .into_iter()
            .flatten()
        {
            backend.destroy_bind_group_layout(layout);
        }
    }
}
