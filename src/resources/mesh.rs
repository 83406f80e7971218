//! Mesh data and GPU upload

use crate::backend::traits::*;
use crate::backend::types::*;
use glam::{Vec2, Vec3, Vec4};

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, tangent: Vec4) {
        let base = self.vertices.len() as u32;
        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];
        for (position, uv) in corners.into_iter().zip(uvs) {
            self.vertices.push(Vertex {
                position,
                normal,
                uv,
                tangent,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Unit cube centered at the origin, counter-clockwise outward faces
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];

        for (normal, right) in faces {
            let up = normal.cross(right);
            let center = normal * 0.5;
            let (r, u) = (right * 0.5, up * 0.5);
            mesh.push_quad(
                [center - r - u, center + r - u, center + r + u, center - r + u],
                normal,
                right.extend(1.0),
            );
        }

        mesh
    }

    /// Axis aligned quad in the XY plane facing +Z
    pub fn quad(width: f32, height: f32) -> Self {
        let mut mesh = Mesh::new("quad");
        let (hw, hh) = (width / 2.0, height / 2.0);
        mesh.push_quad(
            [
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            Vec3::Z,
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        );
        mesh
    }
}

/// Mesh uploaded to vertex and index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMesh {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(backend: &mut dyn GraphicsBackend, mesh: &Mesh) -> BackendResult<Self> {
        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} vertices", mesh.name)),
                size: mesh.vertex_bytes().len() as u64,
                usage: BufferUsage::VERTEX,
                mapped_at_creation: false,
            },
            mesh.vertex_bytes(),
        )?;

        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} indices", mesh.name)),
                size: mesh.index_bytes().len() as u64,
                usage: BufferUsage::INDEX,
                mapped_at_creation: false,
            },
            mesh.index_bytes(),
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        })
    }

    /// Bind buffers and issue one indexed draw. Must be inside a render pass.
    pub fn draw(&self, backend: &mut dyn GraphicsBackend) {
        backend.set_vertex_buffer(0, self.vertex_buffer, 0);
        backend.set_index_buffer(self.index_buffer, 0, IndexFormat::Uint32);
        backend.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_buffer(self.vertex_buffer);
        backend.destroy_buffer(self.index_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn cube_faces_point_outward_and_wind_counter_clockwise() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);

        for triangle in cube.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| cube.vertices[triangle[i] as usize]);
            let winding = (b.position - a.position).cross(c.position - a.position);
            assert!(winding.dot(a.normal) > 0.0);
            assert!((a.position.dot(a.normal) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn quad_spans_requested_extent() {
        let quad = Mesh::quad(4.0, 2.0);
        let max = quad
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MIN), |acc, v| acc.max(v.position));
        assert_eq!(max, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn upload_records_index_count() {
        let mut backend = DummyBackend::new();
        let mesh = Mesh::cube();
        let gpu = GpuMesh::upload(&mut backend, &mesh).unwrap();
        assert_eq!(gpu.index_count, 36);
        assert_eq!(
            backend.buffer_contents(gpu.vertex_buffer).map(|b| b.len()),
            Some(mesh.vertex_bytes().len())
        );
    }
}
