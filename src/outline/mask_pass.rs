//! Mask renderer: tagged objects into the mask color and depth targets

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::outline::filter::FilteringCriteria;
use crate::outline::targets::{MaskTargets, MASK_COLOR_FORMAT, MASK_DEPTH_FORMAT};
use crate::pipeline::draw::SceneBindings;
use crate::scene::{RenderObject, Scene};

pub struct MaskRenderer {
    shader: String,
    bindings: SceneBindings,
    pipeline: Option<RenderPipelineHandle>,
}

impl MaskRenderer {
    pub fn new(shader: String) -> Self {
        Self {
            shader,
            bindings: SceneBindings::new("Outline Mask"),
            pipeline: None,
        }
    }

    /// Create the pipeline once; the mask formats never change
    pub fn configure(&mut self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        let layouts = self.bindings.layouts(backend)?;
        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Outline Mask Pipeline".into()),
            shader: self.shader.clone(),
            has_fragment: true,
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: layouts.to_vec(),
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState {
                format: MASK_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            color_targets: vec![ColorTargetState {
                format: MASK_COLOR_FORMAT,
                blend: None,
                write_mask: ColorWrites::ALL,
            }],
        })?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Clear both targets and draw every object `filter` selects.
    ///
    /// Returns the number of draws issued.
    pub fn render(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
        filter: &FilteringCriteria,
        targets: &MaskTargets,
    ) -> BackendResult<usize> {
        let (Some(pipeline), Some(color), Some(depth)) =
            (self.pipeline, targets.color_view(), targets.depth_view())
        else {
            return Ok(0);
        };

        let objects: Vec<&RenderObject> = filter.select(scene).collect();
        self.bindings.prepare(backend, scene, &objects)?;

        let viewport = scene.camera.viewport;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Outline Mask".into()),
            color_attachments: vec![ColorAttachment {
                view: color,
                load_op: LoadOp::Clear([0.0; 4]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth,
                depth_load_op: LoadOp::Clear([1.0; 4]),
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
            }),
        });
        backend.set_viewport(0.0, 0.0, viewport.width as f32, viewport.height as f32, 0.0, 1.0);
        backend.set_render_pipeline(pipeline);
        let draws = self.bindings.draw(backend, scene, &objects);
        backend.end_render_pass();

        Ok(draws)
    }

    pub fn destroy(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(pipeline) = self.pipeline.take() {
            backend.destroy_render_pipeline(pipeline);
        }
        self.bindings.destroy(backend);
    }
}
