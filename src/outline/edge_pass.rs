//! Edge compositor: full-screen Sobel over the mask, blended onto the camera color

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::outline::kernel::OutlineUniform;
use crate::outline::shader::{
    property_binding, MASK_DEPTH, MASK_SAMPLER, MASK_TEXTURE, OUTLINE_PARAMS, SCENE_DEPTH,
};

/// Binding slots resolved from the shader property table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeSlots {
    mask_texture: u32,
    mask_sampler: u32,
    mask_depth: u32,
    scene_depth: u32,
    outline_params: u32,
}

impl EdgeSlots {
    fn resolve() -> BackendResult<Self> {
        let slot = |name: &str| {
            property_binding(name).ok_or_else(|| {
                BackendError::PipelineCreationFailed(format!("no binding for '{name}'"))
            })
        };
        Ok(Self {
            mask_texture: slot(MASK_TEXTURE)?,
            mask_sampler: slot(MASK_SAMPLER)?,
            mask_depth: slot(MASK_DEPTH)?,
            scene_depth: slot(SCENE_DEPTH)?,
            outline_params: slot(OUTLINE_PARAMS)?,
        })
    }

    fn layout_entries(&self) -> Vec<BindGroupLayoutEntry> {
        let fragment = |binding, ty| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStageFlags::FRAGMENT,
            ty,
        };
        vec![
            fragment(
                self.mask_texture,
                BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                },
            ),
            fragment(self.mask_sampler, BindingType::Sampler { filtering: true }),
            fragment(
                self.mask_depth,
                BindingType::Texture {
                    sample_type: TextureSampleType::Depth,
                },
            ),
            fragment(
                self.scene_depth,
                BindingType::Texture {
                    sample_type: TextureSampleType::Depth,
                },
            ),
            fragment(self.outline_params, BindingType::UniformBuffer),
        ]
    }
}

/// Views the cached bind group was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputViews {
    mask_color: TextureViewHandle,
    mask_depth: TextureViewHandle,
    scene_depth: TextureViewHandle,
}

#[derive(Debug, Clone, Copy)]
struct EdgePipeline {
    target_format: TextureFormat,
    pipeline: RenderPipelineHandle,
    layout: BindGroupLayoutHandle,
    slots: EdgeSlots,
}

pub struct EdgeCompositor {
    shader: String,
    pipeline: Option<EdgePipeline>,
    sampler: Option<SamplerHandle>,
    uniform_buffer: Option<BufferHandle>,
    bind_group: Option<(InputViews, BindGroupHandle)>,
}

impl EdgeCompositor {
    pub fn new(shader: String) -> Self {
        Self {
            shader,
            pipeline: None,
            sampler: None,
            uniform_buffer: None,
            bind_group: None,
        }
    }

    /// Create the pipeline for the camera's color format, plus the sampler
    /// and uniform buffer on first use
    pub fn configure(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        target_format: TextureFormat,
    ) -> BackendResult<()> {
        if self.sampler.is_none() {
            self.sampler = Some(backend.create_sampler(&SamplerDescriptor {
                label: Some("Outline Mask Sampler".into()),
                ..Default::default()
            })?);
        }

        if self.uniform_buffer.is_none() {
            self.uniform_buffer = Some(backend.create_buffer(&BufferDescriptor {
                label: Some("Outline Params".into()),
                size: std::mem::size_of::<OutlineUniform>() as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            })?);
        }

        if matches!(self.pipeline, Some(p) if p.target_format == target_format) {
            return Ok(());
        }

        let slots = EdgeSlots::resolve()?;
        let layout = match self.pipeline {
            Some(p) => p.layout,
            None => backend.create_bind_group_layout(&slots.layout_entries())?,
        };
        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Outline Edge Pipeline".into()),
            shader: self.shader.clone(),
            has_fragment: true,
            vertex_layouts: vec![],
            bind_group_layouts: vec![layout],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![ColorTargetState {
                format: target_format,
                blend: Some(BlendState::alpha_blending()),
                write_mask: ColorWrites::ALL,
            }],
        })?;

        if let Some(old) = self.pipeline {
            backend.destroy_render_pipeline(old.pipeline);
        }
        self.pipeline = Some(EdgePipeline {
            target_format,
            pipeline,
            layout,
            slots,
        });
        Ok(())
    }

    fn bind_group_for(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        pipeline: &EdgePipeline,
        views: InputViews,
    ) -> BackendResult<BindGroupHandle> {
        if let Some((cached, group)) = self.bind_group {
            if cached == views {
                return Ok(group);
            }
            backend.destroy_bind_group(group);
            self.bind_group = None;
        }

        let (Some(sampler), Some(buffer)) = (self.sampler, self.uniform_buffer) else {
            return Err(BackendError::PipelineCreationFailed(
                "outline edge compositor is not configured".into(),
            ));
        };

        let slots = pipeline.slots;
        let group = backend.create_bind_group(
            pipeline.layout,
            &[
                (slots.mask_texture, BindGroupEntry::Texture(views.mask_color)),
                (slots.mask_sampler, BindGroupEntry::Sampler(sampler)),
                (slots.mask_depth, BindGroupEntry::Texture(views.mask_depth)),
                (slots.scene_depth, BindGroupEntry::Texture(views.scene_depth)),
                (
                    slots.outline_params,
                    BindGroupEntry::Buffer {
                        buffer,
                        offset: 0,
                        size: None,
                    },
                ),
            ],
        )?;
        self.bind_group = Some((views, group));
        Ok(group)
    }

    /// Blend the outline onto `target`. The mask and scene depth are only read.
    pub fn render(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        uniform: &OutlineUniform,
        target: TextureViewHandle,
        mask_color: TextureViewHandle,
        mask_depth: TextureViewHandle,
        scene_depth: TextureViewHandle,
    ) -> BackendResult<()> {
        let (Some(pipeline), Some(buffer)) = (self.pipeline, self.uniform_buffer) else {
            return Ok(());
        };

        let views = InputViews {
            mask_color,
            mask_depth,
            scene_depth,
        };
        let bind_group = self.bind_group_for(backend, &pipeline, views)?;
        backend.write_buffer(buffer, 0, bytemuck::bytes_of(uniform));

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Outline Edge".into()),
            color_attachments: vec![ColorAttachment {
                view: target,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });
        backend.set_render_pipeline(pipeline.pipeline);
        backend.set_bind_group(0, bind_group);
        backend.draw(0..3, 0..1);
        backend.end_render_pass();

        Ok(())
    }

    pub fn destroy(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some((_, group)) = self.bind_group.take() {
            backend.destroy_bind_group(group);
        }
        if let Some(buffer) = self.uniform_buffer.take() {
            backend.destroy_buffer(buffer);
        }
        if let Some(sampler) = self.sampler.take() {
            backend.destroy_sampler(sampler);
        }
        if let Some(edge) = self.pipeline.take() {
            backend.destroy_render_pipeline(edge.pipeline);
            backend.destroy_bind_group_layout(edge.layout);
        }
    }
}
