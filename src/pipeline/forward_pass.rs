//! Forward opaque pass of the host pipeline

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::draw::SceneBindings;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::scene::{RenderObject, RenderQueue};
use std::any::Any;

/// Clears the camera color and scene depth, then draws every scene object
/// with simple diffuse shading.
pub struct ForwardPass {
    clear_color: [f32; 4],
    depth_format: TextureFormat,
    camera_color: Option<ResourceId>,
    scene_depth: Option<ResourceId>,
    bindings: SceneBindings,
    pipeline: Option<(TextureFormat, RenderPipelineHandle)>,
}

impl ForwardPass {
    pub fn new(depth_format: TextureFormat) -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth_format,
            camera_color: None,
            scene_depth: None,
            bindings: SceneBindings::new("Forward"),
            pipeline: None,
        }
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }
}

impl RenderPass for ForwardPass {
    fn name(&self) -> &str {
        "Forward Pass"
    }

    fn event(&self) -> PassEvent {
        PassEvent::BeforeOpaque
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        self.camera_color = ctx.external(CAMERA_COLOR);
        self.scene_depth = ctx.external(SCENE_DEPTH);

        if let Some(color) = self.camera_color {
            ctx.write(color, ResourceUsage::RenderTarget);
        }
        if let Some(depth) = self.scene_depth {
            ctx.write(depth, ResourceUsage::DepthStencilWrite);
        }
    }

    fn configure(&mut self, ctx: &mut PassConfigureContext) -> BackendResult<()> {
        let color_format = ctx.camera.viewport.color_format;
        if matches!(self.pipeline, Some((format, _)) if format == color_format) {
            return Ok(());
        }

        let layouts = self.bindings.layouts(ctx.backend)?;
        let pipeline = ctx.backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Forward Pipeline".into()),
            shader: FORWARD_SHADER.to_string(),
            has_fragment: true,
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: layouts.to_vec(),
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState {
                format: self.depth_format,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            color_targets: vec![ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: ColorWrites::ALL,
            }],
        })?;
        if let Some((_, old)) = self.pipeline.replace((color_format, pipeline)) {
            ctx.backend.destroy_render_pipeline(old);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        let color = self.camera_color.and_then(|id| ctx.get_texture(id));
        let depth = self.scene_depth.and_then(|id| ctx.get_texture(id));
        let (Some(color), Some(depth), Some((_, pipeline))) = (color, depth, self.pipeline) else {
            log::trace!("Forward pass: targets not bound, skipping");
            return;
        };

        let scene = ctx.scene;
        let objects: Vec<&RenderObject> = scene
            .objects_in_queue(RenderQueue::Opaque)
            .chain(scene.objects_in_queue(RenderQueue::Transparent))
            .collect();

        if let Err(e) = self.bindings.prepare(ctx.backend, scene, &objects) {
            log::warn!("Forward pass: failed to upload uniforms: {}", e);
            return;
        }

        let viewport = *ctx.viewport();
        let backend = &mut *ctx.backend;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Forward Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: color,
                load_op: LoadOp::Clear(self.clear_color),
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

        log::trace!("Forward pass: {} draws", draws);
    }

    fn teardown(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some((_, pipeline)) = self.pipeline.take() {
            backend.destroy_render_pipeline(pipeline);
        }
        self.bindings.destroy(backend);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub const FORWARD_SHADER: &str = r#"
struct CameraUniforms {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = camera.view_proj * object.model * vec4<f32>(input.position, 1.0);
    output.world_normal = normalize((object.normal_matrix * vec4<f32>(input.normal, 0.0)).xyz);
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light = normalize(vec3<f32>(0.4, 0.7, 1.0));
    let diffuse = max(dot(normalize(input.world_normal), light), 0.0);
    return vec4<f32>(object.base_color.rgb * (0.3 + 0.7 * diffuse), object.base_color.a);
}
"#;
