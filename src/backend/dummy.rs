//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It keeps enough
//! bookkeeping (descriptors, buffer contents, recorded passes) for tests to
//! inspect what a pass asked the GPU to do without requiring GPU hardware.

use crate::backend::traits::*;
use crate::backend::types::*;
use std::collections::HashMap;
use std::ops::Range;

/// A command recorded inside a render pass
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    SetPipeline(RenderPipelineHandle),
    SetBindGroup { index: u32, bind_group: BindGroupHandle },
    SetVertexBuffer { slot: u32, buffer: BufferHandle },
    SetIndexBuffer { buffer: BufferHandle, format: IndexFormat },
    SetViewport { width: f32, height: f32 },
    Draw { vertices: Range<u32>, instances: Range<u32> },
    DrawIndexed { indices: Range<u32>, instances: Range<u32> },
}

/// A render pass as it was submitted to the backend
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub descriptor: RenderPassDescriptor,
    pub commands: Vec<RecordedCommand>,
}

impl RecordedPass {
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Number of draw calls, indexed or not
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. }))
            .count()
    }

    /// Bind groups bound at `index`, in submission order
    pub fn bind_groups_at(&self, index: u32) -> Vec<BindGroupHandle> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetBindGroup { index: i, bind_group } if *i == index => {
                    Some(*bind_group)
                }
                _ => None,
            })
            .collect()
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: u64,

    textures: HashMap<u64, TextureDescriptor>,
    texture_views: HashMap<u64, u64>,
    buffers: HashMap<u64, Vec<u8>>,
    bind_groups: HashMap<u64, Vec<(u32, BindGroupEntry)>>,
    bind_group_layouts: HashMap<u64, Vec<BindGroupLayoutEntry>>,
    samplers: HashMap<u64, SamplerDescriptor>,
    render_pipelines: HashMap<u64, RenderPipelineDescriptor>,

    textures_created: usize,
    textures_destroyed: usize,
    fail_texture_creation: bool,

    pending_render_pass: Option<RecordedPass>,
    passes: Vec<RecordedPass>,
    frames_submitted: usize,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    fn allocate_id(&mut self) -> u64 {
        // Default-constructed backends start at zero; keep ids non-zero anyway
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Make every subsequent `create_texture` fail.
    pub fn set_fail_texture_creation(&mut self, fail: bool) {
        self.fail_texture_creation = fail;
    }

    /// Textures currently alive.
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Texture views currently alive.
    pub fn live_texture_view_count(&self) -> usize {
        self.texture_views.len()
    }

    /// Bind groups currently alive.
    pub fn live_bind_group_count(&self) -> usize {
        self.bind_groups.len()
    }

    /// Buffers currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Bind group layouts currently alive.
    pub fn live_bind_group_layout_count(&self) -> usize {
        self.bind_group_layouts.len()
    }

    /// Samplers currently alive.
    pub fn live_sampler_count(&self) -> usize {
        self.samplers.len()
    }

    /// Render pipelines currently alive.
    pub fn live_render_pipeline_count(&self) -> usize {
        self.render_pipelines.len()
    }

    /// Total number of textures ever created.
    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    /// Total number of textures ever destroyed.
    pub fn textures_destroyed(&self) -> usize {
        self.textures_destroyed
    }

    /// Number of `end_frame` calls.
    pub fn frames_submitted(&self) -> usize {
        self.frames_submitted
    }

    /// Descriptor of a live texture.
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&texture.0)
    }

    /// Descriptor of the texture a live view was created from.
    pub fn view_descriptor(&self, view: TextureViewHandle) -> Option<&TextureDescriptor> {
        self.texture_views
            .get(&view.0)
            .and_then(|texture| self.textures.get(texture))
    }

    /// Current contents of a live buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    /// Entries a live bind group was created with.
    pub fn bind_group_entries(&self, bind_group: BindGroupHandle) -> Option<&[(u32, BindGroupEntry)]> {
        self.bind_groups.get(&bind_group.0).map(Vec::as_slice)
    }

    /// Descriptor of a render pipeline.
    pub fn render_pipeline(&self, pipeline: RenderPipelineHandle) -> Option<&RenderPipelineDescriptor> {
        self.render_pipelines.get(&pipeline.0)
    }

    /// Passes recorded since the last `take_passes`.
    pub fn recorded_passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    /// Drain the recorded passes.
    pub fn take_passes(&mut self) -> Vec<RecordedPass> {
        std::mem::take(&mut self.passes)
    }

    fn record(&mut self, command: RecordedCommand) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(command);
        }
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn begin_frame(&mut self) {
        log::trace!("DummyBackend: begin frame {}", self.frames_submitted);
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.frames_submitted += 1;
        log::trace!(
            "DummyBackend: submitted frame with {} recorded passes",
            self.passes.len()
        );
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!("DummyBackend: creating buffer {:?} (size: {})", desc.label, desc.size);
        let id = self.allocate_id();
        self.buffers.insert(id, vec![0; desc.size as usize]);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!("DummyBackend: creating buffer {:?} with {} bytes", desc.label, data.len());
        let id = self.allocate_id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer.0) {
            let start = offset as usize;
            let end = start + data.len();
            if contents.len() < end {
                contents.resize(end, 0);
            }
            contents[start..end].copy_from_slice(data);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if self.fail_texture_creation {
            return Err(BackendError::TextureCreationFailed(format!(
                "{:?} ({}x{}) rejected by dummy backend",
                desc.label, desc.width, desc.height
            )));
        }

        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        let id = self.allocate_id();
        self.textures.insert(id, desc.clone());
        self.textures_created += 1;
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        if !self.textures.contains_key(&texture.0) {
            return Err(BackendError::InvalidHandle {
                kind: "texture",
                id: texture.0,
            });
        }
        let id = self.allocate_id();
        self.texture_views.insert(id, texture.0);
        Ok(TextureViewHandle(id))
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("DummyBackend: creating sampler {:?}", desc.label);
        let id = self.allocate_id();
        self.samplers.insert(id, desc.clone());
        Ok(SamplerHandle(id))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let id = self.allocate_id();
        self.bind_group_layouts.insert(id, entries.to_vec());
        Ok(BindGroupLayoutHandle(id))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let id = self.allocate_id();
        self.bind_groups.insert(id, entries.to_vec());
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        log::trace!("DummyBackend: creating render pipeline {:?}", desc.label);
        let id = self.allocate_id();
        self.render_pipelines.insert(id, desc.clone());
        Ok(RenderPipelineHandle(id))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.pending_render_pass = Some(RecordedPass {
            descriptor: desc.clone(),
            commands: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        if let Some(pending) = self.pending_render_pass.take() {
            log::trace!(
                "DummyBackend: render pass {:?} with {} commands",
                pending.descriptor.label,
                pending.commands.len()
            );
            self.passes.push(pending);
        }
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.record(RecordedCommand::SetPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.record(RecordedCommand::SetBindGroup { index, bind_group });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        self.record(RecordedCommand::SetVertexBuffer { slot, buffer });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, format: IndexFormat) {
        self.record(RecordedCommand::SetIndexBuffer { buffer, format });
    }

    fn set_viewport(&mut self, _x: f32, _y: f32, width: f32, height: f32, _min_depth: f32, _max_depth: f32) {
        self.record(RecordedCommand::SetViewport { width, height });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.record(RecordedCommand::Draw { vertices, instances });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.record(RecordedCommand::DrawIndexed { indices, instances });
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_some() {
            self.textures_destroyed += 1;
        } else {
            log::warn!("DummyBackend: destroying unknown texture {}", texture.0);
        }
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        self.texture_views.remove(&view.0);
    }

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        self.bind_groups.remove(&bind_group.0);
    }

    fn destroy_bind_group_layout(&mut self, layout: BindGroupLayoutHandle) {
        self.bind_group_layouts.remove(&layout.0);
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.samplers.remove(&sampler.0);
    }

    fn destroy_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        if self.render_pipelines.remove(&pipeline.0).is_none() {
            log::warn!("DummyBackend: destroying unknown render pipeline {}", pipeline.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor {
            label: Some("test".into()),
            width,
            height,
            usage: TextureUsage::RENDER_ATTACHMENT,
            ..Default::default()
        }
    }

    #[test]
    fn tracks_texture_lifetimes() {
        let mut backend = DummyBackend::new();
        let texture = backend.create_texture(&color_desc(4, 4)).unwrap();
        let view = backend.create_texture_view(texture).unwrap();

        assert_eq!(backend.live_texture_count(), 1);
        assert_eq!(backend.view_descriptor(view).map(|d| d.width), Some(4));

        backend.destroy_texture_view(view);
        backend.destroy_texture(texture);
        assert_eq!(backend.live_texture_count(), 0);
        assert_eq!(backend.textures_created(), 1);
        assert_eq!(backend.textures_destroyed(), 1);
    }

    #[test]
    fn records_commands_per_pass() {
        let mut backend = DummyBackend::new();
        backend.begin_frame();
        backend.draw(0..3, 0..1);
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("pass".into()),
            color_attachments: vec![],
            depth_stencil_attachment: None,
        });
        backend.draw(0..3, 0..1);
        backend.draw_indexed(0..36, 0, 0..1);
        backend.end_render_pass();
        backend.end_frame().unwrap();

        let passes = backend.take_passes();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].label(), Some("pass"));
        assert_eq!(passes[0].draw_count(), 2);
        assert_eq!(backend.frames_submitted(), 1);
    }

    #[test]
    fn buffer_writes_are_visible() {
        let mut backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            })
            .unwrap();
        backend.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(backend.buffer_contents(buffer), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
    }

    #[test]
    fn failing_texture_creation_reports_error() {
        let mut backend = DummyBackend::new();
        backend.set_fail_texture_creation(true);
        assert!(matches!(
            backend.create_texture(&color_desc(2, 2)),
            Err(BackendError::TextureCreationFailed(_))
        ));
        assert_eq!(backend.live_texture_count(), 0);
    }
}
