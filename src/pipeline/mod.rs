//! Host pipeline used to drive the outline
//!
//! 1. Forward pass - Clears and draws the scene into the camera color and scene depth
//! 2. Outline pass - Injected by [`OutlineFeature`] before post-processing

pub mod draw;
pub mod forward_pass;

pub use forward_pass::ForwardPass;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::outline::OutlineFeature;
use crate::render_graph::{PassId, RenderGraph, RenderGraphExecutor, CAMERA_COLOR, SCENE_DEPTH};
use crate::scene::Viewport;

/// Depth format of the scene depth buffer the forward pass writes
pub const SCENE_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Configuration for the forward pipeline
#[derive(Debug, Clone, Copy)]
pub struct ForwardConfig {
    /// Clear color of the camera target
    pub clear_color: [f32; 4],
    pub depth_format: TextureFormat,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth_format: SCENE_DEPTH_FORMAT,
        }
    }
}

/// Passes created by [`build_outline_graph`]
#[derive(Debug, Clone, Copy)]
pub struct OutlineGraphPasses {
    pub forward: PassId,
    /// `None` when the outline effect is disabled
    pub outline: Option<PassId>,
}

/// Register the host resources, the forward pass and the outline feature
pub fn build_outline_graph(
    graph: &mut RenderGraph,
    feature: &mut OutlineFeature,
    config: &ForwardConfig,
) -> OutlineGraphPasses {
    graph.register_external(CAMERA_COLOR);
    graph.register_external(SCENE_DEPTH);

    let forward = graph.add_pass(
        ForwardPass::new(config.depth_format).with_clear_color(config.clear_color),
    );
    let outline = feature.register(graph);

    OutlineGraphPasses { forward, outline }
}

/// Camera color and scene depth textures for headless rendering
#[derive(Debug)]
pub struct CameraTargets {
    pub color: TextureHandle,
    pub color_view: TextureViewHandle,
    pub depth: TextureHandle,
    pub depth_view: TextureViewHandle,
    viewport: Viewport,
}

impl CameraTargets {
    pub fn create(
        backend: &mut dyn GraphicsBackend,
        viewport: &Viewport,
        depth_format: TextureFormat,
    ) -> BackendResult<Self> {
        let color = backend.create_texture(&TextureDescriptor {
            label: Some("Camera Color".into()),
            width: viewport.width,
            height: viewport.height,
            mip_levels: 1,
            sample_count: 1,
            format: viewport.color_format,
            usage: TextureUsage::RENDER_ATTACHMENT
                | TextureUsage::TEXTURE_BINDING
                | TextureUsage::COPY_SRC,
        })?;
        let depth = match backend.create_texture(&TextureDescriptor {
            label: Some("Scene Depth".into()),
            width: viewport.width,
            height: viewport.height,
            mip_levels: 1,
            sample_count: 1,
            format: depth_format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        }) {
            Ok(depth) => depth,
            Err(e) => {
                backend.destroy_texture(color);
                return Err(e);
            }
        };

        let color_view = match backend.create_texture_view(color) {
            Ok(view) => view,
            Err(e) => {
                backend.destroy_texture(depth);
                backend.destroy_texture(color);
                return Err(e);
            }
        };
        let depth_view = match backend.create_texture_view(depth) {
            Ok(view) => view,
            Err(e) => {
                backend.destroy_texture_view(color_view);
                backend.destroy_texture(depth);
                backend.destroy_texture(color);
                return Err(e);
            }
        };

        Ok(Self {
            color,
            color_view,
            depth,
            depth_view,
            viewport: *viewport,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Bind both views as the graph's external resources
    pub fn bind(&self, executor: &mut RenderGraphExecutor, graph: &RenderGraph) {
        executor.bind_external(graph, CAMERA_COLOR, self.color_view);
        executor.bind_external(graph, SCENE_DEPTH, self.depth_view);
    }

    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture_view(self.depth_view);
        backend.destroy_texture_view(self.color_view);
        backend.destroy_texture(self.depth);
        backend.destroy_texture(self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::outline::OutlineFeatureConfig;

    #[test]
    fn test_outline_runs_after_forward() {
        let mut graph = RenderGraph::new();
        let mut feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default());
        let passes = build_outline_graph(&mut graph, &mut feature, &ForwardConfig::default());

        let order = graph.compile().pass_order;
        assert_eq!(order, vec![passes.forward, passes.outline.unwrap()]);
    }

    #[test]
    fn test_camera_targets_lifecycle() {
        let mut backend = DummyBackend::new();
        let targets =
            CameraTargets::create(&mut backend, &Viewport::new(32, 16), SCENE_DEPTH_FORMAT)
                .unwrap();
        assert_eq!(backend.live_texture_count(), 2);

        targets.destroy(&mut backend);
        assert_eq!(backend.live_texture_count(), 0);
    }
}
