//! Outline pass: owns the mask targets and sequences mask and edge stages

use crate::backend::traits::*;
use crate::outline::config::{resolve, OutlineConfiguration, OutlineFeatureConfig, OutlineSettings};
use crate::outline::edge_pass::EdgeCompositor;
use crate::outline::filter::FilteringCriteria;
use crate::outline::kernel::EdgeKernel;
use crate::outline::mask_pass::MaskRenderer;
use crate::outline::shader::OutlineShaders;
use crate::outline::targets::MaskTargets;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::any::Any;

/// Screen-space outline around objects selected by rendering layer.
///
/// Per frame: resolve the effective configuration, draw the selected objects
/// into the mask targets, then composite the Sobel edge of the mask onto the
/// camera color, discarding pixels where the scene depth is nearer than the
/// mask depth.
pub struct OutlinePass {
    event: PassEvent,
    settings: OutlineSettings,
    filter: FilteringCriteria,
    targets: MaskTargets,
    mask: MaskRenderer,
    edge: EdgeCompositor,
    camera_color: Option<ResourceId>,
    scene_depth: Option<ResourceId>,
    last_configuration: Option<OutlineConfiguration>,
    warned_missing_inputs: bool,
}

impl OutlinePass {
    pub fn new(config: OutlineFeatureConfig, shaders: OutlineShaders) -> Self {
        Self {
            event: config.event,
            settings: config.settings,
            filter: FilteringCriteria::new(config.settings.rendering_layer_mask),
            targets: MaskTargets::new(),
            mask: MaskRenderer::new(shaders.mask),
            edge: EdgeCompositor::new(shaders.edge),
            camera_color: None,
            scene_depth: None,
            last_configuration: None,
            warned_missing_inputs: false,
        }
    }

    pub fn settings(&self) -> &OutlineSettings {
        &self.settings
    }

    /// Replace the static settings; takes effect on the next frame
    pub fn set_settings(&mut self, settings: OutlineSettings) {
        self.settings = settings;
    }

    pub fn targets(&self) -> &MaskTargets {
        &self.targets
    }

    pub fn filter(&self) -> &FilteringCriteria {
        &self.filter
    }

    /// Configuration used by the most recent frame
    pub fn last_configuration(&self) -> Option<&OutlineConfiguration> {
        self.last_configuration.as_ref()
    }
}

impl RenderPass for OutlinePass {
    fn name(&self) -> &str {
        "Outline Pass"
    }

    fn event(&self) -> PassEvent {
        self.event
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        self.camera_color = ctx.external(CAMERA_COLOR);
        self.scene_depth = ctx.external(SCENE_DEPTH);

        if let Some(depth) = self.scene_depth {
            ctx.read(depth, ResourceUsage::TextureRead);
        }
        if let Some(color) = self.camera_color {
            // Blends over what is already there
            ctx.read(color, ResourceUsage::RenderTarget);
            ctx.write(color, ResourceUsage::RenderTarget);
        }
    }

    fn configure(&mut self, ctx: &mut PassConfigureContext) -> BackendResult<()> {
        let viewport = ctx.camera.viewport;
        if self.targets.ensure(ctx.backend, &viewport)? {
            log::trace!(
                "Outline pass: mask targets allocated at {}x{}",
                viewport.width,
                viewport.height
            );
        }

        self.mask.configure(ctx.backend)?;
        self.edge.configure(ctx.backend, viewport.color_format)?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        let config = resolve(&self.settings, ctx.scene.outline_volume.as_ref());
        self.filter.update(config.rendering_layer_mask);
        self.last_configuration = Some(config);

        let color = self.camera_color.and_then(|id| ctx.get_texture(id));
        let depth = self.scene_depth.and_then(|id| ctx.get_texture(id));
        let (Some(color), Some(scene_depth)) = (color, depth) else {
            if !self.warned_missing_inputs {
                log::warn!("Outline pass: camera color or scene depth not bound, skipping");
                self.warned_missing_inputs = true;
            }
            return;
        };

        let (Some(mask_color), Some(mask_depth)) =
            (self.targets.color_view(), self.targets.depth_view())
        else {
            return;
        };

        let scene = ctx.scene;
        match self.mask.render(ctx.backend, scene, &self.filter, &self.targets) {
            Ok(draws) => log::trace!("Outline pass: {} mask draws", draws),
            Err(e) => {
                log::warn!("Outline pass: mask stage failed: {}", e);
                return;
            }
        }

        let uniform = EdgeKernel::new(&config, scene.camera.viewport.aspect()).uniform();
        if let Err(e) = self.edge.render(
            ctx.backend,
            &uniform,
            color,
            mask_color,
            mask_depth,
            scene_depth,
        ) {
            log::warn!("Outline pass: edge stage failed: {}", e);
        }
    }

    fn teardown(&mut self, backend: &mut dyn GraphicsBackend) {
        self.edge.destroy(backend);
        self.mask.destroy(backend);
        self.targets.release(backend);
        self.last_configuration = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::outline::config::OutlineVolume;
    use crate::render_graph::{RenderGraph, RenderGraphExecutor};
    use crate::scene::{Camera, Scene, Viewport};
    use glam::Vec3;

    fn scene(width: u32, height: u32) -> Scene {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
            .with_viewport(Viewport::new(width, height));
        Scene::new(camera)
    }

    fn graph_with_outline() -> (RenderGraph, PassId) {
        let mut graph = RenderGraph::new();
        graph.register_external(CAMERA_COLOR);
        graph.register_external(SCENE_DEPTH);
        let id = graph.add_pass(OutlinePass::new(
            OutlineFeatureConfig::default(),
            OutlineShaders::builtin(),
        ));
        (graph, id)
    }

    #[test]
    fn test_setup_declares_scene_depth_read() {
        let (graph, id) = graph_with_outline();
        let node = graph.get_pass_node(id).unwrap();
        let depth = graph.get_external(SCENE_DEPTH).unwrap();
        let color = graph.get_external(CAMERA_COLOR).unwrap();

        assert!(node.reads_resource(depth));
        assert!(!node.writes_resource(depth));
        assert!(node.writes_resource(color));
        assert_eq!(node.event, PassEvent::BeforePostProcessing);
    }

    #[test]
    fn test_volume_override_reaches_last_configuration() {
        let (mut graph, id) = graph_with_outline();
        let mut backend = DummyBackend::new();
        let mut executor = RenderGraphExecutor::new();

        let mut scene = scene(64, 32);
        scene.outline_volume = Some(OutlineVolume::default().with_width(0.002));
        executor.execute(&mut graph, &mut backend, &scene);

        let pass = graph.pass_as::<OutlinePass>(id).unwrap();
        let config = pass.last_configuration().unwrap();
        assert_eq!(config.width, 0.002);
        assert_eq!(config.color, OutlineSettings::default().color);
        assert!(pass.targets().is_allocated());
    }

    #[test]
    fn test_unbound_inputs_skip_drawing() {
        let (mut graph, _) = graph_with_outline();
        let mut backend = DummyBackend::new();
        let mut executor = RenderGraphExecutor::new();

        executor.execute(&mut graph, &mut backend, &scene(16, 16));
        executor.execute(&mut graph, &mut backend, &scene(16, 16));

        assert!(backend.recorded_passes().is_empty());
    }

    #[test]
    fn test_teardown_twice_is_noop() {
        let (mut graph, id) = graph_with_outline();
        let mut backend = DummyBackend::new();
        let mut executor = RenderGraphExecutor::new();
        executor.execute(&mut graph, &mut backend, &scene(16, 16));
        assert_eq!(backend.live_texture_count(), 2);

        let mut pass = graph.remove_pass(id).unwrap();
        pass.teardown(&mut backend);
        pass.teardown(&mut backend);

        assert_eq!(backend.live_texture_count(), 0);
        assert_eq!(backend.textures_destroyed(), 2);
    }
}
