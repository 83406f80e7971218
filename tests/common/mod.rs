//! Shared harness for outline integration tests.
//!
//! Builds the forward + outline graph on any backend, owns the camera targets
//! and the scene, and drives frames the way a host would.

#![allow(dead_code)]

use glam::{Vec3, Vec4};
use outline_pass::backend::dummy::RecordedPass;
use outline_pass::backend::{GraphicsBackend, RenderPipelineDescriptor};
use outline_pass::outline::{OutlineFeature, OutlineFeatureConfig, OutlinePass};
use outline_pass::pipeline::{build_outline_graph, CameraTargets, ForwardConfig, OutlineGraphPasses};
use outline_pass::render_graph::{RenderGraph, RenderGraphExecutor};
use outline_pass::resources::{GpuMesh, Material, Mesh};
use outline_pass::scene::{Camera, RenderObject, RenderingLayers, Scene, Viewport};
use outline_pass::DummyBackend;

pub const FORWARD_LABEL: &str = "Forward Pass";
pub const MASK_LABEL: &str = "Outline Mask";
pub const EDGE_LABEL: &str = "Outline Edge";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A host: graph, executor, camera targets and scene on one backend
pub struct Harness<B: GraphicsBackend> {
    pub backend: B,
    pub graph: RenderGraph,
    pub executor: RenderGraphExecutor,
    pub feature: OutlineFeature,
    pub passes: OutlineGraphPasses,
    pub config: ForwardConfig,
    pub targets: Option<CameraTargets>,
    pub scene: Scene,
}

impl<B: GraphicsBackend> Harness<B> {
    pub fn new(mut backend: B, viewport: Viewport, mut feature: OutlineFeature) -> Self {
        init_logger();

        let mut graph = RenderGraph::new();
        let config = ForwardConfig::default();
        let passes = build_outline_graph(&mut graph, &mut feature, &config);

        let targets = CameraTargets::create(&mut backend, &viewport, config.depth_format)
            .expect("camera targets");
        let mut executor = RenderGraphExecutor::new();
        targets.bind(&mut executor, &graph);

        let camera = Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO).with_viewport(viewport);

        Self {
            backend,
            graph,
            executor,
            feature,
            passes,
            config,
            targets: Some(targets),
            scene: Scene::new(camera),
        }
    }

    /// Add an object with a fresh mesh and material
    pub fn add_object(&mut self, mesh: &Mesh, color: Vec4, position: Vec3, layers: RenderingLayers) {
        let mesh = GpuMesh::upload(&mut self.backend, mesh).expect("mesh upload");
        let mesh_id = self.scene.add_mesh(mesh);
        let material_id = self
            .scene
            .add_material(Material::new("test").with_base_color(color));
        self.scene.add_object(
            RenderObject::new(mesh_id, material_id)
                .with_position(position)
                .with_layers(layers),
        );
    }

    /// Record one frame without submitting it
    pub fn execute(&mut self) {
        self.executor
            .execute(&mut self.graph, &mut self.backend, &self.scene);
    }

    /// Record and submit one frame
    pub fn render_frame(&mut self) {
        self.backend.begin_frame();
        self.execute();
        self.backend.end_frame().expect("frame submission");
    }

    /// Recreate the camera targets at a new size and resize the camera
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(targets) = self.targets.take() {
            targets.destroy(&mut self.backend);
        }
        self.scene.camera.resize(width, height);
        let targets = CameraTargets::create(
            &mut self.backend,
            &self.scene.camera.viewport,
            self.config.depth_format,
        )
        .expect("camera targets");
        targets.bind(&mut self.executor, &self.graph);
        self.targets = Some(targets);
    }

    pub fn outline_pass(&self) -> Option<&OutlinePass> {
        let id = self.feature.pass_id()?;
        self.graph.pass_as::<OutlinePass>(id)
    }

    /// Tear everything down, returning the backend for inspection
    pub fn shutdown(mut self) -> B {
        self.feature.dispose(&mut self.graph, &mut self.backend);
        self.executor.cleanup(&mut self.graph, &mut self.backend);
        if let Some(targets) = self.targets.take() {
            targets.destroy(&mut self.backend);
        }
        for mesh in self.scene.meshes.drain(..) {
            mesh.destroy(&mut self.backend);
        }
        self.backend
    }
}

pub fn dummy_harness(width: u32, height: u32) -> Harness<DummyBackend> {
    Harness::new(
        DummyBackend::new(),
        Viewport::new(width, height),
        OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default()),
    )
}

/// Labels of the passes recorded since the last call
pub fn take_labels(backend: &mut DummyBackend) -> Vec<String> {
    backend
        .take_passes()
        .iter()
        .map(|p| p.label().unwrap_or_default().to_string())
        .collect()
}

pub fn find_pass<'a>(passes: &'a [RecordedPass], label: &str) -> Option<&'a RecordedPass> {
    passes.iter().find(|p| p.label() == Some(label))
}

/// Pipeline descriptor bound by a recorded pass
pub fn pass_pipeline<'a>(
    backend: &'a DummyBackend,
    pass: &RecordedPass,
) -> Option<&'a RenderPipelineDescriptor> {
    pass.commands.iter().find_map(|c| match c {
        outline_pass::backend::dummy::RecordedCommand::SetPipeline(handle) => {
            backend.render_pipeline(*handle)
        }
        _ => None,
    })
}

/// RGBA8 pixel from tightly packed readback data
pub fn get_pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}
