//! Outline Pass - A screen-space, occlusion-aware outline effect for a render graph
//!
//! Objects are selected by rendering layer, drawn into a private mask, and
//! outlined with a Sobel edge filter composited over the camera color.
//!
//! # Features
//! - Render graph with explicit setup, configure, execute and teardown hooks
//! - Mask color and depth targets reallocated only when the viewport changes
//! - Occlusion test against the host's scene depth buffer
//! - Per-field runtime overrides through an [`OutlineVolume`]
//! - Headless wgpu backend and a recording dummy backend for tests
//! - Entity Component System (ECS) scene extraction using Bevy ECS
//!
//! # Example
//! ```no_run
//! use outline_pass::backend::WgpuBackend;
//! use outline_pass::outline::{OutlineFeature, OutlineFeatureConfig};
//! use outline_pass::pipeline::{build_outline_graph, CameraTargets, ForwardConfig};
//! use outline_pass::render_graph::{RenderGraph, RenderGraphExecutor};
//! use outline_pass::scene::{Camera, Scene, Viewport};
//! use glam::Vec3;
//!
//! # fn main() -> Result<(), outline_pass::backend::BackendError> {
//! let mut backend = WgpuBackend::new_headless()?;
//! let mut graph = RenderGraph::new();
//! let mut feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default());
//! let config = ForwardConfig::default();
//! build_outline_graph(&mut graph, &mut feature, &config);
//!
//! let viewport = Viewport::new(640, 480);
//! let scene = Scene::new(Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO).with_viewport(viewport));
//! let targets = CameraTargets::create(&mut backend, &viewport, config.depth_format)?;
//!
//! let mut executor = RenderGraphExecutor::new();
//! targets.bind(&mut executor, &graph);
//! executor.execute(&mut graph, &mut backend, &scene);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod outline;
pub mod pipeline;
pub mod render_graph;
pub mod resources;
pub mod scene;

// Re-export Bevy ECS prelude for users
pub use bevy_ecs::prelude::*;

pub use backend::{DummyBackend, GraphicsBackend, WgpuBackend};
pub use outline::{
    OutlineConfiguration, OutlineFeature, OutlineFeatureConfig, OutlinePass, OutlineSettings,
    OutlineShaders, OutlineVolume,
};
pub use render_graph::{PassEvent, RenderGraph, RenderGraphExecutor};
pub use scene::{Camera, RenderingLayers, Scene, Viewport};
