//! Render graph executor

use crate::backend::traits::*;
use crate::render_graph::graph::*;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::scene::Scene;
use std::collections::HashMap;

/// Executor for running a render graph once per frame
pub struct RenderGraphExecutor {
    /// External texture views (camera color, scene depth)
    external_views: HashMap<ResourceId, TextureViewHandle>,

    /// Execution order, recomputed whenever the graph revision moves
    compiled: Option<CompiledGraph>,
}

impl RenderGraphExecutor {
    pub fn new() -> Self {
        Self {
            external_views: HashMap::new(),
            compiled: None,
        }
    }

    /// Set an external texture view for this frame and the following ones
    pub fn set_external_view(&mut self, resource: ResourceId, view: TextureViewHandle) {
        self.external_views.insert(resource, view);
    }

    /// Bind a view by resource name. Returns false if the graph has no such resource.
    pub fn bind_external(
        &mut self,
        graph: &RenderGraph,
        name: &str,
        view: TextureViewHandle,
    ) -> bool {
        match graph.get_external(name) {
            Some(id) => {
                self.set_external_view(id, view);
                true
            }
            None => false,
        }
    }

    /// Execution order used by the last `execute` call
    pub fn compiled(&self) -> Option<&CompiledGraph> {
        self.compiled.as_ref()
    }

    fn ensure_compiled(&mut self, graph: &RenderGraph) -> CompiledGraph {
        match &self.compiled {
            Some(compiled) if compiled.revision == graph.revision() => compiled.clone(),
            _ => {
                let compiled = graph.compile();
                log::debug!("Render graph: compiled order {:?}", compiled.pass_order);
                self.compiled = Some(compiled.clone());
                compiled
            }
        }
    }

    /// Execute the render graph.
    ///
    /// Each pass is configured for the scene camera, then executed. A pass
    /// whose configuration fails is skipped for this frame; nothing is
    /// returned to the caller.
    pub fn execute(
        &mut self,
        graph: &mut RenderGraph,
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
    ) {
        let compiled = self.ensure_compiled(graph);

        for &pass_id in &compiled.pass_order {
            let Some(pass) = graph.get_pass_mut(pass_id) else {
                continue;
            };

            let configured = {
                let mut ctx = PassConfigureContext {
                    backend: &mut *backend,
                    camera: &scene.camera,
                };
                pass.configure(&mut ctx)
            };

            if let Err(e) = configured {
                log::warn!("Render graph: skipping pass '{}': {}", pass.name(), e);
                continue;
            }

            let mut ctx = PassExecuteContext {
                backend: &mut *backend,
                scene,
                resource_textures: &self.external_views,
            };
            pass.execute(&mut ctx);
        }
    }

    /// Tear down every pass and forget external views
    pub fn cleanup(&mut self, graph: &mut RenderGraph, backend: &mut dyn GraphicsBackend) {
        for mut pass in graph.drain_passes() {
            pass.teardown(backend);
        }
        self.external_views.clear();
        self.compiled = None;
    }
}

impl Default for RenderGraphExecutor {
    fn default() -> Self {
        Self::new()
    }
}
