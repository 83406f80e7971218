//! Outline feature: decides whether the pass joins a graph and owns its lifetime

use crate::backend::traits::GraphicsBackend;
use crate::outline::config::OutlineFeatureConfig;
use crate::outline::pass::OutlinePass;
use crate::outline::shader::{OutlineShaders, ShaderError};
use crate::render_graph::{PassId, RenderGraph};

/// Injects one [`OutlinePass`] into a render graph when valid shaders exist.
///
/// Without shaders the effect is disabled: registration is a no-op that warns
/// once. Supplying shaders again re-enables it on the next `register`.
pub struct OutlineFeature {
    config: OutlineFeatureConfig,
    shaders: Option<OutlineShaders>,
    /// Why the last supplied shaders were rejected
    rejected: Option<ShaderError>,
    pass_id: Option<PassId>,
    warned_unavailable: bool,
}

impl OutlineFeature {
    /// Create the feature. Shaders that fail validation count as unavailable.
    pub fn new(config: OutlineFeatureConfig, shaders: Option<OutlineShaders>) -> Self {
        let (shaders, rejected) = validated(shaders);
        Self {
            config,
            shaders,
            rejected,
            pass_id: None,
            warned_unavailable: false,
        }
    }

    /// Feature with the built-in shaders
    pub fn with_builtin_shaders(config: OutlineFeatureConfig) -> Self {
        Self::new(config, Some(OutlineShaders::builtin()))
    }

    pub fn config(&self) -> &OutlineFeatureConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.shaders.is_some()
    }

    /// Id of the registered pass, if it is currently in a graph
    pub fn pass_id(&self) -> Option<PassId> {
        self.pass_id
    }

    /// Add the outline pass to `graph` unless it is already there.
    ///
    /// Returns `None` when the effect is disabled.
    pub fn register(&mut self, graph: &mut RenderGraph) -> Option<PassId> {
        if let Some(id) = self.pass_id {
            if graph.contains_pass(id) {
                return Some(id);
            }
            self.pass_id = None;
        }

        let Some(shaders) = self.shaders.clone() else {
            if !self.warned_unavailable {
                match &self.rejected {
                    Some(e) => log::warn!(
                        "Outline feature: shaders unavailable ({}), outline effect disabled",
                        e
                    ),
                    None => {
                        log::warn!("Outline feature: shaders unavailable, outline effect disabled")
                    }
                }
                self.warned_unavailable = true;
            }
            return None;
        };

        let id = graph.add_pass(OutlinePass::new(self.config, shaders));
        log::debug!("Outline feature: registered pass {:?}", id);
        self.pass_id = Some(id);
        Some(id)
    }

    /// Change shader availability.
    ///
    /// Losing the shaders removes the pass from `graph` and releases its GPU
    /// resources. Gaining them registers the pass again.
    pub fn set_shaders(
        &mut self,
        shaders: Option<OutlineShaders>,
        graph: &mut RenderGraph,
        backend: &mut dyn GraphicsBackend,
    ) {
        self.unregister(graph, backend);
        (self.shaders, self.rejected) = validated(shaders);
        if self.shaders.is_some() {
            self.warned_unavailable = false;
        }
        self.register(graph);
    }

    /// Remove the pass from `graph` and release everything it holds
    pub fn dispose(&mut self, graph: &mut RenderGraph, backend: &mut dyn GraphicsBackend) {
        self.unregister(graph, backend);
    }

    fn unregister(&mut self, graph: &mut RenderGraph, backend: &mut dyn GraphicsBackend) {
        let Some(id) = self.pass_id.take() else {
            return;
        };
        if let Some(mut pass) = graph.remove_pass(id) {
            pass.teardown(backend);
            log::debug!("Outline feature: removed pass {:?}", id);
        }
    }
}

/// Split supplied shaders into usable ones or the reason they were rejected.
/// Rejection is reported by `register`, together with the disabled effect.
fn validated(shaders: Option<OutlineShaders>) -> (Option<OutlineShaders>, Option<ShaderError>) {
    let Some(shaders) = shaders else {
        return (None, None);
    };
    match shaders.validate() {
        Ok(()) => (Some(shaders), None),
        Err(e) => {
            log::debug!("Outline feature: rejected shaders: {}", e);
            (None, Some(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken() -> OutlineShaders {
        OutlineShaders {
            mask: "fn broken(".to_string(),
            edge: OutlineShaders::builtin().edge,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut graph = RenderGraph::new();
        let mut feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default());

        let first = feature.register(&mut graph);
        let second = feature.register(&mut graph);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(graph.pass_count(), 1);
    }

    #[test]
    fn test_missing_shaders_skip_registration() {
        let mut graph = RenderGraph::new();
        let mut feature = OutlineFeature::new(OutlineFeatureConfig::default(), None);

        for _ in 0..3 {
            assert_eq!(feature.register(&mut graph), None);
        }
        assert!(!feature.is_enabled());
        assert_eq!(graph.pass_count(), 0);
    }

    #[test]
    fn test_invalid_shaders_disable_feature() {
        let feature = OutlineFeature::new(OutlineFeatureConfig::default(), Some(broken()));
        assert!(!feature.is_enabled());
        assert!(matches!(feature.rejected, Some(ShaderError::Parse { .. })));
    }

    #[test]
    fn test_valid_shaders_clear_rejection() {
        let mut graph = RenderGraph::new();
        let mut backend = crate::backend::DummyBackend::new();
        let mut feature = OutlineFeature::new(OutlineFeatureConfig::default(), Some(broken()));

        feature.set_shaders(Some(OutlineShaders::builtin()), &mut graph, &mut backend);
        assert!(feature.rejected.is_none());
        assert!(feature.pass_id().is_some());
    }

    #[test]
    fn test_reregisters_after_external_removal() {
        let mut graph = RenderGraph::new();
        let mut feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default());
        let first = feature.register(&mut graph).unwrap();

        graph.remove_pass(first);
        let second = feature.register(&mut graph).unwrap();

        assert_ne!(first, second);
        assert!(graph.contains_pass(second));
    }
}
