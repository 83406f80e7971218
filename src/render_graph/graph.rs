//! Render graph definition and compilation

use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::collections::{HashMap, HashSet};

/// The per-camera pass list
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderPass>>,
    pass_nodes: Vec<PassNode>,
    resources: Vec<ExternalResource>,
    next_pass_id: u32,
    next_resource_id: u32,

    /// External resources by name
    external_resources: HashMap<String, ResourceId>,

    /// Bumped on every structural change so executors know to recompile
    revision: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            pass_nodes: Vec::new(),
            resources: Vec::new(),
            next_pass_id: 0,
            next_resource_id: 0,
            external_resources: HashMap::new(),
            revision: 0,
        }
    }

    /// Register an external resource. Registering a name twice returns the same id.
    pub fn register_external(&mut self, name: &str) -> ResourceId {
        if let Some(id) = self.external_resources.get(name) {
            return *id;
        }

        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        self.resources.push(ExternalResource {
            id,
            name: name.to_string(),
        });
        self.external_resources.insert(name.to_string(), id);
        self.revision += 1;
        id
    }

    /// Get external resource by name
    pub fn get_external(&self, name: &str) -> Option<ResourceId> {
        self.external_resources.get(name).copied()
    }

    /// Add a render pass to the graph
    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P) -> PassId {
        self.add_boxed_pass(Box::new(pass))
    }

    /// Add an already boxed render pass, running its `setup`
    pub fn add_boxed_pass(&mut self, mut pass: Box<dyn RenderPass>) -> PassId {
        let id = PassId(self.next_pass_id);
        self.next_pass_id += 1;

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        {
            let mut ctx = PassSetupContext {
                externals: &self.external_resources,
                inputs: &mut inputs,
                outputs: &mut outputs,
            };
            pass.setup(&mut ctx);
        }

        log::debug!(
            "Render graph: added pass '{}' at {:?} ({} inputs, {} outputs)",
            pass.name(),
            pass.event(),
            inputs.len(),
            outputs.len()
        );

        self.pass_nodes.push(PassNode {
            id,
            name: pass.name().to_string(),
            event: pass.event(),
            inputs,
            outputs,
        });
        self.passes.push(pass);
        self.revision += 1;

        id
    }

    /// Detach a pass. The caller owns it afterwards and is responsible for
    /// tearing it down.
    pub fn remove_pass(&mut self, id: PassId) -> Option<Box<dyn RenderPass>> {
        let index = self.pass_nodes.iter().position(|n| n.id == id)?;
        self.pass_nodes.remove(index);
        self.revision += 1;
        log::debug!("Render graph: removed pass {:?}", id);
        Some(self.passes.remove(index))
    }

    /// Detach every pass, in registration order
    pub fn drain_passes(&mut self) -> Vec<Box<dyn RenderPass>> {
        self.pass_nodes.clear();
        self.revision += 1;
        self.passes.drain(..).collect()
    }

    /// Compile the graph into an execution order.
    ///
    /// A pass runs after every pass that writes a resource it reads. Among
    /// passes that are ready at the same time, the earlier `PassEvent` wins,
    /// then the earlier registration.
    pub fn compile(&self) -> CompiledGraph {
        let keys: HashMap<PassId, (PassEvent, usize)> = self
            .pass_nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, (node.event, index)))
            .collect();

        let mut dependencies: HashMap<PassId, HashSet<PassId>> = self
            .pass_nodes
            .iter()
            .map(|node| (node.id, HashSet::new()))
            .collect();

        for reader in &self.pass_nodes {
            for writer in &self.pass_nodes {
                if reader.id == writer.id {
                    continue;
                }

                for input in &reader.inputs {
                    if !writer.writes_resource(input.resource) {
                        continue;
                    }
                    // Two passes that both read and write a resource are
                    // ordered by stage instead of by data flow.
                    let mutual = reader.writes_resource(input.resource)
                        && writer.reads_resource(input.resource);
                    if mutual && keys[&reader.id] < keys[&writer.id] {
                        continue;
                    }
                    if let Some(deps) = dependencies.get_mut(&reader.id) {
                        deps.insert(writer.id);
                    }
                }
            }
        }

        // Kahn's algorithm, picking the lowest sort key among ready passes
        let mut in_degree: HashMap<PassId, usize> = dependencies
            .iter()
            .map(|(id, deps)| (*id, deps.len()))
            .collect();
        let mut remaining: Vec<&PassNode> = self.pass_nodes.iter().collect();
        let mut pass_order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .enumerate()
                .filter(|(_, node)| in_degree.get(&node.id).copied().unwrap_or(0) == 0)
                .min_by_key(|(_, node)| keys[&node.id])
                .map(|(index, _)| index);

            let Some(index) = next else {
                log::warn!(
                    "Render graph: dependency cycle between {} passes, falling back to stage order",
                    remaining.len()
                );
                remaining.sort_by_key(|node| keys[&node.id]);
                pass_order.extend(remaining.iter().map(|node| node.id));
                break;
            };

            let node = remaining.remove(index);
            pass_order.push(node.id);

            for other in &remaining {
                if dependencies[&other.id].contains(&node.id) {
                    if let Some(degree) = in_degree.get_mut(&other.id) {
                        *degree -= 1;
                    }
                }
            }
        }

        CompiledGraph {
            pass_order,
            revision: self.revision,
        }
    }

    /// Structural revision, bumped by every add/remove/register
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get pass nodes (metadata)
    pub fn pass_nodes(&self) -> &[PassNode] {
        &self.pass_nodes
    }

    /// Get all external resources
    pub fn resources(&self) -> &[ExternalResource] {
        &self.resources
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn contains_pass(&self, id: PassId) -> bool {
        self.pass_nodes.iter().any(|n| n.id == id)
    }

    /// Get pass by ID
    pub fn get_pass(&self, id: PassId) -> Option<&dyn RenderPass> {
        let index = self.pass_nodes.iter().position(|n| n.id == id)?;
        Some(self.passes[index].as_ref())
    }

    /// Get mutable pass by ID
    pub fn get_pass_mut(&mut self, id: PassId) -> Option<&mut (dyn RenderPass + 'static)> {
        let index = self.pass_nodes.iter().position(|n| n.id == id)?;
        Some(self.passes[index].as_mut())
    }

    /// Get a pass as its concrete type
    pub fn pass_as<P: RenderPass + 'static>(&self, id: PassId) -> Option<&P> {
        self.get_pass(id)?.as_any().downcast_ref::<P>()
    }

    /// Get pass node by ID
    pub fn get_pass_node(&self, id: PassId) -> Option<&PassNode> {
        self.pass_nodes.iter().find(|n| n.id == id)
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled render graph with execution order
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub pass_order: Vec<PassId>,
    /// Graph revision this order was computed from
    pub revision: u64,
}
