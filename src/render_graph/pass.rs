//! Render pass definitions for the render graph

use crate::backend::traits::*;
use crate::render_graph::resource::*;
use crate::scene::{Camera, Scene, Viewport};
use std::any::Any;
use std::collections::HashMap;

/// Unique identifier for a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

/// Pipeline stage a pass is injected at
///
/// Passes with no data dependency between them execute in event order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PassEvent {
    BeforeOpaque,
    #[default]
    AfterOpaque,
    BeforePostProcessing,
    AfterPostProcessing,
}

/// Context for declaring pass dependencies
pub struct PassSetupContext<'a> {
    pub(crate) externals: &'a HashMap<String, ResourceId>,
    pub(crate) inputs: &'a mut Vec<ResourceAccess>,
    pub(crate) outputs: &'a mut Vec<ResourceAccess>,
}

impl<'a> PassSetupContext<'a> {
    /// Look up a host resource by name
    pub fn external(&self, name: &str) -> Option<ResourceId> {
        self.externals.get(name).copied()
    }

    /// Declare that this pass reads from a resource
    pub fn read(&mut self, resource: ResourceId, usage: ResourceUsage) {
        self.inputs.push(ResourceAccess { resource, usage });
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: ResourceId, usage: ResourceUsage) {
        self.outputs.push(ResourceAccess { resource, usage });
    }
}

/// Context for per-camera configuration, run right before `execute`
pub struct PassConfigureContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub camera: &'a Camera,
}

/// Context for executing a render pass
pub struct PassExecuteContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub scene: &'a Scene,
    pub resource_textures: &'a HashMap<ResourceId, TextureViewHandle>,
}

impl<'a> PassExecuteContext<'a> {
    /// Get a texture view handle for a resource
    pub fn get_texture(&self, resource: ResourceId) -> Option<TextureViewHandle> {
        self.resource_textures.get(&resource).copied()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.scene.camera.viewport
    }
}

/// Trait for render passes
///
/// Lifecycle: `setup` once when the pass joins a graph, then `configure` and
/// `execute` once per frame, then `teardown` once when the pass leaves.
pub trait RenderPass: Send + Sync {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Stage this pass is injected at
    fn event(&self) -> PassEvent;

    /// Declare resources read and written
    fn setup(&mut self, ctx: &mut PassSetupContext);

    /// Create or resize per-camera GPU state
    fn configure(&mut self, _ctx: &mut PassConfigureContext) -> BackendResult<()> {
        Ok(())
    }

    /// Record commands
    fn execute(&mut self, ctx: &mut PassExecuteContext);

    /// Release everything the pass owns. Must be safe to call more than once.
    fn teardown(&mut self, _backend: &mut dyn GraphicsBackend) {}

    /// Allow downcasting
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Metadata about a pass in the graph
#[derive(Debug)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub event: PassEvent,
    pub inputs: Vec<ResourceAccess>,
    pub outputs: Vec<ResourceAccess>,
}

impl PassNode {
    pub fn reads_resource(&self, resource: ResourceId) -> bool {
        self.inputs.iter().any(|a| a.resource == resource)
    }

    pub fn writes_resource(&self, resource: ResourceId) -> bool {
        self.outputs.iter().any(|a| a.resource == resource)
    }
}
