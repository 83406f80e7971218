//! Resources tracked by the render graph
//!
//! The graph never allocates anything itself. Every resource is external: a
//! host-owned texture registered under a well-known name whose view the
//! executor binds each frame. Passes only use names to declare dependencies.

/// Final color target of the camera
pub const CAMERA_COLOR: &str = "camera_color";

/// Depth buffer the host pipeline renders the scene into
pub const SCENE_DEPTH: &str = "scene_depth";

/// Unique identifier for a render graph resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) u32);

/// Host-owned resource known to the graph by name
#[derive(Debug, Clone)]
pub struct ExternalResource {
    pub id: ResourceId,
    pub name: String,
}

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    /// Read as a texture (sampled or loaded)
    TextureRead,
    /// Write as a render target
    RenderTarget,
    /// Depth attachment with writes disabled
    DepthStencilRead,
    DepthStencilWrite,
}

/// Resource access declaration for a pass
#[derive(Debug, Clone)]
pub struct ResourceAccess {
    pub resource: ResourceId,
    pub usage: ResourceUsage,
}

impl ResourceAccess {
    pub fn is_read(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::TextureRead | ResourceUsage::DepthStencilRead
        )
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::RenderTarget | ResourceUsage::DepthStencilWrite
        )
    }
}
