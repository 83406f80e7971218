//! Mask render target lifecycle

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::scene::Viewport;

/// Color format of the mask; alpha is the occupancy signal
pub const MASK_COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Depth format of the mask
pub const MASK_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24Plus;

/// Descriptor of the mask color target for a viewport.
///
/// Single sample and alpha capable regardless of the camera's own target.
pub fn mask_color_descriptor(viewport: &Viewport) -> TextureDescriptor {
    TextureDescriptor {
        label: Some("Outline Mask".into()),
        width: viewport.width,
        height: viewport.height,
        mip_levels: 1,
        sample_count: 1,
        format: MASK_COLOR_FORMAT,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    }
}

/// Descriptor of the mask depth target for a viewport
pub fn mask_depth_descriptor(viewport: &Viewport) -> TextureDescriptor {
    TextureDescriptor {
        label: Some("Outline Mask Depth".into()),
        format: MASK_DEPTH_FORMAT,
        ..mask_color_descriptor(viewport)
    }
}

#[derive(Debug, Clone)]
struct AllocatedTarget {
    desc: TextureDescriptor,
    texture: TextureHandle,
    view: TextureViewHandle,
}

impl AllocatedTarget {
    fn create(backend: &mut dyn GraphicsBackend, desc: TextureDescriptor) -> BackendResult<Self> {
        let texture = backend.create_texture(&desc)?;
        let view = match backend.create_texture_view(texture) {
            Ok(view) => view,
            Err(e) => {
                backend.destroy_texture(texture);
                return Err(e);
            }
        };
        Ok(Self {
            desc,
            texture,
            view,
        })
    }

    fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture_view(self.view);
        backend.destroy_texture(self.texture);
    }
}

/// Mask color and depth targets, owned by the outline pass.
///
/// Both targets are always allocated together and released together.
#[derive(Debug, Default)]
pub struct MaskTargets {
    color: Option<AllocatedTarget>,
    depth: Option<AllocatedTarget>,
}

impl MaskTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the targets match `viewport`.
    ///
    /// A target is recreated only when its descriptor changed. Returns
    /// whether anything was (re)allocated. On failure nothing stays allocated.
    pub fn ensure(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        viewport: &Viewport,
    ) -> BackendResult<bool> {
        if viewport.width == 0 || viewport.height == 0 {
            self.release(backend);
            return Err(BackendError::TextureCreationFailed(format!(
                "outline mask for a {}x{} viewport",
                viewport.width, viewport.height
            )));
        }

        let color_desc = mask_color_descriptor(viewport);
        let depth_desc = mask_depth_descriptor(viewport);

        let color_changed = self.color.as_ref().map(|t| &t.desc) != Some(&color_desc);
        let depth_changed = self.depth.as_ref().map(|t| &t.desc) != Some(&depth_desc);
        if !color_changed && !depth_changed {
            return Ok(false);
        }

        if color_changed {
            if let Some(old) = self.color.take() {
                old.destroy(backend);
            }
            match AllocatedTarget::create(backend, color_desc) {
                Ok(target) => self.color = Some(target),
                Err(e) => {
                    self.release(backend);
                    return Err(e);
                }
            }
        }

        if depth_changed {
            if let Some(old) = self.depth.take() {
                old.destroy(backend);
            }
            match AllocatedTarget::create(backend, depth_desc) {
                Ok(target) => self.depth = Some(target),
                Err(e) => {
                    self.release(backend);
                    return Err(e);
                }
            }
        }

        log::trace!(
            "Outline mask targets allocated at {}x{}",
            viewport.width,
            viewport.height
        );
        Ok(true)
    }

    /// Destroy both targets. Does nothing when nothing is allocated.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        let released = self.color.is_some() || self.depth.is_some();
        if let Some(color) = self.color.take() {
            color.destroy(backend);
        }
        if let Some(depth) = self.depth.take() {
            depth.destroy(backend);
        }
        if released {
            log::trace!("Outline mask targets released");
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.color.is_some() && self.depth.is_some()
    }

    pub fn color_view(&self) -> Option<TextureViewHandle> {
        self.color.as_ref().map(|t| t.view)
    }

    pub fn depth_view(&self) -> Option<TextureViewHandle> {
        self.depth.as_ref().map(|t| t.view)
    }

    pub fn color_descriptor(&self) -> Option<&TextureDescriptor> {
        self.color.as_ref().map(|t| &t.desc)
    }

    pub fn depth_descriptor(&self) -> Option<&TextureDescriptor> {
        self.depth.as_ref().map(|t| &t.desc)
    }
}
