//! Screen-space outline
//!
//! Objects whose rendering layers intersect the configured mask are drawn
//! into a private mask color and depth target. A full-screen Sobel pass then
//! turns the mask silhouette into a line and blends it over the camera color,
//! skipping pixels where the scene depth shows the object is hidden.

pub mod config;
pub mod edge_pass;
pub mod feature;
pub mod filter;
pub mod kernel;
pub mod mask_pass;
pub mod pass;
pub mod shader;
pub mod targets;

pub use config::{
    resolve, OutlineConfiguration, OutlineFeatureConfig, OutlineSettings, OutlineVolume,
    OverridableParameter, MAX_OUTLINE_WIDTH,
};
pub use feature::OutlineFeature;
pub use filter::FilteringCriteria;
pub use kernel::{composite, CpuSurface, EdgeInputs, EdgeKernel, OutlineUniform};
pub use pass::OutlinePass;
pub use shader::{OutlineShaders, ShaderError};
pub use targets::MaskTargets;
