//! Resource management
//!
//! CPU side meshes and materials, and their uploaded GPU counterparts.

mod mesh;
mod material;

pub use mesh::*;
pub use material::*;
