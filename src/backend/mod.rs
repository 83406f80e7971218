//! Backend abstraction layer
//!
//! Provides common traits and types that the wgpu and dummy backends implement.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use dummy::DummyBackend;
pub use traits::*;
pub use types::*;
pub use wgpu_backend::WgpuBackend;
