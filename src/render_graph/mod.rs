//! Render Graph System
//!
//! The per-camera pass list. Passes declare which host resources they read
//! and write; the graph orders them and the executor drives them through
//! configure and execute once per frame.

pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;

pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use resource::*;
