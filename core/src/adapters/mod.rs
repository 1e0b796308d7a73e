//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

pub mod backend;
pub mod settings;

// Re-export main types for convenience
pub use backend::SystemBackend;
pub use settings::{JsonFileRepository, MemoryRepository};
