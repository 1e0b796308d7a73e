//! Application layer - Use case services.
//!
//! Services orchestrate domain logic over the port traits:
//! - `PortRegistry` owns the snapshot and is the only caller of the backend
//! - `RefreshScheduler` drives periodic refreshes

mod registry;
mod scheduler;

pub use registry::{PortRegistry, Snapshot};
pub use scheduler::RefreshScheduler;
