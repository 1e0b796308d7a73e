//! Port backend port (interface).

use std::future::Future;

use crate::domain::PortRecord;
use crate::error::Result;

/// Port for the native enumeration/termination capability.
///
/// The registry treats implementations as a black-box request/response API:
/// it never inspects how ports are discovered or how processes are killed.
pub trait PortBackend: Send + Sync {
    /// List all TCP ports in the LISTENING state with their owning process.
    fn list_listening_ports(&self) -> impl Future<Output = Result<Vec<PortRecord>>> + Send;

    /// Terminate the process with the given PID.
    fn kill_process(&self, pid: u32) -> impl Future<Output = Result<()>> + Send;
}

impl<T: PortBackend> PortBackend for std::sync::Arc<T> {
    fn list_listening_ports(&self) -> impl Future<Output = Result<Vec<PortRecord>>> + Send {
        (**self).list_listening_ports()
    }

    fn kill_process(&self, pid: u32) -> impl Future<Output = Result<()>> + Send {
        (**self).kill_process(pid)
    }
}
