//! System backend adapter.
//!
//! Platform-specific implementations of port listing and process
//! termination behind the `PortBackend` trait.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

mod utils;

use tracing::{debug, warn};

use crate::domain::PortRecord;
use crate::error::{Error, Result};
use crate::ports::PortBackend;

use utils::Utils;

/// The backend that talks to the local operating system.
pub struct SystemBackend {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinPlatform,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxPlatform,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsPlatform,
}

impl SystemBackend {
    /// Create a backend for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinPlatform::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxPlatform::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsPlatform::new(),
        }
    }
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PortBackend for SystemBackend {
    async fn list_listening_ports(&self) -> Result<Vec<PortRecord>> {
        let records = Utils::finalize(self.inner.list().await?);
        debug!(count = records.len(), "listed listening ports");
        Ok(records)
    }

    async fn kill_process(&self, pid: u32) -> Result<()> {
        debug!(pid, "terminating process");
        let result = terminate(pid).await;
        if let Err(e) = &result {
            warn!(pid, error = %e, "termination failed");
        }
        result
    }
}

/// Internal trait for platform-specific listing.
trait Platform: Send + Sync {
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<PortRecord>>> + Send;
}

#[cfg(unix)]
async fn terminate(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| Error::InvalidPid(pid.to_string()))?;
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(Error::ProcessNotFound(pid)),
        Err(Errno::EPERM) => Err(Error::PermissionDenied(format!(
            "Process {} may require elevated privileges or may be a system process.",
            pid
        ))),
        Err(errno) => Err(Error::TerminationFailed {
            pid,
            reason: errno.desc().to_string(),
        }),
    }
}

#[cfg(windows)]
async fn terminate(pid: u32) -> Result<()> {
    use std::process::Stdio;
    use tokio::process::Command;

    let output = Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::CommandFailed(format!("Failed to run taskkill: {}", e)))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let lower = stderr.to_lowercase();
    if lower.contains("not found") {
        Err(Error::ProcessNotFound(pid))
    } else if lower.contains("access is denied") {
        Err(Error::PermissionDenied(format!(
            "Process {} may require Administrator privileges or may be a system process.",
            pid
        )))
    } else {
        Err(Error::TerminationFailed {
            pid,
            reason: stderr.trim().to_string(),
        })
    }
}
