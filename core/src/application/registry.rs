//! Port registry: the single owner of the listening-port snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::{validate_pid, PortRecord};
use crate::error::{Error, Result};
use crate::ports::PortBackend;

/// Read-only view of the ports known after the last successful refresh.
pub type Snapshot = Arc<[PortRecord]>;

/// Application service that mediates every call to the backend.
///
/// The snapshot is replaced wholesale by a single assignment on each
/// successful refresh and never mutated in place. Failures are turned into
/// a display string kept until the next successful operation.
///
/// Overlapping refreshes are not deduplicated: whichever response lands
/// last wins.
pub struct PortRegistry<B: PortBackend> {
    backend: B,
    snapshot: watch::Sender<Snapshot>,
    error: RwLock<Option<String>>,
    killing: Mutex<Vec<u32>>,
    loading: AtomicUsize,
    revision: AtomicU64,
}

impl<B: PortBackend> PortRegistry<B> {
    /// Create a registry with an empty snapshot.
    pub fn new(backend: B) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            backend,
            snapshot,
            error: RwLock::new(None),
            killing: Mutex::new(Vec::new()),
            loading: AtomicUsize::new(0),
            revision: AtomicU64::new(0),
        }
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Re-synchronize the snapshot with the backend.
    ///
    /// On failure the previous snapshot is kept and the error is stored as
    /// `"Failed to list ports: ..."`. No retry is attempted.
    pub async fn refresh(&self) -> Result<()> {
        let _loading = InFlight::new(&self.loading);

        match self.backend.list_listening_ports().await {
            Ok(records) => {
                let count = records.len();
                self.snapshot.send_replace(Snapshot::from(records));
                let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
                *self.error.write() = None;
                debug!(count, revision, "snapshot replaced");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                *self.error.write() = Some(format!("Failed to list ports: {}", e));
                Err(e)
            }
        }
    }

    /// Terminate a process, then refresh on success.
    ///
    /// `pid` is validated before anything is sent to the backend. A second
    /// request for a pid that is still being terminated is rejected. On
    /// failure the snapshot is left as-is and no refresh happens.
    pub async fn terminate(&self, pid: impl Into<i64>) -> Result<()> {
        let raw = pid.into();
        let pid = match validate_pid(raw) {
            Ok(pid) => pid,
            Err(e) => return Err(self.kill_failed(&raw.to_string(), e)),
        };

        let Some(_marker) = KillMarker::acquire(&self.killing, pid) else {
            return Err(self.kill_failed(&pid.to_string(), Error::KillInProgress(pid)));
        };

        debug!(pid, "terminate requested");
        if let Err(e) = self.backend.kill_process(pid).await {
            return Err(self.kill_failed(&pid.to_string(), e));
        }

        // The kill went through; a failed refresh is already recorded as the
        // current error and does not undo it.
        let _ = self.refresh().await;
        Ok(())
    }

    fn kill_failed(&self, pid: &str, e: Error) -> Error {
        warn!(pid, error = %e, "terminate failed");
        *self.error.write() = Some(format!("Failed to kill process {}: {}", pid, e));
        e
    }

    // MARK: - State Access

    /// The current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receive a notification every time the snapshot is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    /// Number of successful refreshes so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// The latest error message, if the last operation failed.
    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.error.write() = None;
    }

    /// Whether at least one refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Whether a termination of `pid` is in flight.
    pub fn is_killing(&self, pid: u32) -> bool {
        self.killing.lock().contains(&pid)
    }

    /// Most recently started termination still in flight.
    pub fn killing_pid(&self) -> Option<u32> {
        self.killing.lock().last().copied()
    }

    /// Find the first record bound to `port`.
    pub fn find_by_port(&self, port: u16) -> Option<PortRecord> {
        self.snapshot.borrow().iter().find(|r| r.port == port).cloned()
    }

    /// All records owned by `pid`.
    pub fn find_by_pid(&self, pid: u32) -> Vec<PortRecord> {
        self.snapshot
            .borrow()
            .iter()
            .filter(|r| r.pid == pid)
            .cloned()
            .collect()
    }
}

/// Counts an in-flight refresh for as long as it lives.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks a pid as being terminated; cleared on drop whatever the outcome.
struct KillMarker<'a> {
    set: &'a Mutex<Vec<u32>>,
    pid: u32,
}

impl<'a> KillMarker<'a> {
    fn acquire(set: &'a Mutex<Vec<u32>>, pid: u32) -> Option<Self> {
        let mut pids = set.lock();
        if pids.contains(&pid) {
            return None;
        }
        pids.push(pid);
        Some(Self { set, pid })
    }
}

impl Drop for KillMarker<'_> {
    fn drop(&mut self) {
        self.set.lock().retain(|p| *p != self.pid);
    }
}
