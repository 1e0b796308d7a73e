//! Refresh scheduler: immediate call, then a fixed cadence.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Restartable, cancellable periodic trigger.
///
/// Every `start` invokes the callback once right away. When enabled it then
/// keeps invoking it every `interval` until stopped. Each invocation is
/// awaited before the next tick is taken, so ticks missed while a callback
/// runs collapse into one.
///
/// The scheduler owns the spawned task and aborts it on `stop`, on re-arm
/// and on drop. It must be started from within a tokio runtime.
pub struct RefreshScheduler {
    task: Option<JoinHandle<()>>,
    interval: Duration,
    enabled: bool,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self {
            task: None,
            interval: Duration::ZERO,
            enabled: false,
        }
    }

    /// Arm the scheduler, cancelling any previous schedule first.
    ///
    /// The interval is used as given; callers are expected to clamp it.
    pub fn start<F, Fut>(&mut self, callback: F, interval: Duration, enabled: bool)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.interval = interval;
        self.enabled = enabled;

        debug!(interval_ms = interval.as_millis() as u64, enabled, "scheduler armed");

        let task = if enabled {
            // tokio's interval panics on a zero period.
            let period = interval.max(Duration::from_millis(1));
            tokio::spawn(async move {
                let mut ticker = time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    callback().await;
                }
            })
        } else {
            tokio::spawn(async move { callback().await })
        };
        self.task = Some(task);
    }

    /// Cancel pending invocations. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("scheduler stopped");
        }
    }

    /// Whether a schedule is armed and still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Interval of the most recent `start`.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the most recent `start` enabled periodic invocations.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
