//! Periodic background task driving the [`Dispatcher`].
//!
//! The runner dispatches immediately on start, then sleeps for the cadence
//! and repeats. A stop request only interrupts the sleep: a cycle that has
//! already begun always runs to completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;

/// Time between dispatch cycles.
pub const DISPATCH_CADENCE: Duration = Duration::from_secs(24 * 60 * 60);

pub struct DispatchRunner {
    dispatcher: Arc<Dispatcher>,
    cadence: Duration,
}

impl DispatchRunner {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            cadence: DISPATCH_CADENCE,
        }
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self) -> RunnerHandle {
        let shutdown = Arc::new(Notify::new());
        let cycles = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_loop(
            self.dispatcher,
            self.cadence,
            shutdown.clone(),
            cycles.clone(),
        ));

        RunnerHandle {
            shutdown,
            cycles,
            task,
        }
    }
}

async fn run_loop(
    dispatcher: Arc<Dispatcher>,
    cadence: Duration,
    shutdown: Arc<Notify>,
    cycles: Arc<AtomicU64>,
) {
    info!(cadence_secs = cadence.as_secs(), "Dispatch runner started");

    loop {
        let now = chrono::Local::now().naive_local();
        // Store failures are logged by the dispatcher; the loop carries on.
        let _ = dispatcher.run_cycle(now).await;
        let completed = cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(completed, "Dispatch runner sleeping");

        tokio::select! {
            _ = tokio::time::sleep(cadence) => {}
            _ = shutdown.notified() => break,
        }
    }

    info!(cycles = cycles.load(Ordering::SeqCst), "Dispatch runner stopped");
}

/// Handle to a spawned [`DispatchRunner`].
pub struct RunnerHandle {
    shutdown: Arc<Notify>,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl RunnerHandle {
    /// Cycles completed so far, including ones whose store read failed.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop and wait for it. An in-flight cycle finishes
    /// first.
    pub async fn stop(self) {
        // notify_one keeps a permit if the loop is mid-cycle and not yet
        // waiting, so the request is not lost.
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "dispatch runner task ended abnormally");
        }
    }
}
