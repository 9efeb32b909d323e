use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::error;
use crate::error::PrefetchError;

/// # FailureCell
///
/// A write-once slot shared between the prefetch worker and its consumer.
///
/// The worker records the error that ended it instead of dying silently. The
/// consumer never receives the error through the queue; it reads the cell after
/// it has already observed the end of the worker. The first recorded failure
/// wins, later ones are dropped.
#[derive(Debug, Default)]
pub(crate) struct FailureCell {
    slot: OnceLock<PrefetchError>,
}

impl FailureCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record `failure` unless a failure is already present.
    pub(crate) fn record(&self, failure: PrefetchError) {
        if let Err(dropped) = self.slot.set(failure) {
            error!(error = %dropped, "discarding failure, worker already failed");
        }
    }

    pub(crate) fn get(&self) -> Option<&PrefetchError> {
        self.slot.get()
    }
}

/// # Sentinel
///
/// Records a panic of the thread that owns it.
///
/// ## Implementation Strategy
///
/// `Sentinel` leverages Rust's `Drop` trait and the `thread::panicking()` function
/// to detect when it's being dropped during unwinding. When this occurs it writes
/// [`PrefetchError::WorkerPanicked`] into its [`FailureCell`], so a panic on the
/// worker is visible to the consumer in the same way as an ordinary error.
///
/// ## Usage Pattern
///
/// 1. Create a `Sentinel` at the top of the worker thread's closure
/// 2. Keep it alive for the whole body of the worker
/// 3. If the worker panics, the `Sentinel` is dropped during unwinding and records it
pub(crate) struct Sentinel {
    name: String,
    cell: Arc<FailureCell>,
}

impl Sentinel {
    pub(crate) fn new(name: impl Into<String>, cell: Arc<FailureCell>) -> Self {
        Self {
            name: name.into(),
            cell,
        }
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = %self.name, "prefetch worker panicked");
            self.cell.record(PrefetchError::WorkerPanicked {
                name: self.name.clone(),
            });
        }
    }
}
