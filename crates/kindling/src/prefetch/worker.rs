//! Module for owning the background prefetch thread.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread;
use tracing::{debug, error};
use crate::communication::{FailureCell, Sentinel};
use crate::error::{PrefetchError, Result};

/// A handle for managing the background thread that fills a prefetch queue.
///
/// The thread runs a single task for its whole life. The handle is the only
/// owner of the thread and is never exposed outside the prefetcher; callers only
/// ever see the queue the task writes into.
///
/// If the task returns an error, or panics, the failure is recorded in the
/// handle's [`FailureCell`] before the thread exits.
pub(crate) struct PrefetchWorker {
    /// Thread name, also used in logs
    name: String,

    /// Flag indicating whether the task should continue running
    running: Arc<AtomicBool>,

    /// Handle to the spawned thread, becomes `None` once joined or detached
    handle: Option<thread::JoinHandle<()>>,

    /// Where the task's failure ends up
    failure: Arc<FailureCell>,
}

impl PrefetchWorker {
    /// Spawns `task` on a new named thread.
    ///
    /// # Parameters
    ///
    /// * `name` - Thread name
    /// * `task` - The body of the worker. It receives the running flag and should
    ///   return once the flag is cleared.
    ///
    /// # Returns
    ///
    /// The handle, or [`PrefetchError::Spawn`] if the OS refused the thread.
    pub(crate) fn spawn<F>(name: impl Into<String>, task: F) -> Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let running = Arc::new(AtomicBool::new(true));
        let failure = FailureCell::new();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn({
                let running = running.clone();
                let failure = failure.clone();
                let name = name.clone();
                move || {
                    let _sentinel = Sentinel::new(name.clone(), failure.clone());
                    debug!(worker = %name, "prefetch worker started");
                    match task(running) {
                        Ok(()) => debug!(worker = %name, "prefetch worker stopped"),
                        Err(err) => {
                            error!(worker = %name, error = %err, "prefetch worker failed");
                            failure.record(err);
                        }
                    }
                }
            })
            .map_err(|source| PrefetchError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            running,
            handle: Some(handle),
            failure,
        })
    }

    /// Whether the thread is still executing its task.
    pub(crate) fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// The failure that ended the task, if it failed.
    pub(crate) fn failure(&self) -> Option<&PrefetchError> {
        self.failure.get()
    }

    #[cfg(test)]
    /// Returns a clone of the flag that tells the task to keep running.
    pub(crate) fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Joins the thread, blocking until it exits.
    ///
    /// Only call this once the task is known to be finishing (it has stopped
    /// or dropped its end of the queue). It never asks the task to stop.
    ///
    /// Returns `true` if a thread was joined, `false` if it already had been.
    pub(crate) fn join(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        if handle.join().is_err() {
            debug!(worker = %self.name, "joined a panicked prefetch worker");
        }
        true
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Asks the task to stop and detaches the thread.
    ///
    /// The thread is never waited on here: it may be blocked inside the batch
    /// source, and it must never hold up the owner or process exit.
    pub(crate) fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if self.handle.take().is_some() {
            debug!(worker = %self.name, "detached prefetch worker");
        }
    }
}

impl Drop for PrefetchWorker {
    /// Ensures the background task is told to stop when the handle is dropped.
    fn drop(&mut self) {
        self.shutdown();
    }
}
