//! Configuration for a [`Prefetcher`](super::Prefetcher)
//!
//! Example:
//! ```ignore
//! let config = PrefetchConfig::new(Device::new_cuda(0)?)
//!     .queue_size(4)
//!     .thread_name("train-prefetch");
//! ```
//!
//! # Memory considerations
//! - Up to `queue_size` transferred batches are resident on the device at once,
//!   plus the one the consumer is holding and the one the worker is copying.

use crate::constant::{DEFAULT_QUEUE_SIZE, DEFAULT_THREAD_NAME};
use crate::error::{PrefetchError, Result};

/// Configuration for a prefetcher on device `D`
#[derive(Debug, Clone)]
pub struct PrefetchConfig<D> {
    /// Device batches are moved to
    pub device: D,
    /// Maximum number of transferred batches waiting for the consumer (must be > 0)
    pub queue_size: usize,
    /// Name given to the worker thread
    pub thread_name: String,
}

impl<D> PrefetchConfig<D> {
    /// A configuration for `device` with the default queue size
    pub fn new(device: D) -> Self {
        Self {
            device,
            queue_size: DEFAULT_QUEUE_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Set the queue capacity.
    ///
    /// - Too low: the worker stalls whenever one batch is slow to produce.
    /// - Too high: more device memory held by batches nobody is using yet.
    pub fn queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Set the worker thread name
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Check the configuration before any resource is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(PrefetchError::invalid_config(
                "queue_size must be > 0, a zero capacity queue can never hand over a batch",
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(PrefetchError::invalid_config("thread_name must not contain NUL bytes"));
        }
        Ok(())
    }
}
