//! Error types for kindling
//!
//! Construction failures surface directly from constructors. Failures on the
//! prefetch worker never cross the queue; they are recorded in the worker's
//! failure cell and show up as an early end of epoch.

use thiserror::Error;

/// Boxed error produced by external collaborators (datasets, batch sources).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for all kindling operations
#[derive(Debug, Error)]
pub enum PrefetchError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A sampler cannot be used as requested
    #[error("Invalid sampler: {reason}")]
    InvalidSampler { reason: String },

    /// A transfer stream could not be opened on the target device
    #[error("Failed to open transfer stream on {device}: {source}")]
    Stream {
        device: String,
        #[source]
        source: BoxError,
    },

    /// Copying a tensor leaf to the target device failed
    #[error("Device transfer failed: {0}")]
    Transfer(#[source] BoxError),

    /// The prefetch worker thread could not be spawned
    #[error("Failed to spawn prefetch worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The underlying batch source failed while producing a batch
    #[error("Batch source failed: {0}")]
    Source(#[source] BoxError),

    /// The prefetch worker thread panicked
    #[error("Prefetch worker {name} panicked")]
    WorkerPanicked { name: String },
}

impl PrefetchError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }

    pub(crate) fn invalid_sampler(reason: impl Into<String>) -> Self {
        Self::InvalidSampler { reason: reason.into() }
    }

    /// Wrap a backend error raised while copying a tensor.
    pub fn transfer<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transfer(err.into())
    }

    /// Wrap a backend error raised while opening a stream on `device`.
    pub fn stream<D, E>(device: &D, err: E) -> Self
    where
        D: std::fmt::Debug,
        E: Into<BoxError>,
    {
        Self::Stream {
            device: format!("{:?}", device),
            source: err.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = PrefetchError> = std::result::Result<T, E>;
