//! # Prefetching
//!
//! The consumer-facing half of kindling. A [`Prefetcher`] owns one background
//! worker that stages device-resident batches into a bounded queue, and an
//! [`EpochTracker`] that cuts the endless stream of staged batches into epochs
//! of the source's length.
//!
//! ## Lifecycle
//!
//! 1. [`Prefetcher::new`] validates its configuration, opens a transfer stream
//!    on the target device and spawns the worker. The worker starts filling the
//!    queue immediately.
//! 2. Each epoch is consumed through [`Prefetcher::iter`], `&mut prefetcher` in a
//!    `for` loop, [`Prefetcher::stream`] or repeated [`Prefetcher::advance`].
//! 3. Dropping the prefetcher closes the queue and tells the worker to stop. The
//!    worker is never waited on.

mod config;
mod epoch;
mod prefetcher;
mod worker;

pub use config::PrefetchConfig;
pub use epoch::EpochTracker;
pub use prefetcher::{Epoch, EpochStream, Prefetcher};
