//! # Batch sources
//!
//! The collaborators a prefetcher consumes: the [`BatchSource`] contract, the
//! [`Dataset`] contract loaders read from, and two loaders. [`Loader`] builds a
//! new sampler pass every epoch; [`MultiEpochLoader`] keeps one sampler iterator
//! alive for as many epochs as it serves.

mod core_trait;
mod loader;
mod multi_epoch;

pub use core_trait::{BatchIter, BatchSource, Dataset};
pub use loader::Loader;
pub use multi_epoch::MultiEpochLoader;
