//! # Kindling
//!
//! Background device prefetching for multi-epoch training loops.
//!
//! ## Overview
//!
//! A training loop that reads a batch, copies it to the accelerator and only then
//! computes leaves the accelerator idle during every read and copy. Kindling
//! moves both off the training thread: a worker reads batches from a
//! [`BatchSource`](source::BatchSource), copies their tensors to the target
//! device and keeps a small bounded queue of ready batches, so the training loop
//! only ever takes a batch that is already on the device.
//!
//! Key components include:
//!
//! - [`Prefetcher`], the background pipeline and its epoch-by-epoch consumer API
//! - [`TransferEngine`], which moves the tensor leaves of a nested [`Batch`]
//! - [`EpochTracker`], which marks where one epoch ends and the next begins
//! - [`RepeatSampler`](sampler::RepeatSampler) and
//!   [`MultiEpochLoader`](source::MultiEpochLoader), which keep one sampler
//!   iterator alive across every epoch
//!
//! ## Architecture
//!
//! ### Backend Trait
//!
//! The [`Backend`](backend::Backend) trait is the only thing kindling needs from a
//! tensor library: which device a tensor is on, how to open a transfer stream on
//! a device and how to copy a tensor through it. Everything else is
//! backend-agnostic.
//!
//! ### Batches
//!
//! Batches are arbitrarily nested [`Batch`] values. Transfer preserves their
//! shape exactly, replacing only tensor leaves.
//!
//! ### Epochs
//!
//! The worker runs over the source pass after pass without pausing at epoch
//! boundaries. The consumer side counts batches against the source's length and
//! ends an epoch after exactly that many.
//!
//! ## Features
//!
//! - **candle** - Enables candle backend
//! - **burn** - Enables burn backend
//!
//! ## Failures
//!
//! Construction errors are returned directly. Errors on the worker end the
//! current epoch early once the already-staged batches are consumed, and are
//! kept for inspection through [`Prefetcher::failure`].

mod communication;

pub mod backend;
pub mod batch;
pub mod constant;
pub mod error;
pub mod prefetch;
pub mod sampler;
pub mod source;

#[cfg(test)]
mod testing;

pub use batch::{Batch, Scalar, TransferEngine};
pub use error::{BoxError, PrefetchError, Result};
pub use prefetch::{Epoch, EpochStream, EpochTracker, PrefetchConfig, Prefetcher};
