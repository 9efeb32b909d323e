//! # Samplers
//!
//! A [`Sampler`] decides the order in which dataset indices are drawn. Samplers
//! here are the minimal set a loader needs: sequential order, seeded shuffles and
//! grouping into batches, plus the [`RepeatSampler`] that turns any of them into
//! an endless sequence of passes.

mod repeat;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use crate::error::{PrefetchError, Result};

pub use repeat::{Repeat, RepeatSampler};

/// An owned, sendable iterator over sampled items
pub type SamplerIter<T> = Box<dyn Iterator<Item = T> + Send>;

/// A `Sampler` defines the strategy for how to iterate and draw samples from
/// a dataset.
///
/// # Method
/// - `iter(epoch)`: returns the sequence for that epoch. Seeded samplers derive
///   their shuffle from the epoch so every epoch differs but stays reproducible.
/// - `len()`: the number of items one call to `iter` yields.
///
/// The iterator returned by `iter` owns everything it needs, so it can outlive
/// the borrow of the sampler and be kept across epochs.
pub trait Sampler: Send + Sync + 'static {
    type Item: Send + 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self, epoch: usize) -> SamplerIter<Self::Item>;
}

/// Yields indices sequentially in order `(0,1,2,...,dataset_size-1)`.
///
/// # Examples
/// ```
/// use kindling::sampler::{Sampler, SequentialSampler};
///
/// let sampler = SequentialSampler::new(5);
/// let indices: Vec<_> = sampler.iter(0).collect();
/// assert_eq!(indices, vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }
}

impl Sampler for SequentialSampler {
    type Item = usize;

    fn len(&self) -> usize {
        self.dataset_size
    }

    fn iter(&self, _epoch: usize) -> SamplerIter<usize> {
        Box::new(0..self.dataset_size)
    }
}

/// Random uniform sampling over `0..dataset_size`, with optional replacement.
///
/// # Arguments:
/// - `dataset_size`: Total number of samples in a dataset.
/// - `replacement`: If `true`, each draw is independent and indices may repeat.
/// - `num_samples`: Number of samples per epoch, defaults to `dataset_size`.
///   Without replacement it may not exceed `dataset_size`.
/// - `base_seed`: Base RNG seed. Epoch `e` draws from `base_seed + e`.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    dataset_size: usize,
    replacement: bool,
    num_samples: usize,
    base_seed: u64,
}

impl RandomSampler {
    pub fn new(
        dataset_size: usize,
        replacement: bool,
        num_samples: Option<usize>,
        base_seed: u64,
    ) -> Result<Self> {
        let num_samples = num_samples.unwrap_or(dataset_size);
        if num_samples == 0 || dataset_size == 0 {
            return Err(PrefetchError::invalid_sampler(format!(
                "cannot draw {} samples from a dataset of size {}",
                num_samples, dataset_size
            )));
        }
        if !replacement && num_samples > dataset_size {
            return Err(PrefetchError::invalid_sampler(format!(
                "num_samples ({}) exceeds dataset size ({}) without replacement",
                num_samples, dataset_size
            )));
        }

        Ok(Self {
            dataset_size,
            replacement,
            num_samples,
            base_seed,
        })
    }

    #[inline]
    fn rng_for_epoch(&self, epoch: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(epoch as u64))
    }
}

impl Sampler for RandomSampler {
    type Item = usize;

    fn len(&self) -> usize {
        self.num_samples
    }

    fn iter(&self, epoch: usize) -> SamplerIter<usize> {
        let mut rng = self.rng_for_epoch(epoch);
        if self.replacement {
            let dataset_size = self.dataset_size;
            Box::new((0..self.num_samples).map(move |_| rng.random_range(0..dataset_size)))
        } else {
            let mut indices: Vec<_> = (0..self.dataset_size).collect();
            indices.shuffle(&mut rng);
            indices.truncate(self.num_samples);
            Box::new(indices.into_iter())
        }
    }
}

/// Wraps another sampler to yield mini-batches of items.
///
/// If `drop_last` is `true`, a final mini-batch smaller than `batch_size` is
/// discarded.
///
/// # Example
/// ```
/// use kindling::sampler::{BatchSampler, Sampler, SequentialSampler};
///
/// let sampler = BatchSampler::new(SequentialSampler::new(5), 2, false).unwrap();
/// assert_eq!(sampler.len(), 3);
/// assert_eq!(sampler.iter(0).last(), Some(vec![4]));
/// ```
#[derive(Debug, Clone)]
pub struct BatchSampler<S> {
    sampler: S,
    batch_size: usize,
    drop_last: bool,
}

impl<S: Sampler> BatchSampler<S> {
    pub fn new(sampler: S, batch_size: usize, drop_last: bool) -> Result<Self> {
        if batch_size == 0 {
            return Err(PrefetchError::invalid_sampler("batch_size must be > 0"));
        }
        Ok(Self {
            sampler,
            batch_size,
            drop_last,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<S: Sampler> Sampler for BatchSampler<S> {
    type Item = Vec<S::Item>;

    fn len(&self) -> usize {
        if self.drop_last {
            self.sampler.len() / self.batch_size
        } else {
            self.sampler.len().div_ceil(self.batch_size)
        }
    }

    fn iter(&self, epoch: usize) -> SamplerIter<Self::Item> {
        let mut items = self.sampler.iter(epoch);
        let batch_size = self.batch_size;
        let drop_last = self.drop_last;

        Box::new(std::iter::from_fn(move || {
            let mini_batch: Vec<_> = items.by_ref().take(batch_size).collect();
            if mini_batch.len() == batch_size || (!drop_last && !mini_batch.is_empty()) {
                Some(mini_batch)
            } else {
                None
            }
        }))
    }
}
