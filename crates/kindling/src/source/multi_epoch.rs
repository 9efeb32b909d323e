use parking_lot::Mutex;
use crate::error::Result;
use crate::sampler::{Repeat, RepeatSampler, Sampler};
use super::{BatchIter, BatchSource, Dataset};

/// # MultiEpochLoader
///
/// A long-lived loader that never tears its sampling machinery down between
/// epochs.
///
/// The batch sampler is wrapped in a [`RepeatSampler`] and a single endless
/// iterator over it is built at construction. Every epoch then pulls exactly
/// `len()` index batches from that same iterator, so whatever per-pass setup the
/// sampler has is paid once per pass and never for rebuilding the iterator.
///
/// # Example
/// ```ignore
/// let sampler = BatchSampler::new(RandomSampler::new(dataset.len(), false, None, 42)?, 32, true)?;
/// let loader = MultiEpochLoader::new(dataset, sampler)?;
/// let mut prefetcher = Prefetcher::new(loader, Device::new_cuda(0)?, 2)?;
///
/// for epoch in 0..epochs {
///     for batch in &mut prefetcher {
///         // train on batch
///     }
/// }
/// ```
pub struct MultiEpochLoader<D, S: Sampler> {
    dataset: D,
    batch_sampler: RepeatSampler<S>,
    /// The one persistent iterator, shared with whichever pass is running
    indices: Mutex<Repeat<S>>,
}

impl<D, S> MultiEpochLoader<D, S>
where
    D: Dataset,
    S: Sampler<Item = Vec<usize>>,
{
    /// Build the loader and its persistent iterator.
    ///
    /// Fails if `batch_sampler` is empty.
    pub fn new(dataset: D, batch_sampler: S) -> Result<Self> {
        let batch_sampler = RepeatSampler::new(batch_sampler)?;
        let indices = Mutex::new(batch_sampler.repeat());
        Ok(Self {
            dataset,
            batch_sampler,
            indices,
        })
    }

    /// Number of sampler passes started by the persistent iterator
    pub fn passes(&self) -> usize {
        self.indices.lock().pass() + 1
    }
}

impl<D, S> BatchSource for MultiEpochLoader<D, S>
where
    D: Dataset,
    S: Sampler<Item = Vec<usize>>,
{
    type Tensor = D::Tensor;
    type Sampler = RepeatSampler<S>;
    type Dataset = D;

    /// One pass of the wrapped batch sampler
    fn len(&self) -> usize {
        self.batch_sampler.len()
    }

    fn iter(&self) -> BatchIter<'_, D::Tensor> {
        Box::new((0..self.len()).map_while(move |_| {
            let indices = self.indices.lock().next()?;
            Some(self.dataset.fetch(&indices))
        }))
    }

    fn sampler(&self) -> &RepeatSampler<S> {
        &self.batch_sampler
    }

    fn dataset(&self) -> &D {
        &self.dataset
    }
}
