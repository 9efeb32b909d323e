use std::sync::atomic::{AtomicUsize, Ordering};
use crate::sampler::Sampler;
use super::{BatchIter, BatchSource, Dataset};

/// A plain single-epoch loader over a dataset and a batch sampler.
///
/// Every call to [`BatchSource::iter`] starts a fresh sampler pass with the next
/// epoch number, so seeded samplers reshuffle every epoch.
pub struct Loader<D, S> {
    dataset: D,
    batch_sampler: S,
    epoch: AtomicUsize,
}

impl<D, S> Loader<D, S>
where
    D: Dataset,
    S: Sampler<Item = Vec<usize>>,
{
    pub fn new(dataset: D, batch_sampler: S) -> Self {
        Self {
            dataset,
            batch_sampler,
            epoch: AtomicUsize::new(0),
        }
    }

    /// Number of passes started so far
    pub fn epoch(&self) -> usize {
        self.epoch.load(Ordering::SeqCst)
    }
}

impl<D, S> BatchSource for Loader<D, S>
where
    D: Dataset,
    S: Sampler<Item = Vec<usize>>,
{
    type Tensor = D::Tensor;
    type Sampler = S;
    type Dataset = D;

    fn len(&self) -> usize {
        self.batch_sampler.len()
    }

    fn iter(&self) -> BatchIter<'_, D::Tensor> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst);
        Box::new(
            self.batch_sampler
                .iter(epoch)
                .map(move |indices| self.dataset.fetch(&indices)),
        )
    }

    fn sampler(&self) -> &S {
        &self.batch_sampler
    }

    fn dataset(&self) -> &D {
        &self.dataset
    }
}
