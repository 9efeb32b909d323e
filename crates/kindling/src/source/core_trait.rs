use crate::backend::Backend;
use crate::batch::Batch;
use crate::error::BoxError;

/// An owned-or-borrowing iterator over the raw batches of one epoch
pub type BatchIter<'a, T> = Box<dyn Iterator<Item = Result<Batch<T>, BoxError>> + Send + 'a>;

/// # Dataset
///
/// Random access to samples, already collated into a batch.
///
/// Reading samples from storage and collating them is entirely up to the
/// implementor; loaders only hand over the indices to gather.
pub trait Dataset: Send + Sync + 'static {
    /// The tensor type batches are built from
    type Tensor: Backend;

    /// Number of samples in the dataset
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather the samples at `indices` into one batch
    fn fetch(&self, indices: &[usize]) -> Result<Batch<Self::Tensor>, BoxError>;
}

/// # BatchSource
///
/// Anything a [`Prefetcher`](crate::prefetch::Prefetcher) can stage batches from:
/// a finite, restartable sequence of pre-collated batches of known length.
///
/// `iter` is called from the prefetch worker thread, once per pass, while the
/// consumer may read `sampler` and `dataset` concurrently, hence `Sync`.
pub trait BatchSource: Send + Sync + 'static {
    /// The tensor type of the batches produced
    type Tensor: Backend;

    /// The sampler the source draws batches with
    type Sampler;

    /// The dataset the source reads from
    type Dataset;

    /// Number of batches in one epoch
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new pass over the batches of one epoch
    fn iter(&self) -> BatchIter<'_, Self::Tensor>;

    fn sampler(&self) -> &Self::Sampler;

    fn dataset(&self) -> &Self::Dataset;
}
