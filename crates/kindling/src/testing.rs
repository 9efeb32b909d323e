//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use crate::backend::mock_tensor::MockTensor;
use crate::batch::{Batch, Scalar};
use crate::error::BoxError;
use crate::sampler::SequentialSampler;
use crate::source::{BatchIter, BatchSource, Dataset};

/// A dataset of `len` samples whose batches record which indices they hold.
pub(crate) struct IndexDataset {
    len: usize,
}

impl IndexDataset {
    pub(crate) fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Dataset for IndexDataset {
    type Tensor = MockTensor;

    fn len(&self) -> usize {
        self.len
    }

    fn fetch(&self, indices: &[usize]) -> Result<Batch<MockTensor>, BoxError> {
        if let Some(bad) = indices.iter().find(|&&i| i >= self.len) {
            return Err(format!("index {} out of range for {} samples", bad, self.len).into());
        }
        let first = indices.first().copied().unwrap_or_default() as i32;
        Ok(Batch::map([
            (
                "indices",
                Batch::Tuple(
                    indices
                        .iter()
                        .map(|&i| Batch::Scalar(Scalar::Int(i as i64)))
                        .collect(),
                ),
            ),
            ("features", Batch::Tensor(MockTensor::new(vec![indices.len(), 4], first))),
        ]))
    }
}

/// The sample indices carried by a batch built by [`IndexDataset`].
pub(crate) fn values(batch: &Batch<MockTensor>) -> Vec<usize> {
    match batch.get("indices") {
        Some(Batch::Tuple(items)) => items
            .iter()
            .filter_map(|item| match item {
                Batch::Scalar(Scalar::Int(i)) => Some(*i as usize),
                _ => None,
            })
            .collect(),
        other => panic!("not an index batch: {:?}", other),
    }
}

/// The id of a batch built by [`VecSource::numbered`].
pub(crate) fn batch_id(batch: &Batch<MockTensor>) -> i64 {
    match batch.get("id") {
        Some(Batch::Scalar(Scalar::Int(id))) => *id,
        other => panic!("not a numbered batch: {:?}", other),
    }
}

/// A batch source replaying a fixed list of batches every pass.
///
/// It can be told to fail or panic when it reaches a given batch, and counts
/// how many batches the worker has pulled from it across all passes.
pub(crate) struct VecSource {
    batches: Vec<Batch<MockTensor>>,
    sampler: SequentialSampler,
    fail_at: Option<usize>,
    panic_at: Option<usize>,
    pulled: AtomicUsize,
}

impl VecSource {
    pub(crate) fn new(batches: Vec<Batch<MockTensor>>) -> Self {
        Self {
            sampler: SequentialSampler::new(batches.len()),
            batches,
            fail_at: None,
            panic_at: None,
            pulled: AtomicUsize::new(0),
        }
    }

    /// `len` batches, batch `i` holding id `i` and a `[2, 3]` tensor of value `i`.
    pub(crate) fn numbered(len: usize) -> Self {
        Self::new(
            (0..len)
                .map(|i| {
                    Batch::map([
                        ("id", Batch::Scalar(Scalar::Int(i as i64))),
                        ("x", Batch::Tensor(MockTensor::new(vec![2, 3], i as i32))),
                    ])
                })
                .collect(),
        )
    }

    pub(crate) fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub(crate) fn panicking_at(mut self, index: usize) -> Self {
        self.panic_at = Some(index);
        self
    }

    /// Batches handed to the worker so far, over every pass
    pub(crate) fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

impl BatchSource for VecSource {
    type Tensor = MockTensor;
    type Sampler = SequentialSampler;
    type Dataset = Vec<Batch<MockTensor>>;

    fn len(&self) -> usize {
        self.batches.len()
    }

    fn iter(&self) -> BatchIter<'_, MockTensor> {
        Box::new(self.batches.iter().enumerate().map(move |(i, batch)| {
            self.pulled.fetch_add(1, Ordering::SeqCst);
            if self.panic_at == Some(i) {
                panic!("batch source panicked at batch {}", i);
            }
            if self.fail_at == Some(i) {
                return Err(format!("batch source failed at batch {}", i).into());
            }
            Ok(batch.clone())
        }))
    }

    fn sampler(&self) -> &SequentialSampler {
        &self.sampler
    }

    fn dataset(&self) -> &Vec<Batch<MockTensor>> {
        &self.batches
    }
}
