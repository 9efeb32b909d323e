/// Tracks how far the consumer is through the current epoch.
///
/// The epoch length is the batch count of the source, never the number of
/// batches sitting in the queue: the queue is a buffer, not a measure of how
/// many batches an epoch has.
///
/// Invariant: `0 <= idx <= len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTracker {
    idx: usize,
    len: usize,
}

impl EpochTracker {
    pub fn new(len: usize) -> Self {
        Self { idx: 0, len }
    }

    /// Batches consumed so far in this epoch
    pub fn position(&self) -> usize {
        self.idx
    }

    /// Batches per epoch
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every batch of the epoch has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.idx >= self.len
    }

    /// Count one consumed batch.
    pub fn record(&mut self) {
        debug_assert!(self.idx < self.len, "recorded a batch past the end of the epoch");
        self.idx += 1;
    }

    /// Start the next epoch from zero.
    pub fn reset(&mut self) {
        self.idx = 0;
    }
}
