use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use crate::backend::Backend;
use crate::batch::{Batch, TransferEngine};
use crate::error::{PrefetchError, Result};
use crate::source::BatchSource;
use super::config::PrefetchConfig;
use super::epoch::EpochTracker;
use super::worker::PrefetchWorker;

type DeviceOf<S> = <<S as BatchSource>::Tensor as Backend>::Device;

/// # Prefetcher
///
/// Wraps a [`BatchSource`] so batches arrive on the target device ahead of the
/// training loop that consumes them.
///
/// A single background worker walks the source pass after pass, moves each
/// batch to the device and parks it in a bounded queue. The worker blocks while
/// the queue is full, which is the only flow control: at most `queue_size`
/// transferred batches wait for the consumer.
///
/// The consumer sees epochs of exactly [`len`](Self::len) batches. An epoch ends
/// with `None` and the next call starts the following epoch, reading straight
/// on from the queue.
///
/// If the worker dies (the source fails, a transfer fails, or it panics) the
/// batches it already queued are still delivered, then the epoch ends early and
/// every later epoch is empty. What ended the worker is available from
/// [`failure`](Self::failure).
///
/// ## Example
/// ```ignore
/// let mut prefetcher = Prefetcher::new(loader, Device::new_cuda(0)?, 2)?;
/// for epoch in 0..epochs {
///     for batch in &mut prefetcher {
///         let input = batch.get("input").and_then(Batch::as_tensor);
///         // ...
///     }
///     if let Some(err) = prefetcher.failure() {
///         return Err(err.to_string().into());
///     }
/// }
/// ```
///
/// Blocking calls ([`advance`](Self::advance) and the [`Epoch`] iterator) must
/// not be made from inside an async runtime; use [`stream`](Self::stream) there.
pub struct Prefetcher<S: BatchSource> {
    /// Declared first so dropping the prefetcher closes the queue before the
    /// worker is told to stop, releasing a worker blocked on a full queue.
    queue: mpsc::Receiver<Batch<S::Tensor>>,
    worker: PrefetchWorker,
    source: Arc<S>,
    tracker: EpochTracker,
    device: DeviceOf<S>,
    queue_size: usize,
}

impl<S: BatchSource> Prefetcher<S> {
    /// Start prefetching `source` onto `device` with room for `queue_size`
    /// batches.
    ///
    /// # Errors
    /// - [`PrefetchError::InvalidConfig`] if `queue_size` is 0
    /// - [`PrefetchError::Stream`] if no transfer stream can be opened on `device`
    /// - [`PrefetchError::Spawn`] if the worker thread cannot be started
    pub fn new(source: S, device: DeviceOf<S>, queue_size: usize) -> Result<Self> {
        Self::with_config(source, PrefetchConfig::new(device).queue_size(queue_size))
    }

    /// Start prefetching `source` as described by `config`.
    pub fn with_config(source: S, config: PrefetchConfig<DeviceOf<S>>) -> Result<Self> {
        config.validate()?;

        let engine = TransferEngine::<S::Tensor>::new(config.device.clone())?;
        let (sender, queue) = mpsc::channel(config.queue_size);
        let source = Arc::new(source);

        let worker = PrefetchWorker::spawn(config.thread_name.clone(), {
            let source = source.clone();
            move |running| production_loop(source.as_ref(), &engine, &sender, &running)
        })?;

        debug!(
            worker = %config.thread_name,
            device = ?config.device,
            queue_size = config.queue_size,
            batches = source.len(),
            "prefetcher started"
        );

        Ok(Self {
            queue,
            worker,
            tracker: EpochTracker::new(source.len()),
            source,
            device: config.device,
            queue_size: config.queue_size,
        })
    }

    /// Hand over the next batch of the current epoch, blocking until the worker
    /// has one ready.
    ///
    /// Returns `None` once the epoch is complete or when the worker has ended
    /// and nothing is left in the queue. Either way the epoch position goes back
    /// to zero, so the next call begins a new epoch.
    pub fn advance(&mut self) -> Option<Batch<S::Tensor>> {
        if !self.worker.is_alive() && self.queue.is_empty() {
            return self.finish_abnormally();
        }
        if self.tracker.is_exhausted() {
            self.tracker.reset();
            return None;
        }

        match self.queue.blocking_recv() {
            Some(batch) => {
                self.tracker.record();
                Some(batch)
            }
            // the worker went away while we were waiting
            None => self.finish_abnormally(),
        }
    }

    /// Non-blocking counterpart of [`advance`](Self::advance), for async consumers.
    pub fn poll_advance(&mut self, cx: &mut Context<'_>) -> Poll<Option<Batch<S::Tensor>>> {
        if !self.worker.is_alive() && self.queue.is_empty() {
            return Poll::Ready(self.finish_abnormally());
        }
        if self.tracker.is_exhausted() {
            self.tracker.reset();
            return Poll::Ready(None);
        }

        match ready!(self.queue.poll_recv(cx)) {
            Some(batch) => {
                self.tracker.record();
                Poll::Ready(Some(batch))
            }
            None => Poll::Ready(self.finish_abnormally()),
        }
    }

    fn finish_abnormally(&mut self) -> Option<Batch<S::Tensor>> {
        let position = self.tracker.position();
        self.tracker.reset();

        // the worker has already dropped its sender; joining makes sure its
        // failure, if any, has been recorded before we read it
        if self.worker.join() {
            match self.worker.failure() {
                Some(failure) => warn!(
                    worker = %self.worker.name(),
                    error = %failure,
                    position,
                    len = self.tracker.len(),
                    "prefetch worker died, ending epoch early"
                ),
                None => debug!(worker = %self.worker.name(), position, "prefetch worker finished"),
            }
        }
        None
    }

    /// Start a new epoch and iterate it, blocking for each batch.
    pub fn iter(&mut self) -> Epoch<'_, S> {
        self.tracker.reset();
        Epoch { prefetcher: self }
    }

    /// Start a new epoch and consume it as a [`Stream`].
    pub fn stream(&mut self) -> EpochStream<'_, S> {
        self.tracker.reset();
        EpochStream { prefetcher: self }
    }

    /// Batches per epoch
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Batches handed over so far in the current epoch
    pub fn position(&self) -> usize {
        self.tracker.position()
    }

    pub fn tracker(&self) -> &EpochTracker {
        &self.tracker
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sampler(&self) -> &S::Sampler {
        self.source.sampler()
    }

    pub fn dataset(&self) -> &S::Dataset {
        self.source.dataset()
    }

    pub fn device(&self) -> &DeviceOf<S> {
        &self.device
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    /// Transferred batches currently waiting in the queue
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    /// What ended the worker, once it has ended because of a failure.
    ///
    /// Populated by the time an epoch has been cut short by the worker's death.
    pub fn failure(&self) -> Option<&PrefetchError> {
        self.worker.failure()
    }

    pub fn is_worker_alive(&self) -> bool {
        self.worker.is_alive()
    }
}

/// Body of the worker thread: pass after pass over the source until told to
/// stop, until the consumer goes away, or until something fails.
fn production_loop<S: BatchSource>(
    source: &S,
    engine: &TransferEngine<S::Tensor>,
    sender: &mpsc::Sender<Batch<S::Tensor>>,
    running: &AtomicBool,
) -> Result<()> {
    let mut pass = 0usize;

    while running.load(Ordering::SeqCst) {
        let mut produced = 0usize;

        for raw in source.iter() {
            let batch = engine.transfer(raw.map_err(PrefetchError::Source)?)?;
            if sender.blocking_send(batch).is_err() {
                debug!(pass, "queue closed, prefetch worker stopping");
                return Ok(());
            }
            produced += 1;

            if !running.load(Ordering::SeqCst) {
                return Ok(());
            }
        }

        if produced == 0 {
            warn!(pass, "batch source produced no batches, prefetch worker stopping");
            return Ok(());
        }
        trace!(pass, batches = produced, "pass complete");
        pass += 1;
    }

    Ok(())
}

/// One epoch of a [`Prefetcher`], as a blocking iterator.
///
/// The iterator is not fused: calling `next` after it returned `None` starts
/// the following epoch.
pub struct Epoch<'a, S: BatchSource> {
    prefetcher: &'a mut Prefetcher<S>,
}

impl<S: BatchSource> Iterator for Epoch<'_, S> {
    type Item = Batch<S::Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        self.prefetcher.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let tracker = self.prefetcher.tracker();
        (0, Some(tracker.len() - tracker.position()))
    }
}

impl<'a, S: BatchSource> IntoIterator for &'a mut Prefetcher<S> {
    type Item = Batch<S::Tensor>;
    type IntoIter = Epoch<'a, S>;

    fn into_iter(self) -> Epoch<'a, S> {
        self.iter()
    }
}

/// One epoch of a [`Prefetcher`], as an async stream.
pub struct EpochStream<'a, S: BatchSource> {
    prefetcher: &'a mut Prefetcher<S>,
}

impl<S: BatchSource> Stream for EpochStream<'_, S> {
    type Item = Batch<S::Tensor>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().prefetcher.poll_advance(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use crate::backend::mock_tensor::{MockDevice, MockTensor};
    use crate::batch::Scalar;
    use crate::sampler::{BatchSampler, Sampler, SequentialSampler};
    use crate::source::MultiEpochLoader;
    use crate::testing::{batch_id, values, IndexDataset, VecSource};

    fn ids<I: IntoIterator<Item = Batch<MockTensor>>>(batches: I) -> Vec<i64> {
        batches.into_iter().map(|b| batch_id(&b)).collect()
    }

    fn prefetcher(source: VecSource, queue_size: usize) -> Prefetcher<VecSource> {
        Prefetcher::new(source, MockDevice::Accelerator(0), queue_size).unwrap()
    }

    #[test]
    fn test_epochs_deliver_every_batch_on_device() {
        let mut prefetcher = prefetcher(VecSource::numbered(5), 2);

        for _ in 0..3 {
            let epoch: Vec<_> = prefetcher.iter().collect();
            assert_eq!(ids(epoch.iter().cloned()), vec![0, 1, 2, 3, 4]);
            for batch in &epoch {
                let x = batch.get("x").and_then(Batch::as_tensor).unwrap();
                assert!(x.is_on(MockDevice::Accelerator(0)));
                assert_eq!(x.shape, vec![2, 3]);
            }
            assert_eq!(prefetcher.position(), 0);
        }
        assert!(prefetcher.failure().is_none());
    }

    #[test]
    fn test_advance_ends_epoch_and_restarts() {
        let mut prefetcher = prefetcher(VecSource::numbered(5), 2);

        for expected in 0..5 {
            let batch = prefetcher.advance().unwrap();
            assert_eq!(batch_id(&batch), expected);
            assert_eq!(prefetcher.position(), expected as usize + 1);
        }

        assert!(prefetcher.advance().is_none());
        assert_eq!(prefetcher.position(), 0);

        let batch = prefetcher.advance().unwrap();
        assert_eq!(batch_id(&batch), 0);
    }

    #[test]
    fn test_fifo_for_any_queue_size() {
        for len in 1..=6 {
            for queue_size in 1..=3 {
                let mut prefetcher = prefetcher(VecSource::numbered(len), queue_size);
                let expected: Vec<i64> = (0..len as i64).collect();

                assert_eq!(ids(&mut prefetcher), expected, "len {} queue {}", len, queue_size);
                assert_eq!(ids(&mut prefetcher), expected, "len {} queue {}", len, queue_size);
            }
        }
    }

    #[test]
    fn test_worker_blocks_on_full_queue() {
        let mut prefetcher = prefetcher(VecSource::numbered(10), 2);

        thread::sleep(Duration::from_millis(100));

        // two queued plus the one the worker is trying to push
        assert!(prefetcher.source().pulled() <= 3);
        assert!(prefetcher.buffered() <= 2);
        assert!(prefetcher.is_worker_alive());

        assert_eq!(ids(&mut prefetcher), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_abandoned_epoch_continues_from_queue() {
        let mut prefetcher = prefetcher(VecSource::numbered(5), 2);

        let partial = ids(prefetcher.iter().take(2));
        assert_eq!(partial, vec![0, 1]);

        // a new epoch counts from zero but reads on from where the queue is
        assert_eq!(ids(&mut prefetcher), vec![2, 3, 4, 0, 1]);
    }

    #[test]
    fn test_source_failure_ends_epoch_after_queued_batches() {
        let mut prefetcher = prefetcher(VecSource::numbered(5).failing_at(3), 2);

        assert_eq!(ids(&mut prefetcher), vec![0, 1, 2]);
        assert_eq!(prefetcher.position(), 0);
        assert!(!prefetcher.is_worker_alive());
        assert!(matches!(prefetcher.failure(), Some(PrefetchError::Source(_))));

        // every later epoch is empty
        assert!(prefetcher.advance().is_none());
        assert_eq!(ids(&mut prefetcher), Vec::<i64>::new());
    }

    #[test]
    fn test_worker_panic_is_captured() {
        let config = PrefetchConfig::new(MockDevice::Accelerator(1))
            .queue_size(1)
            .thread_name("panicky-prefetch");
        let mut prefetcher = Prefetcher::with_config(VecSource::numbered(4).panicking_at(2), config).unwrap();

        assert_eq!(ids(&mut prefetcher), vec![0, 1]);
        match prefetcher.failure() {
            Some(PrefetchError::WorkerPanicked { name }) => assert_eq!(name, "panicky-prefetch"),
            other => panic!("expected a captured panic, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_failure_is_captured() {
        let source = VecSource::new(vec![
            Batch::map([
                ("id", Batch::Scalar(Scalar::Int(0))),
                ("x", Batch::Tensor(MockTensor::new(vec![1], 0))),
            ]),
            Batch::map([
                ("id", Batch::Scalar(Scalar::Int(1))),
                ("x", Batch::Tensor(MockTensor::poisoned(vec![1], 1))),
            ]),
        ]);
        let mut prefetcher = prefetcher(source, 2);

        assert_eq!(ids(&mut prefetcher), vec![0]);
        assert!(matches!(prefetcher.failure(), Some(PrefetchError::Transfer(_))));
    }

    #[test]
    fn test_empty_source_ends_every_epoch() {
        let mut prefetcher = prefetcher(VecSource::numbered(0), 2);

        assert!(prefetcher.is_empty());
        assert!(prefetcher.advance().is_none());
        assert!(prefetcher.advance().is_none());
        assert!(prefetcher.failure().is_none());
    }

    #[test]
    fn test_missing_device_rejected() {
        let result = Prefetcher::new(VecSource::numbered(3), MockDevice::Accelerator(64), 2);
        assert!(matches!(result, Err(PrefetchError::Stream { .. })));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let result = Prefetcher::new(VecSource::numbered(3), MockDevice::Accelerator(0), 0);
        assert!(matches!(result, Err(PrefetchError::InvalidConfig { .. })));
    }

    #[test]
    fn test_accessors_pass_through() {
        let prefetcher = prefetcher(VecSource::numbered(4), 3);

        assert_eq!(prefetcher.len(), 4);
        assert_eq!(prefetcher.sampler().len(), 4);
        assert_eq!(prefetcher.dataset().len(), 4);
        assert_eq!(prefetcher.device(), &MockDevice::Accelerator(0));
        assert_eq!(prefetcher.queue_size(), 3);
        assert_eq!(prefetcher.tracker().len(), 4);
    }

    #[test]
    fn test_size_hint_counts_down() {
        let mut prefetcher = prefetcher(VecSource::numbered(3), 2);
        let mut epoch = prefetcher.iter();

        assert_eq!(epoch.size_hint(), (0, Some(3)));
        epoch.next();
        assert_eq!(epoch.size_hint(), (0, Some(2)));
    }

    #[test]
    fn test_drop_mid_epoch_releases_worker() {
        let mut prefetcher = prefetcher(VecSource::numbered(50), 1);
        prefetcher.advance();
        drop(prefetcher);
    }

    #[test]
    fn test_multi_epoch_loader_through_prefetcher() {
        let sampler = BatchSampler::new(SequentialSampler::new(6), 2, false).unwrap();
        let loader = MultiEpochLoader::new(IndexDataset::new(6), sampler).unwrap();
        let mut prefetcher = Prefetcher::new(loader, MockDevice::Accelerator(1), 2).unwrap();

        for _ in 0..3 {
            let epoch: Vec<_> = prefetcher.iter().collect();
            let indices: Vec<_> = epoch.iter().map(values).collect();
            assert_eq!(indices, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);

            for batch in &epoch {
                let features = batch.get("features").and_then(Batch::as_tensor).unwrap();
                assert!(features.is_on(MockDevice::Accelerator(1)));
            }
        }
    }

    #[tokio::test]
    async fn test_stream_yields_one_epoch() {
        use futures::StreamExt;

        let mut prefetcher = prefetcher(VecSource::numbered(4), 2);

        let first: Vec<_> = prefetcher.stream().collect().await;
        let second: Vec<_> = prefetcher.stream().collect().await;

        assert_eq!(ids(first), vec![0, 1, 2, 3]);
        assert_eq!(ids(second), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_stream_ends_early_on_failure() {
        use futures::StreamExt;

        let mut prefetcher = prefetcher(VecSource::numbered(4).failing_at(1), 2);

        let mut stream = prefetcher.stream();
        let mut seen = Vec::new();
        while let Some(batch) = stream.next().await {
            seen.push(batch_id(&batch));
        }

        assert_eq!(seen, vec![0]);
        assert!(matches!(prefetcher.failure(), Some(PrefetchError::Source(_))));
    }
}
