use std::sync::Arc;
use tracing::{trace, warn};
use crate::error::{PrefetchError, Result};
use super::{Sampler, SamplerIter};

/// # RepeatSampler
///
/// Wraps a finite sampler so iterating it never ends: each time the inner
/// sampler runs out, a new pass over it starts immediately.
///
/// Its [`len`](Sampler::len) is still the length of one pass of the inner
/// sampler. Callers bound their own consumption; a loader built on top of this
/// pulls exactly `len()` items per logical epoch from one long-lived iterator
/// instead of building a new iterator every epoch.
///
/// Pass `n` calls the inner sampler with epoch `n`, so seeded samplers reshuffle
/// on every pass while deterministic ones repeat the same sequence.
///
/// # Example
/// ```
/// use kindling::sampler::{RepeatSampler, Sampler, SequentialSampler};
///
/// let sampler = RepeatSampler::new(SequentialSampler::new(3)).unwrap();
/// let drawn: Vec<_> = sampler.repeat().take(7).collect();
/// assert_eq!(drawn, vec![0, 1, 2, 0, 1, 2, 0]);
/// assert_eq!(sampler.len(), 3);
/// ```
#[derive(Debug)]
pub struct RepeatSampler<S> {
    sampler: Arc<S>,
}

impl<S: Sampler> RepeatSampler<S> {
    /// Wrap `sampler`. An empty sampler is rejected, repeating it would spin forever.
    pub fn new(sampler: S) -> Result<Self> {
        if sampler.is_empty() {
            return Err(PrefetchError::invalid_sampler("cannot repeat an empty sampler"));
        }
        Ok(Self {
            sampler: Arc::new(sampler),
        })
    }

    /// The wrapped sampler
    pub fn inner(&self) -> &S {
        &self.sampler
    }

    /// An endless iterator starting at pass 0
    pub fn repeat(&self) -> Repeat<S> {
        Repeat::new(self.sampler.clone(), 0)
    }
}

impl<S: Sampler> Sampler for RepeatSampler<S> {
    type Item = S::Item;

    fn len(&self) -> usize {
        self.sampler.len()
    }

    fn iter(&self, epoch: usize) -> SamplerIter<S::Item> {
        Box::new(Repeat::new(self.sampler.clone(), epoch))
    }
}

/// The endless iterator handed out by a [`RepeatSampler`]
pub struct Repeat<S: Sampler> {
    sampler: Arc<S>,
    pass: usize,
    current: SamplerIter<S::Item>,
}

impl<S: Sampler> Repeat<S> {
    fn new(sampler: Arc<S>, pass: usize) -> Self {
        let current = sampler.iter(pass);
        Self {
            sampler,
            pass,
            current,
        }
    }

    /// The pass the next item comes from
    pub fn pass(&self) -> usize {
        self.pass
    }
}

impl<S: Sampler> Iterator for Repeat<S> {
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        if let Some(item) = self.current.next() {
            return Some(item);
        }

        self.pass += 1;
        trace!(pass = self.pass, "restarting sampler");
        self.current = self.sampler.iter(self.pass);

        let item = self.current.next();
        if item.is_none() {
            // a sampler that claims a length but yields nothing would spin here forever
            warn!(pass = self.pass, len = self.sampler.len(), "sampler yielded nothing on a fresh pass");
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
