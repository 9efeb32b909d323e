use std::collections::BTreeMap;
use tracing::debug;
use crate::backend::Backend;
use crate::error::Result;
use super::Batch;

/// Moves the tensor leaves of a [`Batch`] to a device through a dedicated
/// transfer stream.
///
/// The engine owns its stream. It lives on the prefetch worker thread and is
/// never touched by the consumer.
///
/// # Transfer policy
///
/// Variants are handled as follows:
///
/// 1. [`Batch::Tensor`] is copied to the device with a non-blocking copy
/// 2. [`Batch::None`], [`Batch::Str`] and [`Batch::List`] are returned as-is.
///    A `List` is not recursed into, so tensors held directly in a list stay
///    where they are
/// 3. [`Batch::Map`] is rebuilt entry by entry with the same keys
/// 4. [`Batch::Tuple`] is rebuilt element by element
///
/// [`Batch::Scalar`] leaves are returned as-is.
pub struct TransferEngine<T: Backend> {
    device: T::Device,
    stream: T::Stream,
}

impl<T: Backend> TransferEngine<T> {
    /// Open a transfer stream on `device`.
    pub fn new(device: T::Device) -> Result<Self> {
        let stream = T::transfer_stream(&device)?;
        debug!(device = ?device, "opened transfer stream");
        Ok(Self { device, stream })
    }

    /// The device tensors are moved to
    pub fn device(&self) -> &T::Device {
        &self.device
    }

    /// Return `batch` with its tensor leaves moved to the engine's device.
    ///
    /// Fails on the first tensor that cannot be copied.
    pub fn transfer(&self, batch: Batch<T>) -> Result<Batch<T>> {
        match batch {
            Batch::Tensor(tensor) => Ok(Batch::Tensor(tensor.to_device_non_blocking(&self.stream)?)),
            leaf @ (Batch::None | Batch::Str(_) | Batch::List(_) | Batch::Scalar(_)) => Ok(leaf),
            Batch::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| self.transfer(value).map(|value| (key, value)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Batch::Map),
            Batch::Tuple(items) => items
                .into_iter()
                .map(|item| self.transfer(item))
                .collect::<Result<Vec<_>>>()
                .map(Batch::Tuple),
        }
    }
}
