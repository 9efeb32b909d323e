use std::fmt::Debug;
use crate::error::Result;

/// The backend trait that must be fulfilled by any tensor type to be prefetched
///
/// A backend knows which device a tensor lives on, how to open a transfer
/// stream on a device, and how to enqueue a copy of a tensor on that stream.
pub trait Backend: Debug + Clone + Send + Sync + 'static {
    /// The device a tensor can live on
    type Device: Debug + Clone + Send + Sync + 'static;

    /// An ordered execution context for copies onto a single device.
    /// Owned by the prefetch worker, never shared with the consumer.
    type Stream: Send + 'static;

    /// Return the device this tensor currently lives on
    fn current_device(&self) -> Self::Device;

    /// Open a transfer stream bound to `device`
    fn transfer_stream(device: &Self::Device) -> Result<Self::Stream>;

    /// Enqueue a copy of this tensor onto the stream's device.
    ///
    /// Must return as soon as the copy is enqueued; the copy itself may still
    /// be in flight relative to the calling thread.
    fn to_device_non_blocking(self, stream: &Self::Stream) -> Result<Self>;
}
