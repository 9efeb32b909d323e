//! The burn implementation for backend provision.
//! Burn tensors carry their rank as a const generic, so a single generic impl
//! covers every rank and kind.
use std::fmt::Debug;
use super::Backend;
use burn::prelude::{Tensor, Backend as BurnBackend};
use burn::tensor::BasicOps;
use crate::error::Result;

impl<B, const D: usize, K> Backend for Tensor<B, D, K>
where
    B: BurnBackend,
    K: BasicOps<B> + 'static,
    B::Device: 'static,
    Tensor<B, D, K>: Debug + Send + Sync,
{
    type Device = B::Device;

    // burn backends order work per device, so the device is the stream.
    type Stream = B::Device;

    fn current_device(&self) -> Self::Device {
        self.device()
    }

    fn transfer_stream(device: &Self::Device) -> Result<Self::Stream> {
        Ok(device.clone())
    }

    fn to_device_non_blocking(self, stream: &Self::Stream) -> Result<Self> {
        Ok(self.to_device(stream))
    }
}
