use candle_core::{Device, Tensor};
use super::Backend;
use crate::error::{PrefetchError, Result};

impl Backend for Tensor {
    type Device = Device;

    // candle issues every copy for a device on that device handle's own stream,
    // so the handle is the stream.
    type Stream = Device;

    fn current_device(&self) -> Self::Device {
        self.device().clone()
    }

    fn transfer_stream(device: &Self::Device) -> Result<Self::Stream> {
        Ok(device.clone())
    }

    fn to_device_non_blocking(self, stream: &Self::Stream) -> Result<Self> {
        Tensor::to_device(&self, stream).map_err(PrefetchError::transfer)
    }
}
