use crate::backend::Backend;
use crate::error::{PrefetchError, Result};

/// Number of accelerators the mock backend pretends to have
pub const MOCK_ACCELERATORS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockDevice {
    Cpu,
    Accelerator(usize),
}

#[derive(Debug)]
pub struct MockStream {
    device: MockDevice,
}

// A simple mock tensor implementation for testing
#[derive(Clone, Debug, PartialEq)]
pub struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) value: i32,
    pub(crate) device: MockDevice,
    poisoned: bool,
}

impl MockTensor {
    /// A host resident tensor
    pub fn new(shape: Vec<usize>, value: i32) -> Self {
        Self {
            shape,
            value,
            device: MockDevice::Cpu,
            poisoned: false,
        }
    }

    /// A tensor whose transfer always fails
    pub fn poisoned(shape: Vec<usize>, value: i32) -> Self {
        Self {
            poisoned: true,
            ..Self::new(shape, value)
        }
    }

    pub fn is_on(&self, device: MockDevice) -> bool {
        self.device == device
    }
}

impl Backend for MockTensor {
    type Device = MockDevice;
    type Stream = MockStream;

    fn current_device(&self) -> Self::Device {
        self.device
    }

    fn transfer_stream(device: &Self::Device) -> Result<Self::Stream> {
        match device {
            MockDevice::Accelerator(ordinal) if *ordinal >= MOCK_ACCELERATORS => {
                Err(PrefetchError::stream(device, "no such accelerator"))
            }
            _ => Ok(MockStream { device: *device }),
        }
    }

    fn to_device_non_blocking(self, stream: &Self::Stream) -> Result<Self> {
        if self.poisoned {
            return Err(PrefetchError::transfer(format!(
                "cannot copy poisoned tensor {} to {:?}",
                self.value, stream.device
            )));
        }
        Ok(Self {
            device: stream.device,
            ..self
        })
    }
}
