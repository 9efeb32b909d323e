use candle_core::{DType, Device, Tensor};
use kindling::source::Dataset;
use kindling::{Batch, BoxError};

/// An in-memory dataset of feature rows and one label per row, kept on the host.
pub struct TensorDataset {
    features: Tensor,
    labels: Tensor,
}

impl TensorDataset {
    pub fn random(samples: usize, features: usize) -> candle_core::Result<Self> {
        let features = Tensor::randn(0f32, 1f32, (samples, features), &Device::Cpu)?;
        let labels = features.sum(1)?.ge(0f32)?.to_dtype(DType::F32)?;
        Ok(Self { features, labels })
    }
}

impl Dataset for TensorDataset {
    type Tensor = Tensor;

    fn len(&self) -> usize {
        self.labels.dims1().unwrap_or_default()
    }

    fn fetch(&self, indices: &[usize]) -> Result<Batch<Tensor>, BoxError> {
        let indices: Vec<u32> = indices.iter().map(|&i| i as u32).collect();
        let indices = Tensor::new(indices.as_slice(), &Device::Cpu)?;

        Ok(Batch::map([
            ("features", Batch::Tensor(self.features.index_select(&indices, 0)?)),
            ("label", Batch::Tensor(self.labels.index_select(&indices, 0)?)),
        ]))
    }
}
