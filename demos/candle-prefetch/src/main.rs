mod dataset;

use candle_core::Device;
use kindling::sampler::{BatchSampler, RandomSampler};
use kindling::source::MultiEpochLoader;
use kindling::{Batch, PrefetchConfig, Prefetcher};
use tracing::info;
use crate::dataset::TensorDataset;

const SAMPLES: usize = 1_000;
const FEATURES: usize = 16;
const BATCH_SIZE: usize = 64;
const EPOCHS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let device = Device::cuda_if_available(0)?;
    let dataset = TensorDataset::random(SAMPLES, FEATURES)?;
    let sampler = BatchSampler::new(RandomSampler::new(SAMPLES, false, None, 42)?, BATCH_SIZE, true)?;
    let loader = MultiEpochLoader::new(dataset, sampler)?;

    let config = PrefetchConfig::new(device).queue_size(4).thread_name("demo-prefetch");
    let mut prefetcher = Prefetcher::with_config(loader, config)?;

    for epoch in 0..EPOCHS {
        let mut label_sum = 0.0f32;
        for batch in &mut prefetcher {
            let labels = batch.get("label").and_then(Batch::as_tensor).ok_or("batch has no labels")?;
            label_sum += labels.sum_all()?.to_scalar::<f32>()?;
        }
        if let Some(err) = prefetcher.failure() {
            return Err(err.to_string().into());
        }
        info!(epoch, batches = prefetcher.len(), label_sum, "epoch complete");
    }

    Ok(())
}
