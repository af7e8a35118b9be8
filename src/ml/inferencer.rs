// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs a trained model over a whole split in order, either for
// predictions (evaluation) or for the attention weights that the
// temporal attention head assigned to each timestep.
//
// Batches are built by hand in index order rather than through a
// DataLoader, so row i of the output always belongs to sample i.

use anyhow::{anyhow, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};
use ndarray::Array2;

use crate::data::{
    batcher::{YieldBatch, YieldBatcher},
    dataset::YieldDataset,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::TemporalAttentionModel;
use crate::ml::trainer::model_config;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:      TemporalAttentionModel<B>,
    batch_size: usize,
    device:     B::Device,
}

impl Inferencer<InferBackend> {
    /// Rebuild the architecture from the saved config and load the
    /// best weights into it.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let cfg    = ckpt_manager.load_config()?;
        let input_size = cfg
            .input_size
            .ok_or_else(|| anyhow!("train_config.json has no input size; retrain the model"))?;

        let model: TemporalAttentionModel<InferBackend> =
            model_config(&cfg, input_size).init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, cfg.batch_size, device))
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: TemporalAttentionModel<B>, batch_size: usize, device: B::Device) -> Self {
        Self { model, batch_size: batch_size.max(1), device }
    }

    /// Scaled predictions, one per sample, in dataset order
    pub fn predict(&self, dataset: &YieldDataset) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(dataset.len());
        for batch in self.batches(dataset) {
            let pred = self.model.forward(batch.inputs);
            out.extend(to_vec(pred)?);
        }
        Ok(out)
    }

    /// Attention weights, shape (samples, timesteps); rows sum to 1
    pub fn attention(&self, dataset: &YieldDataset) -> Result<Array2<f32>> {
        let timesteps = dataset.timesteps();
        let mut flat  = Vec::with_capacity(dataset.len() * timesteps);
        for batch in self.batches(dataset) {
            let out = self.model.forward_with_attention(batch.inputs);
            flat.extend(to_vec(out.weights)?);
        }
        Ok(Array2::from_shape_vec((dataset.len(), timesteps), flat)?)
    }

    fn batches<'a>(&'a self, dataset: &'a YieldDataset) -> impl Iterator<Item = YieldBatch<B>> + 'a {
        let batcher = YieldBatcher::<B>::new(self.device.clone());
        let total   = dataset.len();
        (0..total).step_by(self.batch_size).map(move |start| {
            let end   = (start + self.batch_size).min(total);
            let items = (start..end).filter_map(|i| dataset.get(i)).collect();
            batcher.batch(items)
        })
    }
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor data: {e:?}"))
}
