// ============================================================
// Layer 4 — Yield Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<YieldSample>
// into tensors.
//
//   Input:  N samples, each a flat (T × F) sequence + one label
//   Output: inputs  [N, T, F]
//           targets [N, 1]
//
// All sequences share T and F (they come from one combined
// tensor), so batching is a flatten + reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::YieldSample;

/// A batch of trials ready for the model forward pass
#[derive(Debug, Clone)]
pub struct YieldBatch<B: Backend> {
    /// Combined sequences - shape: [batch, timesteps, features]
    pub inputs: Tensor<B, 3>,

    /// Scaled yields - shape: [batch, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct YieldBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> YieldBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<YieldSample, YieldBatch<B>> for YieldBatcher<B> {
    fn batch(&self, items: Vec<YieldSample>) -> YieldBatch<B> {
        let batch_size = items.len();
        let (timesteps, features) = items
            .first()
            .map(|s| (s.timesteps, s.features))
            .unwrap_or((0, 0));

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.sequence.iter().copied())
            .collect();
        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();

        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(flat, [batch_size, timesteps, features]),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(labels, [batch_size, 1]),
            &self.device,
        );

        YieldBatch { inputs, targets }
    }
}
