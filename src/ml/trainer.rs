// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam,
// minimising MSE on the scaled yield.
//
// Early stopping:
//   After every epoch the validation loss is compared with the
//   best seen so far. An epoch that does not beat it counts
//   towards `patience`; once `patience` epochs in a row fail to
//   improve, training stops. The weights of the best epoch are
//   checkpointed and returned for evaluation.
//
// Backends:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on the inner backend,
//     which also disables dropout for validation
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::YieldBatcher, dataset::YieldDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, TrainingHistory};
use crate::ml::model::{TemporalAttentionConfig, TemporalAttentionModel};

pub type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
pub type MyInnerBackend = burn::backend::Wgpu;

// ─── Early stopping ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// New best validation loss - keep these weights
    Improved,
    /// No improvement yet, still within patience
    Waiting,
    /// Patience exhausted
    Stop,
}

/// Patience-based early stopping on validation loss
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:   usize,
    best_loss:  f64,
    best_epoch: usize,
    waited:     usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best_loss: f64::INFINITY, best_epoch: 0, waited: 0 }
    }

    pub fn update(&mut self, metrics: &EpochMetrics) -> StopDecision {
        if metrics.is_improvement(self.best_loss) {
            self.best_loss  = metrics.val_loss;
            self.best_epoch = metrics.epoch;
            self.waited     = 0;
            return StopDecision::Improved;
        }
        self.waited += 1;
        if self.waited >= self.patience {
            StopDecision::Stop
        } else {
            StopDecision::Waiting
        }
    }

    pub fn best_epoch(&self) -> usize { self.best_epoch }

    pub fn best_loss(&self) -> f64 { self.best_loss }
}

// ─── Training ─────────────────────────────────────────────────────────────────

/// Result of a run: the loss curve and the best model, already on
/// the inner (non-autodiff) backend
pub struct TrainingOutcome<B: Backend> {
    pub history: TrainingHistory,
    pub model:   TemporalAttentionModel<B>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: YieldDataset,
    val_dataset:   YieldDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainingOutcome<MyInnerBackend>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, Some(ckpt_manager), device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: YieldDataset,
    val_dataset:   YieldDataset,
    ckpt_manager:  Option<&CheckpointManager>,
    device:        B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>> {
    ensure!(!train_dataset.is_empty(), "training split is empty");
    ensure!(!val_dataset.is_empty(), "validation split is empty; early stopping needs it");
    ensure!(
        train_dataset.features() == val_dataset.features()
            && train_dataset.timesteps() == val_dataset.timesteps(),
        "train inputs are (T={}, F={}) but validation inputs are (T={}, F={})",
        train_dataset.timesteps(),
        train_dataset.features(),
        val_dataset.timesteps(),
        val_dataset.features()
    );

    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = model_config(cfg, train_dataset.features());
    let mut model: TemporalAttentionModel<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: T={}, features={}, hidden={}, context_dim={:?}",
        train_dataset.timesteps(),
        train_dataset.features(),
        cfg.hidden_size,
        cfg.context_dim
    );

    let mut optim = AdamConfig::new().init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_samples = train_dataset.len();
    let val_samples   = val_dataset.len();

    let train_loader = DataLoaderBuilder::new(YieldBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(YieldBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut stopper    = EarlyStopping::new(cfg.patience);
    let mut history    = TrainingHistory::default();
    let mut best_model = model.valid();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut train_loss_sum = 0.0f64;
        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0] as f64;
            let (loss, _) = model.forward_loss(batch.inputs, batch.targets);
            train_loss_sum += loss.clone().into_scalar().elem::<f64>() * n;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        // Dropout is off on the inner backend
        let model_valid = model.valid();
        let mse = MseLoss::new();
        let mut val_loss_sum = 0.0f64;
        for batch in val_loader.iter() {
            let n    = batch.targets.dims()[0] as f64;
            let pred = model_valid.forward(batch.inputs);
            val_loss_sum += mse
                .forward(pred, batch.targets, Reduction::Mean)
                .into_scalar()
                .elem::<f64>()
                * n;
        }

        let metrics = EpochMetrics::new(
            epoch,
            train_loss_sum / train_samples as f64,
            val_loss_sum / val_samples as f64,
        );
        println!(
            "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6}",
            epoch, cfg.epochs, metrics.train_loss, metrics.val_loss,
        );

        let decision = stopper.update(&metrics);
        history.epochs.push(metrics);

        match decision {
            StopDecision::Improved => {
                if let Some(ckpt) = ckpt_manager {
                    ckpt.save_model(&model_valid, epoch)?;
                    tracing::info!("Checkpoint saved for epoch {}", epoch);
                }
                best_model = model_valid;
            }
            StopDecision::Waiting => {}
            StopDecision::Stop => {
                tracing::info!(
                    "Early stopping after epoch {}: no improvement for {} epochs",
                    epoch,
                    cfg.patience
                );
                history.stopped_early = true;
                break;
            }
        }
    }

    history.best_epoch = stopper.best_epoch();
    tracing::info!(
        "Training complete! Best epoch {} with val_loss={:.6}",
        history.best_epoch,
        stopper.best_loss()
    );
    Ok(TrainingOutcome { history, model: best_model })
}

/// Architecture derived from the run config and the data's feature count
pub fn model_config(cfg: &TrainConfig, input_size: usize) -> TemporalAttentionConfig {
    TemporalAttentionConfig::new(input_size, cfg.hidden_size, cfg.dropout)
        .with_context_dim(cfg.context_dim)
}
