// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Load combined tensors and scaled labels  (Layer 4 - data)
//   Step 2: Build datasets                           (Layer 4 - data)
//   Step 3: Save config for inference                (Layer 6 - infra)
//   Step 4: Run training loop with early stopping    (Layer 5 - ml)
//   Step 5: Save the loss history                    (Layer 6 - infra)
//   Step 6: Evaluate the best model on validation    (Layer 2/5)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::evaluate_use_case::{evaluate_split, load_split};
use crate::data::scaler::MinMaxScaler;
use crate::infra::{
    artifact_store::ArtifactStore,
    checkpoint::CheckpointManager,
    metrics::{MetricsLogger, RegressionMetrics},
};
use crate::ml::inferencer::Inferencer;
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoint so inference can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_data:     String,
    pub train_labels:   String,
    pub val_data:       String,
    pub val_labels:     String,
    pub checkpoint_dir: String,
    pub results_dir:    String,
    /// Where `preprocess --fit` left yield_scaler.json
    pub artifacts_dir:  String,
    /// Feature count of the combined tensor, filled in from the data
    pub input_size:     Option<usize>,
    pub hidden_size:    usize,
    pub dropout:        f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    /// Optional Linear(hidden → context_dim) after the attention pooling
    pub context_dim:    Option<usize>,
    pub patience:       usize,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_data:     "data/train/combined_train.npy".to_string(),
            train_labels:   "data/train/scaled_yield_train.npy".to_string(),
            val_data:       "data/validation/combined_validation.npy".to_string(),
            val_labels:     "data/validation/scaled_yield_validation.npy".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            results_dir:    "results".to_string(),
            artifacts_dir:  "artifacts".to_string(),
            input_size:     None,
            hidden_size:    128,
            dropout:        0.23,
            batch_size:     512,
            epochs:         50,
            lr:             1e-3,
            context_dim:    None,
            patience:       3,
            seed:           42,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train, keep the best epoch, and report validation metrics on
    /// the original yield scale.
    pub fn execute(&self) -> Result<RegressionMetrics> {
        let mut cfg = self.config.clone();

        // ── Step 1–2: Load data and build datasets ───────────────────────────
        let train_dataset = load_split(Path::new(&cfg.train_data), Path::new(&cfg.train_labels))?;
        let val_dataset   = load_split(Path::new(&cfg.val_data), Path::new(&cfg.val_labels))?;
        tracing::info!(
            "Split: {} train, {} validation, T={}, features={}",
            train_dataset.len(),
            val_dataset.len(),
            train_dataset.timesteps(),
            train_dataset.features()
        );

        // Fail before training rather than after
        let store  = ArtifactStore::new(&cfg.artifacts_dir);
        let scaler = store.load::<MinMaxScaler>(&store.yield_scaler_path())?;

        // ── Step 3: Save config for inference ─────────────────────────────────
        cfg.input_size   = Some(train_dataset.features());
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&cfg)?;

        // ── Step 4: Run training loop (Layer 5) ───────────────────────────────
        let eval_dataset = val_dataset.clone();
        let outcome      = run_training(&cfg, train_dataset, val_dataset, &ckpt_manager)?;

        // ── Step 5: Loss history ──────────────────────────────────────────────
        let logger = MetricsLogger::new(&cfg.results_dir)?;
        logger.save_history(&outcome.history)?;
        tracing::debug!("train loss curve: {:?}", outcome.history.train_losses());
        tracing::debug!("val loss curve:   {:?}", outcome.history.val_losses());

        // ── Step 6: Evaluate the restored best weights ────────────────────────
        let device     = burn::backend::wgpu::WgpuDevice::default();
        let inferencer = Inferencer::new(outcome.model, cfg.batch_size, device);
        let metrics    = evaluate_split(&inferencer, &eval_dataset, &scaler, "validation")?;
        metrics.log();
        logger.save_metrics(&metrics)?;
        Ok(metrics)
    }
}
