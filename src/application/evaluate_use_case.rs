// ============================================================
// Layer 2 — Evaluate / Attention Use Cases
// ============================================================
// Both load the best checkpoint saved by `train` and run it over
// one preprocessed split:
//
//   evaluate   → RMSE / MAE / R² on the original yield scale,
//                written to metrics_<split>.json
//   attention  → per-sample attention weights (samples, T),
//                written to attention_<split>.npy
//
// Predictions and labels are both un-scaled with the yield scaler
// fitted on the reference split before any metric is computed.

use anyhow::{ensure, Result};
use burn::{data::dataset::Dataset, prelude::Backend};
use ndarray::Array3;
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::YieldDataset,
    loader::{read_combined, read_labels, save_npy},
    scaler::MinMaxScaler,
};
use crate::infra::{
    artifact_store::ArtifactStore,
    checkpoint::CheckpointManager,
    metrics::{MetricsLogger, RegressionMetrics},
};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    /// Name used in log lines and output file names
    pub split:          String,
    pub data:           String,
    /// Scaled labels; optional for the attention export
    pub labels:         Option<String>,
    pub checkpoint_dir: String,
    pub results_dir:    String,
    pub artifacts_dir:  String,
}

/// Combined tensor plus scaled labels as a dataset
pub fn load_split(data: &Path, labels: &Path) -> Result<YieldDataset> {
    let inputs = read_combined(data)?;
    let labels = read_labels(labels)?.into_iter().map(|y| y as f32).collect();
    YieldDataset::new(inputs, labels)
}

/// Predict a split and score it on the original yield scale
pub fn evaluate_split<B: Backend>(
    inferencer: &Inferencer<B>,
    dataset:    &YieldDataset,
    scaler:     &MinMaxScaler,
    split:      &str,
) -> Result<RegressionMetrics> {
    let predicted = inferencer.predict(dataset)?;
    score_scaled(split, dataset.labels(), &predicted, scaler)
}

/// Inverse-scale truth and predictions, then compute the metrics
pub fn score_scaled(
    split:     &str,
    truth:     &[f32],
    predicted: &[f32],
    scaler:    &MinMaxScaler,
) -> Result<RegressionMetrics> {
    let widen   = |v: &[f32]| v.iter().map(|&x| f64::from(x)).collect::<Vec<f64>>();
    let actual  = scaler.inverse_transform_column(&widen(truth))?;
    let predict = scaler.inverse_transform_column(&widen(predicted))?;
    RegressionMetrics::compute(split, &actual, &predict)
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RegressionMetrics> {
        let cfg = &self.config;
        let labels = cfg
            .labels
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("evaluation of '{}' needs scaled labels", cfg.split))?;
        let dataset = load_split(Path::new(&cfg.data), Path::new(labels))?;

        let store  = ArtifactStore::new(&cfg.artifacts_dir);
        let scaler = store.load::<MinMaxScaler>(&store.yield_scaler_path())?;

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let inferencer   = Inferencer::from_checkpoint(&ckpt_manager)?;

        let metrics = evaluate_split(&inferencer, &dataset, &scaler, &cfg.split)?;
        metrics.log();
        MetricsLogger::new(&cfg.results_dir)?.save_metrics(&metrics)?;
        Ok(metrics)
    }
}

pub struct AttentionUseCase {
    config: EvaluateConfig,
}

impl AttentionUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    /// Export attention weights and return the output path
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg    = &self.config;
        let inputs = read_combined(Path::new(&cfg.data))?;
        let dataset = match &cfg.labels {
            Some(labels) => {
                let labels = read_labels(Path::new(labels))?.into_iter().map(|y| y as f32).collect();
                YieldDataset::new(inputs, labels)?
            }
            // Labels are not used here; the dataset just needs one per row
            None => unlabeled(inputs)?,
        };
        ensure!(!dataset.is_empty(), "split '{}' has no samples", cfg.split);

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let inferencer   = Inferencer::from_checkpoint(&ckpt_manager)?;
        let weights      = inferencer.attention(&dataset)?;

        let path = attention_path(Path::new(&cfg.results_dir), &cfg.split);
        save_npy(&path, &weights)?;
        Ok(path)
    }
}

fn unlabeled(inputs: Array3<f32>) -> Result<YieldDataset> {
    let n = inputs.dim().0;
    YieldDataset::new(inputs, vec![0.0; n])
}

pub fn attention_path(results_dir: &Path, split: &str) -> PathBuf {
    results_dir.join(format!("attention_{split}.npy"))
}
