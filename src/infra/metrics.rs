// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two kinds of numbers come out of a run:
//
//   1. Per-epoch losses (MSE on the scaled yield), collected into
//      a TrainingHistory and saved as training_history.json;
//      the data behind a loss curve.
//
//   2. Regression metrics on a held-out split, computed on the
//      ORIGINAL yield scale (after inverse-scaling both the
//      predictions and the ground truth):
//
//        RMSE = sqrt(mean((y - ŷ)²))
//        MAE  = mean(|y - ŷ|)
//        R²   = 1 - Σ(y - ŷ)² / Σ(y - ȳ)²
//
//      saved as metrics_<split>.json.
//
// How to read the losses:
//   - If val_loss rises while train_loss falls → overfitting,
//     which is exactly what early stopping reacts to.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
};

use crate::infra::artifact_store::write_json;

/// One row of the loss curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch:      usize,
    /// Sample-weighted mean MSE over all training batches
    pub train_loss: f64,
    pub val_loss:   f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Loss curve of a whole run plus how it ended
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs:        Vec<EpochMetrics>,
    /// Epoch whose weights were kept
    pub best_epoch:    usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.val_loss).collect()
    }
}

/// RMSE / MAE / R² on the original yield scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub split:    String,
    pub samples:  usize,
    pub rmse:     f64,
    pub mae:      f64,
    pub r2_score: f64,
}

impl RegressionMetrics {
    pub fn compute(split: impl Into<String>, actual: &[f64], predicted: &[f64]) -> Result<Self> {
        ensure!(
            actual.len() == predicted.len(),
            "{} ground-truth values but {} predictions",
            actual.len(),
            predicted.len()
        );
        ensure!(!actual.is_empty(), "cannot compute metrics on an empty split");

        let n     = actual.len() as f64;
        let mean  = actual.iter().sum::<f64>() / n;
        let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();
        let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
        let abs_err: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).abs()).sum();

        // Constant ground truth: perfect fit scores 1, anything else 0
        let r2_score = if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };

        Ok(Self {
            split: split.into(),
            samples: actual.len(),
            rmse: (ss_res / n).sqrt(),
            mae: abs_err / n,
            r2_score,
        })
    }

    pub fn log(&self) {
        tracing::info!("{} RMSE: {:.3}", self.split, self.rmse);
        tracing::info!("{} MAE: {:.3}", self.split, self.mae);
        tracing::info!("{} r2_score: {:.3}", self.split, self.r2_score);
    }
}

/// Writes histories and evaluation metrics into the results directory.
pub struct MetricsLogger {
    dir: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn save_history(&self, history: &TrainingHistory) -> Result<PathBuf> {
        let path = self.dir.join("training_history.json");
        write_json(&path, history)?;
        tracing::info!("Saved training history ({} epochs) to '{}'", history.epochs.len(), path.display());
        Ok(path)
    }

    /// Saved under the split name: metrics_<split>.json
    pub fn save_metrics(&self, metrics: &RegressionMetrics) -> Result<PathBuf> {
        let path = self.metrics_path(&metrics.split);
        write_json(&path, metrics)?;
        tracing::info!("Saved {} metrics to '{}'", metrics.split, path.display());
        Ok(path)
    }

    pub fn metrics_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("metrics_{split}.json"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::artifact_store::read_json;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.05, 0.03);
        assert!(m.is_improvement(0.04));
        assert!(!m.is_improvement(0.03));
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [10.0, 20.0, 30.0];
        let m = RegressionMetrics::compute("test", &y, &y).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2_score, 1.0);
    }

    #[test]
    fn test_known_values() {
        let y    = [1.0, 2.0, 3.0, 4.0];
        let yhat = [1.5, 2.0, 2.0, 4.5];
        let m    = RegressionMetrics::compute("validation", &y, &yhat).unwrap();
        // residuals: -0.5, 0, 1, -0.5 → SS_res = 1.5, SS_tot = 5
        assert!((m.rmse - (1.5f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.r2_score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_predicting_the_mean_scores_zero_r2() {
        let y    = [2.0, 4.0, 6.0];
        let yhat = [4.0, 4.0, 4.0];
        let m    = RegressionMetrics::compute("x", &y, &yhat).unwrap();
        assert!(m.r2_score.abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_fails() {
        assert!(RegressionMetrics::compute("x", &[1.0, 2.0], &[1.0]).is_err());
        assert!(RegressionMetrics::compute("x", &[], &[]).is_err());
    }

    #[test]
    fn test_metrics_saved_under_split_name() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let m      = RegressionMetrics::compute("Evaluation", &[1.0, 2.0], &[1.0, 2.5]).unwrap();
        let path   = logger.save_metrics(&m).unwrap();

        assert!(path.ends_with("metrics_Evaluation.json"));
        let back: RegressionMetrics = read_json(&path).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_history_accessors() {
        let h = TrainingHistory {
            epochs: vec![EpochMetrics::new(1, 0.4, 0.5), EpochMetrics::new(2, 0.3, 0.45)],
            best_epoch: 2,
            stopped_early: false,
        };
        assert_eq!(h.train_losses(), vec![0.4, 0.3]);
        assert_eq!(h.val_losses(), vec![0.5, 0.45]);
    }
}
