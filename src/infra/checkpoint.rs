// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's gzip'd MessagePack
// recorder. Weights are kept at full precision so a reloaded model
// predicts exactly what the trained one did.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) - the best validation epoch
//   2. best_epoch.json              - which epoch that was
//   3. train_config.json            - hyperparameters and the
//                                     input size, so `evaluate` and
//                                     `attention` can rebuild the
//                                     exact architecture
//
// File layout:
//   checkpoints/
//     model_best.mpk.gz
//     best_epoch.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::infra::artifact_store::{read_json, write_json};
use crate::ml::model::TemporalAttentionModel;

const MODEL_FILE: &str = "model_best";
const BEST_EPOCH_FILE: &str = "best_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Overwrite the best-model checkpoint with these weights.
    pub fn save_model<B: Backend>(&self, model: &TemporalAttentionModel<B>, epoch: usize) -> Result<()> {
        // The recorder appends the extension itself
        let path = self.dir.join(MODEL_FILE);

        ModelRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        write_json(&self.dir.join(BEST_EPOCH_FILE), &epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the best weights into a freshly initialised model of the
    /// same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  TemporalAttentionModel<B>,
        device: &B::Device,
    ) -> Result<TemporalAttentionModel<B>> {
        let epoch = self.best_epoch()?;
        let path  = self.dir.join(MODEL_FILE);
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Must be called before training so inference can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        write_json(&self.dir.join(CONFIG_FILE), cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        read_json(&self.dir.join(CONFIG_FILE))
            .context("Cannot read the training config. Make sure you have run 'train' first.")
    }

    fn best_epoch(&self) -> Result<usize> {
        read_json(&self.dir.join(BEST_EPOCH_FILE))
            .context("Cannot find 'best_epoch.json'. Have you run 'train' first?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::TemporalAttentionConfig;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    #[test]
    fn test_saved_weights_reload_identically() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = TemporalAttentionConfig::new(3, 4, 0.0);

        let trained = config.init::<NdArray>(&device);
        ckpt.save_model(&trained, 7).unwrap();

        let fresh    = config.init::<NdArray>(&device);
        let restored = ckpt.load_model(fresh, &device).unwrap();

        let x = Tensor::<NdArray, 3>::random([2, 5, 3], Distribution::Default, &device);
        let a = trained.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = restored.forward(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
        assert_eq!(ckpt.best_epoch().unwrap(), 7);
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig::default();
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap().hidden_size, cfg.hidden_size);
    }

    #[test]
    fn test_loading_before_training_fails() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_config().is_err());
    }
}
