// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Fitted preprocessing state lives in one directory as JSON:
//
//   artifacts/
//     weather_scaler.json        ← min/max per (timestep, var)
//     categorical_encoder.json   ← one-hot vocabulary per column
//     yield_scaler.json          ← min/max of the yield label
//
// They are written when the reference split is preprocessed
// with --fit and read back for every other split, so all
// splits share one set of statistics and one vocabulary.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::Persistable;

const WEATHER_SCALER: &str = "weather_scaler.json";
const CATEGORICAL_ENCODER: &str = "categorical_encoder.json";
const YIELD_SCALER: &str = "yield_scaler.json";

/// Write any serialisable value as pretty JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

/// Read a JSON file back into `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn weather_scaler_path(&self) -> PathBuf {
        self.dir.join(WEATHER_SCALER)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(CATEGORICAL_ENCODER)
    }

    pub fn yield_scaler_path(&self) -> PathBuf {
        self.dir.join(YIELD_SCALER)
    }

    /// Save a fitted component, logging where it went
    pub fn save<T: Persistable>(&self, value: &T, path: &Path) -> Result<()> {
        value.save(path)?;
        tracing::info!("Saved fitted artifact to '{}'", path.display());
        Ok(())
    }

    /// Load a fitted component, with a hint when the reference split
    /// has not been preprocessed yet
    pub fn load<T: Persistable>(&self, path: &Path) -> Result<T> {
        T::load(path).with_context(|| {
            format!(
                "Cannot load '{}'. Run 'preprocess --fit' on the training split first.",
                path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name:   String,
        values: Vec<f64>,
    }

    #[test]
    fn test_json_round_trip_creates_parent_dirs() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("nested").join("entry.json");
        let entry = Entry { name: "x".into(), values: vec![1.0, -2.5] };

        write_json(&path, &entry).unwrap();
        let back: Entry = read_json(&path).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res: Result<Entry> = read_json(&dir.path().join("absent.json"));
        assert!(res.is_err());
    }
}
