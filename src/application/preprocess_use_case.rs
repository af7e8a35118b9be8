// ============================================================
// Layer 2 — PreprocessUseCase
// ============================================================
// Turns one raw split into the tensors the model trains on:
//
//   Step 1: Load weather, categorical rows, cluster table  (Layer 4)
//   Step 2: Clean categorical rows                         (Layer 4)
//   Step 3: Filter locations, fit or load the vocabulary   (Layer 4/6)
//   Step 4: One-hot encode, check the width                (Layer 4)
//   Step 5: Keep matching weather rows, scale, combine     (Layer 4/6)
//   Step 6: (optional) scale the yield labels              (Layer 4/6)
//   Step 7: Save fitted artifacts and output tensors       (Layer 4/6)
//
// The reference split is run with `fit = true`: it fits the
// vocabulary and scalers and saves them. Every other split loads
// and reuses them unchanged.

use anyhow::{ensure, Result};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};

use crate::data::{
    categorical::{clean_records, encode_checked, filter_locations, vocabulary_drift, CategoricalEncoder, ColumnDrift},
    combiner::{combine_weather_other, save_combined, scaled_yield_path, select_rows},
    loader::{read_labels, read_records_csv, save_npy, NpySplitLoader},
    scaler::MinMaxScaler,
};
use crate::domain::traits::SplitSource;
use crate::infra::artifact_store::ArtifactStore;

/// Weather features are scaled into this range
pub const WEATHER_RANGE: (f64, f64) = (-1.0, 1.0);

/// Yield labels are scaled into this range
pub const YIELD_RANGE: (f64, f64) = (0.0, 1.0);

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Split name, used in output file names (train, validation, test...)
    pub split:              String,
    pub weather_path:       String,
    pub other_path:         String,
    pub cluster_path:       String,
    /// Whether the categorical CSV starts with a header row
    pub has_header:         bool,
    /// Raw (unscaled) yield per sample, optional
    pub yield_path:         Option<String>,
    /// Outputs land in <data_dir>/<split>/
    pub data_dir:           String,
    pub artifacts_dir:      String,
    /// Fit and save the scalers and vocabulary on this split
    pub fit:                bool,
    pub onehot_width:       usize,
    pub excluded_locations: Vec<i64>,
}

/// What a preprocessing run produced
#[derive(Debug, Clone)]
pub struct PreprocessSummary {
    pub samples_in:     usize,
    pub samples_kept:   usize,
    /// (samples, timesteps, weather_vars + onehot_width)
    pub combined_shape: (usize, usize, usize),
    pub combined_path:  PathBuf,
    pub labels_path:    Option<PathBuf>,
}

pub struct PreprocessUseCase {
    config: PreprocessConfig,
}

impl PreprocessUseCase {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PreprocessSummary> {
        let cfg   = &self.config;
        let store = ArtifactStore::new(&cfg.artifacts_dir);

        // ── Step 1: Load raw inputs ──────────────────────────────────────────
        let loader   = NpySplitLoader::new(&cfg.weather_path, &cfg.other_path, &cfg.cluster_path, cfg.has_header);
        let weather  = loader.weather()?;
        let raw      = loader.records()?;
        let clusters = loader.cluster_ids()?;
        ensure!(
            raw.len() == weather.dim().0,
            "Weather has {} samples but the categorical table has {} rows",
            weather.dim().0,
            raw.len()
        );

        // ── Step 2: Clean ─────────────────────────────────────────────────────
        let clean = clean_records(&raw, &clusters)?;

        // ── Step 3: Filter locations, fit or reuse the vocabulary ────────────
        let (encoder, records, kept_rows) = if cfg.fit {
            let (records, kept) = filter_locations(clean, &cfg.excluded_locations, None);
            (CategoricalEncoder::fit(&records)?, records, kept)
        } else {
            let encoder: CategoricalEncoder = store.load(&store.encoder_path())?;
            let (records, kept) = filter_locations(clean, &cfg.excluded_locations, Some(&encoder));
            (encoder, records, kept)
        };
        ensure!(!records.is_empty(), "No rows left in split '{}' after location filtering", cfg.split);

        // ── Step 4: One-hot encode ────────────────────────────────────────────
        let onehot = encode_checked(&encoder, &records, cfg.onehot_width)?;
        tracing::info!("Encoded {} rows into {} one-hot columns", onehot.nrows(), onehot.ncols());

        // ── Step 5: Align and scale weather ──────────────────────────────────
        let weather = select_rows(&weather, &kept_rows);
        let weather_scaler = if cfg.fit {
            MinMaxScaler::fit_3d(&weather, WEATHER_RANGE)?
        } else {
            store.load::<MinMaxScaler>(&store.weather_scaler_path())?
        };
        let scaled_weather = weather_scaler.transform_3d(&weather)?;
        let combined       = combine_weather_other(&scaled_weather, &onehot)?;

        // ── Step 6: Labels ────────────────────────────────────────────────────
        let labels = match &cfg.yield_path {
            Some(path) => Some(self.scale_labels(&store, Path::new(path), &kept_rows, raw.len())?),
            None => None,
        };

        // ── Step 7: Persist ───────────────────────────────────────────────────
        // Nothing is written before every check above has passed
        if cfg.fit {
            store.save(&encoder, &store.encoder_path())?;
            store.save(&weather_scaler, &store.weather_scaler_path())?;
            if let Some((scaler, _)) = &labels {
                store.save(scaler, &store.yield_scaler_path())?;
            }
        }

        let data_dir      = Path::new(&cfg.data_dir);
        let combined_path = save_combined(&combined, data_dir, &cfg.split)?;
        let labels_path = match labels {
            Some((_, scaled)) => {
                let out = scaled_yield_path(data_dir, &cfg.split);
                save_npy(&out, &scaled)?;
                Some(out)
            }
            None => None,
        };

        Ok(PreprocessSummary {
            samples_in: raw.len(),
            samples_kept: kept_rows.len(),
            combined_shape: combined.dim(),
            combined_path,
            labels_path,
        })
    }

    /// Yield scaler (fitted here or loaded) and the scaled kept labels
    fn scale_labels(
        &self,
        store:     &ArtifactStore,
        path:      &Path,
        kept_rows: &[usize],
        expected:  usize,
    ) -> Result<(MinMaxScaler, Array1<f32>)> {
        let labels = read_labels(path)?;
        ensure!(
            labels.len() == expected,
            "'{}' has {} labels for {} samples",
            path.display(),
            labels.len(),
            expected
        );
        let kept: Vec<f64> = kept_rows.iter().map(|&i| labels[i]).collect();

        let scaler = if self.config.fit {
            let column = Array2::from_shape_vec((kept.len(), 1), kept.clone())?;
            MinMaxScaler::fit(column.view(), YIELD_RANGE)?
        } else {
            store.load::<MinMaxScaler>(&store.yield_scaler_path())?
        };

        let scaled = scaler.transform_column(&kept)?.into_iter().map(|y| y as f32).collect();
        Ok((scaler, scaled))
    }
}

/// Compare two raw categorical tables and log where they differ.
pub fn diff_vocabulary(reference: &Path, candidate: &Path, has_header: bool) -> Result<Vec<ColumnDrift>> {
    let reference = read_records_csv(reference, has_header)?;
    let candidate = read_records_csv(candidate, has_header)?;
    let report    = vocabulary_drift(&reference, &candidate);
    if report.is_empty() {
        tracing::info!("Categorical vocabularies match on every compared column");
    }
    Ok(report)
}
