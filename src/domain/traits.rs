// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, so the
// concrete file formats (npy, csv, json) stay in Layers 4 and 6.

use anyhow::Result;
use std::path::Path;

use crate::domain::record::RawRecord;

// ─── SplitSource ──────────────────────────────────────────────────────────────
/// Anything that can hand over the raw inputs of one data split.
///
/// Implementations:
///   - NpySplitLoader → weather .npy + categorical .csv + cluster .npy
pub trait SplitSource {
    /// Raw weather tensor, shape (samples, timesteps, weather_vars)
    fn weather(&self) -> Result<ndarray::Array3<f64>>;

    /// Raw categorical rows, one per sample
    fn records(&self) -> Result<Vec<RawRecord>>;

    /// Genotype → cluster lookup, indexed by zero-based genotype id
    fn cluster_ids(&self) -> Result<Vec<i64>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any fitted component whose state is saved once on the reference
/// split and reloaded for every other split.
///
/// Implementations:
///   - MinMaxScaler       → weather and yield scalers
///   - CategoricalEncoder → one-hot vocabulary
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path
    fn load(path: &Path) -> Result<Self>;
}
