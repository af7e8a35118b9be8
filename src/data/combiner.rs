// ============================================================
// Layer 4 — Tensor Combiner
// ============================================================
// Joins the scaled weather series with the static one-hot vector
// of each sample:
//
//   weather  (samples, timesteps, weather_vars)
//   one-hot  (samples, onehot_width)
//       │
//       ▼   broadcast one-hot across the timestep axis
//   combined (samples, timesteps, weather_vars + onehot_width)
//
// Every timestep row of a sample is
//   [w_1 .. w_v | h_1 .. h_k]
// with the same one-hot tail h repeated T times.

use anyhow::{ensure, Context, Result};
use ndarray::{s, Array2, Array3, Axis};
use std::path::{Path, PathBuf};

use crate::data::loader::save_npy;

/// Broadcast and concatenate. Sample counts must match.
pub fn combine_weather_other(weather: &Array3<f64>, onehot: &Array2<f32>) -> Result<Array3<f32>> {
    let (samples, timesteps, vars) = weather.dim();
    ensure!(
        onehot.nrows() == samples,
        "Weather has {} samples but the one-hot matrix has {} rows",
        samples,
        onehot.nrows()
    );
    let width = onehot.ncols();

    let mut combined = Array3::<f32>::zeros((samples, timesteps, vars + width));
    for ((mut out, w), h) in combined
        .axis_iter_mut(Axis(0))
        .zip(weather.axis_iter(Axis(0)))
        .zip(onehot.axis_iter(Axis(0)))
    {
        out.slice_mut(s![.., ..vars]).assign(&w.mapv(|x| x as f32));
        let tail = h
            .broadcast((timesteps, width))
            .context("one-hot row does not broadcast over timesteps")?;
        out.slice_mut(s![.., vars..]).assign(&tail);
    }

    ensure!(
        combined.dim() == (samples, timesteps, vars + width),
        "Combined tensor has shape {:?}, expected {:?}",
        combined.dim(),
        (samples, timesteps, vars + width)
    );
    Ok(combined)
}

/// Keep only the given sample rows (after categorical filtering)
pub fn select_rows(weather: &Array3<f64>, rows: &[usize]) -> Array3<f64> {
    weather.select(Axis(0), rows)
}

/// `<data_dir>/<split>/combined_<split>.npy`
pub fn combined_path(data_dir: &Path, split: &str) -> PathBuf {
    data_dir.join(split).join(format!("combined_{split}.npy"))
}

/// `<data_dir>/<split>/scaled_yield_<split>.npy`
pub fn scaled_yield_path(data_dir: &Path, split: &str) -> PathBuf {
    data_dir.join(split).join(format!("scaled_yield_{split}.npy"))
}

/// Persist a combined tensor under its split name
pub fn save_combined(combined: &Array3<f32>, data_dir: &Path, split: &str) -> Result<PathBuf> {
    let path = combined_path(data_dir, split);
    save_npy(&path, combined)?;
    Ok(path)
}
