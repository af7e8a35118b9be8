// ============================================================
// Layer 4 — Min-Max Scaler
// ============================================================
// Rescales every column of a 2-D array into a target range:
//
//   x' = lo + (x - min) / (max - min) * (hi - lo)
//
// The statistics are fit ONCE on the reference (training) split
// and then reused verbatim for validation and test, so that a
// temperature of 30°C maps to the same scaled value everywhere.
//
// Weather tensors are 3-D (samples, timesteps, vars). They are
// flattened to (samples, timesteps*vars) before fitting, so each
// (timestep, variable) pair gets its own column statistics, and
// reshaped back afterwards.
//
// A constant column (max == min) has its range treated as 1,
// which maps every value onto the lower bound.

use anyhow::{ensure, Result};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::traits::Persistable;
use crate::infra::artifact_store::{read_json, write_json};

/// Fitted per-column min-max statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    /// Target interval (lo, hi)
    pub feature_range: (f64, f64),
    pub data_min:      Vec<f64>,
    pub data_max:      Vec<f64>,
}

impl MinMaxScaler {
    /// Fit column statistics on a 2-D view (rows = samples).
    pub fn fit(data: ArrayView2<f64>, feature_range: (f64, f64)) -> Result<Self> {
        ensure!(
            feature_range.0 < feature_range.1,
            "invalid feature range ({}, {})",
            feature_range.0,
            feature_range.1
        );
        ensure!(data.nrows() > 0, "cannot fit a scaler on zero samples");

        let data_min = data
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        let data_max = data
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect();

        Ok(Self { feature_range, data_min, data_max })
    }

    /// Fit on a 3-D weather tensor via its flattened (samples, t*v) view
    pub fn fit_3d(data: &Array3<f64>, feature_range: (f64, f64)) -> Result<Self> {
        let flat = flatten_3d(data)?;
        Self::fit(flat.view(), feature_range)
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    /// Per-column (min, range); a zero range is replaced by 1
    fn min_and_range(&self) -> (Array1<f64>, Array1<f64>) {
        let min: Array1<f64> = self.data_min.iter().copied().collect();
        let range: Array1<f64> = self
            .data_min
            .iter()
            .zip(&self.data_max)
            .map(|(&min, &max)| if max == min { 1.0 } else { max - min })
            .collect();
        (min, range)
    }

    /// Apply the fitted transform column-wise
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let (lo, hi)     = self.feature_range;
        let (min, range) = self.min_and_range();
        // (x - min) / range is exactly 0 and 1 at the column extremes
        Ok(((&data - &min) / &range) * (hi - lo) + lo)
    }

    /// Undo the transform column-wise
    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let (lo, hi)     = self.feature_range;
        let (min, range) = self.min_and_range();
        Ok(((&data - lo) / (hi - lo)) * &range + &min)
    }

    /// Transform a 3-D tensor, keeping its original shape
    pub fn transform_3d(&self, data: &Array3<f64>) -> Result<Array3<f64>> {
        let flat   = flatten_3d(data)?;
        let scaled = self.transform(flat.view())?;
        Ok(scaled.into_shape_with_order(data.raw_dim())?)
    }

    /// Convenience for single-column scalers (the yield scaler)
    pub fn transform_column(&self, values: &[f64]) -> Result<Vec<f64>> {
        let col = Array2::from_shape_vec((values.len(), 1), values.to_vec())?;
        Ok(self.transform(col.view())?.into_raw_vec_and_offset().0)
    }

    /// Inverse of `transform_column`
    pub fn inverse_transform_column(&self, values: &[f64]) -> Result<Vec<f64>> {
        let col = Array2::from_shape_vec((values.len(), 1), values.to_vec())?;
        Ok(self.inverse_transform(col.view())?.into_raw_vec_and_offset().0)
    }

    fn check_width(&self, ncols: usize) -> Result<()> {
        ensure!(
            ncols == self.n_features(),
            "scaler was fit on {} columns but got {}",
            self.n_features(),
            ncols
        );
        Ok(())
    }
}

impl Persistable for MinMaxScaler {
    fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// (samples, t, v) → (samples, t*v), row-major
fn flatten_3d(data: &Array3<f64>) -> Result<Array2<f64>> {
    let (n, t, v) = data.dim();
    Ok(data
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((n, t * v))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn weather() -> Array3<f64> {
        // 3 samples, 2 timesteps, 2 vars
        Array3::from_shape_vec(
            (3, 2, 2),
            vec![
                1.0, 10.0,   2.0, 20.0,
                3.0, 30.0,   4.0, 40.0,
                5.0, 50.0,   6.0, 60.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_reference_split_hits_range_extremes() {
        let w      = weather();
        let scaler = MinMaxScaler::fit_3d(&w, (-1.0, 1.0)).unwrap();
        let scaled = scaler.transform_3d(&w).unwrap();

        assert_eq!(scaled.dim(), w.dim());
        assert!(scaled.iter().all(|&x| (-1.0..=1.0).contains(&x)));
        // Sample 0 holds every column minimum, sample 2 every maximum
        assert!(scaled.index_axis(Axis(0), 0).iter().all(|&x| x == -1.0));
        assert!(scaled.index_axis(Axis(0), 2).iter().all(|&x| x == 1.0));
        assert!(scaled.index_axis(Axis(0), 1).iter().all(|&x| x.abs() < 1e-12));
    }

    #[test]
    fn test_other_split_reuses_reference_statistics() {
        let scaler = MinMaxScaler::fit_3d(&weather(), (-1.0, 1.0)).unwrap();
        // A test sample outside the training range lands outside [-1, 1]
        let test   = Array3::from_shape_vec((1, 2, 2), vec![9.0, 90.0, 2.0, 20.0]).unwrap();
        let scaled = scaler.transform_3d(&test).unwrap();
        assert!((scaled[[0, 0, 0]] - 3.0).abs() < 1e-12);
        assert!((scaled[[0, 1, 0]] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_maps_to_lower_bound() {
        let data   = array![[5.0, 1.0], [5.0, 3.0]];
        let scaler = MinMaxScaler::fit(data.view(), (-1.0, 1.0)).unwrap();
        let out    = scaler.transform(data.view()).unwrap();
        assert_eq!(out[[0, 0]], -1.0);
        assert_eq!(out[[1, 0]], -1.0);
    }

    #[test]
    fn test_label_inverse_round_trip() {
        let labels = [12.5, 47.0, 63.25, 30.0];
        let col    = Array2::from_shape_vec((4, 1), labels.to_vec()).unwrap();
        let scaler = MinMaxScaler::fit(col.view(), (0.0, 1.0)).unwrap();

        let scaled = scaler.transform_column(&labels).unwrap();
        let back   = scaler.inverse_transform_column(&scaled).unwrap();
        for (a, b) in labels.iter().zip(&back) {
            assert!((a - b).abs() < 1e-9);
        }
        let again = scaler.transform_column(&back).unwrap();
        for (a, b) in scaled.iter().zip(&again) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_width_mismatch_is_an_error() {
        let scaler = MinMaxScaler::fit_3d(&weather(), (-1.0, 1.0)).unwrap();
        let wrong  = Array3::<f64>::zeros((1, 3, 2));
        assert!(scaler.transform_3d(&wrong).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("scaler.json");
        let scaler = MinMaxScaler::fit_3d(&weather(), (-1.0, 1.0)).unwrap();
        scaler.save(&path).unwrap();
        assert_eq!(MinMaxScaler::load(&path).unwrap(), scaler);
    }

    #[test]
    fn test_reloaded_statistics_are_bit_identical() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        // Values whose shortest decimal form needs 17 significant digits
        let data = array![[0.1 + 0.2, 1.0 / 3.0], [2.0f64.sqrt(), std::f64::consts::PI * 1e-7]];
        let scaler = MinMaxScaler::fit(data.view(), (-1.0, 1.0)).unwrap();
        scaler.save(&path).unwrap();

        let back = MinMaxScaler::load(&path).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<u64>>();
        assert_eq!(bits(&back.data_min), bits(&scaler.data_min));
        assert_eq!(bits(&back.data_max), bits(&scaler.data_max));
        assert_eq!(
            back.transform(data.view()).unwrap(),
            scaler.transform(data.view()).unwrap()
        );
    }
}
