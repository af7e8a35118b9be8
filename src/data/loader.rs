// ============================================================
// Layer 4 — Split Loader
// ============================================================
// Reads the raw inputs of one data split from disk:
//
//   weather   .npy   (samples, timesteps, weather_vars), f32 or f64
//   other     .csv   five columns: MG, Genotype ID, State, Year, Location
//   clusters  .npy   1-D genotype → cluster table, integer or float
//
// The categorical table is CSV rather than .npy because it holds
// strings (the State column), which ndarray-npy cannot read.
// Export it once with `np.savetxt(path, arr, fmt="%s", delimiter=",")`.
//
// Also home to the small .npy helpers shared by the training
// stage (labels, combined tensors).

use anyhow::{ensure, Context, Result};
use ndarray::{Array3, ArrayD, Ix3};
use ndarray_npy::{read_npy, write_npy, WritableElement};
use std::path::{Path, PathBuf};

use crate::domain::record::RawRecord;
use crate::domain::traits::SplitSource;

/// Loads one split from a weather .npy, a categorical .csv and the
/// shared cluster table.
pub struct NpySplitLoader {
    weather_path:  PathBuf,
    other_path:    PathBuf,
    cluster_path:  PathBuf,
    /// Whether the first CSV row is a header to skip
    has_header:    bool,
}

impl NpySplitLoader {
    pub fn new(
        weather_path: impl Into<PathBuf>,
        other_path:   impl Into<PathBuf>,
        cluster_path: impl Into<PathBuf>,
        has_header:   bool,
    ) -> Self {
        Self {
            weather_path: weather_path.into(),
            other_path:   other_path.into(),
            cluster_path: cluster_path.into(),
            has_header,
        }
    }
}

impl SplitSource for NpySplitLoader {
    fn weather(&self) -> Result<Array3<f64>> {
        let arr = read_float_array(&self.weather_path)?;
        let arr = arr.into_dimensionality::<Ix3>().with_context(|| {
            format!("Weather tensor '{}' must be 3-D", self.weather_path.display())
        })?;
        tracing::info!("Loaded weather tensor {:?} from '{}'", arr.dim(), self.weather_path.display());
        Ok(arr)
    }

    fn records(&self) -> Result<Vec<RawRecord>> {
        read_records_csv(&self.other_path, self.has_header)
    }

    fn cluster_ids(&self) -> Result<Vec<i64>> {
        read_cluster_ids(&self.cluster_path)
    }
}

/// Read an .npy array stored as float64 or float32, widened to f64
pub fn read_float_array(path: &Path) -> Result<ArrayD<f64>> {
    if let Ok(arr) = read_npy::<_, ArrayD<f64>>(path) {
        return Ok(arr);
    }
    let arr: ArrayD<f32> = read_npy(path)
        .with_context(|| format!("Cannot read float array from '{}'", path.display()))?;
    Ok(arr.mapv(f64::from))
}

/// Read a combined (samples, timesteps, features) tensor as f32
pub fn read_combined(path: &Path) -> Result<Array3<f32>> {
    let arr = read_float_array(path)?
        .into_dimensionality::<Ix3>()
        .with_context(|| format!("Combined tensor '{}' must be 3-D", path.display()))?;
    tracing::info!("Loaded combined tensor {:?} from '{}'", arr.dim(), path.display());
    Ok(arr.mapv(|x| x as f32))
}

/// Read a label vector; (n,) and (n, 1) layouts are both accepted
pub fn read_labels(path: &Path) -> Result<Vec<f64>> {
    let arr = read_float_array(path)?;
    ensure!(
        arr.ndim() == 1 || (arr.ndim() == 2 && arr.shape()[1] == 1),
        "Labels in '{}' must have shape (n,) or (n, 1), got {:?}",
        path.display(),
        arr.shape()
    );
    Ok(arr.iter().copied().collect())
}

/// Read the genotype → cluster table. Integer and float files are
/// both accepted; floats are truncated.
pub fn read_cluster_ids(path: &Path) -> Result<Vec<i64>> {
    let ids: Vec<i64> = if let Ok(arr) = read_npy::<_, ArrayD<i64>>(path) {
        arr.iter().copied().collect()
    } else if let Ok(arr) = read_npy::<_, ArrayD<i32>>(path) {
        arr.iter().map(|&v| i64::from(v)).collect()
    } else {
        read_float_array(path)?.iter().map(|&v| v as i64).collect()
    };
    tracing::info!("Loaded {} genotype clusters from '{}'", ids.len(), path.display());
    Ok(ids)
}

/// Read the five-column categorical table
pub fn read_records_csv(path: &Path, has_header: bool) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Cannot open categorical table '{}'", path.display()))?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let rec = result.with_context(|| format!("Bad CSV row {row} in '{}'", path.display()))?;
        ensure!(
            rec.len() == 5,
            "Row {row} of '{}' has {} columns, expected 5",
            path.display(),
            rec.len()
        );
        records.push(RawRecord::new(&rec[0], &rec[1], &rec[2], &rec[3], &rec[4]));
    }
    tracing::info!("Loaded {} categorical rows from '{}'", records.len(), path.display());
    Ok(records)
}

/// Write any array to .npy, creating the parent directory
pub fn save_npy<A, D>(path: &Path, array: &ndarray::Array<A, D>) -> Result<()>
where
    A: WritableElement,
    D: ndarray::Dimension,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    write_npy(path, array).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Saved {:?} array to '{}'", array.shape(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use std::io::Write;

    #[test]
    fn test_reads_f32_weather_as_f64() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.npy");
        let w    = Array3::<f32>::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 12 + j * 4 + k) as f32);
        save_npy(&path, &w).unwrap();

        let loader = NpySplitLoader::new(&path, "unused.csv", "unused.npy", false);
        let back   = loader.weather().unwrap();
        assert_eq!(back.dim(), (2, 3, 4));
        assert_eq!(back[[1, 2, 3]], 23.0);
    }

    #[test]
    fn test_labels_accept_column_vector() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("y.npy");
        save_npy(&path, &Array2::<f64>::from_shape_vec((3, 1), vec![0.1, 0.2, 0.3]).unwrap()).unwrap();
        assert_eq!(read_labels(&path).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_cluster_ids_from_floats() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.npy");
        save_npy(&path, &Array1::from(vec![3.0f64, 0.0, 7.0])).unwrap();
        assert_eq!(read_cluster_ids(&path).unwrap(), vec![3, 0, 7]);
    }

    #[test]
    fn test_csv_with_header() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "mg,genotype,state,year,location").unwrap();
        writeln!(f, "3.0, 12, IA_1, 2004, 101").unwrap();
        drop(f);

        let rows = read_records_csv(&path, true).unwrap();
        assert_eq!(rows, vec![RawRecord::new("3.0", "12", "IA_1", "2004", "101")]);
    }

    #[test]
    fn test_csv_wrong_column_count_fails() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "3.0,12,IA\n").unwrap();
        assert!(read_records_csv(&path, false).is_err());
    }
}
