use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

/// One field trial: its combined (timesteps × features) sequence,
/// flattened row-major, and its scaled yield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldSample {
    pub sequence:  Vec<f32>,
    pub timesteps: usize,
    pub features:  usize,
    pub label:     f32,
}

/// Combined tensor + scaled labels of one split
#[derive(Debug, Clone)]
pub struct YieldDataset {
    inputs: Array3<f32>,
    labels: Vec<f32>,
}

impl YieldDataset {
    pub fn new(inputs: Array3<f32>, labels: Vec<f32>) -> Result<Self> {
        ensure!(
            inputs.len_of(Axis(0)) == labels.len(),
            "{} input sequences but {} labels",
            inputs.len_of(Axis(0)),
            labels.len()
        );
        Ok(Self { inputs, labels })
    }

    pub fn timesteps(&self) -> usize { self.inputs.dim().1 }

    pub fn features(&self) -> usize { self.inputs.dim().2 }

    pub fn labels(&self) -> &[f32] { &self.labels }
}

impl Dataset<YieldSample> for YieldDataset {
    fn get(&self, index: usize) -> Option<YieldSample> {
        let label = *self.labels.get(index)?;
        let (_, timesteps, features) = self.inputs.dim();
        let sequence = self.inputs.index_axis(Axis(0), index).iter().copied().collect();
        Some(YieldSample { sequence, timesteps, features, label })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_flattens_one_sample() {
        let inputs = Array3::from_shape_fn((2, 3, 2), |(i, j, k)| (i * 6 + j * 2 + k) as f32);
        let ds     = YieldDataset::new(inputs, vec![0.5, 0.25]).unwrap();
        let s      = ds.get(1).unwrap();
        assert_eq!(s.sequence, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!((s.timesteps, s.features), (3, 2));
        assert_eq!(s.label, 0.25);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_label_count_must_match() {
        let inputs = Array3::<f32>::zeros((2, 3, 2));
        assert!(YieldDataset::new(inputs, vec![0.5]).is_err());
    }
}
