//! Per-column log2 transformation of intensities.

use crate::data::IntensityMatrix;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Log2 intensities (features × samples) with a per-column transformed flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log2Matrix {
    /// log2 values; NaN for missing cells and for every cell of an
    /// untransformed column.
    #[serde(skip)]
    pub data: DMatrix<f64>,
    pub feature_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    /// Whether each column was log2-transformed.
    pub transformed: Vec<bool>,
}

impl Log2Matrix {
    /// log2 value at (feature, sample), `None` when missing or untransformed.
    #[inline]
    pub fn get(&self, feature: usize, sample: usize) -> Option<f64> {
        let v = self.data[(feature, sample)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Usable log2 values of a feature restricted to some columns.
    pub fn valid_values(&self, feature: usize, samples: &[usize]) -> Vec<f64> {
        samples.iter().filter_map(|&s| self.get(feature, s)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Names of columns left untransformed.
    pub fn untransformed_columns(&self) -> Vec<&str> {
        self.sample_ids
            .iter()
            .zip(&self.transformed)
            .filter(|(_, &t)| !t)
            .map(|(s, _)| s.as_str())
            .collect()
    }
}

/// Apply log2 to each column whose valid values are all strictly positive.
///
/// Missing cells do not disqualify a column. A column containing any
/// non-positive valid value is left out entirely and reported once with a
/// warning; downstream statistics never see its values.
pub fn log2_transform(intensities: &IntensityMatrix) -> Log2Matrix {
    let values = intensities.values();
    let (n_features, n_samples) = values.shape();

    let transformed: Vec<bool> = (0..n_samples)
        .into_par_iter()
        .map(|c| values.column(c).iter().filter(|v| !v.is_nan()).all(|&v| v > 0.0))
        .collect();

    let data = DMatrix::from_fn(n_features, n_samples, |r, c| {
        let v = values[(r, c)];
        if transformed[c] && !v.is_nan() {
            v.log2()
        } else {
            f64::NAN
        }
    });

    for (name, _) in intensities
        .sample_ids()
        .iter()
        .zip(&transformed)
        .filter(|(_, &t)| !t)
    {
        log::warn!(
            "Column '{}' has non-positive intensities; left untransformed and excluded",
            name
        );
    }

    Log2Matrix {
        data,
        feature_ids: intensities.feature_ids().to_vec(),
        sample_ids: intensities.sample_ids().to_vec(),
        transformed,
    }
}
