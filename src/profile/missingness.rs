//! Missing-value profiling for intensity matrices.

use crate::data::IntensityMatrix;
use crate::stats::median;
use serde::{Deserialize, Serialize};

/// Missing fraction of one sample column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMissingness {
    pub sample: String,
    pub missing_fraction: f64,
}

/// Profile of missing values (absent cells, text, sentinel 0/1) in an intensity matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessProfile {
    /// Total number of entries (features × samples).
    pub total_entries: usize,
    pub missing_entries: usize,
    /// Overall proportion of missing entries.
    pub missing_fraction: f64,
    /// Features without any missing value.
    pub complete_features: usize,
    /// Missing fraction per feature (row).
    #[serde(skip)]
    pub feature_missing: Vec<f64>,
    pub sample_missing: Vec<SampleMissingness>,
    pub mean_feature_missing: f64,
    pub median_feature_missing: f64,
}

impl MissingnessProfile {
    /// Check if more than half of all entries are missing.
    pub fn is_highly_missing(&self) -> bool {
        self.missing_fraction > 0.5
    }
}

impl std::fmt::Display for MissingnessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Missingness Profile")?;
        writeln!(f, "  Total entries:      {}", self.total_entries)?;
        writeln!(f, "  Missing entries:    {}", self.missing_entries)?;
        writeln!(f, "  Overall missing:    {:.2}%", self.missing_fraction * 100.0)?;
        writeln!(f, "  Complete features:  {}", self.complete_features)?;
        writeln!(f, "  Mean feature missing:   {:.2}%", self.mean_feature_missing * 100.0)?;
        writeln!(f, "  Median feature missing: {:.2}%", self.median_feature_missing * 100.0)?;
        for s in &self.sample_missing {
            writeln!(f, "  {:<20} {:.2}%", s.sample, s.missing_fraction * 100.0)?;
        }
        Ok(())
    }
}

/// Profile missing values of an intensity matrix.
pub fn profile_missingness(intensities: &IntensityMatrix) -> MissingnessProfile {
    let n_features = intensities.n_features();
    let n_samples = intensities.n_samples();
    let values = intensities.values();
    let total_entries = n_features * n_samples;
    let missing_entries = intensities.n_missing();

    let fraction = |missing: usize, of: usize| {
        if of == 0 {
            0.0
        } else {
            missing as f64 / of as f64
        }
    };

    let feature_missing: Vec<f64> = values
        .row_iter()
        .map(|row| fraction(row.iter().filter(|v| v.is_nan()).count(), n_samples))
        .collect();
    let sample_missing: Vec<SampleMissingness> = values
        .column_iter()
        .zip(intensities.sample_ids())
        .map(|(col, sample)| SampleMissingness {
            sample: sample.clone(),
            missing_fraction: fraction(col.iter().filter(|v| v.is_nan()).count(), n_features),
        })
        .collect();

    let complete_features = feature_missing.iter().filter(|&&m| m == 0.0).count();
    let mean_feature_missing = if n_features == 0 {
        0.0
    } else {
        feature_missing.iter().sum::<f64>() / n_features as f64
    };
    let median_feature_missing = if n_features == 0 {
        0.0
    } else {
        median(&feature_missing)
    };

    MissingnessProfile {
        total_entries,
        missing_entries,
        missing_fraction: fraction(missing_entries, total_entries),
        complete_features,
        feature_missing,
        sample_missing,
        mean_feature_missing,
        median_feature_missing,
    }
}
