//! Two-component PCA projection of samples for quality control.

use crate::data::{Condition, IntensityMatrix, SampleAnnotation};
use crate::error::{DiaError, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

/// Configuration for the sample projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// log2-transform valid intensities before projecting.
    pub log2: bool,
    /// Features missing in more than this fraction of samples are dropped.
    pub max_missing_fraction: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            log2: true,
            max_missing_fraction: 0.5,
        }
    }
}

/// Coordinates of one sample on the first two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedSample {
    pub column: String,
    pub display_name: String,
    pub condition: Condition,
    pub pc1: f64,
    pub pc2: f64,
}

/// Two-component projection of all annotated samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Samples in annotation order.
    pub samples: Vec<ProjectedSample>,
    /// Fraction of total variance explained by PC1 and PC2.
    pub explained_variance_ratio: [f64; 2],
    /// Features left after dropping sparse ones.
    pub n_features_used: usize,
}

impl Projection {
    /// Look up a sample by column name.
    pub fn get(&self, column: &str) -> Option<&ProjectedSample> {
        self.samples.iter().find(|s| s.column == column)
    }
}

/// Project the annotated samples onto the first two principal components.
///
/// Sparse features are dropped and remaining gaps are filled with the
/// feature mean. The decomposition works on the samples × samples Gram
/// matrix, and each axis is oriented so that its largest-magnitude
/// coordinate is positive; the result is identical across runs.
pub fn project_samples(
    intensities: &IntensityMatrix,
    annotation: &SampleAnnotation,
    config: &PcaConfig,
) -> Result<Projection> {
    let labels = annotation.labels();
    let n_samples = labels.len();
    if n_samples < 2 {
        return Err(DiaError::InvalidParameter(format!(
            "PCA needs at least 2 samples, got {}",
            n_samples
        )));
    }
    let sample_cols = intensities.sample_indices(&annotation.columns())?;

    // Sample values per feature, with gaps imputed.
    let max_missing = config.max_missing_fraction * n_samples as f64;
    let mut features: Vec<Vec<f64>> = Vec::new();
    for row in 0..intensities.n_features() {
        let values: Vec<Option<f64>> = sample_cols
            .iter()
            .map(|&c| {
                let v = intensities.get(row, c)?;
                if config.log2 {
                    (v > 0.0).then(|| v.log2())
                } else {
                    Some(v)
                }
            })
            .collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let n_missing = n_samples - present.len();
        if present.is_empty() || n_missing as f64 > max_missing {
            continue;
        }
        let fill = present.iter().sum::<f64>() / present.len() as f64;
        features.push(values.iter().map(|v| v.unwrap_or(fill)).collect());
    }

    let n_features = features.len();
    if n_features == 0 {
        return Err(DiaError::EmptyData(
            "No features left for PCA after dropping sparse features".to_string(),
        ));
    }

    // Samples × features, mean-centered per feature.
    let mut x = DMatrix::from_fn(n_samples, n_features, |s, f| features[f][s]);
    for mut col in x.column_iter_mut() {
        let m = col.mean();
        col.add_scalar_mut(-m);
    }

    let gram = &x * x.transpose();
    if gram.iter().any(|v| !v.is_finite()) {
        return Err(DiaError::Numerical(
            "Sample covariance overflowed; try a log2 projection".to_string(),
        ));
    }
    let eigen = SymmetricEigen::new(gram);

    let mut order: Vec<usize> = (0..n_samples).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let eigenvalues: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
    let total: f64 = eigenvalues.iter().sum();
    let tol = total * 1e-12;

    let mut coords = [vec![0.0; n_samples], vec![0.0; n_samples]];
    let mut ratios = [0.0; 2];
    for (k, axis) in coords.iter_mut().enumerate() {
        let Some(&lambda) = eigenvalues.get(k) else {
            break;
        };
        if lambda <= tol {
            continue;
        }
        let vector = eigen.eigenvectors.column(order[k]);
        let scale = lambda.sqrt();
        for (s, c) in axis.iter_mut().enumerate() {
            *c = vector[s] * scale;
        }
        orient(axis);
        ratios[k] = lambda / total;
    }

    let samples = labels
        .iter()
        .enumerate()
        .map(|(s, label)| ProjectedSample {
            column: label.column.clone(),
            display_name: label.display_name.clone(),
            condition: label.condition,
            pc1: coords[0][s],
            pc2: coords[1][s],
        })
        .collect();

    log::info!(
        "Projected {} samples over {} features (PC1 {:.1}%, PC2 {:.1}%)",
        n_samples,
        n_features,
        ratios[0] * 100.0,
        ratios[1] * 100.0
    );

    Ok(Projection {
        samples,
        explained_variance_ratio: ratios,
        n_features_used: n_features,
    })
}

/// Flip an axis so its largest-magnitude coordinate is positive.
fn orient(axis: &mut [f64]) {
    let pivot = axis
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        axis.iter_mut().for_each(|v| *v = -*v);
    }
}
