//! Reproducibility filtering on the per-condition coefficient of variation.

use crate::data::{ConditionGroups, IntensityMatrix};
use crate::error::{DiaError, Result};
use crate::stats::coefficient_of_variation;
use rayon::prelude::*;

/// CV (fraction) of raw intensities in ConditionA and ConditionB, per feature.
///
/// Undefined CVs (fewer than two valid values, or a zero mean) are NaN.
pub fn condition_cvs(intensities: &IntensityMatrix, groups: &ConditionGroups) -> Vec<(f64, f64)> {
    (0..intensities.n_features())
        .into_par_iter()
        .map(|row| {
            let a = intensities.valid_values(row, &groups.condition_a);
            let b = intensities.valid_values(row, &groups.condition_b);
            (coefficient_of_variation(&a), coefficient_of_variation(&b))
        })
        .collect()
}

/// Per-feature pass/fail: both CVs defined and at most `cutoff`.
pub fn reproducibility_mask(cvs: &[(f64, f64)], cutoff: f64) -> Vec<bool> {
    cvs.iter()
        .map(|&(a, b)| a.is_finite() && b.is_finite() && a <= cutoff && b <= cutoff)
        .collect()
}

/// Keep features whose CV in both conditions is at most `cutoff` (fraction).
pub fn filter_reproducibility(
    intensities: &IntensityMatrix,
    groups: &ConditionGroups,
    cutoff: f64,
) -> Result<IntensityMatrix> {
    if !(cutoff.is_finite() && cutoff > 0.0) {
        return Err(DiaError::InvalidParameter(format!(
            "CV cutoff must be positive, got {}",
            cutoff
        )));
    }
    let cvs = condition_cvs(intensities, groups);
    let keep: Vec<usize> = reproducibility_mask(&cvs, cutoff)
        .into_iter()
        .enumerate()
        .filter_map(|(i, pass)| pass.then_some(i))
        .collect();
    intensities.subset_features(&keep)
}
