//! Completeness filtering: minimum valid measurements per condition.

use crate::data::{ConditionGroups, IntensityMatrix};
use crate::error::{DiaError, Result};
use rayon::prelude::*;

/// Number of valid values per feature within a set of columns.
pub fn valid_counts(intensities: &IntensityMatrix, columns: &[usize]) -> Vec<usize> {
    (0..intensities.n_features())
        .into_par_iter()
        .map(|row| columns.iter().filter(|&&c| intensities.get(row, c).is_some()).count())
        .collect()
}

/// Per-feature pass/fail for the completeness criterion.
///
/// A feature passes only when ConditionA and ConditionB each have at least
/// `min_valid` valid values. The two group masks are combined row by row.
pub fn completeness_mask(
    intensities: &IntensityMatrix,
    groups: &ConditionGroups,
    min_valid: usize,
) -> Vec<bool> {
    let a_ok: Vec<bool> = valid_counts(intensities, &groups.condition_a)
        .into_iter()
        .map(|n| n >= min_valid)
        .collect();
    let b_ok: Vec<bool> = valid_counts(intensities, &groups.condition_b)
        .into_iter()
        .map(|n| n >= min_valid)
        .collect();
    a_ok.iter().zip(&b_ok).map(|(&a, &b)| a && b).collect()
}

/// Keep features meeting the completeness criterion in both conditions.
pub fn filter_completeness(
    intensities: &IntensityMatrix,
    groups: &ConditionGroups,
    min_valid: usize,
) -> Result<IntensityMatrix> {
    if min_valid == 0 {
        return Err(DiaError::InvalidParameter(
            "Minimum valid values must be at least 1".to_string(),
        ));
    }
    let keep: Vec<usize> = completeness_mask(intensities, groups, min_valid)
        .into_iter()
        .enumerate()
        .filter_map(|(i, pass)| pass.then_some(i))
        .collect();
    intensities.subset_features(&keep)
}
