//! Differential expression between ConditionA and ConditionB.
//!
//! Log2-transform the quality-filtered intensities, run a Welch t-test per
//! feature and label each feature by fold-change magnitude and significance.

use crate::config::AnalysisConfig;
use crate::data::{FeatureResult, FeatureResultSet, Regulation, SampleAnnotation};
use crate::error::Result;
use crate::filter::QualityFiltered;
use crate::normalize::log2_transform;
use crate::stats::mean;
use crate::test::welch_t_test;
use rayon::prelude::*;

/// Compute per-feature differential expression on filtered intensities.
///
/// Features with fewer than two usable log2 values in either condition are
/// dropped. Results keep the order of the filtered matrix.
pub fn compute_differential_expression(
    filtered: &QualityFiltered,
    annotation: &SampleAnnotation,
    config: &AnalysisConfig,
) -> Result<FeatureResultSet> {
    let intensities = &filtered.intensities;
    let groups = intensities.condition_groups(annotation)?;
    let log2 = log2_transform(intensities);
    let threshold = config.fold_change_threshold;

    let results: Vec<FeatureResult> = (0..log2.n_features())
        .into_par_iter()
        .filter_map(|row| {
            let a = log2.valid_values(row, &groups.condition_a);
            let b = log2.valid_values(row, &groups.condition_b);
            let feature_id = &log2.feature_ids[row];

            let Some(test) = welch_t_test(&a, &b) else {
                log::debug!(
                    "Dropping '{}': {} and {} log2 values per condition",
                    feature_id,
                    a.len(),
                    b.len()
                );
                return None;
            };

            let (mean_a, mean_b) = (mean(&a), mean(&b));
            let log2_fold_change = mean_a - mean_b;
            let significant =
                log2_fold_change.abs() >= threshold && test.p_value <= config.alpha;
            let qc = &filtered.qc[row];

            Some(FeatureResult {
                feature_id: feature_id.clone(),
                species: qc.species.clone(),
                cv_condition_a: qc.cv_condition_a,
                cv_condition_b: qc.cv_condition_b,
                n_valid_a: a.len(),
                n_valid_b: b.len(),
                mean_log2_a: mean_a,
                mean_log2_b: mean_b,
                log2_fold_change,
                p_value: test.p_value,
                significant,
                regulation: Regulation::from_log2fc(log2_fold_change, threshold),
                source_row: intensities.source_rows()[row],
            })
        })
        .collect();

    let set = FeatureResultSet::new(results);
    let summary = set.summary();
    log::info!(
        "Tested {} of {} features: {} significant, {} up, {} down",
        summary.total,
        log2.n_features(),
        summary.significant,
        summary.up,
        summary.down
    );
    Ok(set)
}
