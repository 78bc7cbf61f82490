//! Benchmark metrics for multi-species mixtures with known fold changes.
//!
//! Definitions follow the published multi-species DIA benchmark, including
//! its non-standard deFDR and specificity formulas.

use crate::config::ExpectedDirection;
use crate::data::{FeatureResultSet, Regulation};
use crate::error::{DiaError, Result};
use crate::stats::{mean, median};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Guard against division by zero in ratio metrics.
pub const EPSILON: f64 = 1e-6;

/// Maximum deFDR (percent) for a passing benchmark.
pub const MAX_DE_FDR_PERCENT: f64 = 1.0;
/// Maximum mean CV (percent) for a passing benchmark.
pub const MAX_MEAN_CV_PERCENT: f64 = 5.0;
/// Accepted asymmetry range.
pub const ASYMMETRY_RANGE: (f64, f64) = (0.5, 2.0);

/// Pass/fail for each benchmark metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkVerdicts {
    pub de_fdr: bool,
    pub mean_cv: bool,
    pub asymmetry: bool,
}

impl BenchmarkVerdicts {
    /// Check if every metric passes.
    pub fn all_pass(&self) -> bool {
        self.de_fdr && self.mean_cv && self.asymmetry
    }
}

/// Benchmark scores for one result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Mean of all finite per-condition CVs, in percent.
    pub mean_cv_percent: f64,
    /// median(|log2FC|) / (mean(|log2FC|) + ε).
    pub asymmetry: f64,
    /// Percentage of tagged results whose species tag differs from their
    /// regulation label.
    pub de_fdr_percent: f64,
    /// Percentage of tagged results whose regulation label disagrees with the
    /// direction expected for their species.
    pub direction_mismatch_percent: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// TP / (TP + FN + ε).
    pub sensitivity: f64,
    /// TP / (TP + FP + ε).
    pub specificity: f64,
    /// Number of results with a species tag.
    pub n_tagged: usize,
    pub verdicts: BenchmarkVerdicts,
}

impl std::fmt::Display for BenchmarkMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |pass: bool| if pass { "PASS" } else { "FAIL" };
        writeln!(
            f,
            "Mean CV:      {:.2}%  [{}]",
            self.mean_cv_percent,
            mark(self.verdicts.mean_cv)
        )?;
        writeln!(
            f,
            "Asymmetry:    {:.3}   [{}]",
            self.asymmetry,
            mark(self.verdicts.asymmetry)
        )?;
        writeln!(
            f,
            "deFDR:        {:.2}%  [{}]",
            self.de_fdr_percent,
            mark(self.verdicts.de_fdr)
        )?;
        writeln!(f, "Sensitivity:  {:.4}", self.sensitivity)?;
        writeln!(f, "Specificity:  {:.4}", self.specificity)?;
        writeln!(
            f,
            "TP/FP/FN:     {}/{}/{}",
            self.true_positives, self.false_positives, self.false_negatives
        )?;
        Ok(())
    }
}

/// Score a result set against expected per-species directions.
///
/// Results without a species tag count toward CV and asymmetry but are left
/// out of every tag-based metric.
pub fn score_benchmark(
    results: &FeatureResultSet,
    expected: &BTreeMap<String, ExpectedDirection>,
) -> Result<BenchmarkMetrics> {
    if results.is_empty() {
        return Err(DiaError::EmptyData(
            "No differential expression results to benchmark".to_string(),
        ));
    }
    if expected.is_empty() {
        return Err(DiaError::Config(
            "No expected species fold changes configured".to_string(),
        ));
    }

    let cvs: Vec<f64> = results
        .iter()
        .flat_map(|r| [r.cv_condition_a, r.cv_condition_b])
        .filter(|cv| cv.is_finite())
        .collect();
    let mean_cv_percent = mean(&cvs) * 100.0;

    let abs_fc: Vec<f64> = results
        .log2_fold_changes()
        .into_iter()
        .map(f64::abs)
        .filter(|fc| fc.is_finite())
        .collect();
    let asymmetry = median(&abs_fc) / (mean(&abs_fc) + EPSILON);

    let mut n_tagged = 0usize;
    let mut tag_mismatch = 0usize;
    let mut direction_mismatch = 0usize;
    let (mut tp, mut fp, mut fneg) = (0usize, 0usize, 0usize);

    for (species, regulation) in results
        .iter()
        .filter_map(|r| r.species.as_deref().map(|s| (s, r.regulation)))
    {
        n_tagged += 1;
        if species != regulation.name() {
            tag_mismatch += 1;
        }
        let direction = expected.get(species).copied();
        if direction.map_or(true, |d| !matches_direction(d, regulation)) {
            direction_mismatch += 1;
        }
        let expected_up = direction == Some(ExpectedDirection::Up);
        match (regulation, expected_up) {
            (Regulation::Up, true) => tp += 1,
            (Regulation::Up, false) => fp += 1,
            (Regulation::Down, true) => fneg += 1,
            _ => {}
        }
    }

    let percent = |n: usize| {
        if n_tagged == 0 {
            f64::NAN
        } else {
            100.0 * n as f64 / n_tagged as f64
        }
    };
    let de_fdr_percent = percent(tag_mismatch);
    let direction_mismatch_percent = percent(direction_mismatch);
    let sensitivity = tp as f64 / (tp as f64 + fneg as f64 + EPSILON);
    let specificity = tp as f64 / (tp as f64 + fp as f64 + EPSILON);

    let verdicts = BenchmarkVerdicts {
        de_fdr: de_fdr_percent <= MAX_DE_FDR_PERCENT,
        mean_cv: mean_cv_percent <= MAX_MEAN_CV_PERCENT,
        asymmetry: (ASYMMETRY_RANGE.0..=ASYMMETRY_RANGE.1).contains(&asymmetry),
    };

    log::info!(
        "Benchmark over {} tagged features: deFDR {:.2}%, mean CV {:.2}%, asymmetry {:.3}",
        n_tagged,
        de_fdr_percent,
        mean_cv_percent,
        asymmetry
    );

    Ok(BenchmarkMetrics {
        mean_cv_percent,
        asymmetry,
        de_fdr_percent,
        direction_mismatch_percent,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fneg,
        sensitivity,
        specificity,
        n_tagged,
        verdicts,
    })
}

fn matches_direction(direction: ExpectedDirection, regulation: Regulation) -> bool {
    matches!(
        (direction, regulation),
        (ExpectedDirection::Up, Regulation::Up)
            | (ExpectedDirection::Down, Regulation::Down)
            | (ExpectedDirection::Unchanged, Regulation::NotSignificant)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureResult;

    fn result(species: Option<&str>, fc: f64, cv: f64) -> FeatureResult {
        FeatureResult {
            feature_id: format!("{:?}_{}", species, fc),
            species: species.map(|s| s.to_string()),
            cv_condition_a: cv,
            cv_condition_b: cv,
            n_valid_a: 3,
            n_valid_b: 3,
            mean_log2_a: 20.0 + fc,
            mean_log2_b: 20.0,
            log2_fold_change: fc,
            p_value: 0.001,
            significant: fc.abs() >= 1.0,
            regulation: Regulation::from_log2fc(fc, 1.0),
            source_row: 0,
        }
    }

    fn expected() -> BTreeMap<String, ExpectedDirection> {
        let mut map = BTreeMap::new();
        map.insert("HUMAN".to_string(), ExpectedDirection::Unchanged);
        map.insert("YEAST".to_string(), ExpectedDirection::Up);
        map
    }

    #[test]
    fn test_symmetric_asymmetry_is_one() {
        let results = FeatureResultSet::new(
            [1.5, -1.5, 1.5, -1.5, 1.5, -1.5]
                .iter()
                .map(|&fc| result(Some("HUMAN"), fc, 0.03))
                .collect(),
        );
        let metrics = score_benchmark(&results, &expected()).unwrap();
        assert!((metrics.asymmetry - 1.0).abs() < 1e-5);
        assert!(metrics.verdicts.asymmetry);
    }

    #[test]
    fn test_confusion_literal_epsilon() {
        let mut rs = Vec::new();
        // 3 TP: YEAST up
        rs.extend((0..3).map(|_| result(Some("YEAST"), 1.5, 0.02)));
        // 1 FP: HUMAN up
        rs.push(result(Some("HUMAN"), 1.2, 0.02));
        // 1 FN: YEAST down
        rs.push(result(Some("YEAST"), -1.3, 0.02));
        // Ignored by confusion counts.
        rs.push(result(Some("HUMAN"), 0.1, 0.02));
        let metrics = score_benchmark(&FeatureResultSet::new(rs), &expected()).unwrap();

        assert_eq!(metrics.true_positives, 3);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert!((metrics.sensitivity - 3.0 / 4.000001).abs() < 1e-12);
        assert!((metrics.specificity - 3.0 / 4.000001).abs() < 1e-12);
        assert!((metrics.sensitivity - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_de_fdr_compares_tag_to_label() {
        let results = FeatureResultSet::new(vec![
            result(Some("HUMAN"), 0.0, 0.02),
            result(Some("YEAST"), 1.5, 0.02),
        ]);
        let metrics = score_benchmark(&results, &expected()).unwrap();
        // Species names never equal "up"/"down"/"not_significant".
        assert!((metrics.de_fdr_percent - 100.0).abs() < 1e-12);
        assert!(!metrics.verdicts.de_fdr);
        // The direction-aware proxy sees both as correct.
        assert!(metrics.direction_mismatch_percent.abs() < 1e-12);
    }

    #[test]
    fn test_de_fdr_matches_when_tag_equals_label() {
        let results = FeatureResultSet::new(vec![
            result(Some("up"), 2.0, 0.02),
            result(Some("down"), -2.0, 0.02),
            result(Some("up"), 0.0, 0.02),
            result(Some("not_significant"), 0.0, 0.02),
        ]);
        let mut map = BTreeMap::new();
        map.insert("up".to_string(), ExpectedDirection::Up);
        let metrics = score_benchmark(&results, &map).unwrap();
        assert!((metrics.de_fdr_percent - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_untagged_results_excluded_from_tag_counts() {
        let results = FeatureResultSet::new(vec![
            result(Some("YEAST"), 1.5, 0.02),
            result(None, 3.0, 0.02),
        ]);
        let metrics = score_benchmark(&results, &expected()).unwrap();
        assert_eq!(metrics.n_tagged, 1);
        assert_eq!(metrics.false_positives, 0);
        assert_eq!(metrics.true_positives, 1);
    }

    #[test]
    fn test_mean_cv_percent() {
        let mut a = result(Some("HUMAN"), 0.0, 0.02);
        a.cv_condition_b = 0.04;
        let mut b = result(Some("HUMAN"), 0.0, 0.06);
        b.cv_condition_b = f64::NAN;
        let metrics = score_benchmark(&FeatureResultSet::new(vec![a, b]), &expected()).unwrap();
        assert!((metrics.mean_cv_percent - 4.0).abs() < 1e-9);
        assert!(metrics.verdicts.mean_cv);
    }

    #[test]
    fn test_empty_inputs_error() {
        assert!(score_benchmark(&FeatureResultSet::default(), &expected()).is_err());
        let results = FeatureResultSet::new(vec![result(Some("HUMAN"), 0.0, 0.02)]);
        assert!(score_benchmark(&results, &BTreeMap::new()).is_err());
    }
}
