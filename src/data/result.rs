//! Result types for differential expression analysis.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Regulation label derived from fold-change magnitude alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regulation {
    /// log2FC >= threshold.
    Up,
    /// log2FC <= -threshold.
    Down,
    /// |log2FC| below threshold.
    NotSignificant,
}

impl Regulation {
    /// Classify a fold change. Does not look at the p-value.
    pub fn from_log2fc(log2fc: f64, threshold: f64) -> Self {
        if log2fc >= threshold {
            Self::Up
        } else if log2fc <= -threshold {
            Self::Down
        } else {
            Self::NotSignificant
        }
    }

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::NotSignificant => "not_significant",
        }
    }
}

/// Result for a single feature from differential expression analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    /// Feature identifier.
    pub feature_id: String,
    /// Species tag, when species patterns were supplied.
    pub species: Option<String>,
    /// CV of raw intensities in ConditionA (fraction).
    pub cv_condition_a: f64,
    /// CV of raw intensities in ConditionB (fraction).
    pub cv_condition_b: f64,
    /// Number of log2 values used in ConditionA.
    pub n_valid_a: usize,
    /// Number of log2 values used in ConditionB.
    pub n_valid_b: usize,
    /// Mean log2 intensity in ConditionA.
    pub mean_log2_a: f64,
    /// Mean log2 intensity in ConditionB.
    pub mean_log2_b: f64,
    /// mean(log2 A) - mean(log2 B).
    pub log2_fold_change: f64,
    /// Welch t-test p-value (two-sided); NaN when the test is degenerate.
    pub p_value: f64,
    /// |log2FC| >= threshold and p <= alpha.
    pub significant: bool,
    /// Magnitude-only regulation label.
    pub regulation: Regulation,
    /// Row of the source matrix.
    #[serde(skip)]
    pub source_row: usize,
}

/// Collection of per-feature results, in filtered-matrix order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureResultSet {
    /// Individual results for each feature.
    pub results: Vec<FeatureResult>,
}

impl FeatureResultSet {
    /// Create a new result set.
    pub fn new(results: Vec<FeatureResult>) -> Self {
        Self { results }
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over results.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureResult> {
        self.results.iter()
    }

    /// Significant results.
    pub fn significant(&self) -> Vec<&FeatureResult> {
        self.results.iter().filter(|r| r.significant).collect()
    }

    /// Results carrying a given regulation label.
    pub fn with_regulation(&self, regulation: Regulation) -> Vec<&FeatureResult> {
        self.results
            .iter()
            .filter(|r| r.regulation == regulation)
            .collect()
    }

    /// Results tagged with a given species.
    pub fn for_species<'a>(&'a self, species: &'a str) -> impl Iterator<Item = &'a FeatureResult> + 'a {
        self.results
            .iter()
            .filter(move |r| r.species.as_deref() == Some(species))
    }

    /// Fold changes, in result order.
    pub fn log2_fold_changes(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.log2_fold_change).collect()
    }

    /// Counts by label.
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            total: self.len(),
            significant: self.significant().len(),
            up: self.with_regulation(Regulation::Up).len(),
            down: self.with_regulation(Regulation::Down).len(),
            not_significant: self.with_regulation(Regulation::NotSignificant).len(),
        }
    }

    /// Write results to TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(File::create(path)?);
        for r in &self.results {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Summary statistics for a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total: usize,
    pub significant: usize,
    pub up: usize,
    pub down: usize,
    pub not_significant: usize,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total features tested: {}", self.total)?;
        writeln!(f, "Significant:           {}", self.significant)?;
        writeln!(f, "Up:                    {}", self.up)?;
        writeln!(f, "Down:                  {}", self.down)?;
        writeln!(f, "Not significant:       {}", self.not_significant)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn result(id: &str, fc: f64, p: f64, significant: bool) -> FeatureResult {
        FeatureResult {
            feature_id: id.to_string(),
            species: Some("HUMAN".to_string()),
            cv_condition_a: 0.05,
            cv_condition_b: 0.07,
            n_valid_a: 3,
            n_valid_b: 3,
            mean_log2_a: 20.0 + fc,
            mean_log2_b: 20.0,
            log2_fold_change: fc,
            p_value: p,
            significant,
            regulation: Regulation::from_log2fc(fc, 1.0),
            source_row: 0,
        }
    }

    #[test]
    fn test_regulation_thresholds() {
        assert_eq!(Regulation::from_log2fc(1.0, 1.0), Regulation::Up);
        assert_eq!(Regulation::from_log2fc(-1.0, 1.0), Regulation::Down);
        assert_eq!(Regulation::from_log2fc(0.99, 1.0), Regulation::NotSignificant);
        assert_eq!(Regulation::from_log2fc(-0.5, 1.0), Regulation::NotSignificant);
    }

    #[test]
    fn test_summary_keeps_labels_independent() {
        let set = FeatureResultSet::new(vec![
            result("p1", 2.0, 0.001, true),
            // Up by magnitude, not significant by p-value.
            result("p2", 1.5, 0.2, false),
            result("p3", -3.0, 0.0001, true),
            result("p4", 0.1, 0.9, false),
        ]);
        let summary = set.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.significant, 2);
        assert_eq!(summary.up, 2);
        assert_eq!(summary.down, 1);
        assert_eq!(summary.not_significant, 1);
        assert_eq!(set.for_species("HUMAN").count(), 4);

        let significant: Vec<&str> = set.significant().iter().map(|r| r.feature_id.as_str()).collect();
        assert_eq!(significant, vec!["p1", "p3"]);
        assert_eq!(set.log2_fold_changes(), vec![2.0, 1.5, -3.0, 0.1]);
    }

    #[test]
    fn test_to_tsv_header() {
        let set = FeatureResultSet::new(vec![result("p1", 2.0, 0.001, true)]);
        let file = NamedTempFile::new().unwrap();
        set.to_tsv(file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.starts_with("feature_id\tspecies\tcv_condition_a"));
        assert!(header.ends_with("significant\tregulation"));
        assert!(content.contains("\tup"));
    }
}
