//! Threshold configuration and its YAML/JSON persistence.

use crate::data::{ColumnClassification, SampleAnnotation};
use crate::error::{DiaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Expected direction of a species' fold change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedDirection {
    Up,
    Down,
    Unchanged,
}

impl ExpectedDirection {
    /// Direction implied by an expected log2 fold change.
    pub fn from_log2fc(log2fc: f64) -> Self {
        if log2fc > 0.0 {
            Self::Up
        } else if log2fc < 0.0 {
            Self::Down
        } else {
            Self::Unchanged
        }
    }
}

/// Analysis thresholds plus optional explicit condition assignment.
///
/// Unknown keys are ignored on load; only the fields below are written on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Columns assigned to ConditionA (empty = default midpoint split).
    #[serde(rename = "conditionA_columns", default)]
    pub condition_a_columns: Vec<String>,
    /// Columns assigned to ConditionB (empty = default midpoint split).
    #[serde(rename = "conditionB_columns", default)]
    pub condition_b_columns: Vec<String>,
    /// Minimum number of valid measurements required in each condition.
    pub min_valid_per_group: usize,
    /// Maximum CV in each condition, in percent.
    pub cv_cutoff_percent: f64,
    /// Minimum |log2FC| to call a feature regulated.
    pub fold_change_threshold: f64,
    /// Significance level for the p-value.
    pub alpha: f64,
    /// Expected log2 fold change per species tag.
    #[serde(default)]
    pub species_expected_fold_change: BTreeMap<String, f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            condition_a_columns: Vec::new(),
            condition_b_columns: Vec::new(),
            min_valid_per_group: 2,
            cv_cutoff_percent: 20.0,
            fold_change_threshold: 1.0,
            alpha: 0.01,
            species_expected_fold_change: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DiaError::Config(e.to_string()))
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DiaError::from)
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DiaError::Config(e.to_string()))
    }

    /// Save to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(DiaError::from)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Save to a file, choosing the format from the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_json(path) {
            self.to_json()?
        } else {
            self.to_yaml()?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// CV cutoff as a fraction.
    pub fn cv_cutoff(&self) -> f64 {
        self.cv_cutoff_percent / 100.0
    }

    /// Expected direction for each configured species.
    pub fn expected_directions(&self) -> BTreeMap<String, ExpectedDirection> {
        self.species_expected_fold_change
            .iter()
            .map(|(species, &fc)| (species.clone(), ExpectedDirection::from_log2fc(fc)))
            .collect()
    }

    /// Check if explicit condition columns are configured.
    pub fn has_condition_columns(&self) -> bool {
        !self.condition_a_columns.is_empty() || !self.condition_b_columns.is_empty()
    }

    /// Validate thresholds and the explicit condition lists.
    pub fn validate(&self) -> Result<()> {
        if self.min_valid_per_group == 0 {
            return Err(DiaError::Config(
                "min_valid_per_group must be at least 1".to_string(),
            ));
        }
        if !self.cv_cutoff_percent.is_finite() || self.cv_cutoff_percent <= 0.0 {
            return Err(DiaError::Config(format!(
                "cv_cutoff_percent must be a positive number, got {}",
                self.cv_cutoff_percent
            )));
        }
        if !self.fold_change_threshold.is_finite() || self.fold_change_threshold < 0.0 {
            return Err(DiaError::Config(format!(
                "fold_change_threshold must be non-negative, got {}",
                self.fold_change_threshold
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(DiaError::Config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if let Some((species, fc)) = self
            .species_expected_fold_change
            .iter()
            .find(|(_, fc)| !fc.is_finite())
        {
            return Err(DiaError::Config(format!(
                "Expected fold change for '{}' is not finite: {}",
                species, fc
            )));
        }
        if self.has_condition_columns() {
            if self.condition_a_columns.is_empty() || self.condition_b_columns.is_empty() {
                return Err(DiaError::Config(
                    "conditionA_columns and conditionB_columns must both be non-empty"
                        .to_string(),
                ));
            }
            let a: HashSet<&String> = self.condition_a_columns.iter().collect();
            if let Some(shared) = self.condition_b_columns.iter().find(|c| a.contains(c)) {
                return Err(DiaError::Config(format!(
                    "Column '{}' appears in both conditionA_columns and conditionB_columns",
                    shared
                )));
            }
        }
        Ok(())
    }

    /// Check that the explicit condition columns exist and are numeric.
    pub fn validate_against(&self, classification: &ColumnClassification) -> Result<()> {
        for column in self
            .condition_a_columns
            .iter()
            .chain(&self.condition_b_columns)
        {
            if !classification.is_numeric(column) {
                return Err(DiaError::Config(format!(
                    "Condition column '{}' is not a numeric column of the matrix",
                    column
                )));
            }
        }
        Ok(())
    }

    /// Annotation from the explicit condition columns, if any.
    pub fn annotation(&self) -> Result<Option<SampleAnnotation>> {
        if !self.has_condition_columns() {
            return Ok(None);
        }
        SampleAnnotation::from_condition_columns(
            &self.condition_a_columns,
            &self.condition_b_columns,
        )
        .map(Some)
    }

    /// Return a copy whose condition lists mirror an annotation.
    pub fn with_annotation(&self, annotation: &SampleAnnotation) -> Self {
        use crate::data::Condition;
        Self {
            condition_a_columns: annotation.columns_for(Condition::ConditionA),
            condition_b_columns: annotation.columns_for(Condition::ConditionB),
            ..self.clone()
        }
    }

    /// Example configuration for a three-species benchmark.
    pub fn example() -> Self {
        let mut species = BTreeMap::new();
        species.insert("HUMAN".to_string(), 0.0);
        species.insert("YEAST".to_string(), 1.0);
        species.insert("ECOLI".to_string(), -2.0);
        Self {
            species_expected_fold_change: species,
            ..Self::default()
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
