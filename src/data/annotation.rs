//! Sample annotation: condition labels and display names for numeric columns.

use crate::error::{DiaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One of the two experimental conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Reference group (default display prefix `C`).
    #[serde(rename = "conditionA")]
    ConditionA,
    /// Comparison group (default display prefix `T`).
    #[serde(rename = "conditionB")]
    ConditionB,
}

impl Condition {
    /// Prefix used by the default display names.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ConditionA => "C",
            Self::ConditionB => "T",
        }
    }

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConditionA => "condition_a",
            Self::ConditionB => "condition_b",
        }
    }
}

/// Annotation of a single numeric column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleLabel {
    /// Numeric column name in the matrix.
    pub column: String,
    /// Assigned condition.
    pub condition: Condition,
    /// Short name used for display.
    pub display_name: String,
}

/// Condition assignment for every numeric column, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAnnotation {
    labels: Vec<SampleLabel>,
}

impl SampleAnnotation {
    /// Default split at the midpoint.
    ///
    /// The first `n / 2` columns become ConditionA (`C1..Ck`), the rest
    /// ConditionB (`T1..Tm`). For odd counts ConditionA is the smaller half.
    pub fn default_for(columns: &[String]) -> Self {
        let split = columns.len() / 2;
        let labels = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let (condition, position) = if i < split {
                    (Condition::ConditionA, i + 1)
                } else {
                    (Condition::ConditionB, i - split + 1)
                };
                SampleLabel {
                    column: column.clone(),
                    condition,
                    display_name: format!("{}{}", condition.prefix(), position),
                }
            })
            .collect();
        Self { labels }
    }

    /// Build an annotation from explicit condition column lists.
    ///
    /// Display names are `C1..` and `T1..` by position within each list.
    pub fn from_condition_columns(condition_a: &[String], condition_b: &[String]) -> Result<Self> {
        if condition_a.is_empty() || condition_b.is_empty() {
            return Err(DiaError::Config(
                "Both conditions need at least one column".to_string(),
            ));
        }
        let a: HashSet<&String> = condition_a.iter().collect();
        if let Some(shared) = condition_b.iter().find(|c| a.contains(c)) {
            return Err(DiaError::Config(format!(
                "Column '{}' is assigned to both conditions",
                shared
            )));
        }

        let mut labels = Vec::with_capacity(condition_a.len() + condition_b.len());
        for (condition, columns) in [
            (Condition::ConditionA, condition_a),
            (Condition::ConditionB, condition_b),
        ] {
            let mut seen = HashSet::new();
            for (i, column) in columns.iter().enumerate() {
                if !seen.insert(column) {
                    return Err(DiaError::Config(format!(
                        "Column '{}' listed twice for {}",
                        column,
                        condition.name()
                    )));
                }
                labels.push(SampleLabel {
                    column: column.clone(),
                    condition,
                    display_name: format!("{}{}", condition.prefix(), i + 1),
                });
            }
        }
        Ok(Self { labels })
    }

    /// Re-apply the default policy without discarding manual assignments.
    ///
    /// Columns already annotated keep their label; columns no longer in
    /// `columns` are dropped; newly seen columns get the condition the default
    /// split would give them and the lowest display number not yet taken for
    /// that condition's prefix.
    pub fn with_defaults(&self, columns: &[String]) -> Self {
        let defaults = Self::default_for(columns);
        let mut taken: HashSet<String> = defaults
            .labels
            .iter()
            .filter_map(|d| self.get(&d.column))
            .map(|l| l.display_name.clone())
            .collect();

        let labels = defaults
            .labels
            .into_iter()
            .map(|default| match self.get(&default.column) {
                Some(existing) => existing.clone(),
                None => {
                    let prefix = default.condition.prefix();
                    let display_name = (1..)
                        .map(|n| format!("{}{}", prefix, n))
                        .find(|name| !taken.contains(name))
                        .unwrap_or(default.display_name);
                    taken.insert(display_name.clone());
                    SampleLabel {
                        display_name,
                        ..default
                    }
                }
            })
            .collect();
        Self { labels }
    }

    /// Return a copy with one column renamed and reassigned.
    pub fn with_override(
        &self,
        column: &str,
        condition: Condition,
        display_name: &str,
    ) -> Result<Self> {
        let mut next = self.clone();
        let label = next
            .labels
            .iter_mut()
            .find(|l| l.column == column)
            .ok_or_else(|| DiaError::MissingColumn(column.to_string()))?;
        label.condition = condition;
        label.display_name = display_name.to_string();
        Ok(next)
    }

    /// Label for a column.
    pub fn get(&self, column: &str) -> Option<&SampleLabel> {
        self.labels.iter().find(|l| l.column == column)
    }

    /// All labels in column order.
    pub fn labels(&self) -> &[SampleLabel] {
        &self.labels
    }

    /// Column names assigned to a condition, in order.
    pub fn columns_for(&self, condition: Condition) -> Vec<String> {
        self.labels
            .iter()
            .filter(|l| l.condition == condition)
            .map(|l| l.column.clone())
            .collect()
    }

    /// All annotated column names, in order.
    pub fn columns(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.column.clone()).collect()
    }

    /// Number of annotated columns.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Check both conditions are populated.
    pub fn validate(&self) -> Result<()> {
        for condition in [Condition::ConditionA, Condition::ConditionB] {
            if !self.labels.iter().any(|l| l.condition == condition) {
                return Err(DiaError::Config(format!(
                    "No columns assigned to {}",
                    condition.name()
                )));
            }
        }
        Ok(())
    }
}
