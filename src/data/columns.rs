//! Partition matrix columns into metadata and numeric measurements.

use crate::data::{Cell, Matrix};
use serde::{Deserialize, Serialize};

/// Kind of a matrix column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Identifier or annotation text.
    Metadata,
    /// Per-sample intensity measurements.
    Numeric,
}

/// Classification of every column of a matrix, in matrix order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    /// Metadata column names.
    pub metadata: Vec<String>,
    /// Numeric column names.
    pub numeric: Vec<String>,
}

impl ColumnClassification {
    /// Kind of a column, or `None` if the column is unknown.
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        if self.numeric.iter().any(|c| c == name) {
            Some(ColumnKind::Numeric)
        } else if self.metadata.iter().any(|c| c == name) {
            Some(ColumnKind::Metadata)
        } else {
            None
        }
    }

    /// Check if a column was classified as numeric.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.kind(name) == Some(ColumnKind::Numeric)
    }

    /// Total number of classified columns.
    pub fn len(&self) -> usize {
        self.metadata.len() + self.numeric.len()
    }

    /// Check if no columns were classified.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify the columns of a matrix.
///
/// A column is numeric as soon as any one of its cells coerces to a number;
/// it is metadata only when every cell fails coercion. A mostly-textual
/// column with a single numeric-looking entry is therefore numeric, and its
/// text cells are read as missing values downstream.
pub fn classify_columns(matrix: &Matrix) -> ColumnClassification {
    let mut metadata = Vec::new();
    let mut numeric = Vec::new();

    for (col, name) in matrix.columns().iter().enumerate() {
        let any_numeric = matrix
            .rows()
            .iter()
            .any(|row| matches!(row[col], Cell::Number(_)));
        if any_numeric {
            numeric.push(name.clone());
        } else {
            metadata.push(name.clone());
        }
    }

    log::debug!(
        "Classified {} metadata and {} numeric columns",
        metadata.len(),
        numeric.len()
    );

    ColumnClassification { metadata, numeric }
}
