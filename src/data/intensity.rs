//! Dense numeric block extracted from a matrix, with the missing-value policy applied.

use crate::data::{Cell, Condition, Matrix, SampleAnnotation};
use crate::error::{DiaError, Result};
use nalgebra::DMatrix;

/// Check whether a raw intensity counts as "not detected".
///
/// Quantification software writes exact 0 and exact 1 for features it did
/// not detect, so both are treated exactly like an absent value.
#[inline]
pub fn is_missing_value(value: f64) -> bool {
    !value.is_finite() || value == 0.0 || value == 1.0
}

/// Column positions of each condition within an [`IntensityMatrix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionGroups {
    pub condition_a: Vec<usize>,
    pub condition_b: Vec<usize>,
}

impl ConditionGroups {
    /// Column positions for one condition.
    pub fn get(&self, condition: Condition) -> &[usize] {
        match condition {
            Condition::ConditionA => &self.condition_a,
            Condition::ConditionB => &self.condition_b,
        }
    }
}

/// Intensities (features × samples) with missing cells stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityMatrix {
    /// Dense values; NaN marks a missing cell.
    values: DMatrix<f64>,
    /// Feature identifiers (row names).
    feature_ids: Vec<String>,
    /// Sample column names.
    sample_ids: Vec<String>,
    /// Row of the source matrix for each feature.
    source_rows: Vec<usize>,
}

impl IntensityMatrix {
    /// Create from dense values and identifiers.
    pub fn new(
        values: DMatrix<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = values.shape();
        if nrows != feature_ids.len() {
            return Err(DiaError::InvalidParameter(format!(
                "{} feature ids for {} rows",
                feature_ids.len(),
                nrows
            )));
        }
        if ncols != sample_ids.len() {
            return Err(DiaError::InvalidParameter(format!(
                "{} sample ids for {} columns",
                sample_ids.len(),
                ncols
            )));
        }
        let values = values.map(|v| if is_missing_value(v) { f64::NAN } else { v });
        Ok(Self {
            values,
            feature_ids,
            sample_ids,
            source_rows: (0..nrows).collect(),
        })
    }

    /// Extract the given sample columns from a matrix.
    ///
    /// Feature identifiers come from `id_column` when given; otherwise rows
    /// are named `row_<i>`. Text cells inside the sample columns, raw 0 and
    /// raw 1 all become missing.
    pub fn from_matrix(
        matrix: &Matrix,
        sample_columns: &[String],
        id_column: Option<&str>,
    ) -> Result<Self> {
        let col_indices: Vec<usize> = sample_columns
            .iter()
            .map(|name| {
                matrix
                    .column_index(name)
                    .ok_or_else(|| DiaError::MissingColumn(name.clone()))
            })
            .collect::<Result<_>>()?;

        let feature_ids: Vec<String> = match id_column {
            Some(name) => {
                let col = matrix
                    .column_index(name)
                    .ok_or_else(|| DiaError::MissingColumn(name.to_string()))?;
                matrix
                    .rows()
                    .iter()
                    .enumerate()
                    .map(|(i, row)| match &row[col] {
                        Cell::Missing => format!("row_{}", i),
                        cell => cell.render(),
                    })
                    .collect()
            }
            None => (0..matrix.n_rows()).map(|i| format!("row_{}", i)).collect(),
        };

        let n_features = matrix.n_rows();
        let n_samples = col_indices.len();
        let values = DMatrix::from_fn(n_features, n_samples, |row, j| {
            match matrix.cell(row, col_indices[j]).as_number() {
                Some(v) if !is_missing_value(v) => v,
                _ => f64::NAN,
            }
        });

        Ok(Self {
            values,
            feature_ids,
            sample_ids: sample_columns.to_vec(),
            source_rows: (0..n_features).collect(),
        })
    }

    /// Value at (row, col), `None` when missing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.values[(row, col)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Valid (non-missing) values of a row restricted to some columns.
    pub fn valid_values(&self, row: usize, cols: &[usize]) -> Vec<f64> {
        cols.iter().filter_map(|&c| self.get(row, c)).collect()
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Source matrix row of each feature.
    #[inline]
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Underlying dense values (NaN for missing).
    #[inline]
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Column position of a sample.
    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == name)
    }

    /// Column positions of several samples.
    pub fn sample_indices(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                self.sample_index(n)
                    .ok_or_else(|| DiaError::MissingColumn(n.clone()))
            })
            .collect()
    }

    /// Resolve annotated columns to positions, failing if either condition is empty.
    pub fn condition_groups(&self, annotation: &SampleAnnotation) -> Result<ConditionGroups> {
        let condition_a = self.sample_indices(&annotation.columns_for(Condition::ConditionA))?;
        let condition_b = self.sample_indices(&annotation.columns_for(Condition::ConditionB))?;
        if condition_a.is_empty() || condition_b.is_empty() {
            return Err(DiaError::Config(format!(
                "Each condition needs at least one column (got {} and {})",
                condition_a.len(),
                condition_b.len()
            )));
        }
        Ok(ConditionGroups {
            condition_a,
            condition_b,
        })
    }

    /// Keep only the given features, in the given order.
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_features()) {
            return Err(DiaError::InvalidParameter(format!(
                "Feature index {} out of bounds",
                bad
            )));
        }
        let values = DMatrix::from_fn(indices.len(), self.n_samples(), |r, c| {
            self.values[(indices[r], c)]
        });
        Ok(Self {
            values,
            feature_ids: indices.iter().map(|&i| self.feature_ids[i].clone()).collect(),
            sample_ids: self.sample_ids.clone(),
            source_rows: indices.iter().map(|&i| self.source_rows[i]).collect(),
        })
    }

    /// Total number of missing cells.
    pub fn n_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}
