//! Data structures for DIA abundance matrices.

mod annotation;
mod columns;
mod intensity;
mod matrix;
mod result;

pub use annotation::{Condition, SampleAnnotation, SampleLabel};
pub use columns::{classify_columns, ColumnClassification, ColumnKind};
pub use intensity::{is_missing_value, ConditionGroups, IntensityMatrix};
pub use matrix::{Cell, Matrix};
pub use result::{FeatureResult, FeatureResultSet, Regulation, ResultSummary};
