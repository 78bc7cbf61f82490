//! Error types for the composable-dia library.

use thiserror::Error;

/// Pipeline stage names used to give failures context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Configuration,
    ColumnClassification,
    SampleAnnotation,
    QualityFilter,
    DifferentialExpression,
    Benchmark,
    Projection,
    Export,
}

impl Stage {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Configuration => "configuration",
            Self::ColumnClassification => "column classification",
            Self::SampleAnnotation => "sample annotation",
            Self::QualityFilter => "quality filter",
            Self::DifferentialExpression => "differential expression",
            Self::Benchmark => "benchmark",
            Self::Projection => "projection",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DiaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input at line {line}: {message}")]
    Ingestion { line: usize, message: String },

    #[error("Duplicate column '{0}' in matrix header")]
    DuplicateColumn(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<DiaError>,
    },

    #[error("Invalid species pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiaError {
    /// Wrap this error with the stage it occurred in.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            // Keep the innermost stage when errors bubble through nested stages.
            already @ DiaError::Stage { .. } => already,
            other => DiaError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DiaError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DiaError>;
