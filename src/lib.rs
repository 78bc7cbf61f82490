//! Composable DIA Proteomics Analysis Library
//!
//! This library provides modular primitives for analysing label-free
//! data-independent acquisition (DIA) abundance matrices: quality filtering,
//! two-condition differential expression, benchmarking against known
//! species mixtures and sample-level projection.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (Matrix, IntensityMatrix, SampleAnnotation, results)
//! - **config**: Analysis configuration (condition columns, thresholds, expectations)
//! - **profile**: Data profiling (missingness)
//! - **filter**: Feature filtering (species, completeness, reproducibility)
//! - **normalize**: Intensity transformation (log2)
//! - **test**: Hypothesis testing (Welch t-test)
//! - **diffexp**: Per-feature differential expression
//! - **benchmark**: Benchmark scoring and synthetic mixtures
//! - **reduce**: Dimensionality reduction (PCA)
//! - **pipeline**: Pipeline composition, execution and caching
//! - **export**: Result writers
//!
//! # Example
//!
//! ```no_run
//! use composable_dia::prelude::*;
//!
//! let config = AnalysisConfig::load("config.yaml").unwrap();
//! let output = Pipeline::new(config).run_path("report.tsv").unwrap();
//!
//! println!("{}", output.results.summary());
//! if let Some(metrics) = &output.metrics {
//!     println!("{}", metrics);
//! }
//! write_bundle(&output, "results").unwrap();
//! ```

pub mod benchmark;
pub mod config;
pub mod data;
pub mod diffexp;
pub mod error;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod reduce;
pub mod stats;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::benchmark::{
        generate_synthetic, score_benchmark, BenchmarkMetrics, BenchmarkVerdicts,
        SyntheticConfig, SyntheticData, SyntheticFeature, SyntheticSpecies,
    };
    pub use crate::config::{AnalysisConfig, ExpectedDirection};
    pub use crate::data::{
        classify_columns, Cell, ColumnClassification, ColumnKind, Condition, ConditionGroups,
        FeatureResult, FeatureResultSet, IntensityMatrix, Matrix, Regulation, ResultSummary,
        SampleAnnotation, SampleLabel,
    };
    pub use crate::diffexp::compute_differential_expression;
    pub use crate::error::{DiaError, Result, Stage};
    pub use crate::export::{
        write_bundle, write_metrics_json, write_projection_table, write_results_table,
    };
    pub use crate::filter::{
        filter_completeness, filter_quality, filter_reproducibility, FeatureQc, FilterReport,
        QualityFiltered, SpeciesAssignment, SpeciesMatcher,
    };
    pub use crate::normalize::{log2_transform, Log2Matrix};
    pub use crate::pipeline::{
        cache_key, AnalysisCache, AnalysisOutput, Pipeline, PipelineContext, PipelineStep,
    };
    pub use crate::profile::{profile_missingness, MissingnessProfile};
    pub use crate::reduce::{project_samples, PcaConfig, ProjectedSample, Projection};
    pub use crate::test::{welch_t_test, WelchResult};
}
