//! Benchmarking utilities for evaluating differential expression results.
//!
//! This module scores results against known per-species fold changes and
//! generates synthetic mixtures with known ground truth.

mod generate;
mod metrics;

pub use generate::{
    generate_synthetic, SyntheticConfig, SyntheticData, SyntheticFeature, SyntheticSpecies,
};
pub use metrics::{
    score_benchmark, BenchmarkMetrics, BenchmarkVerdicts, ASYMMETRY_RANGE, EPSILON,
    MAX_DE_FDR_PERCENT, MAX_MEAN_CV_PERCENT,
};
