//! Pipeline composition, execution and memoization.

mod cache;
mod runner;

pub use cache::{cache_key, AnalysisCache};
pub use runner::{AnalysisOutput, Pipeline, PipelineContext, PipelineStep};
