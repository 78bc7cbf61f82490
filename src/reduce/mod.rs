//! Dimensionality reduction for sample-level QC.

pub mod pca;

pub use pca::{project_samples, PcaConfig, ProjectedSample, Projection};
