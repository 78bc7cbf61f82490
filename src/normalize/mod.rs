//! Intensity transformations applied before statistical testing.

pub mod log2;

pub use log2::{log2_transform, Log2Matrix};
