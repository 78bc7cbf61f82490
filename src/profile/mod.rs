//! Data profiling primitives for understanding intensity matrix characteristics.

mod missingness;

pub use missingness::{profile_missingness, MissingnessProfile, SampleMissingness};
