//! Feature quality filters for intensity matrices.

pub mod completeness;
pub mod quality;
pub mod reproducibility;
pub mod species;

pub use completeness::{completeness_mask, filter_completeness, valid_counts};
pub use quality::{filter_quality, FeatureQc, FilterReport, QualityFiltered};
pub use reproducibility::{condition_cvs, filter_reproducibility, reproducibility_mask};
pub use species::{assign_species, SpeciesAssignment, SpeciesMatcher};
