//! Synthetic multi-species abundance matrices for benchmarking.
//!
//! Generates DIA-style intensity tables where each feature belongs to a
//! species with a known log2 fold change between ConditionA and ConditionB,
//! mirroring spiked proteome mixtures (e.g. yeast over a human background).

use crate::config::AnalysisConfig;
use crate::data::{Cell, Matrix};
use crate::error::{DiaError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One species in the synthetic mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpecies {
    /// Tag embedded in feature identifiers (`P00001_<TAG>`).
    pub tag: String,
    /// Share of features belonging to this species.
    pub fraction: f64,
    /// True log2(A / B) for every feature of this species.
    pub log2_fold_change: f64,
}

impl SyntheticSpecies {
    pub fn new(tag: &str, fraction: f64, log2_fold_change: f64) -> Self {
        Self {
            tag: tag.to_string(),
            fraction,
            log2_fold_change,
        }
    }
}

/// Configuration for synthetic data generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of features (proteins).
    pub n_features: usize,
    /// Replicates per condition.
    pub n_replicates: usize,
    pub species: Vec<SyntheticSpecies>,
    /// Mean of per-feature baseline log2 intensities.
    pub baseline_log2_mean: f64,
    /// Spread of per-feature baseline log2 intensities.
    pub baseline_log2_sd: f64,
    /// Replicate noise (sd in log2 space).
    pub noise_log2_sd: f64,
    /// Probability that a cell is reported as not detected (written as 0).
    pub missing_rate: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_features: 2000,
            n_replicates: 3,
            species: vec![
                SyntheticSpecies::new("HUMAN", 0.65, 0.0),
                SyntheticSpecies::new("YEAST", 0.35, 1.5),
            ],
            baseline_log2_mean: 20.0,
            baseline_log2_sd: 2.0,
            noise_log2_sd: 0.1,
            missing_rate: 0.02,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Human/yeast/E. coli mixture.
    pub fn three_species() -> Self {
        Self {
            species: vec![
                SyntheticSpecies::new("HUMAN", 0.6, 0.0),
                SyntheticSpecies::new("YEAST", 0.25, 1.5),
                SyntheticSpecies::new("ECOLI", 0.15, -2.0),
            ],
            ..Self::default()
        }
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set dimensions.
    pub fn with_dimensions(mut self, n_features: usize, n_replicates: usize) -> Self {
        self.n_features = n_features;
        self.n_replicates = n_replicates;
        self
    }

    /// Set missing-value rate.
    pub fn with_missing_rate(mut self, rate: f64) -> Self {
        self.missing_rate = rate.clamp(0.0, 0.99);
        self
    }

    /// Set replicate noise.
    pub fn with_noise(mut self, noise_log2_sd: f64) -> Self {
        self.noise_log2_sd = noise_log2_sd;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_features == 0 || self.n_replicates == 0 {
            return Err(DiaError::InvalidParameter(
                "Synthetic data needs at least one feature and one replicate".to_string(),
            ));
        }
        if self.species.is_empty() {
            return Err(DiaError::InvalidParameter(
                "Synthetic data needs at least one species".to_string(),
            ));
        }
        if self.species.iter().any(|s| !(s.fraction >= 0.0)) {
            return Err(DiaError::InvalidParameter(
                "Species fractions must be non-negative".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(DiaError::InvalidParameter(format!(
                "Missing rate must be in [0, 1), got {}",
                self.missing_rate
            )));
        }
        Ok(())
    }
}

/// Known truth for one generated feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticFeature {
    pub feature_id: String,
    pub species: String,
    pub true_log2fc: f64,
}

/// Result of synthetic data generation.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// `Protein` column followed by `A_1..A_n` and `B_1..B_n`.
    pub matrix: Matrix,
    pub truth: Vec<SyntheticFeature>,
    pub config: SyntheticConfig,
}

impl SyntheticData {
    /// Sample columns of ConditionA.
    pub fn condition_a_columns(&self) -> Vec<String> {
        sample_names("A", self.config.n_replicates)
    }

    /// Sample columns of ConditionB.
    pub fn condition_b_columns(&self) -> Vec<String> {
        sample_names("B", self.config.n_replicates)
    }

    /// Analysis configuration matching this dataset: explicit condition
    /// columns and the true species fold changes as expectations.
    pub fn analysis_config(&self) -> AnalysisConfig {
        let expected: BTreeMap<String, f64> = self
            .config
            .species
            .iter()
            .map(|s| (s.tag.clone(), s.log2_fold_change))
            .collect();
        AnalysisConfig {
            condition_a_columns: self.condition_a_columns(),
            condition_b_columns: self.condition_b_columns(),
            species_expected_fold_change: expected,
            ..AnalysisConfig::default()
        }
    }

    /// Write the truth table as TSV.
    pub fn truth_to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        for feature in &self.truth {
            wtr.serialize(feature)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write matrix, truth table and analysis config to a directory.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.matrix.to_tsv(dir.join("matrix.tsv"))?;
        self.truth_to_tsv(dir.join("truth.tsv"))?;
        self.analysis_config().save(dir.join("config.yaml"))?;
        Ok(())
    }
}

fn sample_names(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{}_{}", prefix, i)).collect()
}

/// Generate a synthetic matrix with known per-species fold changes.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticData> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let baseline = Normal::new(config.baseline_log2_mean, config.baseline_log2_sd)
        .map_err(|e| DiaError::InvalidParameter(e.to_string()))?;
    let noise = Normal::new(0.0, config.noise_log2_sd)
        .map_err(|e| DiaError::InvalidParameter(e.to_string()))?;

    // Allocate features to species by fraction; the last species takes the rest.
    let total: f64 = config.species.iter().map(|s| s.fraction).sum();
    let mut assignment: Vec<usize> = Vec::with_capacity(config.n_features);
    for (i, species) in config.species.iter().enumerate() {
        let n = if i + 1 == config.species.len() {
            config.n_features - assignment.len()
        } else {
            let share = if total > 0.0 { species.fraction / total } else { 0.0 };
            ((share * config.n_features as f64).round() as usize)
                .min(config.n_features - assignment.len())
        };
        assignment.extend(std::iter::repeat(i).take(n));
    }
    assignment.shuffle(&mut rng);

    let n = config.n_replicates;
    let mut columns = vec!["Protein".to_string()];
    columns.extend(sample_names("A", n));
    columns.extend(sample_names("B", n));

    let mut rows = Vec::with_capacity(config.n_features);
    let mut truth = Vec::with_capacity(config.n_features);
    for (idx, &species_idx) in assignment.iter().enumerate() {
        let species = &config.species[species_idx];
        let feature_id = format!("P{:05}_{}", idx + 1, species.tag);
        let mu: f64 = baseline.sample(&mut rng);

        let mut row = Vec::with_capacity(2 * n + 1);
        row.push(Cell::Text(feature_id.clone()));
        for shift in [species.log2_fold_change, 0.0] {
            for _ in 0..n {
                let log2_value = mu + shift + noise.sample(&mut rng);
                let cell = if rng.gen_bool(config.missing_rate) {
                    Cell::Number(0.0)
                } else {
                    Cell::Number(log2_value.exp2())
                };
                row.push(cell);
            }
        }
        rows.push(row);
        truth.push(SyntheticFeature {
            feature_id,
            species: species.tag.clone(),
            true_log2fc: species.log2_fold_change,
        });
    }

    let matrix = Matrix::new(columns, rows)?;
    log::info!(
        "Generated {} synthetic features over {} samples (seed {})",
        matrix.n_rows(),
        2 * n,
        config.seed
    );

    Ok(SyntheticData {
        matrix,
        truth,
        config: config.clone(),
    })
}
