//! Content-addressed memoization of pipeline runs.

use crate::data::{Cell, Matrix};
use crate::error::Result;
use crate::pipeline::runner::{AnalysisOutput, Pipeline};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// SHA-256 hex digest over the matrix content and every pipeline input.
///
/// The pipeline contributes its config, annotation, id column, species
/// patterns and step list (including projection settings).
pub fn cache_key(matrix: &Matrix, pipeline: &Pipeline) -> Result<String> {
    let mut hasher = Sha256::new();

    hasher.update((matrix.n_columns() as u64).to_le_bytes());
    for name in matrix.columns() {
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
    }
    hasher.update((matrix.n_rows() as u64).to_le_bytes());
    for row in matrix.rows() {
        for cell in row {
            match cell {
                Cell::Number(v) => {
                    hasher.update([b'N']);
                    hasher.update(v.to_bits().to_le_bytes());
                }
                Cell::Text(s) => {
                    hasher.update([b'T']);
                    hasher.update((s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
                Cell::Missing => hasher.update([b'M']),
            }
        }
    }

    hasher.update(serde_json::to_vec(pipeline)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Cache of completed runs keyed by [`cache_key`].
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<String, Arc<AnalysisOutput>>,
    hits: usize,
    misses: usize,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached output for these inputs, running the pipeline on a miss.
    ///
    /// The matrix is shared with the run, never copied. Failed runs are not
    /// cached.
    pub fn get_or_run(
        &mut self,
        matrix: &Arc<Matrix>,
        pipeline: &Pipeline,
    ) -> Result<Arc<AnalysisOutput>> {
        let key = cache_key(matrix, pipeline)?;
        if let Some(output) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Analysis cache hit {}", &key[..12]);
            return Ok(Arc::clone(output));
        }
        self.misses += 1;
        log::debug!("Analysis cache miss {}", &key[..12]);
        let output = Arc::new(pipeline.run_shared(Arc::clone(matrix))?);
        self.entries.insert(key, Arc::clone(&output));
        Ok(output)
    }

    /// Cached output for a key, if any.
    pub fn get(&self, key: &str) -> Option<Arc<AnalysisOutput>> {
        self.entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation or the last clear.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::data::{Condition, SampleAnnotation};
    use crate::reduce::PcaConfig;

    fn create_test_matrix() -> Matrix {
        let columns: Vec<String> = ["Protein", "S1", "S2", "S3", "S4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<Cell>> = [
            ["P1", "100", "104", "400", "410"],
            ["P2", "200", "198", "202", "199"],
        ]
        .iter()
        .map(|row| row.iter().map(|&s| Cell::parse(s)).collect())
        .collect();
        Matrix::new(columns, rows).unwrap()
    }

    #[test]
    fn test_key_changes_with_any_input() {
        let matrix = create_test_matrix();
        let pipeline = Pipeline::new(AnalysisConfig::default());
        let base = cache_key(&matrix, &pipeline).unwrap();
        assert_eq!(base.len(), 64);
        assert_eq!(base, cache_key(&matrix, &pipeline.clone()).unwrap());

        // Matrix content.
        let mut rows = matrix.rows().to_vec();
        rows[0][1] = Cell::Number(101.0);
        let edited = Matrix::new(matrix.columns().to_vec(), rows).unwrap();
        assert_ne!(base, cache_key(&edited, &pipeline).unwrap());

        // Threshold.
        let stricter = Pipeline::new(AnalysisConfig {
            cv_cutoff_percent: 10.0,
            ..AnalysisConfig::default()
        });
        assert_ne!(base, cache_key(&matrix, &stricter).unwrap());

        // Annotation.
        let samples: Vec<String> = matrix.columns()[1..].to_vec();
        let annotation = SampleAnnotation::default_for(&samples)
            .with_override("S3", Condition::ConditionA, "C3")
            .unwrap();
        let annotated = pipeline.clone().with_annotation(annotation);
        assert_ne!(base, cache_key(&matrix, &annotated).unwrap());

        // Id column and projection settings.
        assert_ne!(base, cache_key(&matrix, &pipeline.clone().with_id_column("Protein")).unwrap());
        let no_log = Pipeline::empty(AnalysisConfig::default()).project(PcaConfig {
            log2: false,
            max_missing_fraction: 0.5,
        });
        let with_log = Pipeline::empty(AnalysisConfig::default()).project(PcaConfig::default());
        assert_ne!(
            cache_key(&matrix, &no_log).unwrap(),
            cache_key(&matrix, &with_log).unwrap()
        );
    }

    #[test]
    fn test_text_and_number_cells_hash_differently() {
        let columns = vec!["a".to_string()];
        let num = Matrix::new(columns.clone(), vec![vec![Cell::Number(5.0)]]).unwrap();
        let text = Matrix::new(columns, vec![vec![Cell::Text("5".into())]]).unwrap();
        let pipeline = Pipeline::empty(AnalysisConfig::default());
        assert_ne!(cache_key(&num, &pipeline).unwrap(), cache_key(&text, &pipeline).unwrap());
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let matrix = Arc::new(create_test_matrix());
        let pipeline = Pipeline::new(AnalysisConfig {
            cv_cutoff_percent: 50.0,
            ..AnalysisConfig::default()
        });
        let mut cache = AnalysisCache::new();

        let first = cache.get_or_run(&matrix, &pipeline).unwrap();
        let second = cache.get_or_run(&matrix, &pipeline).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), (1, 1));

        let other = Pipeline::new(AnalysisConfig {
            cv_cutoff_percent: 40.0,
            ..AnalysisConfig::default()
        });
        let third = cache.get_or_run(&matrix, &other).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);

        // The shared matrix is held only by the caller once runs finish.
        assert_eq!(Arc::strong_count(&matrix), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
