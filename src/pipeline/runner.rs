//! Pipeline runner for composing and executing analysis steps.

use crate::benchmark::{score_benchmark, BenchmarkMetrics};
use crate::config::AnalysisConfig;
use crate::data::{
    classify_columns, ColumnClassification, FeatureResultSet, IntensityMatrix, Matrix,
    SampleAnnotation,
};
use crate::diffexp::compute_differential_expression;
use crate::error::{DiaError, Result, Stage};
use crate::filter::{filter_quality, QualityFiltered, SpeciesMatcher};
use crate::reduce::{project_samples, PcaConfig, Projection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A step in the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Split columns into metadata and numeric.
    ClassifyColumns,
    /// Assign numeric columns to conditions.
    AnnotateSamples,
    /// Species, completeness and reproducibility filters.
    FilterQuality,
    /// Welch t-test per feature on log2 intensities.
    DifferentialExpression,
    /// Score results against expected species fold changes.
    Benchmark,
    /// Two-component sample projection of the filtered intensities.
    Project { config: PcaConfig },
}

impl PipelineStep {
    /// Stage this step reports failures under.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ClassifyColumns => Stage::ColumnClassification,
            Self::AnnotateSamples => Stage::SampleAnnotation,
            Self::FilterQuality => Stage::QualityFilter,
            Self::DifferentialExpression => Stage::DifferentialExpression,
            Self::Benchmark => Stage::Benchmark,
            Self::Project { .. } => Stage::Projection,
        }
    }

    /// The full analysis, in order.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::ClassifyColumns,
            Self::AnnotateSamples,
            Self::FilterQuality,
            Self::DifferentialExpression,
            Self::Benchmark,
            Self::Project {
                config: PcaConfig::default(),
            },
        ]
    }
}

/// Builder for constructing and running analysis pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    config: AnalysisConfig,
    annotation: Option<SampleAnnotation>,
    id_column: Option<String>,
    species_patterns: Option<Vec<(String, String)>>,
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Pipeline running every standard step.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            steps: PipelineStep::standard(),
            ..Self::empty(config)
        }
    }

    /// Pipeline without steps; add them with the builder methods.
    pub fn empty(config: AnalysisConfig) -> Self {
        Self {
            config,
            annotation: None,
            id_column: None,
            species_patterns: None,
            steps: Vec::new(),
        }
    }

    /// Use an explicit annotation instead of the configured or default one.
    pub fn with_annotation(mut self, annotation: SampleAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Column holding feature identifiers.
    pub fn with_id_column(mut self, column: &str) -> Self {
        self.id_column = Some(column.to_string());
        self
    }

    /// Match species with explicit `(tag, regex)` pairs instead of literal tags.
    pub fn with_species_patterns<S: AsRef<str>, P: AsRef<str>>(mut self, patterns: &[(S, P)]) -> Self {
        self.species_patterns = Some(
            patterns
                .iter()
                .map(|(s, p)| (s.as_ref().to_string(), p.as_ref().to_string()))
                .collect(),
        );
        self
    }

    pub fn classify_columns(mut self) -> Self {
        self.steps.push(PipelineStep::ClassifyColumns);
        self
    }

    pub fn annotate_samples(mut self) -> Self {
        self.steps.push(PipelineStep::AnnotateSamples);
        self
    }

    pub fn filter_quality(mut self) -> Self {
        self.steps.push(PipelineStep::FilterQuality);
        self
    }

    pub fn differential_expression(mut self) -> Self {
        self.steps.push(PipelineStep::DifferentialExpression);
        self
    }

    pub fn benchmark(mut self) -> Self {
        self.steps.push(PipelineStep::Benchmark);
        self
    }

    /// Add the sample projection with a given configuration.
    pub fn project(mut self, config: PcaConfig) -> Self {
        self.steps.push(PipelineStep::Project { config });
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Read a matrix from disk and run the pipeline on it.
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisOutput> {
        let matrix = Matrix::from_path(path).map_err(|e| e.in_stage(Stage::Ingestion))?;
        self.run_shared(Arc::new(matrix))
    }

    /// Run the pipeline on a borrowed matrix, copying it once into the context.
    pub fn run(&self, matrix: &Matrix) -> Result<AnalysisOutput> {
        self.run_shared(Arc::new(matrix.clone()))
    }

    /// Run the pipeline on a shared matrix without copying it.
    pub fn run_shared(&self, matrix: Arc<Matrix>) -> Result<AnalysisOutput> {
        self.config
            .validate()
            .map_err(|e| e.in_stage(Stage::Configuration))?;
        log::info!(
            "Running {} steps on {} rows x {} columns",
            self.steps.len(),
            matrix.n_rows(),
            matrix.n_columns()
        );

        let mut context = PipelineContext::new(matrix, self.config.clone())
            .with_id_column(self.id_column.clone())
            .with_species_patterns(self.species_patterns.clone());
        if let Some(annotation) = &self.annotation {
            context = context.with_annotation(annotation.clone());
        }

        for step in &self.steps {
            context = context.apply(step)?;
        }

        context.finalize()
    }
}

/// Snapshot of pipeline state between steps.
///
/// Each step consumes the context and returns the next snapshot; nothing is
/// shared or mutated across steps.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    matrix: Arc<Matrix>,
    config: AnalysisConfig,
    id_column: Option<String>,
    species_patterns: Option<Vec<(String, String)>>,
    classification: Option<ColumnClassification>,
    annotation: Option<SampleAnnotation>,
    filtered: Option<QualityFiltered>,
    results: Option<FeatureResultSet>,
    metrics: Option<BenchmarkMetrics>,
    projection: Option<Projection>,
}

impl PipelineContext {
    pub fn new(matrix: Arc<Matrix>, config: AnalysisConfig) -> Self {
        Self {
            matrix,
            config,
            id_column: None,
            species_patterns: None,
            classification: None,
            annotation: None,
            filtered: None,
            results: None,
            metrics: None,
            projection: None,
        }
    }

    /// Preset the annotation used by the annotation step.
    pub fn with_annotation(mut self, annotation: SampleAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_id_column(mut self, column: Option<String>) -> Self {
        self.id_column = column;
        self
    }

    pub fn with_species_patterns(mut self, patterns: Option<Vec<(String, String)>>) -> Self {
        self.species_patterns = patterns;
        self
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn classification(&self) -> Option<&ColumnClassification> {
        self.classification.as_ref()
    }

    pub fn annotation(&self) -> Option<&SampleAnnotation> {
        self.annotation.as_ref()
    }

    pub fn filtered(&self) -> Option<&QualityFiltered> {
        self.filtered.as_ref()
    }

    pub fn results(&self) -> Option<&FeatureResultSet> {
        self.results.as_ref()
    }

    pub fn metrics(&self) -> Option<&BenchmarkMetrics> {
        self.metrics.as_ref()
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Apply one step and return the next snapshot.
    pub fn apply(self, step: &PipelineStep) -> Result<Self> {
        let stage = step.stage();
        self.apply_inner(step).map_err(|e| e.in_stage(stage))
    }

    fn apply_inner(mut self, step: &PipelineStep) -> Result<Self> {
        match step {
            PipelineStep::ClassifyColumns => {
                let classification = classify_columns(&self.matrix);
                self.config.validate_against(&classification)?;
                log::info!(
                    "Columns: {} metadata, {} numeric",
                    classification.metadata.len(),
                    classification.numeric.len()
                );
                self.classification = Some(classification);
            }

            PipelineStep::AnnotateSamples => {
                let classification = self.require_classification()?.clone();
                let annotation = match (self.annotation.take(), self.config.annotation()?) {
                    (Some(preset), _) => preset,
                    (None, Some(configured)) => configured,
                    (None, None) => SampleAnnotation::default_for(&classification.numeric),
                };
                if let Some(label) = annotation
                    .labels()
                    .iter()
                    .find(|l| !classification.is_numeric(&l.column))
                {
                    return Err(DiaError::Config(format!(
                        "Annotated column '{}' is not numeric",
                        label.column
                    )));
                }
                annotation.validate()?;
                log::info!("Annotated {} sample columns", annotation.len());
                self.annotation = Some(annotation);
            }

            PipelineStep::FilterQuality => {
                let classification = self.require_classification()?;
                let annotation = self.require_annotation()?;
                let id_column = self
                    .id_column
                    .clone()
                    .or_else(|| classification.metadata.first().cloned());
                let intensities =
                    IntensityMatrix::from_matrix(&self.matrix, &annotation.columns(), id_column.as_deref())?;
                let matcher = self.species_matcher()?;
                self.filtered = Some(filter_quality(
                    &self.matrix,
                    &intensities,
                    annotation,
                    &self.config,
                    matcher.as_ref(),
                )?);
            }

            PipelineStep::DifferentialExpression => {
                let filtered = self.filtered.as_ref().ok_or_else(|| {
                    DiaError::Pipeline(
                        "Must filter before differential expression".to_string(),
                    )
                })?;
                let annotation = self.require_annotation()?;
                self.results = Some(compute_differential_expression(
                    filtered,
                    annotation,
                    &self.config,
                )?);
            }

            PipelineStep::Benchmark => {
                let results = self.results.as_ref().ok_or_else(|| {
                    DiaError::Pipeline(
                        "Must run differential expression before benchmarking".to_string(),
                    )
                })?;
                let expected = self.config.expected_directions();
                if expected.is_empty() {
                    log::warn!("No expected species fold changes configured; skipping benchmark");
                } else if results.is_empty() {
                    log::warn!("No features survived to benchmark; skipping benchmark");
                } else {
                    self.metrics = Some(score_benchmark(results, &expected)?);
                }
            }

            PipelineStep::Project { config } => {
                let filtered = self.filtered.as_ref().ok_or_else(|| {
                    DiaError::Pipeline("Must filter before projecting samples".to_string())
                })?;
                let annotation = self.require_annotation()?;
                if filtered.is_empty() {
                    log::warn!("No features survived filtering; skipping projection");
                } else {
                    self.projection =
                        Some(project_samples(&filtered.intensities, annotation, config)?);
                }
            }
        }
        Ok(self)
    }

    fn require_classification(&self) -> Result<&ColumnClassification> {
        self.classification.as_ref().ok_or_else(|| {
            DiaError::Pipeline("Must classify columns first".to_string())
        })
    }

    fn require_annotation(&self) -> Result<&SampleAnnotation> {
        self.annotation.as_ref().ok_or_else(|| {
            DiaError::Pipeline("Must annotate samples first".to_string())
        })
    }

    fn species_matcher(&self) -> Result<Option<SpeciesMatcher>> {
        if let Some(patterns) = &self.species_patterns {
            return SpeciesMatcher::with_patterns(patterns.iter().map(|(t, p)| (t, p))).map(Some);
        }
        if self.config.species_expected_fold_change.is_empty() {
            return Ok(None);
        }
        SpeciesMatcher::from_tags(self.config.species_expected_fold_change.keys()).map(Some)
    }

    /// Collect the outputs of a completed run.
    pub fn finalize(self) -> Result<AnalysisOutput> {
        let classification = self.classification.ok_or_else(|| {
            DiaError::Pipeline("Pipeline must include column classification".to_string())
        })?;
        let annotation = self.annotation.ok_or_else(|| {
            DiaError::Pipeline("Pipeline must include sample annotation".to_string())
        })?;
        let filtered = self.filtered.ok_or_else(|| {
            DiaError::Pipeline("Pipeline must include the quality filter".to_string())
        })?;
        let results = self.results.ok_or_else(|| {
            DiaError::Pipeline("Pipeline must include differential expression".to_string())
        })?;

        Ok(AnalysisOutput {
            config: self.config.with_annotation(&annotation),
            classification,
            annotation,
            filtered,
            results,
            metrics: self.metrics,
            projection: self.projection,
        })
    }
}

/// Everything a full run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Configuration with the condition lists of the annotation actually used.
    pub config: AnalysisConfig,
    pub classification: ColumnClassification,
    pub annotation: SampleAnnotation,
    pub filtered: QualityFiltered,
    pub results: FeatureResultSet,
    pub metrics: Option<BenchmarkMetrics>,
    pub projection: Option<Projection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cell, Condition, Regulation};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> Matrix {
        let columns: Vec<String> = ["Protein", "Gene", "S1", "S2", "S3", "S4", "S5", "S6"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<Cell>> = [
            ["P1_YEAST", "g1", "4000", "4100", "3950", "1000", "1010", "990"],
            ["P2_HUMAN", "g2", "500", "510", "495", "505", "498", "502"],
            ["P3_HUMAN", "g3", "800", "0", "1", "790", "805", "810"],
            ["P4_HUMAN", "g4", "300", "305", "298", "301", "299", "303"],
            ["P5_MOUSE", "g5", "300", "305", "298", "301", "299", "303"],
        ]
        .iter()
        .map(|row| row.iter().map(|&s| Cell::parse(s)).collect())
        .collect();
        Matrix::new(columns, rows).unwrap()
    }

    fn config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.species_expected_fold_change.insert("HUMAN".into(), 0.0);
        config.species_expected_fold_change.insert("YEAST".into(), 2.0);
        config
    }

    #[test]
    fn test_standard_pipeline() {
        let output = Pipeline::new(config()).run(&create_test_matrix()).unwrap();

        assert_eq!(output.classification.metadata, vec!["Protein", "Gene"]);
        assert_eq!(output.annotation.columns_for(Condition::ConditionA), vec!["S1", "S2", "S3"]);
        assert_eq!(output.filtered.report.n_ambiguous, 1);
        assert_eq!(output.filtered.report.n_incomplete, 1);
        assert_eq!(output.results.len(), 3);

        let yeast = output.results.iter().find(|r| r.feature_id == "P1_YEAST").unwrap();
        assert_eq!(yeast.regulation, Regulation::Up);
        assert!(yeast.significant);
        assert!(output.metrics.is_some());
        assert_eq!(output.projection.as_ref().unwrap().samples.len(), 6);
        assert_eq!(output.config.condition_b_columns, vec!["S4", "S5", "S6"]);
    }

    #[test]
    fn test_context_is_snapshot_per_step() {
        let matrix = Arc::new(create_test_matrix());
        let ctx = PipelineContext::new(matrix, config());
        let classified = ctx.apply(&PipelineStep::ClassifyColumns).unwrap();
        assert!(classified.annotation().is_none());

        let before = classified.clone();
        let annotated = classified.apply(&PipelineStep::AnnotateSamples).unwrap();
        assert!(before.annotation().is_none());
        assert_eq!(annotated.annotation().unwrap().len(), 6);
        assert_eq!(annotated.matrix().n_rows(), 5);
    }

    #[test]
    fn test_step_order_errors_name_stage() {
        let err = Pipeline::empty(config())
            .classify_columns()
            .differential_expression()
            .run(&create_test_matrix())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DifferentialExpression));
    }

    #[test]
    fn test_configured_condition_columns() {
        let mut config = config();
        config.condition_a_columns = vec!["S1".into(), "S2".into(), "S3".into()];
        config.condition_b_columns = vec!["S4".into(), "S5".into()];
        let output = Pipeline::new(config).run(&create_test_matrix()).unwrap();
        assert_eq!(output.annotation.len(), 5);
        assert!(output.annotation.get("S6").is_none());
    }

    #[test]
    fn test_rerun_on_filtered_output() {
        let matrix = create_test_matrix();
        let n = matrix.n_rows();
        let tagged = matrix
            .with_column("species", vec![Cell::Text("mixed".into()); n])
            .unwrap();
        let first = Pipeline::new(config()).run(&tagged).unwrap();
        assert_eq!(first.classification.metadata, vec!["Protein", "Gene", "species"]);
        assert_eq!(first.filtered.matrix.columns().len(), tagged.n_columns() + 2);

        // Output QC columns are numeric, so pin the sample columns for the second pass.
        let mut pinned = config();
        pinned.condition_a_columns = vec!["S1".into(), "S2".into(), "S3".into()];
        pinned.condition_b_columns = vec!["S4".into(), "S5".into(), "S6".into()];
        let second = Pipeline::new(pinned).run(&first.filtered.matrix).unwrap();
        assert_eq!(second.filtered.matrix.columns(), first.filtered.matrix.columns());
        assert_eq!(second.results.len(), first.results.len());
    }

    #[test]
    fn test_non_numeric_condition_column_fails_before_filtering() {
        let mut config = config();
        config.condition_a_columns = vec!["Gene".into()];
        config.condition_b_columns = vec!["S4".into()];
        let err = Pipeline::new(config).run(&create_test_matrix()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ColumnClassification));
        assert!(err.to_string().contains("Gene"));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = AnalysisConfig {
            alpha: 0.0,
            ..config()
        };
        let err = Pipeline::new(config).run(&create_test_matrix()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Configuration));
    }

    #[test]
    fn test_no_expectations_skips_benchmark() {
        let output = Pipeline::new(AnalysisConfig::default())
            .run(&create_test_matrix())
            .unwrap();
        assert!(output.metrics.is_none());
        assert_eq!(output.filtered.report.n_ambiguous, 0);
        assert!(output.results.iter().all(|r| r.species.is_none()));
    }

    #[test]
    fn test_explicit_id_column_and_patterns() {
        let output = Pipeline::new(config())
            .with_id_column("Gene")
            .with_species_patterns(&[("HUMAN", r"^g[2-4]$"), ("YEAST", r"^g1$")])
            .run(&create_test_matrix())
            .unwrap();
        assert!(output.results.iter().any(|r| r.feature_id == "g1"));
        assert_eq!(output.filtered.report.n_ambiguous, 1);
    }

    #[test]
    fn test_run_path_ingestion_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Protein\tS1\tS2").unwrap();
        writeln!(file, "P1\t1\t2\t3").unwrap();
        let err = Pipeline::new(config()).run_path(file.path()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Ingestion));
    }

    #[test]
    fn test_pipeline_yaml_roundtrip() {
        let pipeline = Pipeline::new(config()).with_id_column("Protein");
        let yaml = serde_yaml::to_string(&pipeline).unwrap();
        let back: Pipeline = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, pipeline);
    }
}
