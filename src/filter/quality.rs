//! Quality filtering: species ambiguity, completeness, then reproducibility.

use crate::config::AnalysisConfig;
use crate::data::{Cell, IntensityMatrix, Matrix, SampleAnnotation};
use crate::error::Result;
use crate::filter::completeness::completeness_mask;
use crate::filter::reproducibility::{condition_cvs, reproducibility_mask};
use crate::filter::species::{assign_species, SpeciesMatcher};
use serde::{Deserialize, Serialize};

/// Per-feature quality annotations for a surviving feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureQc {
    pub feature_id: String,
    pub species: Option<String>,
    pub cv_condition_a: f64,
    pub cv_condition_b: f64,
}

/// Counts of features removed at each filtering step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub n_input: usize,
    pub n_ambiguous: usize,
    pub n_incomplete: usize,
    pub n_irreproducible: usize,
    pub n_retained: usize,
}

impl std::fmt::Display for FilterReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Input features:        {}", self.n_input)?;
        writeln!(f, "Ambiguous species:     {}", self.n_ambiguous)?;
        writeln!(f, "Incomplete:            {}", self.n_incomplete)?;
        writeln!(f, "Irreproducible (CV):   {}", self.n_irreproducible)?;
        writeln!(f, "Retained:              {}", self.n_retained)?;
        Ok(())
    }
}

/// Output of [`filter_quality`].
#[derive(Debug, Clone)]
pub struct QualityFiltered {
    /// Surviving rows with `species`, `cv_condition_a` and `cv_condition_b` set,
    /// replacing input columns of the same name.
    pub matrix: Matrix,
    /// Surviving numeric block (source rows refer to the input matrix).
    pub intensities: IntensityMatrix,
    /// QC annotations, aligned with `intensities` rows.
    pub qc: Vec<FeatureQc>,
    pub report: FilterReport,
}

impl QualityFiltered {
    /// Number of surviving features.
    pub fn n_features(&self) -> usize {
        self.intensities.n_features()
    }

    /// Check if every feature was filtered out.
    pub fn is_empty(&self) -> bool {
        self.n_features() == 0
    }
}

/// Apply the three quality criteria in order.
///
/// `intensities` must be extracted from `matrix`, so that its source rows
/// index into it. Species assignment runs only when `matcher` is given.
pub fn filter_quality(
    matrix: &Matrix,
    intensities: &IntensityMatrix,
    annotation: &SampleAnnotation,
    config: &AnalysisConfig,
    matcher: Option<&SpeciesMatcher>,
) -> Result<QualityFiltered> {
    let groups = intensities.condition_groups(annotation)?;
    let n_input = intensities.n_features();

    // Step 1: species
    let (current, species) = match matcher {
        Some(matcher) => {
            let assigned = assign_species(intensities.feature_ids(), matcher);
            let mut keep = Vec::with_capacity(assigned.len());
            let mut tags = Vec::with_capacity(assigned.len());
            for (row, assignment) in assigned.iter().enumerate() {
                match assignment.tag() {
                    Some(tag) => {
                        keep.push(row);
                        tags.push(Some(tag.to_string()));
                    }
                    None => log::debug!(
                        "Dropping '{}': no unique species match",
                        intensities.feature_ids()[row]
                    ),
                }
            }
            (intensities.subset_features(&keep)?, tags)
        }
        None => (intensities.clone(), vec![None; n_input]),
    };
    let n_ambiguous = n_input - current.n_features();

    // Step 2: completeness
    let complete = completeness_mask(&current, &groups, config.min_valid_per_group);
    let keep = kept_indices(&current, &complete, "fewer than the minimum valid values");
    let n_incomplete = current.n_features() - keep.len();
    let species: Vec<Option<String>> = keep.iter().map(|&i| species[i].clone()).collect();
    let current = current.subset_features(&keep)?;

    // Step 3: reproducibility
    let cvs = condition_cvs(&current, &groups);
    let reproducible = reproducibility_mask(&cvs, config.cv_cutoff());
    let keep = kept_indices(&current, &reproducible, "CV above cutoff");
    let n_irreproducible = current.n_features() - keep.len();
    let filtered = current.subset_features(&keep)?;

    let qc: Vec<FeatureQc> = keep
        .iter()
        .zip(filtered.feature_ids())
        .map(|(&i, id)| FeatureQc {
            feature_id: id.clone(),
            species: species[i].clone(),
            cv_condition_a: cvs[i].0,
            cv_condition_b: cvs[i].1,
        })
        .collect();

    let out_matrix = matrix
        .subset_rows(filtered.source_rows())?
        .with_column(
            "species",
            qc.iter()
                .map(|q| q.species.as_deref().map_or(Cell::Missing, |s| Cell::Text(s.to_string())))
                .collect(),
        )?
        .with_column("cv_condition_a", qc.iter().map(|q| Cell::from(q.cv_condition_a)).collect())?
        .with_column("cv_condition_b", qc.iter().map(|q| Cell::from(q.cv_condition_b)).collect())?;

    let report = FilterReport {
        n_input,
        n_ambiguous,
        n_incomplete,
        n_irreproducible,
        n_retained: filtered.n_features(),
    };
    log::info!(
        "Quality filter kept {} of {} features ({} ambiguous, {} incomplete, {} irreproducible)",
        report.n_retained,
        report.n_input,
        report.n_ambiguous,
        report.n_incomplete,
        report.n_irreproducible
    );

    Ok(QualityFiltered {
        matrix: out_matrix,
        intensities: filtered,
        qc,
        report,
    })
}

fn kept_indices(intensities: &IntensityMatrix, mask: &[bool], reason: &str) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &pass)| {
            if !pass {
                log::debug!("Dropping '{}': {}", intensities.feature_ids()[i], reason);
            }
            pass.then_some(i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Condition;

    fn create_test_matrix() -> Matrix {
        let columns: Vec<String> = ["Protein", "A1", "A2", "A3", "B1", "B2", "B3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<Cell>> = [
            // passes everything
            ["P1_HUMAN", "100", "102", "98", "100", "101", "99"],
            // one valid in A out of 3
            ["P2_HUMAN", "100", "0", "1", "100", "101", "99"],
            // high CV in B
            ["P3_YEAST", "100", "102", "98", "50", "200", "120"],
            // matches no species
            ["P4_MOUSE", "100", "102", "98", "100", "101", "99"],
            // matches two species
            ["P5_HUMAN;P6_YEAST", "100", "102", "98", "100", "101", "99"],
            // passes, two valid per group
            ["P7_YEAST", "400", "", "410", "200", "NA", "205"],
        ]
        .iter()
        .map(|row| row.iter().map(|&s| Cell::parse(s)).collect())
        .collect();
        Matrix::new(columns, rows).unwrap()
    }

    fn setup() -> (Matrix, IntensityMatrix, SampleAnnotation) {
        let matrix = create_test_matrix();
        let samples: Vec<String> = matrix.columns()[1..].to_vec();
        let intensities = IntensityMatrix::from_matrix(&matrix, &samples, Some("Protein")).unwrap();
        let annotation = SampleAnnotation::default_for(&samples);
        (matrix, intensities, annotation)
    }

    #[test]
    fn test_filter_quality_steps() {
        let (matrix, intensities, annotation) = setup();
        let config = AnalysisConfig::default();
        let matcher = SpeciesMatcher::from_tags(["HUMAN", "YEAST"]).unwrap();

        let out = filter_quality(&matrix, &intensities, &annotation, &config, Some(&matcher)).unwrap();

        assert_eq!(out.intensities.feature_ids(), &["P1_HUMAN", "P7_YEAST"]);
        assert_eq!(out.intensities.source_rows(), &[0, 5]);
        assert_eq!(
            out.report,
            FilterReport {
                n_input: 6,
                n_ambiguous: 2,
                n_incomplete: 1,
                n_irreproducible: 1,
                n_retained: 2,
            }
        );
        assert_eq!(out.qc[1].species.as_deref(), Some("YEAST"));
        assert!(out.qc.iter().all(|q| q.cv_condition_a <= 0.2 && q.cv_condition_b <= 0.2));
    }

    #[test]
    fn test_output_matrix_has_qc_columns() {
        let (matrix, intensities, annotation) = setup();
        let matcher = SpeciesMatcher::from_tags(["HUMAN", "YEAST"]).unwrap();
        let out = filter_quality(
            &matrix,
            &intensities,
            &annotation,
            &AnalysisConfig::default(),
            Some(&matcher),
        )
        .unwrap();

        assert_eq!(out.matrix.n_rows(), 2);
        let n = out.matrix.n_columns();
        assert_eq!(
            &out.matrix.columns()[n - 3..],
            &["species", "cv_condition_a", "cv_condition_b"]
        );
        let species: Vec<String> = out.matrix.column("species").unwrap().map(|c| c.render()).collect();
        assert_eq!(species, vec!["HUMAN", "YEAST"]);
        // Source matrix untouched.
        assert_eq!(matrix.n_rows(), 6);
    }

    #[test]
    fn test_existing_qc_columns_are_replaced() {
        let (matrix, intensities, annotation) = setup();
        let n = matrix.n_rows();
        let with_species = matrix
            .with_column("species", vec![Cell::Text("unknown".into()); n])
            .unwrap();
        let matcher = SpeciesMatcher::from_tags(["HUMAN", "YEAST"]).unwrap();
        let out = filter_quality(
            &with_species,
            &intensities,
            &annotation,
            &AnalysisConfig::default(),
            Some(&matcher),
        )
        .unwrap();

        assert_eq!(out.matrix.n_columns(), with_species.n_columns() + 2);
        assert_eq!(out.matrix.column_index("species"), with_species.column_index("species"));
        let species: Vec<String> = out.matrix.column("species").unwrap().map(|c| c.render()).collect();
        assert_eq!(species, vec!["HUMAN", "YEAST"]);

        // Filtering the output again keeps one copy of each QC column.
        let again_int = IntensityMatrix::from_matrix(
            &out.matrix,
            &annotation.columns(),
            Some("Protein"),
        )
        .unwrap();
        let again = filter_quality(
            &out.matrix,
            &again_int,
            &annotation,
            &AnalysisConfig::default(),
            Some(&matcher),
        )
        .unwrap();
        assert_eq!(again.matrix.columns(), out.matrix.columns());
        assert_eq!(again.report.n_retained, 2);
    }

    #[test]
    fn test_without_matcher_keeps_untagged() {
        let (matrix, intensities, annotation) = setup();
        let out = filter_quality(&matrix, &intensities, &annotation, &AnalysisConfig::default(), None)
            .unwrap();
        assert_eq!(out.report.n_ambiguous, 0);
        assert_eq!(out.n_features(), 4);
        assert!(out.qc.iter().all(|q| q.species.is_none()));
    }

    #[test]
    fn test_survivors_meet_thresholds() {
        let (matrix, intensities, annotation) = setup();
        let groups = intensities.condition_groups(&annotation).unwrap();
        for min_valid in 1..=3 {
            let config = AnalysisConfig {
                min_valid_per_group: min_valid,
                cv_cutoff_percent: 50.0,
                ..AnalysisConfig::default()
            };
            let out = filter_quality(&matrix, &intensities, &annotation, &config, None).unwrap();
            for row in 0..out.n_features() {
                for cond in [Condition::ConditionA, Condition::ConditionB] {
                    assert!(out.intensities.valid_values(row, groups.get(cond)).len() >= min_valid);
                }
            }
        }
    }

    #[test]
    fn test_missing_condition_column_fails() {
        let (matrix, intensities, _) = setup();
        let bad = SampleAnnotation::from_condition_columns(&["A1".to_string()], &["Z9".to_string()]).unwrap();
        assert!(filter_quality(&matrix, &intensities, &bad, &AnalysisConfig::default(), None).is_err());
    }
}
