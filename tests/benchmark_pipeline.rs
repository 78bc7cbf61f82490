//! Integration tests running the full pipeline on synthetic species mixtures.

use composable_dia::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn rate(results: &FeatureResultSet, species: &str, pred: impl Fn(&FeatureResult) -> bool) -> f64 {
    let tagged: Vec<&FeatureResult> = results.for_species(species).collect();
    let hits = tagged.iter().filter(|&&r| pred(r)).count();
    hits as f64 / tagged.len() as f64
}

#[test]
fn test_two_species_mixture_recovers_yeast_shift() {
    let data = generate_synthetic(&SyntheticConfig::default()).unwrap();
    assert_eq!(data.matrix.n_rows(), 2000);
    assert_eq!(data.matrix.n_columns(), 7);

    let output = Pipeline::new(data.analysis_config()).run(&data.matrix).unwrap();

    assert_eq!(
        output.annotation.columns_for(Condition::ConditionA),
        data.condition_a_columns()
    );
    assert!(output.filtered.report.n_retained > 1500);
    assert_eq!(output.filtered.report.n_ambiguous, 0);

    let results = &output.results;
    let human_significant = rate(results, "HUMAN", |r| r.significant);
    let yeast_up = rate(results, "YEAST", |r| r.regulation == Regulation::Up);
    assert!(human_significant < 0.05, "HUMAN significant rate {}", human_significant);
    assert!(yeast_up > 0.5, "YEAST up rate {}", yeast_up);

    // Recovered yeast fold changes center on the simulated 1.5.
    let yeast: Vec<f64> = results
        .for_species("YEAST")
        .map(|r| r.log2_fold_change)
        .collect();
    let mean_fc = yeast.iter().sum::<f64>() / yeast.len() as f64;
    assert!((mean_fc - 1.5).abs() < 0.05, "mean yeast log2FC {}", mean_fc);

    let metrics = output.metrics.as_ref().unwrap();
    assert_eq!(metrics.n_tagged, results.len());
    assert!(metrics.sensitivity > 0.9);
    assert!(metrics.specificity > 0.9);
    assert!(metrics.direction_mismatch_percent < 10.0);
    // Species tags never equal a regulation label, so every tagged result counts.
    assert!((metrics.de_fdr_percent - 100.0).abs() < 1e-9);
    assert!(!metrics.verdicts.de_fdr);

    let projection = output.projection.as_ref().unwrap();
    assert_eq!(projection.samples.len(), 6);
    let side = |c: Condition| -> Vec<f64> {
        projection
            .samples
            .iter()
            .filter(|s| s.condition == c)
            .map(|s| s.pc1)
            .collect()
    };
    let a = side(Condition::ConditionA);
    let b = side(Condition::ConditionB);
    assert!(
        a.iter().all(|&x| x > 0.0) && b.iter().all(|&x| x < 0.0)
            || a.iter().all(|&x| x < 0.0) && b.iter().all(|&x| x > 0.0)
    );
    assert!(projection.explained_variance_ratio[0] > 0.5);
}

/// A true log2FC equal to the fold-change threshold lands on either side of
/// it with roughly equal odds, so only about half of that species is called up.
#[test]
fn test_fold_change_at_threshold_splits_regulation() {
    let config = SyntheticConfig {
        species: vec![
            SyntheticSpecies::new("HUMAN", 0.65, 0.0),
            SyntheticSpecies::new("YEAST", 0.35, 1.0),
        ],
        ..SyntheticConfig::default()
    };
    let data = generate_synthetic(&config).unwrap();
    let analysis = data.analysis_config();
    assert!((analysis.fold_change_threshold - 1.0).abs() < 1e-12);
    assert_eq!(analysis.species_expected_fold_change["YEAST"], 1.0);

    let output = Pipeline::new(analysis).run(&data.matrix).unwrap();
    let human_significant = rate(&output.results, "HUMAN", |r| r.significant);
    let yeast_up = rate(&output.results, "YEAST", |r| r.regulation == Regulation::Up);
    assert!(human_significant < 0.01, "HUMAN significant rate {}", human_significant);
    assert!(
        (0.35..0.65).contains(&yeast_up),
        "YEAST up rate {}",
        yeast_up
    );

    // The recovered shift is still centred on the true value.
    let yeast: Vec<f64> = output
        .results
        .for_species("YEAST")
        .map(|r| r.log2_fold_change)
        .collect();
    let mean_fc = yeast.iter().sum::<f64>() / yeast.len() as f64;
    assert!((mean_fc - 1.0).abs() < 0.05, "mean yeast log2FC {}", mean_fc);
}

#[test]
fn test_three_species_mixture() {
    let config = SyntheticConfig::three_species()
        .with_dimensions(900, 4)
        .with_seed(7);
    let data = generate_synthetic(&config).unwrap();
    let output = Pipeline::new(data.analysis_config()).run(&data.matrix).unwrap();

    let ecoli_down = rate(&output.results, "ECOLI", |r| r.regulation == Regulation::Down);
    let human_significant = rate(&output.results, "HUMAN", |r| r.significant);
    assert!(ecoli_down > 0.5, "ECOLI down rate {}", ecoli_down);
    assert!(human_significant < 0.05);
    assert!(output.metrics.is_some());
}

#[test]
fn test_simulated_files_round_trip_through_run_path() {
    let data = generate_synthetic(&SyntheticConfig::default().with_dimensions(300, 3)).unwrap();
    let dir = tempdir().unwrap();
    data.write_to_dir(dir.path()).unwrap();

    let config = AnalysisConfig::load(dir.path().join("config.yaml")).unwrap();
    assert_eq!(config, data.analysis_config());

    let from_file = Pipeline::new(config.clone())
        .run_path(dir.path().join("matrix.tsv"))
        .unwrap();
    let in_memory = Pipeline::new(config).run(&data.matrix).unwrap();

    assert_eq!(from_file.results.len(), in_memory.results.len());
    assert_eq!(from_file.filtered.report, in_memory.filtered.report);
    for (f, m) in from_file.results.iter().zip(in_memory.results.iter()) {
        assert_eq!(f.feature_id, m.feature_id);
        assert_eq!(f.regulation, m.regulation);
        assert!((f.log2_fold_change - m.log2_fold_change).abs() < 1e-9);
    }
}

#[test]
fn test_bundle_written_for_run() {
    let data = generate_synthetic(&SyntheticConfig::default().with_dimensions(200, 3)).unwrap();
    let output = Pipeline::new(data.analysis_config()).run(&data.matrix).unwrap();

    let dir = tempdir().unwrap();
    let written = write_bundle(&output, dir.path().join("out")).unwrap();
    assert_eq!(written.len(), 4);

    let results = Matrix::from_path(dir.path().join("out/results.tsv")).unwrap();
    assert_eq!(results.n_rows(), output.filtered.n_features());
    for column in ["Protein", "species", "cv_condition_a", "log2_fold_change", "regulation"] {
        assert!(results.column_index(column).is_some(), "{} missing", column);
    }
}

#[test]
fn test_default_split_on_reported_matrix() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Protein,Gene,S1,S2,S3,S4,S5,S6").unwrap();
    writeln!(file, "P1_YEAST,g1,4000,4100,3950,1000,1010,990").unwrap();
    writeln!(file, "P2_HUMAN,g2,500,510,495,505,498,502").unwrap();
    writeln!(file, "P3_HUMAN,g3,800,790,805,801,799,810").unwrap();
    writeln!(file, "P4_HUMAN,g4,0,1,NaN,801,799,810").unwrap();
    file.flush().unwrap();

    let output = Pipeline::new(AnalysisConfig::example())
        .run_path(file.path())
        .unwrap();

    assert_eq!(output.classification.metadata, vec!["Protein", "Gene"]);
    let display: Vec<&str> = output
        .annotation
        .labels()
        .iter()
        .map(|l| l.display_name.as_str())
        .collect();
    assert_eq!(display, vec!["C1", "C2", "C3", "T1", "T2", "T3"]);

    // P4 has no valid ConditionA value.
    assert_eq!(output.filtered.report.n_incomplete, 1);
    let up = output.results.with_regulation(Regulation::Up);
    assert_eq!(up.len(), 1);
    assert_eq!(up[0].feature_id, "P1_YEAST");
}
