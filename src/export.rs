//! Writers for analysis results: tables, metrics and the full bundle.

use crate::benchmark::BenchmarkMetrics;
use crate::data::FeatureResult;
use crate::error::Result;
use crate::pipeline::AnalysisOutput;
use crate::reduce::Projection;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Result columns appended to the filtered matrix.
const RESULT_COLUMNS: &[&str] = &[
    "n_valid_a",
    "n_valid_b",
    "mean_log2_a",
    "mean_log2_b",
    "log2_fold_change",
    "p_value",
    "significant",
    "regulation",
];

fn result_fields(result: Option<&FeatureResult>) -> Vec<String> {
    match result {
        Some(r) => vec![
            r.n_valid_a.to_string(),
            r.n_valid_b.to_string(),
            r.mean_log2_a.to_string(),
            r.mean_log2_b.to_string(),
            r.log2_fold_change.to_string(),
            r.p_value.to_string(),
            r.significant.to_string(),
            r.regulation.name().to_string(),
        ],
        None => vec![String::new(); RESULT_COLUMNS.len()],
    }
}

/// Write the filtered matrix joined with per-feature results as TSV.
///
/// Every filtered row is written; rows dropped by differential expression
/// have empty result columns.
pub fn write_results_table<P: AsRef<Path>>(output: &AnalysisOutput, path: P) -> Result<()> {
    let by_row: HashMap<usize, &FeatureResult> =
        output.results.iter().map(|r| (r.source_row, r)).collect();
    let matrix = &output.filtered.matrix;

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(File::create(path)?);

    let header: Vec<&str> = matrix
        .columns()
        .iter()
        .map(String::as_str)
        .chain(RESULT_COLUMNS.iter().copied())
        .collect();
    wtr.write_record(&header)?;

    for (row, &source_row) in matrix
        .rows()
        .iter()
        .zip(output.filtered.intensities.source_rows())
    {
        let record: Vec<String> = row
            .iter()
            .map(|c| c.render())
            .chain(result_fields(by_row.get(&source_row).copied()))
            .collect();
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write benchmark metrics as pretty JSON.
pub fn write_metrics_json<P: AsRef<Path>>(metrics: &BenchmarkMetrics, path: P) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, metrics)?;
    Ok(())
}

/// Write sample coordinates as TSV.
pub fn write_projection_table<P: AsRef<Path>>(projection: &Projection, path: P) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(File::create(path)?);
    for sample in &projection.samples {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every output of a run into `dir`, returning the paths written.
///
/// `results.tsv` and `config.yaml` are always written; `metrics.json` and
/// `projection.tsv` only when those steps produced output.
pub fn write_bundle<P: AsRef<Path>>(output: &AnalysisOutput, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let results = dir.join("results.tsv");
    write_results_table(output, &results)?;
    written.push(results);

    if let Some(metrics) = &output.metrics {
        let path = dir.join("metrics.json");
        write_metrics_json(metrics, &path)?;
        written.push(path);
    }

    if let Some(projection) = &output.projection {
        let path = dir.join("projection.tsv");
        write_projection_table(projection, &path)?;
        written.push(path);
    }

    let config = dir.join("config.yaml");
    output.config.save(&config)?;
    written.push(config);

    log::info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
