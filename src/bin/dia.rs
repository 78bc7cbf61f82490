//! DIA - DIA proteomics analysis CLI
//!
//! Command-line interface for composable DIA differential expression and benchmarking.

use clap::{Parser, Subcommand, ValueEnum};
use composable_dia::benchmark::{generate_synthetic, SyntheticConfig};
use composable_dia::config::AnalysisConfig;
use composable_dia::data::{classify_columns, IntensityMatrix, Matrix, SampleAnnotation};
use composable_dia::error::{Result, Stage};
use composable_dia::export::write_bundle;
use composable_dia::pipeline::Pipeline;
use composable_dia::profile::profile_missingness;
use std::path::PathBuf;

/// Output format for profiling reports
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Composable DIA Proteomics Analysis
#[derive(Parser)]
#[command(name = "dia")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis on an abundance matrix
    Run {
        /// Path to abundance matrix (TSV or CSV)
        #[arg(short, long)]
        matrix: PathBuf,

        /// Path to analysis configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for results.tsv, metrics.json, projection.tsv and config.yaml
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Column holding feature identifiers (defaults to the first metadata column)
        #[arg(long)]
        id_column: Option<String>,
    },

    /// Profile columns, default annotation and missing values of a matrix
    Profile {
        /// Path to abundance matrix (TSV or CSV)
        #[arg(short, long)]
        matrix: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write an example analysis configuration
    Example {
        /// Output path for configuration YAML
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate a synthetic species-mixture benchmark
    Simulate {
        /// Output path for the abundance matrix TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for the matching analysis configuration
        #[arg(long)]
        config_out: Option<PathBuf>,

        /// Output path for the per-feature truth table
        #[arg(long)]
        truth_out: Option<PathBuf>,

        /// Number of features
        #[arg(long, default_value = "2000")]
        features: usize,

        /// Replicates per condition
        #[arg(long, default_value = "3")]
        replicates: usize,

        /// Fraction of cells written as missing
        #[arg(long, default_value = "0.02")]
        missing_rate: f64,

        /// Use the three-species (HUMAN, YEAST, ECOLI) mixture
        #[arg(long)]
        three_species: bool,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let env = env_logger::Env::default().default_filter_or(cli.log_level.as_str());
    env_logger::Builder::from_env(env).init();

    let result = match cli.command {
        Commands::Run {
            matrix,
            config,
            output_dir,
            id_column,
        } => cmd_run(&matrix, config.as_ref(), &output_dir, id_column.as_deref()),

        Commands::Profile { matrix, format } => cmd_profile(&matrix, format),

        Commands::Example { output } => cmd_example(&output),

        Commands::Simulate {
            output,
            config_out,
            truth_out,
            features,
            replicates,
            missing_rate,
            three_species,
            seed,
        } => {
            let base = if three_species {
                SyntheticConfig::three_species()
            } else {
                SyntheticConfig::default()
            };
            let config = base
                .with_dimensions(features, replicates)
                .with_missing_rate(missing_rate)
                .with_seed(seed);
            cmd_simulate(&config, &output, config_out.as_ref(), truth_out.as_ref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    matrix_path: &PathBuf,
    config_path: Option<&PathBuf>,
    output_dir: &PathBuf,
    id_column: Option<&str>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => AnalysisConfig::load(path).map_err(|e| e.in_stage(Stage::Configuration))?,
        None => AnalysisConfig::default(),
    };

    let mut pipeline = Pipeline::new(config);
    if let Some(column) = id_column {
        pipeline = pipeline.with_id_column(column);
    }

    eprintln!("Running analysis on {:?}...", matrix_path);
    let output = pipeline.run_path(matrix_path)?;

    eprintln!();
    eprintln!("{}", output.filtered.report);
    eprintln!("{}", output.results.summary());
    if let Some(metrics) = &output.metrics {
        eprintln!("{}", metrics);
    }

    let written = write_bundle(&output, output_dir).map_err(|e| e.in_stage(Stage::Export))?;
    for path in written {
        eprintln!("Wrote {:?}", path);
    }
    Ok(())
}

fn cmd_profile(matrix_path: &PathBuf, format: OutputFormat) -> Result<()> {
    eprintln!("Loading matrix...");
    let matrix = Matrix::from_path(matrix_path)?;

    let classification = classify_columns(&matrix);
    let annotation = SampleAnnotation::default_for(&classification.numeric);
    let id_column = classification.metadata.first().map(String::as_str);
    let intensities = IntensityMatrix::from_matrix(&matrix, &classification.numeric, id_column)?;
    let missingness = profile_missingness(&intensities);

    let profile = serde_json::json!({
        "dimensions": {
            "n_rows": matrix.n_rows(),
            "n_columns": matrix.n_columns()
        },
        "columns": classification,
        "annotation": annotation.labels(),
        "missingness": missingness
    });

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&profile)?),
        OutputFormat::Text => {
            println!("Matrix: {} rows x {} columns", matrix.n_rows(), matrix.n_columns());
            println!();
            println!("Metadata columns: {}", classification.metadata.join(", "));
            println!("Numeric columns:  {}", classification.numeric.join(", "));
            println!();
            println!("Default annotation");
            for label in annotation.labels() {
                println!(
                    "  {:<20} {:<12} {}",
                    label.column,
                    label.condition.name(),
                    label.display_name
                );
            }
            println!();
            print!("{}", missingness);
            if missingness.is_highly_missing() {
                println!();
                println!("Warning: more than half of all intensities are missing");
            }
        }
    }

    Ok(())
}

fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let config = AnalysisConfig::example();
    config.save(output_path)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn cmd_simulate(
    config: &SyntheticConfig,
    output_path: &PathBuf,
    config_out: Option<&PathBuf>,
    truth_out: Option<&PathBuf>,
) -> Result<()> {
    let data = generate_synthetic(config)?;

    data.matrix.to_tsv(output_path)?;
    eprintln!(
        "Wrote {} features x {} samples to {:?}",
        data.matrix.n_rows(),
        data.matrix.n_columns() - 1,
        output_path
    );

    if let Some(path) = config_out {
        data.analysis_config().save(path)?;
        eprintln!("Wrote analysis configuration to {:?}", path);
    }
    if let Some(path) = truth_out {
        data.truth_to_tsv(path)?;
        eprintln!("Wrote truth table to {:?}", path);
    }
    Ok(())
}
