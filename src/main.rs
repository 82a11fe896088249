use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use arbor_io::{ExperimentName, ReportWriter, TableReader, TargetAggregation, TargetSpec};
use arbor_tree::{CrossValidation, ForestConfig, RemainderPolicy, Table};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Entropy decision trees and bagged forests over categorical tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

/// Shared input and output arguments.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Number of trailing score columns folded into the target
    #[arg(long, default_value_t = 3)]
    score_columns: usize,

    /// Name of the derived target column
    #[arg(long, default_value = arbor_io::DEFAULT_TARGET_NAME)]
    target_name: String,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-validate score trees on the mean of the score columns
    Kfold {
        #[command(flatten)]
        input: DataArgs,

        /// Number of contiguous folds
        #[arg(long, default_value_t = 10)]
        folds: usize,
    },

    /// Train a bagged forest on score quartiles and test it on a stratified holdout
    Forest {
        #[command(flatten)]
        input: DataArgs,

        /// Number of stratified folds; the last one is held out for testing
        #[arg(long, default_value_t = 3)]
        folds: usize,

        /// Number of trees to train
        #[arg(long, default_value_t = 4)]
        n_trees: usize,

        /// Number of best trees to report
        #[arg(long, default_value_t = 2)]
        keep: usize,

        /// Attributes sampled per split (all informative attributes if not set)
        #[arg(long)]
        max_attributes: Option<usize>,

        /// Out-of-bag rows: "by-index" or "by-value"
        #[arg(long, default_value = "by-index")]
        remainder: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct KfoldOutput {
    experiment: String,
    n_rows: usize,
    n_folds: usize,
    mean_absolute_error: f64,
    report: PathBuf,
}

#[derive(Serialize)]
struct ForestOutput {
    experiment: String,
    n_rows: usize,
    n_trees: usize,
    ensemble_accuracy: f64,
    test_accuracy: f64,
    report: PathBuf,
}

fn parse_remainder_policy(s: &str) -> Result<RemainderPolicy> {
    match s {
        "by-index" => Ok(RemainderPolicy::ByIndex),
        "by-value" => Ok(RemainderPolicy::ByValue),
        other => anyhow::bail!("unknown remainder policy: {other} (expected by-index or by-value)"),
    }
}

fn load_table(input: &DataArgs, aggregation: TargetAggregation) -> Result<Table> {
    let raw = TableReader::new(&input.data)
        .read()
        .context("failed to read input CSV")?;
    let table = TargetSpec::new(input.score_columns, aggregation)
        .with_target_name(input.target_name.as_str())
        .apply(&raw)
        .context("failed to derive target column")?;
    info!(
        n_rows = table.len(),
        n_attributes = table.header().n_attributes(),
        "table ready"
    );
    Ok(table)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Kfold { input, folds } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let table = load_table(&input, TargetAggregation::Mean)?;

            let report = CrossValidation::new(folds)?
                .with_seed(cli.seed)
                .mean_absolute_error(&table)
                .context("cross-validation failed")?;

            let writer = ReportWriter::new(&input.output_dir, experiment_name)?;
            let path = writer.write_kfold(&report)?;

            if !cli.quiet {
                println!("Mean Absolute Error: {:.5}", report.mean_absolute_error);
            }

            let output = KfoldOutput {
                experiment: input.experiment,
                n_rows: report.n_rows,
                n_folds: report.n_folds,
                mean_absolute_error: report.mean_absolute_error,
                report: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Forest {
            input,
            folds,
            n_trees,
            keep,
            max_attributes,
            remainder,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let remainder_policy = parse_remainder_policy(&remainder)?;
            let table = load_table(&input, TargetAggregation::Quartile)?;

            let config = ForestConfig::new(n_trees, keep)?
                .with_max_attributes(max_attributes)
                .with_remainder_policy(remainder_policy)
                .with_seed(cli.seed);

            let report = config
                .evaluate_holdout(&table, folds)
                .context("forest training failed")?;

            let writer = ReportWriter::new(&input.output_dir, experiment_name)?;
            let path = writer.write_forest(&report)?;

            let ensemble = report.result().confusion_matrix();
            if !cli.quiet {
                println!("{ensemble}");
                println!("{}", ensemble.pooled());
            }

            let output = ForestOutput {
                experiment: input.experiment,
                n_rows: table.len(),
                n_trees: report.result().forest().members().len(),
                ensemble_accuracy: ensemble.accuracy(),
                test_accuracy: report.test_matrix().accuracy(),
                report: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
