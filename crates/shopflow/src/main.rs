use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopflow_bucket::{BucketError, BucketStore, S3BucketStore};
use shopflow_core::seed::{seed_raw_data, SeedFile};
use shopflow_core::{Pipeline, PipelineConfig, PipelineError, RunOutcome};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod report;

const EXIT_INCOMPLETE: u8 = 1;
const EXIT_ABORTED: u8 = 2;
const EXIT_CONFIGURATION: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch ETL for the shop's S3 data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract raw CSVs, clean them, build metrics and upload the results
    Run {
        /// Also print the run report as JSON
        #[arg(long)]
        report_json: bool,
    },
    /// Create the bucket if needed and upload local raw CSV files
    Seed {
        #[arg(short, long, default_value = "data/raw")]
        dir: PathBuf,
    },
    /// Verify the configured credentials can reach the bucket
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match execute(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if is_configuration_error(&err) {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::from(EXIT_ABORTED)
            }
        }
    }
}

async fn execute(command: Command) -> Result<ExitCode> {
    let config = PipelineConfig::from_env().context("failed to load pipeline configuration")?;
    let store = S3BucketStore::new(config.storage.clone())
        .await
        .context("failed to build S3 client")?;

    match command {
        Command::Run { report_json } => run_pipeline(store, config, report_json).await,
        Command::Seed { dir } => seed(&store, &config, &dir).await,
        Command::Check => check(&store).await,
    }
}

async fn run_pipeline(
    store: S3BucketStore,
    config: PipelineConfig,
    report_json: bool,
) -> Result<ExitCode> {
    let pipeline = Pipeline::new(Arc::new(store), config);
    let outcome = match pipeline.run().await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "pipeline aborted");
            eprintln!("Pipeline aborted: {err}");
            return Ok(ExitCode::from(EXIT_ABORTED));
        }
    };

    let run = outcome.run();
    println!("{}", report::outputs_table(&run.load));
    if report_json {
        let json = serde_json::to_string_pretty(run).context("failed to serialize run report")?;
        println!("{json}");
    }

    match outcome {
        RunOutcome::Completed(run) => {
            println!(
                "Run {} completed: {} outputs stored",
                run.run_id,
                run.load.succeeded_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Incomplete(run) => {
            println!(
                "Run {} incomplete: {} of {} outputs stored",
                run.run_id,
                run.load.succeeded_count(),
                run.expected_outputs()
            );
            Ok(ExitCode::from(EXIT_INCOMPLETE))
        }
    }
}

async fn seed(store: &dyn BucketStore, config: &PipelineConfig, dir: &Path) -> Result<ExitCode> {
    let files = read_seed_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no CSV files found to upload");
    }

    let report = seed_raw_data(store, config.region(), files)
        .await
        .context("failed to seed raw data")?;

    if report.bucket_created {
        println!("Created bucket {}", store.bucket());
    }
    println!("{}", report::outputs_table(&report.uploads));
    println!("Objects under raw-data/: {}", report.listed.len());
    for dataset in &report.missing {
        println!("  missing: {}", dataset.raw_key());
    }

    if report.uploads.is_complete() && report.missing.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    }
}

fn read_seed_files(dir: &Path) -> Result<Vec<SeedFile>> {
    let pattern = dir.join("*.csv");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("seed directory is not valid UTF-8: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern).context("invalid seed file pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "could not read path from glob pattern");
                continue;
            }
        };
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let contents =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        info!(file = %path.display(), bytes = contents.len(), "read seed file");
        files.push(SeedFile {
            file_name: file_name.to_string(),
            contents,
        });
    }
    Ok(files)
}

async fn check(store: &dyn BucketStore) -> Result<ExitCode> {
    let exists = store
        .bucket_exists()
        .await
        .context("failed to reach S3")?;

    if exists {
        let raw = store
            .list_objects(shopflow_core::datasets::RAW_PREFIX)
            .await
            .context("failed to list raw objects")?;
        println!(
            "Bucket {} is reachable ({} raw objects)",
            store.bucket(),
            raw.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Bucket {} does not exist", store.bucket());
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    }
}

fn is_configuration_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ) || matches!(
            cause.downcast_ref::<BucketError>(),
            Some(BucketError::Configuration(_))
        )
    })
}
