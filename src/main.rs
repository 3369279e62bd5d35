//! dynamo-replicate CLI - copy one DynamoDB table into another.

use clap::Parser;
use dynamo_replicate::telemetry::{LogFormat, init_tracing};
use dynamo_replicate::{DynamoStore, Error, ReplicationJob, Replicator, Settings, handle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dynamo-replicate")]
#[command(about = "Copy every item of a DynamoDB table into another table")]
#[command(version)]
struct Cli {
    /// Path to the JSON job descriptor ("-" or omitted reads stdin)
    #[arg(short, long)]
    job: Option<PathBuf>,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e.format_detailed(), "Failed to load configuration");
            return ExitCode::from(2);
        }
    };

    let job = match read_job(cli.job.as_deref()).await {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e.format_detailed(), "Failed to read job descriptor");
            return ExitCode::from(2);
        }
    };

    let store = DynamoStore::connect(settings.endpoint_url.as_deref()).await;
    let replicator = Replicator::new(store, settings.retry);

    if let Some(report) = handle(&replicator, &job).await {
        info!(
            cleanup = ?report.cleanup,
            migrate = ?report.migrate,
            "Replication report"
        );
    }

    ExitCode::SUCCESS
}

async fn read_job(path: Option<&Path>) -> Result<ReplicationJob, Error> {
    let json = match path {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path).await?,
        _ => {
            let mut buffer = String::new();
            let _ = tokio::io::stdin().read_to_string(&mut buffer).await?;
            buffer
        }
    };
    ReplicationJob::from_json(&json)
}
