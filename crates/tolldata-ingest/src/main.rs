//! tolldata-ingest - reference sweep and snapshot ingestion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tolldata_common::logging::{init_logging, LogConfig, LogLevel};
use tolldata_ingest::config::{CsvOptions, FetchConfig};
use tolldata_ingest::db::{self, DbConfig};
use tolldata_ingest::fetch::{ArtifactStore, FetchPool, ReferenceDownloader};
use tolldata_ingest::records::{self, SnapshotWriter};
use tolldata_ingest::references::ReferenceSource;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tolldata-ingest")]
#[command(author, version, about = "Toll data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep the recorded reference URLs and store the documents
    Fetch {
        /// Concurrent fetch workers
        #[arg(long)]
        max_workers: Option<usize>,

        /// JSON file of request headers
        #[arg(long)]
        headers: Option<PathBuf>,

        /// Directory the documents are written into
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
    },

    /// Validate a delimited export and commit it as a new snapshot
    Snapshot {
        /// Path to the pipe-delimited export
        #[arg(long)]
        csv: PathBuf,

        /// Data rows to discard after the header row
        #[arg(long)]
        skip_rows: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().with_file_prefix("tolldata-ingest");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    // Missing connection parameters abort here, before any work begins.
    let db_config = DbConfig::from_env().context("database configuration")?;
    let pool = db::create_pool(&db_config).await?;

    match cli.command {
        Command::Fetch {
            max_workers,
            headers,
            artifact_dir,
        } => {
            let mut config = FetchConfig::from_env().context("fetch configuration")?;
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if let Some(path) = headers {
                config.headers_file = Some(path);
            }
            if let Some(dir) = artifact_dir {
                config.artifact_dir = dir;
            }
            config.validate().context("fetch configuration")?;

            run_fetch(pool, config).await?;
        },
        Command::Snapshot { csv, skip_rows } => {
            let mut options = CsvOptions::default();
            if let Some(skip) = skip_rows {
                options.skip_leading_rows = skip;
            }

            run_snapshot(pool, &csv, options).await?;
        },
    }

    Ok(())
}

async fn run_fetch(pool: sqlx::PgPool, config: FetchConfig) -> Result<()> {
    let urls = ReferenceSource::new(pool)
        .load()
        .await
        .context("loading reference urls")?;
    info!(count = urls.len(), "reference urls loaded");

    let store = ArtifactStore::open(&config.artifact_dir)
        .await
        .context("opening artifact store")?;
    let max_workers = config.max_workers;
    let downloader = ReferenceDownloader::new(config).context("building downloader")?;
    let fetch_pool = FetchPool::new(downloader, store, max_workers);

    let cancel = CancellationToken::new();
    let signal_guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, aborting in-flight retries");
            signal_guard.cancel();
        }
    });

    let report = fetch_pool.fetch_all(urls, &cancel).await;
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            warn!(url = %failure.url, error = %e, "reference not retrieved");
        }
    }

    Ok(())
}

async fn run_snapshot(pool: sqlx::PgPool, csv: &Path, options: CsvOptions) -> Result<()> {
    let records = records::read_file(csv, &options)
        .with_context(|| format!("reading export {}", csv.display()))?;
    info!(rows = records.len(), "export validated");

    let snapshot = SnapshotWriter::new(pool)
        .commit(&records)
        .await
        .context("committing snapshot")?;
    info!(snapshot_id = %snapshot, "snapshot committed");

    Ok(())
}
