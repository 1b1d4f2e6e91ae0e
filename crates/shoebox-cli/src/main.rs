//! shoebox: archive photos and videos into blob storage by capture date.
//!
//! Storage, enrichment and cost settings come from the environment (or a
//! `.env` file); run options come from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use shoebox_archiver::{
    ArchivePipeline, CostEstimator, LocalFileSource, LogProgress, RetrieveOptions, Retriever,
};
use shoebox_cli::enrichment::attach_plugins;
use shoebox_cli::init_tracing;
use shoebox_cli::summary::{archive_summary, cost_summary, retrieve_summary};
use shoebox_core::{AccessTier, ArchiverConfig, ConflictResolution, DownloadOptions, UploadOptions};
use shoebox_storage::create_blob_store;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "shoebox", about = "Archive media files into blob storage by capture date")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive every matching file under a directory
    Upload {
        /// Directory to archive
        path: PathBuf,
        /// Glob matched against paths relative to the directory
        #[arg(long, default_value = "**/*")]
        search_pattern: String,
        /// Number of files to skip after sorting by path
        #[arg(long, default_value = "0")]
        skip: usize,
        /// Maximum number of files to process
        #[arg(long)]
        take: Option<usize>,
        /// Skip files whose content was already archived under any name
        #[arg(long)]
        deduplicate: bool,
        /// skip, keep-both, snapshot-and-overwrite or overwrite
        #[arg(long, default_value = "skip")]
        conflict_resolution: ConflictResolution,
        /// Re-read the stored hash after uploading
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        verify: bool,
        /// Delete local files once archived
        #[arg(long)]
        delete: bool,
        /// hot, cool, cold or archive
        #[arg(long, default_value = "cool")]
        access_tier: AccessTier,
        /// Parallel block transfers per upload
        #[arg(long)]
        parallel_block_count: Option<usize>,
    },
    /// Download files archived on a date (or date range) into a directory
    Download {
        /// First capture date (YYYY-MM-DD)
        date: NaiveDate,
        /// Target directory
        path: PathBuf,
        /// Last capture date, inclusive
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Only files tagged with any of these (comma separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Only files showing any of these people (comma separated)
        #[arg(long, value_delimiter = ',')]
        people: Vec<String>,
        /// Check downloaded content against the stored hash
        #[arg(long)]
        verify: bool,
        /// Move blobs back to the archive tier once downloaded
        #[arg(long)]
        archive: bool,
        /// Tier archived blobs are rehydrated to
        #[arg(long, default_value = "hot")]
        rehydration_tier: AccessTier,
    },
    /// Resume downloads still waiting on rehydration
    Continue {
        #[arg(long)]
        verify: bool,
        #[arg(long)]
        archive: bool,
        #[arg(long, default_value = "hot")]
        rehydration_tier: AccessTier,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = ArchiverConfig::from_env().context("Failed to load configuration")?;
    let store = create_blob_store(&config)
        .await
        .context("Failed to initialize blob storage")?;
    let costs = Arc::new(CostEstimator::new());
    let cancel = shutdown_token();
    let progress = LogProgress::new();
    let started = Instant::now();

    let (lines, has_errors) = match cli.command {
        Commands::Upload {
            path,
            search_pattern,
            skip,
            take,
            deduplicate,
            conflict_resolution,
            verify,
            delete,
            access_tier,
            parallel_block_count,
        } => {
            let options = UploadOptions {
                search_pattern,
                skip,
                take,
                deduplicate,
                conflict_resolution,
                verify,
                delete,
                access_tier,
                parallel_block_count,
            };
            options.validate()?;

            let root = tokio::fs::canonicalize(&path)
                .await
                .with_context(|| format!("Cannot open directory {}", path.display()))?;
            tracing::info!(path = %root.display(), container = %config.container, "Archiving");

            let pipeline = ArchivePipeline::new(
                store,
                Arc::new(LocalFileSource::new(&root)),
                config.clone(),
                options,
                costs.clone(),
            );
            let pipeline = attach_plugins(pipeline, &config).await;
            let report = pipeline.archive(&progress, &cancel).await?;
            (
                archive_summary(&report, started.elapsed()),
                report.has_errors(),
            )
        }
        Commands::Download {
            date,
            path,
            end_date,
            tags,
            people,
            verify,
            archive,
            rehydration_tier,
        } => {
            let options = DownloadOptions {
                end_date,
                tags,
                people,
                verify,
                archive,
                rehydration_tier,
                ..DownloadOptions::new(date)
            };
            options.validate()?;

            let target = prepare_target(&path).await?;
            tracing::info!(
                from = %date,
                to = %options.end_date.unwrap_or(date),
                path = %target.display(),
                "Downloading"
            );

            let retriever = Retriever::new(
                store,
                Arc::new(LocalFileSource::new(&target)),
                &config,
                costs.clone(),
            );
            let report = retriever
                .download(&options, &target, &progress, &cancel)
                .await?;
            (
                retrieve_summary(&report, started.elapsed()),
                report.has_errors(),
            )
        }
        Commands::Continue {
            verify,
            archive,
            rehydration_tier,
        } => {
            if rehydration_tier.is_archive() {
                anyhow::bail!("rehydration tier must be an online tier");
            }
            let options = RetrieveOptions {
                verify,
                archive,
                rehydration_tier,
            };
            tracing::info!(sessions = %config.sessions_dir.display(), "Resuming retrieval sessions");

            let retriever = Retriever::new(
                store,
                Arc::new(LocalFileSource::new(".")),
                &config,
                costs.clone(),
            );
            let report = retriever.resume(&options, &progress, &cancel).await?;
            (
                retrieve_summary(&report, started.elapsed()),
                report.has_errors(),
            )
        }
    };

    for line in lines
        .into_iter()
        .chain(cost_summary(&costs, &config.costs))
    {
        println!("{}", line);
    }

    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

/// Token cancelled on Ctrl-C; the run stops before its next file.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Stopping after the current file");
            token.cancel();
        }
    });
    cancel
}

/// Create the download directory and return its absolute path, so saved
/// sessions stay valid from any working directory.
async fn prepare_target(path: &Path) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Cannot create directory {}", path.display()))?;
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Cannot open directory {}", path.display()))
}
