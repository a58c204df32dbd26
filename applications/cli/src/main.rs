/// Bucket Mirror - make one object-storage bucket an exact copy of another
use anyhow::Context;
use bucket_mirror::{ledger_status, MirrorConfig, Overrides};
use clap::{Parser, Subcommand};
use mirror_core::{BucketUri, StoreRegistry};
use mirror_sync::{MirrorProgress, RunController, RunPhase};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bucket-mirror", version)]
#[command(about = "Crash-resumable one-way bucket mirror", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror SOURCE onto DESTINATION, resuming an interrupted run if there is one
    Sync {
        /// Source bucket, e.g. fs:///srv/data
        source: BucketUri,
        /// Destination bucket
        destination: BucketUri,
        /// Ledger file tracking the run
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Concurrent transfers
        #[arg(long)]
        workers: Option<usize>,
        /// Source paths fetched from the ledger per batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Attempts per object before giving up on transient errors
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the state of a ledger without touching any bucket
    Status {
        /// Ledger file to inspect
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucket_mirror=info,mirror_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            source,
            destination,
            ledger,
            workers,
            batch_size,
            max_attempts,
            config,
        } => {
            let overrides = Overrides {
                ledger,
                workers,
                batch_size,
                max_attempts,
            };
            sync(source, destination, config, overrides).await?;
        }
        Commands::Status {
            ledger,
            json,
            config,
        } => {
            status(ledger, json, config).await?;
        }
    }

    Ok(())
}

async fn sync(
    source: BucketUri,
    destination: BucketUri,
    config_file: Option<PathBuf>,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let config = MirrorConfig::load(config_file.as_deref())?.apply(overrides);
    config.validate()?;

    let run_config = config.run_config(source, destination);
    let controller = RunController::new(run_config, &StoreRegistry::with_defaults())?;

    tracing::info!("Mirroring {} -> {}", controller.config().source, controller.config().destination);
    tracing::info!("Ledger: {}", controller.config().ledger_path.display());

    let (progress, handle) = controller.spawn();
    let reporter = tokio::spawn(report_phases(progress));

    let summary = handle.await.context("mirror task panicked")??;
    let _ = reporter.await;

    println!(
        "{} transferred ({} bytes), {} unchanged, {} vanished, {} deleted in {:.1}s",
        summary.transferred,
        summary.bytes_transferred,
        summary.skipped,
        summary.vanished,
        summary.deleted,
        summary.duration_ms as f64 / 1000.0
    );

    Ok(())
}

/// Log a line whenever the run moves to a new phase
async fn report_phases(mut progress: mpsc::Receiver<MirrorProgress>) {
    let mut current: Option<RunPhase> = None;
    while let Some(update) = progress.recv().await {
        if current != Some(update.phase) {
            current = Some(update.phase);
            tracing::info!(phase = ?update.phase, total = update.total_items, "Phase started");
        }
    }
}

async fn status(ledger: Option<PathBuf>, json: bool, config_file: Option<PathBuf>) -> anyhow::Result<()> {
    let config = MirrorConfig::load(config_file.as_deref())?.apply(Overrides {
        ledger,
        ..Overrides::default()
    });

    let report = ledger_status(&config.ledger.path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
