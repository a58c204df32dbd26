use crate::config::RunConfig;
use crate::error::{LedgerResultExt, Result, SyncError};
use crate::planner;
use crate::reconciler;
use crate::snapshot;
use crate::transfer::{TransferExecutor, TransferOptions};
use crate::types::{
    MirrorProgress, ProgressSink, ReconcileStats, RunMode, RunPhase, RunSummary, TransferStats,
};
use mirror_core::{ObjectStore, StoreRegistry};
use mirror_storage::{archive_ledger, discard_ledger, Ledger, RunInfo};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the progress channel handed out by `spawn`
const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// Drives one mirror run end to end
pub struct RunController {
    config: RunConfig,
    source: Arc<dyn ObjectStore>,
    destination: Arc<dyn ObjectStore>,
}

impl RunController {
    /// Resolve both buckets through `registry`
    pub fn new(config: RunConfig, registry: &StoreRegistry) -> Result<Self> {
        let source = registry.open(&config.source)?;
        let destination = registry.open(&config.destination)?;
        Self::with_stores(config, source, destination)
    }

    /// Use already constructed clients
    pub fn with_stores(
        config: RunConfig,
        source: Arc<dyn ObjectStore>,
        destination: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            destination,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run to completion on the current task
    pub async fn run(&self) -> Result<RunSummary> {
        self.execute(&ProgressSink::disabled()).await
    }

    /// Run on a spawned task, reporting progress over a bounded channel
    pub fn spawn(self) -> (mpsc::Receiver<MirrorProgress>, JoinHandle<Result<RunSummary>>) {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move { self.execute(&ProgressSink::new(tx)).await });
        (rx, handle)
    }

    async fn execute(&self, progress: &ProgressSink) -> Result<RunSummary> {
        let start_time = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        let (ledger, run, mode) = self.prepare(progress).await?;
        info!(
            run_id = %run.run_id,
            mode = ?mode,
            source = %run.source,
            destination = %run.destination,
            ledger = %self.config.ledger_path.display(),
            "Run started"
        );

        let result = self.sync(&ledger, progress).await;
        ledger.close().await;

        let (skipped, transfer, reconcile) = match result {
            Ok(counts) => counts,
            Err(e) => {
                error!(run_id = %run.run_id, error = %e, "Run stopped; ledger kept for resume");
                return Err(e);
            }
        };

        let summary = RunSummary {
            run_id: run.run_id,
            mode,
            started_at,
            completed_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: start_time.elapsed().as_millis() as u64,
            skipped,
            transferred: transfer.transferred,
            vanished: transfer.vanished,
            deleted: reconcile.deleted,
            bytes_transferred: transfer.bytes_transferred,
        };

        progress.emit(MirrorProgress::new(RunPhase::Complete, 0, 0));
        info!(
            "Run complete: {} transferred, {} skipped, {} vanished, {} deleted in {}ms",
            summary.transferred, summary.skipped, summary.vanished, summary.deleted, summary.duration_ms
        );

        Ok(summary)
    }

    /// Plan, transfer and reconcile against an initialized ledger
    async fn sync(
        &self,
        ledger: &Ledger,
        progress: &ProgressSink,
    ) -> Result<(u64, TransferStats, ReconcileStats)> {
        debug!("Phase: planning");
        let plan = planner::plan(ledger).await?;
        progress.emit(MirrorProgress::new(RunPhase::Planning, plan.pending, 0));

        debug!("Phase: transfer");
        let executor = TransferExecutor::new(
            Arc::clone(&self.source),
            Arc::clone(&self.destination),
            TransferOptions {
                workers: self.config.workers,
                batch_size: self.config.batch_size,
                spool_threshold: self.config.spool_threshold,
                retry: self.config.retry,
            },
        );
        let transfer = executor.run(ledger, progress).await?;

        debug!("Phase: reconcile");
        let reconcile = reconciler::reconcile(
            ledger,
            self.destination.as_ref(),
            self.config.batch_size,
            &self.config.retry,
            progress,
        )
        .await?;

        Ok((plan.skipped, transfer, reconcile))
    }

    /// Decide between a new run and resuming the ledger on disk
    async fn prepare(&self, progress: &ProgressSink) -> Result<(Ledger, RunInfo, RunMode)> {
        let path = self.config.ledger_path.as_path();

        if !tokio::fs::try_exists(path).await? {
            return self.start_new(progress).await;
        }

        let ledger = Ledger::open(path).await.in_ledger(path)?;
        let Some(run) = ledger.run_info().await.in_ledger(path)? else {
            warn!(ledger = %path.display(), "Ledger was never initialized, discarding");
            ledger.close().await;
            discard_ledger(path).await.in_ledger(path)?;
            return self.start_new(progress).await;
        };

        if run.source != self.config.source || run.destination != self.config.destination {
            ledger.close().await;
            return Err(SyncError::BucketMismatch {
                path: path.to_path_buf(),
                recorded: format!("{} -> {}", run.source, run.destination),
                requested: format!("{} -> {}", self.config.source, self.config.destination),
            });
        }

        if !run.snapshot_complete {
            warn!(
                ledger = %path.display(),
                run_id = %run.run_id,
                "Snapshot never finished, discarding ledger"
            );
            ledger.close().await;
            discard_ledger(path).await.in_ledger(path)?;
            return self.start_new(progress).await;
        }

        if ledger.has_pending().await.in_ledger(path)? {
            return Ok((ledger, run, RunMode::Resume));
        }

        ledger.close().await;
        archive_ledger(path, chrono::Utc::now().timestamp())
            .await
            .in_ledger(path)?;
        self.start_new(progress).await
    }

    async fn start_new(&self, progress: &ProgressSink) -> Result<(Ledger, RunInfo, RunMode)> {
        let path = self.config.ledger_path.as_path();
        let run = RunInfo::new(self.config.source.clone(), self.config.destination.clone());

        let ledger = Ledger::create(path).await.in_ledger(path)?;
        ledger.initialize(&run).await.in_ledger(path)?;

        debug!("Phase: snapshot");
        snapshot::load_snapshot(
            &ledger,
            self.source.as_ref(),
            self.destination.as_ref(),
            progress,
        )
        .await?;

        Ok((ledger, run, RunMode::New))
    }
}
