//! Transfer executor
//!
//! Copies pending source objects to the destination in batches. Within a
//! batch at most `workers` copies run at once; finished copies are committed
//! to the ledger in the order they complete, and only by this loop. The next
//! batch is read from the ledger once every copy of the current one has been
//! committed.

use crate::error::{LedgerResultExt, Result, SyncError};
use crate::retry::{RetryError, RetryPolicy, Transient};
use crate::spool::SpoolBuffer;
use crate::types::{MirrorProgress, ProgressSink, RunPhase, TransferStats};
use futures_util::TryStreamExt;
use mirror_core::{ObjectStore, StoreError};
use mirror_storage::Ledger;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Settings for one executor run
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub workers: usize,
    pub batch_size: usize,
    pub spool_threshold: usize,
    pub retry: RetryPolicy,
}

/// Result of copying one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Copied { bytes: u64 },
    /// Source object disappeared after it was listed
    Vanished,
}

/// Failure of a single copy attempt, tagged with the side that failed
#[derive(Debug)]
enum CopyError {
    Read(StoreError),
    Write(StoreError),
    Spool(std::io::Error),
}

impl Transient for CopyError {
    fn is_transient(&self) -> bool {
        match self {
            CopyError::Read(e) | CopyError::Write(e) => e.is_transient(),
            CopyError::Spool(_) => false,
        }
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::Read(e) => write!(f, "read failed: {}", e),
            CopyError::Write(e) => write!(f, "write failed: {}", e),
            CopyError::Spool(e) => write!(f, "spool failed: {}", e),
        }
    }
}

impl From<CopyError> for SyncError {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::Read(e) | CopyError::Write(e) => SyncError::Store(e),
            CopyError::Spool(e) => SyncError::Io(e),
        }
    }
}

struct Copier {
    source: Arc<dyn ObjectStore>,
    destination: Arc<dyn ObjectStore>,
    spool_threshold: usize,
    retry: RetryPolicy,
}

impl Copier {
    /// Read the whole object, then write it under the same path
    async fn copy_once(&self, path: &str) -> std::result::Result<u64, CopyError> {
        let mut body = self.source.get(path).await.map_err(CopyError::Read)?;
        let mut spool = SpoolBuffer::new(self.spool_threshold);
        while let Some(chunk) = body.try_next().await.map_err(CopyError::Read)? {
            spool.write(&chunk).await.map_err(CopyError::Spool)?;
        }

        let length = spool.len();
        let reader = spool.into_reader().await.map_err(CopyError::Spool)?;
        self.destination
            .put(path, reader, length)
            .await
            .map_err(CopyError::Write)?;
        Ok(length)
    }

    async fn transfer(&self, path: &str) -> Result<TransferOutcome> {
        match self.retry.run(path, || self.copy_once(path)).await {
            Ok(bytes) => Ok(TransferOutcome::Copied { bytes }),
            Err(RetryError::Permanent(CopyError::Read(e))) if e.is_not_found() => {
                warn!(path = %path, "Source object vanished, skipping");
                Ok(TransferOutcome::Vanished)
            }
            Err(RetryError::Permanent(e)) => Err(e.into()),
            Err(RetryError::Exhausted { attempts, last }) => match last {
                CopyError::Read(source) | CopyError::Write(source) => {
                    Err(SyncError::RetriesExhausted {
                        path: path.to_string(),
                        attempts,
                        source,
                    })
                }
                CopyError::Spool(e) => Err(SyncError::Io(e)),
            },
        }
    }
}

/// Concurrent copier driven by the ledger's pending set
pub struct TransferExecutor {
    copier: Arc<Copier>,
    workers: usize,
    batch_size: usize,
}

impl TransferExecutor {
    pub fn new(
        source: Arc<dyn ObjectStore>,
        destination: Arc<dyn ObjectStore>,
        options: TransferOptions,
    ) -> Self {
        Self {
            copier: Arc::new(Copier {
                source,
                destination,
                spool_threshold: options.spool_threshold,
                retry: options.retry,
            }),
            workers: options.workers.max(1),
            batch_size: options.batch_size.max(1),
        }
    }

    /// Copy every pending path, batch after batch, until none is left
    pub async fn run(&self, ledger: &Ledger, progress: &ProgressSink) -> Result<TransferStats> {
        let mut stats = TransferStats::default();
        let total = ledger.count_pending().await.in_ledger(ledger.path())?;
        let mut batch_number = 0u64;

        loop {
            let batch = ledger
                .pending_source_paths(self.batch_size)
                .await
                .in_ledger(ledger.path())?;
            if batch.is_empty() {
                break;
            }

            batch_number += 1;
            debug!(batch = batch_number, paths = batch.len(), "Starting transfer batch");
            self.run_batch(ledger, batch, total, &mut stats, progress).await?;
        }

        info!(
            transferred = stats.transferred,
            vanished = stats.vanished,
            bytes = stats.bytes_transferred,
            "Transfers complete"
        );
        Ok(stats)
    }

    async fn run_batch(
        &self,
        ledger: &Ledger,
        batch: Vec<String>,
        total: u64,
        stats: &mut TransferStats,
        progress: &ProgressSink,
    ) -> Result<()> {
        let mut queue: VecDeque<String> = batch.into();
        let mut in_flight = JoinSet::new();

        // Dropping `in_flight` on an early return aborts the remaining copies
        loop {
            while in_flight.len() < self.workers {
                let Some(path) = queue.pop_front() else {
                    break;
                };
                let copier = Arc::clone(&self.copier);
                in_flight.spawn(async move {
                    let outcome = copier.transfer(&path).await;
                    (path, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                return Ok(());
            };
            let (path, outcome) = joined.map_err(|e| SyncError::Worker(e.to_string()))?;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(path = %path, error = %e, "Transfer failed, stopping run");
                    return Err(e);
                }
            };

            ledger.mark_processed(&path).await.in_ledger(ledger.path())?;

            match outcome {
                TransferOutcome::Copied { bytes } => {
                    stats.transferred += 1;
                    stats.bytes_transferred += bytes;
                    info!(path = %path, bytes, "Transferred");
                }
                TransferOutcome::Vanished => stats.vanished += 1,
            }

            progress.emit(
                MirrorProgress::new(RunPhase::Transfer, total, stats.transferred + stats.vanished)
                    .with_item(path),
            );
        }
    }
}
