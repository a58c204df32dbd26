use crate::error::{LedgerResultExt, Result, SyncError};
use crate::retry::{RetryError, RetryPolicy};
use crate::types::{MirrorProgress, ProgressSink, ReconcileStats, RunPhase};
use mirror_core::ObjectStore;
use mirror_storage::Ledger;
use tracing::{debug, info, warn};

/// Delete destination objects that have no source counterpart
///
/// Each object is deleted before its ledger record, so an interrupted pass
/// simply finds the remaining orphans again. Objects already missing from
/// the destination are counted and their records dropped.
pub async fn reconcile(
    ledger: &Ledger,
    destination: &dyn ObjectStore,
    batch_size: usize,
    retry: &RetryPolicy,
    progress: &ProgressSink,
) -> Result<ReconcileStats> {
    let total = ledger
        .count_orphaned_destination_entries()
        .await
        .in_ledger(ledger.path())?;
    let mut stats = ReconcileStats::default();

    if total == 0 {
        debug!("No orphaned destination objects");
        return Ok(stats);
    }

    info!(orphans = total, bucket = %destination.bucket(), "Deleting orphaned destination objects");

    loop {
        let batch = ledger
            .orphaned_destination_batch(batch_size.max(1))
            .await
            .in_ledger(ledger.path())?;
        if batch.is_empty() {
            break;
        }

        for entry in batch {
            match retry.run(&entry.path, || destination.delete(&entry.path)).await {
                Ok(()) => {
                    stats.deleted += 1;
                    info!(path = %entry.path, "Deleted");
                }
                Err(RetryError::Permanent(e)) if e.is_not_found() => {
                    stats.already_absent += 1;
                    warn!(path = %entry.path, "Orphan already absent from destination");
                }
                Err(RetryError::Permanent(e)) => return Err(e.into()),
                Err(RetryError::Exhausted { attempts, last }) => {
                    return Err(SyncError::RetriesExhausted {
                        path: entry.path,
                        attempts,
                        source: last,
                    })
                }
            }

            ledger
                .delete_destination_entry(entry.id)
                .await
                .in_ledger(ledger.path())?;

            progress.emit(
                MirrorProgress::new(RunPhase::Reconcile, total, stats.deleted + stats.already_absent)
                    .with_item(entry.path),
            );
        }
    }

    Ok(stats)
}
