//! Snapshot loader
//!
//! Records both bucket listings in the ledger, exactly once per run.

use crate::error::{LedgerResultExt, Result};
use crate::types::{MirrorProgress, ProgressSink, RunPhase};
use futures_util::TryStreamExt;
use mirror_core::{ObjectStore, Relation};
use mirror_storage::Ledger;
use tracing::{debug, info};

/// Listing entries committed per ledger transaction
pub const SNAPSHOT_CHUNK_SIZE: usize = 500;

/// Entries recorded for each side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub source: u64,
    pub destination: u64,
}

/// Load the destination listing, then the source listing, then flag the
/// snapshot complete. Any failure leaves the snapshot flag unset.
pub async fn load_snapshot(
    ledger: &Ledger,
    source: &dyn ObjectStore,
    destination: &dyn ObjectStore,
    progress: &ProgressSink,
) -> Result<SnapshotCounts> {
    let destination_count = load_listing(ledger, Relation::Destination, destination, progress).await?;
    let source_count = load_listing(ledger, Relation::Source, source, progress).await?;

    ledger.mark_snapshot_complete().await.in_ledger(ledger.path())?;

    info!(
        source = source_count,
        destination = destination_count,
        "Snapshot complete"
    );

    Ok(SnapshotCounts {
        source: source_count,
        destination: destination_count,
    })
}

async fn load_listing(
    ledger: &Ledger,
    relation: Relation,
    store: &dyn ObjectStore,
    progress: &ProgressSink,
) -> Result<u64> {
    let bucket = store.bucket();
    info!(bucket = %bucket, relation = relation.table(), "Listing bucket");

    let mut listing = store.list();
    let mut chunk = Vec::with_capacity(SNAPSHOT_CHUNK_SIZE);
    let mut recorded = 0;

    while let Some(object) = listing.try_next().await? {
        chunk.push(object);
        if chunk.len() == SNAPSHOT_CHUNK_SIZE {
            recorded += ledger
                .bulk_insert(relation, bucket, &chunk)
                .await
                .in_ledger(ledger.path())?;
            chunk.clear();

            debug!(bucket = %bucket, recorded, "Recorded listing chunk");
            progress.emit(MirrorProgress::new(RunPhase::Snapshot, 0, recorded).with_item(bucket.to_string()));
        }
    }

    if !chunk.is_empty() {
        recorded += ledger
            .bulk_insert(relation, bucket, &chunk)
            .await
            .in_ledger(ledger.path())?;
    }

    Ok(recorded)
}
