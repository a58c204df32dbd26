//! Diff planner
//!
//! Pure ledger work: no object store is touched.

use crate::error::{LedgerResultExt, Result};
use crate::types::DiffPlan;
use mirror_storage::Ledger;
use tracing::info;

/// Mark unchanged objects processed and size up the remaining work.
///
/// Idempotent; running it again on the same ledger skips nothing new.
pub async fn plan(ledger: &Ledger) -> Result<DiffPlan> {
    let path = ledger.path();

    let skipped = ledger.mark_unchanged_processed().await.in_ledger(path)?;
    let pending = ledger.count_pending().await.in_ledger(path)?;
    let orphaned = ledger
        .count_orphaned_destination_entries()
        .await
        .in_ledger(path)?;

    info!(skipped, pending, orphaned, "Planned transfers");

    Ok(DiffPlan {
        skipped,
        pending,
        orphaned,
    })
}
