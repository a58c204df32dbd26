//! Individual phases driven against a real ledger

mod test_helpers;

use mirror_core::{Fault, ObjectStore, Operation};
use mirror_storage::{Ledger, RunInfo};
use mirror_sync::{
    load_snapshot, plan, reconcile, ProgressSink, RetryPolicy, TransferExecutor, TransferOptions,
};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

async fn snapshot_ledger(harness: &Harness) -> Ledger {
    let ledger = Ledger::create(harness.ledger_path()).await.unwrap();
    ledger
        .initialize(&RunInfo::new(source_bucket(), destination_bucket()))
        .await
        .unwrap();
    load_snapshot(
        &ledger,
        harness.source.as_ref(),
        harness.destination.as_ref(),
        &ProgressSink::disabled(),
    )
    .await
    .unwrap();
    ledger
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1))
}

#[tokio::test]
async fn test_snapshot_records_both_listings_in_chunks() {
    let objects = numbered_objects(1201);
    let harness = Harness::new(&as_pairs(&objects), &[("extra", "x")]);

    let ledger = snapshot_ledger(&harness).await;

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.source_entries, 1201);
    assert_eq!(stats.destination_entries, 1);
    assert!(ledger.run_info().await.unwrap().unwrap().snapshot_complete);
}

#[tokio::test]
async fn test_plan_is_idempotent() {
    let harness = Harness::new(
        &[("same", "1"), ("changed", "new"), ("added", "3")],
        &[("same", "1"), ("changed", "old"), ("orphan", "4")],
    );
    let ledger = snapshot_ledger(&harness).await;

    let first = plan(&ledger).await.unwrap();
    assert_eq!(first.skipped, 1);
    assert_eq!(first.pending, 2);
    assert_eq!(first.orphaned, 1);

    let second = plan(&ledger).await.unwrap();
    assert_eq!(second.skipped, 0);
    assert_eq!(second.pending, 2);
    assert_eq!(second.orphaned, 1);
}

#[tokio::test]
async fn test_executor_drains_every_batch() {
    let objects = numbered_objects(37);
    let harness = Harness::new(&as_pairs(&objects), &[]);
    let ledger = snapshot_ledger(&harness).await;

    let executor = TransferExecutor::new(
        Arc::clone(&harness.source) as Arc<dyn ObjectStore>,
        Arc::clone(&harness.destination) as Arc<dyn ObjectStore>,
        TransferOptions {
            workers: 3,
            batch_size: 10,
            spool_threshold: 8,
            retry: fast_retry(),
        },
    );
    let stats = executor.run(&ledger, &ProgressSink::disabled()).await.unwrap();

    assert_eq!(stats.transferred, 37);
    assert!(!ledger.has_pending().await.unwrap());
    harness.assert_converged();
}

#[tokio::test]
async fn test_reconcile_removes_records_for_missing_objects() {
    let harness = Harness::new(&[("keep", "1")], &[("keep", "1"), ("a", "2"), ("b", "3")]);
    let ledger = snapshot_ledger(&harness).await;
    harness
        .destination
        .inject(Operation::Delete, "a", Fault::NotFound, 1);
    harness
        .destination
        .inject(Operation::Delete, "b", Fault::Transient, 1);

    let stats = reconcile(
        &ledger,
        harness.destination.as_ref(),
        1,
        &fast_retry(),
        &ProgressSink::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.already_absent, 1);
    assert_eq!(harness.destination.calls(Operation::Delete, "b"), 2);
    assert!(harness.destination.content("b").is_none());
    assert!(harness.destination.content("keep").is_some());
    assert_eq!(ledger.count_orphaned_destination_entries().await.unwrap(), 0);
}
