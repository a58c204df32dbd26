//! Test helpers and fixtures for ledger integration tests
//!
//! These helpers create ledgers as REAL SQLite files (NOT in-memory) so the
//! journal mode, constraints and indexes behave as they do in production.

#![allow(dead_code)]

use mirror_core::{BucketUri, Fingerprint, ObjectInfo, Relation};
use mirror_storage::{Ledger, RunInfo};
use std::path::PathBuf;
use tempfile::TempDir;

/// Ledger in a temporary directory that is removed on drop
pub struct TestLedger {
    pub ledger: Ledger,
    pub path: PathBuf,
    pub dir: TempDir,
}

impl TestLedger {
    /// Create an initialized ledger for `mem://source` -> `mem://destination`
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("state.db");

        let ledger = Ledger::create(&path).await.expect("Failed to create ledger");
        ledger
            .initialize(&RunInfo::new(source_bucket(), destination_bucket()))
            .await
            .expect("Failed to initialize ledger");

        Self { ledger, path, dir }
    }

    /// Create a ledger holding the given snapshots, marked complete
    pub async fn with_snapshot(source: &[(&str, &str)], destination: &[(&str, &str)]) -> Self {
        let test = Self::new().await;
        test.ledger
            .bulk_insert(Relation::Destination, &destination_bucket(), &entries(destination))
            .await
            .expect("Failed to insert destination snapshot");
        test.ledger
            .bulk_insert(Relation::Source, &source_bucket(), &entries(source))
            .await
            .expect("Failed to insert source snapshot");
        test.ledger
            .mark_snapshot_complete()
            .await
            .expect("Failed to mark snapshot complete");
        test
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

pub fn source_bucket() -> BucketUri {
    "mem://source".parse().unwrap()
}

pub fn destination_bucket() -> BucketUri {
    "mem://destination".parse().unwrap()
}

/// Listing entries from `(path, fingerprint)` pairs
pub fn entries(pairs: &[(&str, &str)]) -> Vec<ObjectInfo> {
    pairs
        .iter()
        .map(|(path, fingerprint)| ObjectInfo::new(*path, Fingerprint::new(*fingerprint)))
        .collect()
}

/// Sorted paths, for order-independent comparisons
pub fn sorted(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    paths
}
