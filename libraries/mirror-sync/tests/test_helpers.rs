//! Shared fixtures for mirror run tests
//!
//! Buckets are in-memory stores with call counters; the ledger is a REAL
//! SQLite file in a temporary directory.

#![allow(dead_code)]

use mirror_core::{BucketUri, MemoryStore, ObjectStore};
use mirror_sync::{RetryPolicy, RunConfig, RunController};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub dir: TempDir,
    pub source: Arc<MemoryStore>,
    pub destination: Arc<MemoryStore>,
}

pub fn source_bucket() -> BucketUri {
    "mem://source".parse().unwrap()
}

pub fn destination_bucket() -> BucketUri {
    "mem://destination".parse().unwrap()
}

impl Harness {
    pub fn new(source: &[(&str, &str)], destination: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = MemoryStore::with_objects(
            source_bucket(),
            source.iter().map(|(p, c)| (p.to_string(), c.to_string())),
        );
        let destination = MemoryStore::with_objects(
            destination_bucket(),
            destination.iter().map(|(p, c)| (p.to_string(), c.to_string())),
        );

        Self {
            dir,
            source: Arc::new(source),
            destination: Arc::new(destination),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("state.db")
    }

    /// Config with fast retries so tests never sleep for long
    pub fn config(&self) -> RunConfig {
        RunConfig::new(source_bucket(), destination_bucket(), self.ledger_path())
            .with_workers(4)
            .with_retry(RetryPolicy::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(5),
            ))
    }

    pub fn controller(&self) -> RunController {
        self.controller_with(self.config())
    }

    pub fn controller_with(&self, config: RunConfig) -> RunController {
        RunController::with_stores(
            config,
            Arc::clone(&self.source) as Arc<dyn ObjectStore>,
            Arc::clone(&self.destination) as Arc<dyn ObjectStore>,
        )
        .expect("valid config")
    }

    /// Ledger files archived next to the live one
    pub fn archived_ledgers(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("state.db-") && !name.ends_with("-journal"))
            .collect();
        names.sort();
        names
    }

    pub fn assert_converged(&self) {
        assert_eq!(self.destination.fingerprints(), self.source.fingerprints());
    }
}

/// `n` objects named `objects/00000`...
pub fn numbered_objects(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| (format!("objects/{:05}", i), format!("content of object {}", i)))
        .collect()
}

pub fn as_pairs(objects: &[(String, String)]) -> Vec<(&str, &str)> {
    objects.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect()
}
