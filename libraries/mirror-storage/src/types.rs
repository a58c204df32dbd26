/// Ledger record types
use mirror_core::BucketUri;
use serde::{Deserialize, Serialize};

/// The run record stored alongside the snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub source: BucketUri,
    pub destination: BucketUri,
    /// Unix timestamp (seconds) at which the ledger was initialized
    pub created_at: i64,
    /// Set once both bucket listings are fully recorded
    pub snapshot_complete: bool,
}

impl RunInfo {
    /// Run record for a fresh run with a random id, stamped with the current time
    pub fn new(source: BucketUri, destination: BucketUri) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), source, destination)
    }

    /// Run record with a caller-chosen identifier
    pub fn with_id(run_id: impl Into<String>, source: BucketUri, destination: BucketUri) -> Self {
        Self {
            run_id: run_id.into(),
            source,
            destination,
            created_at: chrono::Utc::now().timestamp(),
            snapshot_complete: false,
        }
    }
}

/// Row counts describing how far a run has progressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub source_entries: u64,
    pub processed_entries: u64,
    pub destination_entries: u64,
    pub orphaned_entries: u64,
}

impl LedgerStats {
    /// Source entries still waiting for a transfer
    pub fn pending_entries(&self) -> u64 {
        self.source_entries.saturating_sub(self.processed_entries)
    }

    /// True when no source entry is pending
    pub fn is_complete(&self) -> bool {
        self.pending_entries() == 0
    }
}
