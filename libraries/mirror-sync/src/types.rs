use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Whether a run started from scratch or picked up an existing ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    New,
    Resume,
}

/// Phase a run is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Snapshot,
    Planning,
    Transfer,
    Reconcile,
    Complete,
}

/// Progress information for an ongoing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorProgress {
    pub phase: RunPhase,
    pub total_items: u64,
    pub processed_items: u64,
    pub current_item: Option<String>,
}

impl MirrorProgress {
    pub fn new(phase: RunPhase, total_items: u64, processed_items: u64) -> Self {
        Self {
            phase,
            total_items,
            processed_items,
            current_item: None,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    pub fn percentage(&self) -> f32 {
        if self.total_items == 0 {
            return 100.0;
        }
        (self.processed_items as f32 / self.total_items as f32) * 100.0
    }
}

/// Outcome of the diff planner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPlan {
    /// Entries newly marked processed because destination already matches
    pub skipped: u64,
    /// Entries still waiting for a transfer
    pub pending: u64,
    /// Destination entries the reconciler will delete
    pub orphaned: u64,
}

/// Counters accumulated by the transfer executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub transferred: u64,
    /// Source objects that disappeared between listing and transfer
    pub vanished: u64,
    pub bytes_transferred: u64,
}

/// Counters accumulated by the reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub deleted: u64,
    /// Orphans already gone from the destination
    pub already_absent: u64,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub mode: RunMode,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: u64,
    pub skipped: u64,
    pub transferred: u64,
    pub vanished: u64,
    pub deleted: u64,
    pub bytes_transferred: u64,
}

/// Non-blocking progress channel; a full or closed receiver drops updates
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<MirrorProgress>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<MirrorProgress>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, progress: MirrorProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(progress);
        }
    }
}
