//! `bucket-mirror status`: read-only view of a ledger

use crate::error::Result;
use mirror_storage::{Ledger, LedgerStats, RunInfo};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    /// No ledger file; the next sync starts a new run
    Absent,
    /// File exists but the run never finished listing; it will be discarded
    Abandoned,
    /// Transfers remain; the next sync resumes
    InProgress,
    /// Everything transferred; the next sync archives it and starts over
    Complete,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub ledger: PathBuf,
    pub state: LedgerState,
    pub run: Option<RunInfo>,
    pub stats: Option<LedgerStats>,
}

/// Inspect the ledger at `path` without touching any bucket
pub async fn ledger_status(path: &Path) -> Result<StatusReport> {
    let mut report = StatusReport {
        ledger: path.to_path_buf(),
        state: LedgerState::Absent,
        run: None,
        stats: None,
    };

    if !path.exists() {
        return Ok(report);
    }

    let ledger = Ledger::open(path).await?;
    report.run = ledger.run_info().await?;
    report.state = match &report.run {
        Some(run) if run.snapshot_complete => {
            let stats = ledger.stats().await?;
            report.stats = Some(stats);
            if stats.is_complete() {
                LedgerState::Complete
            } else {
                LedgerState::InProgress
            }
        }
        _ => LedgerState::Abandoned,
    };
    ledger.close().await;

    Ok(report)
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ledger:          {}", self.ledger.display())?;

        let state = match self.state {
            LedgerState::Absent => "absent (next sync starts a new run)",
            LedgerState::Abandoned => "abandoned snapshot (next sync discards it)",
            LedgerState::InProgress => "in progress (next sync resumes)",
            LedgerState::Complete => "complete (next sync archives it)",
        };
        writeln!(f, "State:           {}", state)?;

        if let Some(run) = &self.run {
            writeln!(f, "Run:             {}", run.run_id)?;
            writeln!(f, "Source:          {}", run.source)?;
            writeln!(f, "Destination:     {}", run.destination)?;
            writeln!(f, "Created at:      {}", run.created_at)?;
        }

        if let Some(stats) = &self.stats {
            writeln!(f, "Source objects:  {}", stats.source_entries)?;
            writeln!(f, "Processed:       {}", stats.processed_entries)?;
            writeln!(f, "Pending:         {}", stats.pending_entries())?;
            writeln!(f, "Dest. objects:   {}", stats.destination_entries)?;
            writeln!(f, "Orphans:         {}", stats.orphaned_entries)?;
        }

        Ok(())
    }
}
