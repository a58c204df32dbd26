//! Bucket Mirror Sync Engine
//!
//! Makes a destination bucket an exact copy of a source bucket and survives
//! being killed at any point along the way.
//!
//! A run goes through these phases, all recorded in a [`mirror_storage::Ledger`]:
//!
//! 1. **Snapshot** - both buckets are listed once into the ledger
//! 2. **Planning** - objects whose path and fingerprint already match are
//!    marked done without any I/O
//! 3. **Transfer** - the remaining objects are copied by a pool of workers,
//!    each completion committed to the ledger before it counts
//! 4. **Reconcile** - destination objects absent from the source are deleted
//!
//! Restarting with the same ledger resumes at the first uncommitted transfer.
//!
//! ```rust,no_run
//! use mirror_core::StoreRegistry;
//! use mirror_sync::{RunConfig, RunController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new("fs:///srv/data".parse()?, "fs:///mnt/backup".parse()?, "state.db");
//! let controller = RunController::new(config, &StoreRegistry::with_defaults())?;
//!
//! let summary = controller.run().await?;
//! println!("{} objects copied", summary.transferred);
//! # Ok(())
//! # }
//! ```

mod config;
mod controller;
mod error;
mod planner;
mod reconciler;
mod retry;
mod snapshot;
mod spool;
mod transfer;
mod types;

pub use config::{default_workers, RunConfig, DEFAULT_BATCH_SIZE};
pub use controller::RunController;
pub use error::{Result, SyncError};
pub use planner::plan;
pub use reconciler::reconcile;
pub use retry::{RetryError, RetryPolicy, Transient};
pub use snapshot::{load_snapshot, SnapshotCounts, SNAPSHOT_CHUNK_SIZE};
pub use spool::{SpoolBuffer, DEFAULT_SPOOL_THRESHOLD};
pub use transfer::{TransferExecutor, TransferOptions, TransferOutcome};
pub use types::{
    DiffPlan, MirrorProgress, ProgressSink, ReconcileStats, RunMode, RunPhase, RunSummary, TransferStats,
};
