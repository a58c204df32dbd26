//! Bucket Mirror Storage
//!
//! Durable `SQLite` run ledger for the bucket mirror.
//!
//! One ledger file tracks one run: the source and destination snapshots taken
//! at run start, a processed flag per source entry, and a run record naming
//! the two buckets. Every mutation is its own durable transaction, so a crash
//! at any point leaves a ledger a restarted process can resume from.
//!
//! # Architecture
//!
//! - **Single Writer**: the pool holds exactly one connection; concurrent
//!   callers queue behind it instead of racing on the file
//! - **Vertical Slicing**: `snapshot`, `source` and `destination` each own
//!   their queries
//! - **Self-contained File**: rollback journal rather than WAL, so a closed
//!   ledger is one file that can be renamed or removed
//!
//! # Example
//!
//! ```rust,no_run
//! use mirror_storage::{Ledger, RunInfo};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Ledger::create("state.db").await?;
//! ledger
//!     .initialize(&RunInfo::new("fs:///data".parse()?, "fs:///backup".parse()?))
//!     .await?;
//!
//! // Snapshot loader output goes in via bulk_insert, then:
//! for path in ledger.pending_source_paths(1000).await? {
//!     ledger.mark_processed(&path).await?;
//! }
//! assert!(!ledger.has_pending().await?);
//! # Ok(())
//! # }
//! ```

mod archive;
mod destination;
mod error;
mod ledger;
mod snapshot;
mod source;
mod types;

pub use archive::{archive_ledger, archived_ledger_path, discard_ledger};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use types::{LedgerStats, RunInfo};

/// Ledger file name used when the operator does not pick one
pub const DEFAULT_LEDGER_PATH: &str = "state.db";
