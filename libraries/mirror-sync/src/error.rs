use mirror_core::StoreError;
use mirror_storage::LedgerError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a mirror run
///
/// Every variant leaves the ledger on disk untouched, so the next run
/// resumes from the last committed transfer.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "Ledger error ({}): {source}; inspect the ledger manually before running again",
        .path.display()
    )]
    Ledger {
        path: PathBuf,
        #[source]
        source: LedgerError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Giving up on {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Transfer worker failed: {0}")]
    Worker(String),

    #[error(
        "Ledger {} was created for {recorded}, refusing to use it for {requested}",
        .path.display()
    )]
    BucketMismatch {
        path: PathBuf,
        recorded: String,
        requested: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn ledger(path: impl Into<PathBuf>, source: LedgerError) -> Self {
        Self::Ledger {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Attach the ledger location to storage-layer failures
pub(crate) trait LedgerResultExt<T> {
    fn in_ledger(self, path: &Path) -> Result<T>;
}

impl<T> LedgerResultExt<T> for mirror_storage::Result<T> {
    fn in_ledger(self, path: &Path) -> Result<T> {
        self.map_err(|e| SyncError::ledger(path, e))
    }
}
