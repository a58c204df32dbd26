/// Ledger-specific errors
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `LedgerError`
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger error types
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// I/O error while archiving or discarding a ledger file
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `initialize` called on a ledger that already has a schema
    #[error("Ledger is already initialized")]
    AlreadyInitialized,

    /// Ledger has no schema or run record
    #[error("Ledger is not initialized")]
    NotInitialized,

    /// Ledger file expected but absent
    #[error("Ledger file not found: {0}")]
    Missing(PathBuf),

    /// A stored value could not be decoded
    #[error("Corrupt ledger record: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// Create a corrupt record error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
