/// Command-line error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sync(#[from] mirror_sync::SyncError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] mirror_storage::LedgerError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
