//! Bucket Mirror command-line application
//!
//! Configuration loading and ledger inspection used by the `bucket-mirror`
//! binary.

pub mod config;
pub mod error;
pub mod status;

pub use config::{MirrorConfig, Overrides};
pub use error::{CliError, Result};
pub use status::{ledger_status, LedgerState, StatusReport};
