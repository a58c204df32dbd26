//! Ledger file lifecycle
//!
//! A finished ledger is kept for inspection under a timestamped name; an
//! abandoned one (snapshot never finished) is removed outright.

use crate::error::{LedgerError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// First free name of the form `<path>-<timestamp>`, then
/// `<path>-<timestamp>.1`, `<path>-<timestamp>.2`...
pub async fn archived_ledger_path(path: &Path, timestamp: i64) -> Result<PathBuf> {
    let base = with_suffix(path, &format!("-{}", timestamp));
    let mut candidate = base.clone();
    let mut n = 0;
    while fs::try_exists(&candidate).await? {
        n += 1;
        candidate = with_suffix(&base, &format!(".{}", n));
    }
    Ok(candidate)
}

/// Rename a closed ledger out of the way and return its new location
///
/// # Errors
/// Returns `LedgerError::Missing` if there is no file at `path`
pub async fn archive_ledger(path: &Path, timestamp: i64) -> Result<PathBuf> {
    if !fs::try_exists(path).await? {
        return Err(LedgerError::Missing(path.to_path_buf()));
    }

    let target = archived_ledger_path(path, timestamp).await?;
    fs::rename(path, &target).await?;

    info!(from = %path.display(), to = %target.display(), "Archived completed ledger");
    Ok(target)
}

/// Delete a ledger file and its rollback journal, if any
pub async fn discard_ledger(path: &Path) -> Result<()> {
    for file in [path.to_path_buf(), with_suffix(path, "-journal")] {
        match fs::remove_file(&file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
