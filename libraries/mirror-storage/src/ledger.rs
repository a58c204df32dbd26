//! Ledger handle
//!
//! Wraps a single-connection `SQLite` pool and delegates to the per-table
//! slices in `snapshot`, `source` and `destination`.

use crate::error::{LedgerError, Result};
use crate::types::{LedgerStats, RunInfo};
use crate::{destination, snapshot, source};
use mirror_core::{BucketUri, DestinationEntry, ObjectInfo, Relation, SourceEntry};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// Embed the ledger schema into the binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Persistent state of one mirror run
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    path: PathBuf,
}

fn connect_options(path: &Path, create: bool) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        // Rollback journal keeps the ledger a single file once closed
        .journal_mode(SqliteJournalMode::Delete)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(30))
}

impl Ledger {
    async fn connect(path: &Path, create: bool) -> Result<Self> {
        debug!(path = %path.display(), create, "Opening ledger");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options(path, create))
            .await?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open the ledger at `path`, creating an empty file if needed
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(path.as_ref(), true).await
    }

    /// Open an existing ledger
    ///
    /// # Errors
    /// Returns `LedgerError::Missing` if there is no file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Err(LedgerError::Missing(path.to_path_buf()));
        }
        Self::connect(path, false).await
    }

    /// File backing this ledger
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying pool, for callers that need raw access
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// True once the schema has been created
    pub async fn has_schema(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'run'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Create the schema and store the run record
    ///
    /// # Errors
    /// Returns `LedgerError::AlreadyInitialized` if the ledger already holds
    /// a schema
    pub async fn initialize(&self, run: &RunInfo) -> Result<()> {
        if self.has_schema().await? {
            return Err(LedgerError::AlreadyInitialized);
        }

        MIGRATOR.run(&self.pool).await?;

        sqlx::query(
            "INSERT INTO run (id, run_id, source_bucket, destination_bucket, created_at, snapshot_complete)
             VALUES (1, ?, ?, ?, ?, ?)",
        )
        .bind(&run.run_id)
        .bind(run.source.to_string())
        .bind(run.destination.to_string())
        .bind(run.created_at)
        .bind(run.snapshot_complete)
        .execute(&self.pool)
        .await?;

        debug!(run_id = %run.run_id, "Ledger initialized");
        Ok(())
    }

    /// The run record, or `None` if the ledger was never initialized
    pub async fn run_info(&self) -> Result<Option<RunInfo>> {
        if !self.has_schema().await? {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT run_id, source_bucket, destination_bucket, created_at, snapshot_complete
             FROM run WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(RunInfo {
            run_id: row.try_get("run_id")?,
            source: parse_bucket(&row.try_get::<String, _>("source_bucket")?)?,
            destination: parse_bucket(&row.try_get::<String, _>("destination_bucket")?)?,
            created_at: row.try_get("created_at")?,
            snapshot_complete: row.try_get("snapshot_complete")?,
        }))
    }

    /// Row counts for progress reporting
    pub async fn stats(&self) -> Result<LedgerStats> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM source) AS source_entries,
                (SELECT COUNT(*) FROM source WHERE processed = 1) AS processed_entries,
                (SELECT COUNT(*) FROM destination) AS destination_entries",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerStats {
            source_entries: row.try_get::<i64, _>("source_entries")? as u64,
            processed_entries: row.try_get::<i64, _>("processed_entries")? as u64,
            destination_entries: row.try_get::<i64, _>("destination_entries")? as u64,
            orphaned_entries: destination::count_orphaned(&self.pool).await?,
        })
    }

    /// Close the pool, releasing the file
    pub async fn close(self) {
        self.pool.close().await;
        debug!(path = %self.path.display(), "Ledger closed");
    }

    // ---- Snapshot ----

    /// Append snapshot entries for `relation` in one transaction
    pub async fn bulk_insert(
        &self,
        relation: Relation,
        bucket: &BucketUri,
        entries: &[ObjectInfo],
    ) -> Result<u64> {
        snapshot::bulk_insert(&self.pool, relation, bucket, entries).await
    }

    /// Record that both listings have been fully loaded
    pub async fn mark_snapshot_complete(&self) -> Result<()> {
        snapshot::mark_complete(&self.pool).await
    }

    // ---- Source ----

    /// Up to `limit` source paths still waiting for a transfer
    pub async fn pending_source_paths(&self, limit: usize) -> Result<Vec<String>> {
        source::pending_paths(&self.pool, limit).await
    }

    /// Mark one source path as processed. Returns false if it already was,
    /// or if no such path exists
    pub async fn mark_processed(&self, path: &str) -> Result<bool> {
        source::mark_processed(&self.pool, path).await
    }

    /// Mark processed every source entry whose path and fingerprint match a
    /// destination entry; returns how many were newly marked
    pub async fn mark_unchanged_processed(&self) -> Result<u64> {
        source::mark_unchanged_processed(&self.pool).await
    }

    pub async fn has_pending(&self) -> Result<bool> {
        source::has_pending(&self.pool).await
    }

    pub async fn count_pending(&self) -> Result<u64> {
        source::count_pending(&self.pool).await
    }

    /// Look up one source entry by path
    pub async fn source_entry(&self, path: &str) -> Result<Option<SourceEntry>> {
        source::get_by_path(&self.pool, path).await
    }

    // ---- Destination ----

    /// Destination entries whose path has no source counterpart
    pub async fn orphaned_destination_entries(&self) -> Result<Vec<DestinationEntry>> {
        destination::orphaned(&self.pool, None).await
    }

    /// First `limit` orphaned destination entries, oldest first
    pub async fn orphaned_destination_batch(&self, limit: usize) -> Result<Vec<DestinationEntry>> {
        destination::orphaned(&self.pool, Some(limit)).await
    }

    pub async fn count_orphaned_destination_entries(&self) -> Result<u64> {
        destination::count_orphaned(&self.pool).await
    }

    /// Remove one destination entry. Returns false if it did not exist
    pub async fn delete_destination_entry(&self, id: i64) -> Result<bool> {
        destination::delete(&self.pool, id).await
    }
}

pub(crate) fn parse_bucket(raw: &str) -> Result<BucketUri> {
    raw.parse()
        .map_err(|e| LedgerError::corrupt(format!("bucket identifier {:?}: {}", raw, e)))
}
