use crate::error::Result;
use crate::ledger::parse_bucket;
use mirror_core::{Fingerprint, SourceEntry};
use sqlx::{Row, SqlitePool};

pub(crate) async fn pending_paths(pool: &SqlitePool, limit: usize) -> Result<Vec<String>> {
    let paths = sqlx::query_scalar("SELECT path FROM source WHERE processed = 0 ORDER BY id LIMIT ?")
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;
    Ok(paths)
}

pub(crate) async fn mark_processed(pool: &SqlitePool, path: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE source SET processed = 1 WHERE path = ? AND processed = 0")
        .bind(path)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Equi-join on (path, fingerprint) against the destination snapshot
pub(crate) async fn mark_unchanged_processed(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE source SET processed = 1
         WHERE processed = 0
           AND EXISTS (
               SELECT 1 FROM destination d
               WHERE d.path = source.path AND d.fingerprint = source.fingerprint
           )",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn has_pending(pool: &SqlitePool) -> Result<bool> {
    let pending: i64 =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM source WHERE processed = 0)")
            .fetch_one(pool)
            .await?;
    Ok(pending != 0)
}

pub(crate) async fn count_pending(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM source WHERE processed = 0")
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}

pub(crate) async fn get_by_path(pool: &SqlitePool, path: &str) -> Result<Option<SourceEntry>> {
    let row = sqlx::query("SELECT id, bucket, path, fingerprint, processed FROM source WHERE path = ?")
        .bind(path)
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        Ok(SourceEntry {
            id: row.try_get("id")?,
            bucket: parse_bucket(&row.try_get::<String, _>("bucket")?)?,
            path: row.try_get("path")?,
            fingerprint: Fingerprint::new(row.try_get::<String, _>("fingerprint")?),
            processed: row.try_get("processed")?,
        })
    })
    .transpose()
}
