use crate::error::Result;
use crate::ledger::parse_bucket;
use mirror_core::{DestinationEntry, Fingerprint};
use sqlx::{Row, SqlitePool};

const ORPHANED: &str = "SELECT d.id, d.bucket, d.path, d.fingerprint
     FROM destination d
     WHERE NOT EXISTS (SELECT 1 FROM source s WHERE s.path = d.path)
     ORDER BY d.id";

/// Orphaned destination entries, all of them or the first `limit`
pub(crate) async fn orphaned(
    pool: &SqlitePool,
    limit: Option<usize>,
) -> Result<Vec<DestinationEntry>> {
    let rows = match limit {
        Some(limit) => {
            let sql = format!("{} LIMIT ?", ORPHANED);
            sqlx::query(&sql).bind(limit as i64).fetch_all(pool).await?
        }
        None => sqlx::query(ORPHANED).fetch_all(pool).await?,
    };

    rows.into_iter()
        .map(|row| {
            Ok(DestinationEntry {
                id: row.try_get("id")?,
                bucket: parse_bucket(&row.try_get::<String, _>("bucket")?)?,
                path: row.try_get("path")?,
                fingerprint: Fingerprint::new(row.try_get::<String, _>("fingerprint")?),
            })
        })
        .collect()
}

pub(crate) async fn count_orphaned(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM destination d
         WHERE NOT EXISTS (SELECT 1 FROM source s WHERE s.path = d.path)",
    )
    .fetch_one(pool)
    .await?;
    Ok(count as u64)
}

pub(crate) async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM destination WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
