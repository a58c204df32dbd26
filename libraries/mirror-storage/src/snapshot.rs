use crate::error::Result;
use mirror_core::{BucketUri, ObjectInfo, Relation};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Rows per INSERT statement; three bound parameters each stays well under
/// SQLite's variable limit
const ROWS_PER_STATEMENT: usize = 200;

/// Append `entries` to the snapshot table for `relation`, all or nothing
pub(crate) async fn bulk_insert(
    pool: &SqlitePool,
    relation: Relation,
    bucket: &BucketUri,
    entries: &[ObjectInfo],
) -> Result<u64> {
    if entries.is_empty() {
        return Ok(0);
    }

    let bucket = bucket.to_string();
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for chunk in entries.chunks(ROWS_PER_STATEMENT) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} (bucket, path, fingerprint) ",
            relation.table()
        ));
        builder.push_values(chunk, |mut row, entry| {
            row.push_bind(&bucket)
                .push_bind(&entry.path)
                .push_bind(entry.fingerprint.as_str());
        });

        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

pub(crate) async fn mark_complete(pool: &SqlitePool) -> Result<()> {
    sqlx::query("UPDATE run SET snapshot_complete = 1 WHERE id = 1")
        .execute(pool)
        .await?;
    Ok(())
}
