//! Keyed record store
//!
//! A persistent map from business key to row payload. Writes during
//! ingestion happen through `upsert_tx` inside a caller-owned
//! transaction so that hundreds to low thousands of puts commit as one
//! batch; reads go straight through the pool and may interleave with an
//! in-flight ingestion's committed batches.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::Result;
use crate::types::{RowPayload, StoredRecord};

/// Handle over the `records` table
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One-off upsert in its own transaction, for callers outside the
    /// coordinator's batching.
    pub async fn put(&self, key: &str, payload: &RowPayload, source_file_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        Self::upsert_tx(&mut tx, key, payload, source_file_id, now_ms).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Point lookup by business key.
    pub async fn get(&self, key: &str) -> Result<Option<StoredRecord>> {
        let row = sqlx::query(
            "SELECT key, payload, source_file_id, updated_at FROM records WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    /// Number of distinct keys currently stored.
    ///
    /// COUNT(*) over the rowid table; re-putting an existing key never
    /// changes the result.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Bounded scan in key order, used for preview sampling.
    pub async fn scan(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        self.scan_page(None, limit).await
    }

    /// Keyset-paginated scan: records with key greater than `after`, in
    /// key order. Stable across pages, so export walks the whole store
    /// without OFFSET churn or materializing it.
    pub async fn scan_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<StoredRecord>> {
        let rows = match after {
            Some(after) => {
                sqlx::query(
                    r#"
                    SELECT key, payload, source_file_id, updated_at
                    FROM records
                    WHERE key > ?1
                    ORDER BY key
                    LIMIT ?2
                    "#,
                )
                .bind(after)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT key, payload, source_file_id, updated_at
                    FROM records
                    ORDER BY key
                    LIMIT ?1
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(record_from_row).collect()
    }

    /// Upsert one record within the caller's batch transaction.
    ///
    /// Last write wins: an existing key is overwritten with the new
    /// payload and ownership.
    pub async fn upsert_tx(
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
        payload: &RowPayload,
        source_file_id: &str,
        updated_at: i64,
    ) -> Result<()> {
        let payload_json = serde_json::to_string(payload)?;

        sqlx::query(
            r#"
            INSERT INTO records (key, payload, source_file_id, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                source_file_id = excluded.source_file_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(payload_json)
        .bind(source_file_id)
        .bind(updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Remove every record owned by `source_file_id`. Used only by the
    /// registry's cascade delete, inside its transaction.
    pub async fn delete_where_tx(
        tx: &mut Transaction<'_, Sqlite>,
        source_file_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records WHERE source_file_id = ?1")
            .bind(source_file_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

fn record_from_row(row: SqliteRow) -> Result<StoredRecord> {
    let payload_json: String = row.try_get("payload")?;
    let payload: RowPayload = serde_json::from_str(&payload_json)?;

    Ok(StoredRecord {
        key: row.try_get("key")?,
        payload,
        source_file_id: row.try_get("source_file_id")?,
        updated_at: row.try_get("updated_at")?,
    })
}
