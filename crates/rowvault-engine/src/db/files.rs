//! File registry
//!
//! Per-upload metadata: registration by deterministic id, display
//! renames, manual ordering, and the cascade delete that removes an
//! entry together with every record it owns in one transaction.
//!
//! Operations referencing a missing id are no-ops, not errors; they
//! report `false`/`0` so callers can surface it if they care.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use super::records::RecordStore;
use crate::error::Result;
use crate::types::{FileEntry, FileStatus, ReorderDirection};

/// Metadata for a new (or re-selected) upload
#[derive(Debug, Clone)]
pub struct NewFileEntry {
    pub id: String,
    pub original_name: String,
    pub kind: String,
    pub size: i64,
    pub last_modified: i64,
}

/// Handle over the `files` table
#[derive(Clone)]
pub struct FileRegistry {
    pool: SqlitePool,
}

impl FileRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or replace an entry by its deterministic id.
    ///
    /// Re-selecting an identical file resolves to the same entry with
    /// counters reset and a fresh position at the end of the listing.
    pub async fn register(&self, meta: &NewFileEntry) -> Result<FileEntry> {
        let mut tx = self.pool.begin().await?;

        let next_ord =
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(ord), 0) + 1 FROM files")
                .fetch_one(&mut *tx)
                .await?;

        let uploaded_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO files (
                id, original_name, display_name, kind, size, last_modified,
                uploaded_at, rows_seen, rows_upserted, status, error_detail, ord
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, NULL, ?9)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                uploaded_at = excluded.uploaded_at,
                rows_seen = 0,
                rows_upserted = 0,
                status = excluded.status,
                error_detail = NULL,
                ord = excluded.ord
            "#,
        )
        .bind(&meta.id)
        .bind(&meta.original_name)
        .bind(&meta.original_name)
        .bind(&meta.kind)
        .bind(meta.size)
        .bind(meta.last_modified)
        .bind(uploaded_at)
        .bind(FileStatus::Processing.as_str())
        .bind(next_ord)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(file_id = %meta.id, name = %meta.original_name, "file registered");

        Ok(FileEntry {
            id: meta.id.clone(),
            original_name: meta.original_name.clone(),
            display_name: meta.original_name.clone(),
            kind: meta.kind.clone(),
            size: meta.size,
            last_modified: meta.last_modified,
            uploaded_at,
            rows_seen: 0,
            rows_upserted: 0,
            status: FileStatus::Processing,
            error_detail: None,
            ord: next_ord,
        })
    }

    /// Fetch one entry by id.
    pub async fn get(&self, id: &str) -> Result<Option<FileEntry>> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(entry_from_row).transpose()
    }

    /// All entries, manual priority ascending.
    pub async fn list(&self) -> Result<Vec<FileEntry>> {
        let rows = sqlx::query("SELECT * FROM files ORDER BY ord ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    /// Change the display name only. Returns false when the id is
    /// unknown.
    pub async fn rename(&self, id: &str, display_name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET display_name = ?1 WHERE id = ?2")
            .bind(display_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Swap `ord` with the adjacent entry in the current listing.
    ///
    /// A no-op (returns false) at either boundary or for an unknown id.
    pub async fn reorder(&self, id: &str, direction: ReorderDirection) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let entries: Vec<(String, i64)> =
            sqlx::query_as("SELECT id, ord FROM files ORDER BY ord ASC")
                .fetch_all(&mut *tx)
                .await?;

        let Some(index) = entries.iter().position(|(eid, _)| eid == id) else {
            return Ok(false);
        };

        let neighbor = match direction {
            ReorderDirection::Up => index.checked_sub(1),
            ReorderDirection::Down => {
                if index + 1 < entries.len() {
                    Some(index + 1)
                } else {
                    None
                }
            }
        };
        let Some(neighbor) = neighbor else {
            return Ok(false);
        };

        let (this_id, this_ord) = &entries[index];
        let (other_id, other_ord) = &entries[neighbor];

        sqlx::query("UPDATE files SET ord = ?1 WHERE id = ?2")
            .bind(other_ord)
            .bind(this_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE files SET ord = ?1 WHERE id = ?2")
            .bind(this_ord)
            .bind(other_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Remove the entry and every record it owns as one atomic unit.
    ///
    /// Returns the number of records removed. Unknown ids are a no-op.
    /// Keys last written by this file disappear entirely; there is no
    /// fallback to an older file's value.
    pub async fn delete_cascade(&self, id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = RecordStore::delete_where_tx(&mut tx, id).await?;
        sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(file_id = %id, records_removed = removed, "cascade delete completed");
        Ok(removed)
    }

    /// Persist batch counters within the coordinator's transaction so
    /// registry and record store stay coherent.
    pub async fn update_progress_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        rows_seen: i64,
        rows_upserted: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE files SET rows_seen = ?1, rows_upserted = ?2 WHERE id = ?3")
            .bind(rows_seen)
            .bind(rows_upserted)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Finalize an entry as ready with its final counts.
    pub async fn mark_ready(&self, id: &str, rows_seen: i64, rows_upserted: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE files
            SET status = ?1, rows_seen = ?2, rows_upserted = ?3, error_detail = NULL
            WHERE id = ?4
            "#,
        )
        .bind(FileStatus::Ready.as_str())
        .bind(rows_seen)
        .bind(rows_upserted)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark an entry failed, keeping whatever counts were committed.
    /// The entry stays listed with its detail so the user can retry or
    /// delete it.
    pub async fn mark_error(&self, id: &str, detail: &str) -> Result<()> {
        sqlx::query("UPDATE files SET status = ?1, error_detail = ?2 WHERE id = ?3")
            .bind(FileStatus::Error.as_str())
            .bind(detail)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn entry_from_row(row: SqliteRow) -> Result<FileEntry> {
    let status: String = row.try_get("status")?;
    let uploaded_at: DateTime<Utc> = row.try_get("uploaded_at")?;

    Ok(FileEntry {
        id: row.try_get("id")?,
        original_name: row.try_get("original_name")?,
        display_name: row.try_get("display_name")?,
        kind: row.try_get("kind")?,
        size: row.try_get("size")?,
        last_modified: row.try_get("last_modified")?,
        uploaded_at,
        rows_seen: row.try_get("rows_seen")?,
        rows_upserted: row.try_get("rows_upserted")?,
        status: FileStatus::from(status),
        error_detail: row.try_get("error_detail")?,
        ord: row.try_get("ord")?,
    })
}
