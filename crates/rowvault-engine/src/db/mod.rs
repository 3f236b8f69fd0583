//! SQLite persistence layer
//!
//! The store lives in a single database file with two tables: `files`
//! (per-upload metadata) and `records` (the deduplicated keyed store).
//! The pool is constructed explicitly at the process entry point and
//! handed to the coordinator/exporter; there is no ambient global
//! handle.

pub mod files;
pub mod records;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Open (and create if missing) the store at `path`.
///
/// WAL journaling keeps point reads usable while an ingestion's batch
/// writes are in flight.
pub async fn open(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    debug!(path = %path.display(), "store opened");
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet.
async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            original_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            size INTEGER NOT NULL,
            last_modified INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL,
            rows_seen INTEGER NOT NULL DEFAULT 0,
            rows_upserted INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            error_detail TEXT,
            ord INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            source_file_id TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Cascade delete walks this index instead of scanning the table
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_records_source_file
        ON records(source_file_id)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
