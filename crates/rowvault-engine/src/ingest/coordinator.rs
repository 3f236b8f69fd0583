//! Ingestion coordinator
//!
//! Drives one upload end to end: registers the FileEntry, pulls row
//! batches from the parser, upserts keyed rows and the entry's counters
//! in one transaction per batch, and finalizes the entry as `ready` or
//! `error`. An entry is never left in `processing`.

use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{IngestPhase, ProgressEvent, ProgressSender};
use super::IngestState;
use crate::db::files::{FileRegistry, NewFileEntry};
use crate::db::records::RecordStore;
use crate::error::{Result, VaultError};
use crate::parse::csv::CsvBatchReader;
use crate::parse::workbook::read_first_sheet;
use crate::parse::{SourceFormat, MAX_WORKBOOK_BYTES};
use crate::types::RowPayload;

const DEFAULT_BATCH_SIZE: usize = 1000;

/// Per-ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Field holding the business key used to deduplicate rows
    pub key_field: String,
    /// When set, conflicts compare this field and keep the newer value
    /// instead of pure ingestion-order last-write-wins
    pub revision_field: Option<String>,
    /// Rows per write transaction
    pub batch_size: usize,
}

impl IngestOptions {
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            revision_field: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_revision_field(mut self, field: impl Into<String>) -> Self {
        self.revision_field = Some(field.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Outcome of a completed ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub file_id: String,
    pub rows_seen: i64,
    pub rows_upserted: i64,
    /// Distinct keys in the whole store after this file
    pub total_records: i64,
}

#[derive(Debug, Default)]
struct Totals {
    rows_seen: i64,
    rows_upserted: i64,
}

/// Coordinates ingestions against one store
#[derive(Clone)]
pub struct Ingestor {
    pool: SqlitePool,
    registry: FileRegistry,
    records: RecordStore,
}

impl Ingestor {
    pub fn new(pool: SqlitePool) -> Self {
        let registry = FileRegistry::new(pool.clone());
        let records = RecordStore::new(pool.clone());
        Self {
            pool,
            registry,
            records,
        }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Ingest one upload to completion.
    ///
    /// Files are processed strictly one at a time; callers iterate
    /// their queue sequentially and decide after a failure whether to
    /// continue with the next file.
    pub async fn ingest(
        &self,
        path: &Path,
        options: &IngestOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<IngestReport> {
        // Format detection is pre-I/O; oversize is pre-parse. Neither
        // creates a FileEntry, matching the upload flow where metadata
        // is only written once the file is accepted.
        let format = match SourceFormat::from_path(path) {
            Ok(format) => format,
            Err(e) => {
                let _ = progress.send(ProgressEvent::new(IngestPhase::Error, 0, e.to_string()));
                return Err(e);
            }
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let _ = progress.send(ProgressEvent::new(
            IngestPhase::Reading,
            1,
            format!("Preparing {}", name),
        ));

        let metadata = tokio::fs::metadata(path).await?;
        let size = metadata.len();

        if format == SourceFormat::Xlsx && size > MAX_WORKBOOK_BYTES {
            let e = VaultError::Oversize {
                size,
                limit: MAX_WORKBOOK_BYTES,
            };
            let _ = progress.send(ProgressEvent::new(IngestPhase::Error, 0, e.to_string()));
            return Err(e);
        }

        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let entry = self
            .registry
            .register(&NewFileEntry {
                id: rowvault_common::upload_id(&name, size, last_modified),
                original_name: name.clone(),
                kind: format.as_str().to_string(),
                size: size as i64,
                last_modified,
            })
            .await?;

        info!(
            file_id = %entry.id,
            name = %name,
            size = size,
            format = format.as_str(),
            "ingestion started"
        );

        let mut state = if options.revision_field.is_some() {
            IngestState::Deduping
        } else {
            IngestState::Parsing
        };
        debug!(file_id = %entry.id, state = state.as_str(), "state entered");

        let result = match format {
            SourceFormat::Csv => {
                self.run_csv(path, &entry.id, size, options, &progress, &cancel)
                    .await
            }
            SourceFormat::Xlsx => {
                self.run_workbook(path, &entry.id, options, &progress, &cancel)
                    .await
            }
        };

        match result {
            Ok(totals) => {
                state = IngestState::Ready;
                debug!(file_id = %entry.id, state = state.as_str(), "state entered");
                self.registry
                    .mark_ready(&entry.id, totals.rows_seen, totals.rows_upserted)
                    .await?;
                let total_records = self.records.count().await?;

                info!(
                    file_id = %entry.id,
                    rows_seen = totals.rows_seen,
                    rows_upserted = totals.rows_upserted,
                    total_records = total_records,
                    "ingestion completed"
                );
                let _ = progress.send(ProgressEvent::new(
                    IngestPhase::Done,
                    100,
                    format!("Done. Total deduped records: {}", total_records),
                ));

                Ok(IngestReport {
                    file_id: entry.id,
                    rows_seen: totals.rows_seen,
                    rows_upserted: totals.rows_upserted,
                    total_records,
                })
            }
            Err(e) => {
                state = IngestState::Error;
                debug!(file_id = %entry.id, state = state.as_str(), "state entered");
                let detail = e.to_string();
                warn!(file_id = %entry.id, error = %detail, "ingestion failed");

                // Committed batches stay; the entry must not remain in
                // `processing`.
                if let Err(mark_err) = self.registry.mark_error(&entry.id, &detail).await {
                    warn!(file_id = %entry.id, error = %mark_err, "failed to store error status");
                }
                let _ = progress.send(ProgressEvent::new(IngestPhase::Error, 0, detail));
                Err(e)
            }
        }
    }

    /// Streamed path: lazy batches, percent from bytes consumed.
    async fn run_csv(
        &self,
        path: &Path,
        file_id: &str,
        total_bytes: u64,
        options: &IngestOptions,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<Totals> {
        let mut reader = CsvBatchReader::open(path, options.batch_size).await?;
        let phase = self.active_phase(options);
        let mut totals = Totals::default();

        while let Some(batch) = reader.next_batch().await? {
            check_cancelled(progress, cancel)?;
            self.commit_batch(file_id, &batch.rows, options, &mut totals)
                .await?;

            let percent = if total_bytes > 0 {
                ((batch.cursor_bytes * 100 / total_bytes) as u8).min(99)
            } else {
                99
            };
            let _ = progress.send(ProgressEvent::new(
                phase,
                percent,
                format!("Rows processed: {}", totals.rows_seen),
            ));
            // Let interactive reads interleave between batches
            tokio::task::yield_now().await;
        }

        Ok(totals)
    }

    /// Whole-document path: percent from rows processed.
    async fn run_workbook(
        &self,
        path: &Path,
        file_id: &str,
        options: &IngestOptions,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<Totals> {
        let sheet = read_first_sheet(path).await?;
        let total_rows = sheet.rows.len().max(1) as i64;
        let phase = self.active_phase(options);
        let mut totals = Totals::default();

        for chunk in sheet.rows.chunks(options.batch_size.max(1)) {
            check_cancelled(progress, cancel)?;
            self.commit_batch(file_id, chunk, options, &mut totals).await?;

            let percent = ((totals.rows_seen * 100 / total_rows) as u8).min(99);
            let _ = progress.send(ProgressEvent::new(
                phase,
                percent,
                format!("Rows processed: {}", totals.rows_seen),
            ));
            tokio::task::yield_now().await;
        }

        Ok(totals)
    }

    fn active_phase(&self, options: &IngestOptions) -> IngestPhase {
        if options.revision_field.is_some() {
            IngestPhase::Deduping
        } else {
            IngestPhase::Parsing
        }
    }

    /// Upsert one batch of rows plus the entry's counters in a single
    /// transaction. Rows without a usable key count as seen only.
    async fn commit_batch(
        &self,
        file_id: &str,
        rows: &[RowPayload],
        options: &IngestOptions,
        totals: &mut Totals,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now_ms = Utc::now().timestamp_millis();

        for payload in rows {
            totals.rows_seen += 1;

            let key = scalar_text(payload.get(&options.key_field));
            if key.is_empty() {
                continue;
            }

            if let Some(revision_field) = &options.revision_field {
                if !revision_wins(&mut tx, &key, revision_field, payload).await? {
                    continue;
                }
            }

            RecordStore::upsert_tx(&mut tx, &key, payload, file_id, now_ms).await?;
            totals.rows_upserted += 1;
        }

        FileRegistry::update_progress_tx(&mut tx, file_id, totals.rows_seen, totals.rows_upserted)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Cancellation is cooperative: a triggered token or a dropped progress
/// receiver stops the file between batches. Committed batches remain.
fn check_cancelled(progress: &ProgressSender, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() || progress.is_closed() {
        return Err(VaultError::Cancelled);
    }
    Ok(())
}

/// Compare the incoming row's revision field against the stored one,
/// inside the batch transaction so same-batch conflicts resolve
/// correctly. Revision stamps compare as strings (ISO dates order
/// lexicographically); ties fall back to last-write-wins, and a row
/// missing the field loses to a stored record that has it.
async fn revision_wins(
    tx: &mut Transaction<'_, Sqlite>,
    key: &str,
    revision_field: &str,
    incoming: &RowPayload,
) -> Result<bool> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT payload FROM records WHERE key = ?1")
            .bind(key)
            .fetch_optional(&mut **tx)
            .await?;

    let Some(existing_json) = existing else {
        return Ok(true);
    };
    let existing_payload: RowPayload = serde_json::from_str(&existing_json)?;

    let existing_rev = scalar_text(existing_payload.get(revision_field));
    let incoming_rev = scalar_text(incoming.get(revision_field));

    if incoming_rev.is_empty() && !existing_rev.is_empty() {
        return Ok(false);
    }
    Ok(incoming_rev >= existing_rev)
}

/// Render a payload scalar as trimmed text ("" for null/missing), used
/// for business keys and revision stamps.
fn scalar_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_text_variants() {
        use serde_json::Value;

        assert_eq!(scalar_text(Some(&Value::String("  A1 ".into()))), "A1");
        assert_eq!(scalar_text(Some(&Value::Number(42.into()))), "42");
        assert_eq!(scalar_text(Some(&Value::Bool(true))), "true");
        assert_eq!(scalar_text(Some(&Value::Null)), "");
        assert_eq!(scalar_text(None), "");
    }

    #[test]
    fn test_options_builder() {
        let options = IngestOptions::new("sku")
            .with_revision_field("revised_at")
            .with_batch_size(0);
        assert_eq!(options.key_field, "sku");
        assert_eq!(options.revision_field.as_deref(), Some("revised_at"));
        // batch size never drops below one row
        assert_eq!(options.batch_size, 1);
    }
}
