//! Ingestion coordinator tests
//!
//! End-to-end ingestion through the real parser and store: dedup
//! counting, last-write-wins across files, failure handling that never
//! leaves an entry in `processing`, and cooperative cancellation.

use std::path::{Path, PathBuf};

use rowvault_engine::ingest::IngestPhase;
use rowvault_engine::{db, IngestOptions, IngestReport, Ingestor, VaultError};
use rowvault_engine::types::FileStatus;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,rowvault_engine=debug")),
        )
        .with_test_writer()
        .try_init();
}

async fn open_store() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::open(&dir.path().join("store.db")).await.unwrap();
    (dir, pool)
}

fn write_fixture(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

async fn ingest(
    ingestor: &Ingestor,
    path: &Path,
    options: &IngestOptions,
) -> (rowvault_engine::Result<IngestReport>, Vec<IngestPhase>) {
    let (progress, mut events) = mpsc::unbounded_channel::<rowvault_engine::ingest::ProgressEvent>();
    let drain = tokio::spawn(async move {
        let mut phases = Vec::new();
        while let Some(event) = events.recv().await {
            phases.push(event.phase);
        }
        phases
    });

    let result = ingestor
        .ingest(path, options, progress, CancellationToken::new())
        .await;
    let phases = drain.await.unwrap();
    (result, phases)
}

#[tokio::test]
async fn test_scenario_dedup_counts() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let path = write_fixture(&dir, "inventory.csv", b"id,qty\nA,5\nB,7\nA,9\n");
    let (result, phases) = ingest(&ingestor, &path, &IngestOptions::new("id")).await;
    let report = result.unwrap();

    assert_eq!(report.rows_seen, 3);
    assert_eq!(report.rows_upserted, 3);
    assert_eq!(report.total_records, 2);

    let record = ingestor.records().get("A").await.unwrap().unwrap();
    assert_eq!(record.payload["qty"], "9");

    assert_eq!(phases.first(), Some(&IngestPhase::Reading));
    assert_eq!(phases.last(), Some(&IngestPhase::Done));
}

#[tokio::test]
async fn test_empty_key_rows_counted_but_not_upserted() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let path = write_fixture(&dir, "inventory.csv", b"id,qty\nA,5\n,6\n  ,7\n");
    let (result, _) = ingest(&ingestor, &path, &IngestOptions::new("id")).await;
    let report = result.unwrap();

    assert_eq!(report.rows_seen, 3);
    assert_eq!(report.rows_upserted, 1);
    assert_eq!(ingestor.records().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reingest_unchanged_file_is_idempotent() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let path = write_fixture(&dir, "inventory.csv", b"id,qty\nA,5\nB,7\n");
    let options = IngestOptions::new("id");

    let (first, _) = ingest(&ingestor, &path, &options).await;
    let first = first.unwrap();
    let payload_before = ingestor.records().get("A").await.unwrap().unwrap().payload;

    let (second, _) = ingest(&ingestor, &path, &options).await;
    let second = second.unwrap();

    // same deterministic id, same counts, same content
    assert_eq!(first.file_id, second.file_id);
    assert_eq!(second.total_records, first.total_records);
    let payload_after = ingestor.records().get("A").await.unwrap().unwrap().payload;
    assert_eq!(payload_before, payload_after);
    assert_eq!(ingestor.registry().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_last_write_wins_across_files() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);
    let options = IngestOptions::new("id");

    let file_a = write_fixture(&dir, "a.csv", b"id,v\nX,1\n");
    let file_b = write_fixture(&dir, "b.csv", b"id,v\nX,2\n");

    let (report_a, _) = ingest(&ingestor, &file_a, &options).await;
    let report_a = report_a.unwrap();
    let (report_b, _) = ingest(&ingestor, &file_b, &options).await;
    let report_b = report_b.unwrap();

    let record = ingestor.records().get("X").await.unwrap().unwrap();
    assert_eq!(record.payload["v"], "2");
    assert_eq!(record.source_file_id, report_b.file_id);
    assert_ne!(report_a.file_id, report_b.file_id);

    // listing order does not affect the winner
    assert_eq!(ingestor.records().count().await.unwrap(), 1);

    // deleting the overwriting file removes the key entirely; the
    // older file's value does not come back
    ingestor
        .registry()
        .delete_cascade(&report_b.file_id)
        .await
        .unwrap();
    assert!(ingestor.records().get("X").await.unwrap().is_none());
    assert_eq!(ingestor.records().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_parse_failure_keeps_partial_counts_and_marks_error() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    // second record carries invalid UTF-8; batch size 1 so the first
    // row commits before the failure
    let path = write_fixture(&dir, "broken.csv", b"id,qty\nA,5\nB,\xff\xfe\n");
    let options = IngestOptions::new("id").with_batch_size(1);

    let (result, phases) = ingest(&ingestor, &path, &options).await;
    assert!(matches!(result.unwrap_err(), VaultError::Parse(_)));
    assert_eq!(phases.last(), Some(&IngestPhase::Error));

    // prior committed batch persists
    assert_eq!(ingestor.records().count().await.unwrap(), 1);

    // the entry is listed as error with detail, never stuck processing
    let entries = ingestor.registry().list().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, FileStatus::Error);
    assert!(entries[0].error_detail.as_deref().unwrap().contains("parse"));
    assert_eq!(entries[0].rows_seen, 1);
}

#[tokio::test]
async fn test_unsupported_extension_fails_before_any_state() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let path = write_fixture(&dir, "notes.txt", b"id,qty\nA,5\n");
    let (result, phases) = ingest(&ingestor, &path, &IngestOptions::new("id")).await;

    assert!(matches!(
        result.unwrap_err(),
        VaultError::UnsupportedFormat(_)
    ));
    assert_eq!(phases, [IngestPhase::Error]);
    assert!(ingestor.registry().list().await.unwrap().is_empty());
    assert_eq!(ingestor.records().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversize_workbook_fails_before_parse() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let oversized = vec![0u8; 21 * 1024 * 1024];
    let path = write_fixture(&dir, "big.xlsx", &oversized);

    let (result, _) = ingest(&ingestor, &path, &IngestOptions::new("id")).await;
    assert!(matches!(result.unwrap_err(), VaultError::Oversize { .. }));
    assert!(ingestor.registry().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_marks_entry_error() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);

    let path = write_fixture(&dir, "inventory.csv", b"id,qty\nA,5\nB,7\n");
    let (progress, _events) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = ingestor
        .ingest(&path, &IngestOptions::new("id"), progress, cancel)
        .await;
    assert!(matches!(result.unwrap_err(), VaultError::Cancelled));

    let entries = ingestor.registry().list().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, FileStatus::Error);
    assert!(entries[0]
        .error_detail
        .as_deref()
        .unwrap()
        .contains("cancelled"));
}

#[tokio::test]
async fn test_revision_field_keeps_newer_value() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);
    let options = IngestOptions::new("id").with_revision_field("revised_at");

    // the older revision arrives later, both within one file and from a
    // second file
    let first = write_fixture(
        &dir,
        "a.csv",
        b"id,revised_at,v\nX,2026-02-01,new\nX,2026-01-01,stale\n",
    );
    let (result, phases) = ingest(&ingestor, &first, &options).await;
    let report = result.unwrap();
    assert_eq!(report.rows_seen, 2);
    assert_eq!(report.rows_upserted, 1);
    assert!(phases.contains(&IngestPhase::Deduping));

    let record = ingestor.records().get("X").await.unwrap().unwrap();
    assert_eq!(record.payload["v"], "new");

    let second = write_fixture(&dir, "b.csv", b"id,revised_at,v\nX,2025-12-31,older\n");
    let (result, _) = ingest(&ingestor, &second, &options).await;
    result.unwrap();

    let record = ingestor.records().get("X").await.unwrap().unwrap();
    assert_eq!(record.payload["v"], "new");
}

#[tokio::test]
async fn test_failure_does_not_abort_other_files() {
    init_tracing();
    let (dir, pool) = open_store().await;
    let ingestor = Ingestor::new(pool);
    let options = IngestOptions::new("id");

    let bad = write_fixture(&dir, "bad.txt", b"nope");
    let good = write_fixture(&dir, "good.csv", b"id,qty\nA,5\n");

    let (bad_result, _) = ingest(&ingestor, &bad, &options).await;
    assert!(bad_result.is_err());

    // caller decides to continue with the next queued file
    let (good_result, _) = ingest(&ingestor, &good, &options).await;
    assert_eq!(good_result.unwrap().rows_upserted, 1);
}
