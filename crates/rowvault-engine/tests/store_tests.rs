//! Record store and file registry tests
//!
//! Covers the store invariants: count equals distinct keys ever written
//! minus cascade-deleted keys, re-putting a key never double-counts,
//! cascade delete removes exactly the records a file owns, and registry
//! operations on missing ids are no-ops.

use rowvault_engine::db;
use rowvault_engine::db::files::{FileRegistry, NewFileEntry};
use rowvault_engine::db::records::RecordStore;
use rowvault_engine::types::{FileStatus, ReorderDirection, RowPayload};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn open_store() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::open(&dir.path().join("store.db")).await.unwrap();
    (dir, pool)
}

fn payload(pairs: &[(&str, &str)]) -> RowPayload {
    let mut payload = RowPayload::new();
    for (name, value) in pairs {
        payload.insert(name.to_string(), Value::String(value.to_string()));
    }
    payload
}

async fn put(pool: &SqlitePool, key: &str, pairs: &[(&str, &str)], file_id: &str) {
    RecordStore::new(pool.clone())
        .put(key, &payload(pairs), file_id)
        .await
        .unwrap();
}

fn meta(id: &str, name: &str) -> NewFileEntry {
    NewFileEntry {
        id: id.to_string(),
        original_name: name.to_string(),
        kind: "csv".to_string(),
        size: 100,
        last_modified: 1_700_000_000_000,
    }
}

#[tokio::test]
async fn test_count_matches_distinct_keys() {
    let (_dir, pool) = open_store().await;
    let records = RecordStore::new(pool.clone());

    put(&pool, "A", &[("qty", "1")], "f1").await;
    put(&pool, "B", &[("qty", "2")], "f1").await;
    put(&pool, "A", &[("qty", "9")], "f1").await;

    assert_eq!(records.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_reput_overwrites_payload_and_owner() {
    let (_dir, pool) = open_store().await;
    let records = RecordStore::new(pool.clone());

    put(&pool, "A", &[("qty", "1")], "f1").await;
    put(&pool, "A", &[("qty", "9")], "f2").await;

    let record = records.get("A").await.unwrap().unwrap();
    assert_eq!(record.payload["qty"], "9");
    assert_eq!(record.source_file_id, "f2");
    assert_eq!(records.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_scan_is_bounded_and_key_ordered() {
    let (_dir, pool) = open_store().await;
    let records = RecordStore::new(pool.clone());

    for key in ["C", "A", "B", "D"] {
        put(&pool, key, &[("qty", "1")], "f1").await;
    }

    let sample = records.scan(3).await.unwrap();
    let keys: Vec<_> = sample.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["A", "B", "C"]);

    let rest = records.scan_page(Some("C"), 10).await.unwrap();
    let keys: Vec<_> = rest.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["D"]);
}

#[tokio::test]
async fn test_cascade_delete_removes_only_owned_records() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());
    let records = RecordStore::new(pool.clone());

    registry.register(&meta("f1", "a.csv")).await.unwrap();
    registry.register(&meta("f2", "b.csv")).await.unwrap();

    put(&pool, "A", &[("qty", "1")], "f1").await;
    put(&pool, "B", &[("qty", "2")], "f2").await;
    put(&pool, "C", &[("qty", "3")], "f2").await;

    let removed = registry.delete_cascade("f2").await.unwrap();
    assert_eq!(removed, 2);

    assert!(records.get("A").await.unwrap().is_some());
    assert!(records.get("B").await.unwrap().is_none());
    assert!(records.get("C").await.unwrap().is_none());
    assert_eq!(records.count().await.unwrap(), 1);
    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cascade_delete_missing_id_is_noop() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());
    let records = RecordStore::new(pool.clone());

    registry.register(&meta("f1", "a.csv")).await.unwrap();
    put(&pool, "A", &[("qty", "1")], "f1").await;

    let removed = registry.delete_cascade("no-such-id").await.unwrap();
    assert_eq!(removed, 0);
    assert_eq!(records.count().await.unwrap(), 1);
    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_is_idempotent_by_id() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());

    registry.register(&meta("f1", "a.csv")).await.unwrap();
    registry.register(&meta("f1", "a.csv")).await.unwrap();

    let entries = registry.list().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, FileStatus::Processing);
    assert_eq!(entries[0].rows_seen, 0);
}

#[tokio::test]
async fn test_listing_follows_manual_order() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());

    registry.register(&meta("f1", "first.csv")).await.unwrap();
    registry.register(&meta("f2", "second.csv")).await.unwrap();
    registry.register(&meta("f3", "third.csv")).await.unwrap();

    let names: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(names, ["first.csv", "second.csv", "third.csv"]);
}

#[tokio::test]
async fn test_reorder_swaps_with_neighbor() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());

    registry.register(&meta("f1", "first.csv")).await.unwrap();
    registry.register(&meta("f2", "second.csv")).await.unwrap();

    assert!(registry.reorder("f2", ReorderDirection::Up).await.unwrap());

    let ids: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, ["f2", "f1"]);
}

#[tokio::test]
async fn test_reorder_boundary_and_missing_id_are_noops() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());

    registry.register(&meta("f1", "first.csv")).await.unwrap();
    registry.register(&meta("f2", "second.csv")).await.unwrap();

    // already at the top / bottom
    assert!(!registry.reorder("f1", ReorderDirection::Up).await.unwrap());
    assert!(!registry.reorder("f2", ReorderDirection::Down).await.unwrap());
    // unknown id
    assert!(!registry.reorder("ghost", ReorderDirection::Up).await.unwrap());

    let ids: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, ["f1", "f2"]);
}

#[tokio::test]
async fn test_rename_touches_display_name_only() {
    let (_dir, pool) = open_store().await;
    let registry = FileRegistry::new(pool.clone());

    registry.register(&meta("f1", "a.csv")).await.unwrap();
    assert!(registry.rename("f1", "Inventory week 32").await.unwrap());

    let entry = registry.get("f1").await.unwrap().unwrap();
    assert_eq!(entry.display_name, "Inventory week 32");
    assert_eq!(entry.original_name, "a.csv");

    assert!(!registry.rename("ghost", "x").await.unwrap());
}

#[tokio::test]
async fn test_payload_field_order_survives_storage() {
    let (_dir, pool) = open_store().await;
    let records = RecordStore::new(pool.clone());

    put(&pool, "A", &[("z", "1"), ("a", "2"), ("m", "3")], "f1").await;

    let record = records.get("A").await.unwrap().unwrap();
    let keys: Vec<_> = record.payload.keys().cloned().collect();
    assert_eq!(keys, ["z", "a", "m"]);
}
