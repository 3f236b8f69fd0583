//! Core types for the keyed store and file registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row payload: field name -> JSON scalar, in first-seen field order.
///
/// `serde_json` is built with `preserve_order`, so the map keeps
/// insertion order and re-export reproduces the original column order.
pub type RowPayload = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Processing,
    Ready,
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FileStatus::Processing => "processing",
            FileStatus::Ready => "ready",
            FileStatus::Error => "error",
        }
    }
}

impl From<String> for FileStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ready" => FileStatus::Ready,
            "error" => FileStatus::Error,
            _ => FileStatus::Processing,
        }
    }
}

/// Per-upload metadata entry (maps to the `files` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Deterministic id derived from name + size + last-modified
    pub id: String,
    pub original_name: String,
    /// User-renamable display name
    pub display_name: String,
    /// Source format ("csv" or "xlsx")
    pub kind: String,
    pub size: i64,
    /// Last-modified timestamp of the source file, epoch milliseconds
    pub last_modified: i64,
    pub uploaded_at: DateTime<Utc>,
    /// Rows observed in the source, including rows without a usable key
    pub rows_seen: i64,
    /// Rows actually written to the record store
    pub rows_upserted: i64,
    pub status: FileStatus,
    pub error_detail: Option<String>,
    /// Manual priority; listings sort by this ascending
    pub ord: i64,
}

/// A deduplicated record (maps to the `records` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Business key; unique across the store
    pub key: String,
    pub payload: RowPayload,
    /// FileEntry that last wrote this key
    pub source_file_id: String,
    /// Write timestamp, epoch milliseconds
    pub updated_at: i64,
}

/// Direction for a manual reorder of the file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    Up,
    Down,
}

impl std::str::FromStr for ReorderDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(ReorderDirection::Up),
            "down" => Ok(ReorderDirection::Down),
            other => Err(format!("invalid direction '{}': expected 'up' or 'down'", other)),
        }
    }
}
