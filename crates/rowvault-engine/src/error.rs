//! Error types for the Rowvault engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for the engine
///
/// Every failure mode of an ingestion maps onto one of these variants;
/// `UnsupportedFormat` and `Oversize` are raised before any store I/O,
/// while `Parse` and `Storage` abort the current file mid-flight with
/// partial counts retained.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("unsupported file format '{0}': only .csv and .xlsx uploads are accepted")]
    UnsupportedFormat(String),

    #[error("workbook too large ({size} bytes, limit {limit}): convert to CSV for streaming ingestion")]
    Oversize { size: u64, limit: u64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ingestion cancelled")]
    Cancelled,
}
