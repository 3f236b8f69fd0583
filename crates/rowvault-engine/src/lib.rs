//! Rowvault Engine
//!
//! Streaming ingestion of large tabular uploads into a persistent,
//! deduplicated, keyed SQLite store.
//!
//! # Components
//!
//! - [`parse`]: chunked CSV parsing and bounded XLSX decoding
//! - [`db`]: the keyed record store and the per-upload file registry
//! - [`ingest`]: the ingestion coordinator (state machine, batching,
//!   progress events, cancellation)
//! - [`export`]: streaming CSV re-export of the deduplicated store
//!
//! # Example
//!
//! ```no_run
//! use rowvault_engine::{db, Ingestor, IngestOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> rowvault_engine::Result<()> {
//!     let pool = db::open(std::path::Path::new("rowvault.db")).await?;
//!     let ingestor = Ingestor::new(pool);
//!     let (progress, _events) = tokio::sync::mpsc::unbounded_channel();
//!     let report = ingestor
//!         .ingest(
//!             std::path::Path::new("inventory.csv"),
//!             &IngestOptions::new("sku"),
//!             progress,
//!             CancellationToken::new(),
//!         )
//!         .await?;
//!     println!("{} rows upserted", report.rows_upserted);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod export;
pub mod ingest;
pub mod parse;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VaultError};
pub use export::Exporter;
pub use ingest::{IngestOptions, IngestReport, Ingestor};
pub use types::{FileEntry, FileStatus, ReorderDirection, RowPayload, StoredRecord};
