//! Ingestion coordination
//!
//! Orchestrates parser, record store, and file registry for one upload
//! at a time:
//!
//! 1. Reading phase: detect format, capture metadata, register the entry
//! 2. Parsing phase: batch rows into per-transaction upserts
//! 3. Optional deduping phase: revision-field conflict resolution
//! 4. Finalize: entry becomes `ready` (or `error` with detail)
//!
//! Progress is published on a channel; cancellation is a token checked
//! between batches. Queued files are processed strictly one at a time
//! by the caller, so two uploads never race on the same key.

pub mod coordinator;
pub mod progress;

pub use coordinator::{IngestOptions, IngestReport, Ingestor};
pub use progress::{IngestPhase, ProgressEvent, ProgressSender};

use serde::{Deserialize, Serialize};

/// Coordinator state machine.
///
/// `Idle` is initial; `Ready` and `Error` are terminal per file.
/// `Deduping` is entered only when conflict resolution compares a
/// revision field instead of pure ingestion-order last-write-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Idle,
    Reading,
    Parsing,
    Deduping,
    Ready,
    Error,
}

impl IngestState {
    pub fn as_str(&self) -> &str {
        match self {
            IngestState::Idle => "idle",
            IngestState::Reading => "reading",
            IngestState::Parsing => "parsing",
            IngestState::Deduping => "deduping",
            IngestState::Ready => "ready",
            IngestState::Error => "error",
        }
    }

    /// Whether no further transitions can happen for this file.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestState::Ready | IngestState::Error)
    }
}
