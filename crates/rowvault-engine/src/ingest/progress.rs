//! Progress event stream
//!
//! The coordinator publishes `{phase, percent, detail}` events on an
//! unbounded channel. A dropped receiver counts as a cancellation
//! request, checked between batches alongside the token.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Externally visible phase of an ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestPhase {
    Reading,
    Parsing,
    Deduping,
    Done,
    Error,
}

impl IngestPhase {
    pub fn as_str(&self) -> &str {
        match self {
            IngestPhase::Reading => "reading",
            IngestPhase::Parsing => "parsing",
            IngestPhase::Deduping => "deduping",
            IngestPhase::Done => "done",
            IngestPhase::Error => "error",
        }
    }
}

/// One progress update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: IngestPhase,
    /// 0-100; capped at 99 until the file is finalized
    pub percent: u8,
    pub detail: String,
}

impl ProgressEvent {
    pub fn new(phase: IngestPhase, percent: u8, detail: impl Into<String>) -> Self {
        Self {
            phase,
            percent: percent.min(100),
            detail: detail.into(),
        }
    }
}

/// Sending half of the progress stream
pub type ProgressSender = UnboundedSender<ProgressEvent>;
