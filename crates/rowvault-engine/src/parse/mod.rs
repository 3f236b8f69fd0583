//! Upload parsing
//!
//! Two input kinds are accepted:
//!
//! - **CSV** (`csv.rs`): parsed lazily in chunks with byte-position
//!   markers for progress. No size ceiling; memory stays bounded.
//! - **XLSX** (`workbook.rs`): decoded whole into memory in one pass
//!   (the format cannot be chunked), first sheet only, so inputs above
//!   [`MAX_WORKBOOK_BYTES`] are rejected before the parse begins.
//!
//! Format detection happens from the extension alone, before any I/O.

pub mod csv;
pub mod workbook;

use std::path::Path;

use crate::error::{Result, VaultError};
use crate::types::RowPayload;

/// In-memory ceiling for whole-document workbook decoding (20 MB).
pub const MAX_WORKBOOK_BYTES: u64 = 20 * 1024 * 1024;

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Detect the format from the file extension. Fails with
    /// `UnsupportedFormat` before any I/O happens.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            _ => Err(VaultError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
        }
    }
}

/// One parsed chunk of rows plus the byte position reached in the
/// source, for percent-complete reporting on the streamed path.
#[derive(Debug)]
pub struct RowBatch {
    pub rows: Vec<RowPayload>,
    pub cursor_bytes: u64,
}

/// Map a positional field list onto the header, producing the ordered
/// payload. Missing trailing fields become JSON null (absent, not an
/// error); fields beyond the header are dropped.
pub(crate) fn payload_from_fields<'a, I>(headers: &[String], fields: I) -> RowPayload
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut payload = RowPayload::new();
    let mut fields = fields;
    for name in headers {
        let value = match fields.next().flatten() {
            Some(text) => serde_json::Value::String(text.to_string()),
            None => serde_json::Value::Null,
        };
        payload.insert(name.clone(), value);
    }
    payload
}
