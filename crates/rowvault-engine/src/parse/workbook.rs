//! Bounded XLSX decoding
//!
//! Workbooks cannot be parsed incrementally, so the whole document is
//! decoded in one pass and only the first sheet is flattened into row
//! payloads. Callers are protected from memory exhaustion by the size
//! ceiling checked before the parse begins; the decode itself runs on
//! the blocking pool so the cooperative scheduler keeps running.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use serde_json::Value;

use super::MAX_WORKBOOK_BYTES;
use crate::error::{Result, VaultError};
use crate::types::RowPayload;

/// Decoded first sheet: header names plus one payload per data row.
#[derive(Debug)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<RowPayload>,
}

/// Decode the first sheet of the workbook at `path`.
///
/// Fails with `Oversize` before any parsing when the file exceeds
/// [`MAX_WORKBOOK_BYTES`].
pub async fn read_first_sheet(path: &Path) -> Result<SheetRows> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > MAX_WORKBOOK_BYTES {
        return Err(VaultError::Oversize {
            size,
            limit: MAX_WORKBOOK_BYTES,
        });
    }

    let path: PathBuf = path.to_owned();
    tokio::task::spawn_blocking(move || decode_first_sheet(&path))
        .await
        .map_err(|e| VaultError::Parse(format!("workbook decode task failed: {}", e)))?
}

fn decode_first_sheet(path: &Path) -> Result<SheetRows> {
    let mut workbook: Xlsx<BufReader<File>> =
        open_workbook::<Xlsx<BufReader<File>>, _>(path)
            .map_err(|e| VaultError::Parse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| VaultError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| VaultError::Parse(e.to_string()))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(header_row) => header_row.iter().map(cell_to_header).collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for sheet_row in row_iter {
        let mut payload = RowPayload::new();
        for (i, name) in headers.iter().enumerate() {
            let value = sheet_row.get(i).map(cell_to_value).unwrap_or(Value::Null);
            payload.insert(name.clone(), value);
        }
        rows.push(payload);
    }

    Ok(SheetRows { headers, rows })
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => cell_to_value(other)
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Map a sheet cell onto the tagged scalar model: string, number,
/// boolean, or null for empty.
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::DateTime(dt) => serde_json::Number::from_f64(dt.as_f64())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("{:?}", e)),
    }
}
