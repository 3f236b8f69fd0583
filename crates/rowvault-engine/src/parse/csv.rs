//! Chunked CSV parsing
//!
//! Wraps an async CSV reader into a pull-based batch source: each call
//! to `next_batch` yields up to `batch_size` row payloads plus the byte
//! position reached, then suspends. The sequence is lazy and
//! non-resumable; quoting and embedded delimiters are handled by the
//! reader.

use std::path::Path;

use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use tokio::fs::File;

use super::{payload_from_fields, RowBatch};
use crate::error::{Result, VaultError};

/// Lazy batch reader over a CSV file
pub struct CsvBatchReader {
    reader: AsyncReader<File>,
    headers: Vec<String>,
    batch_size: usize,
    done: bool,
}

impl CsvBatchReader {
    /// Open the file and consume the header record, which defines the
    /// field names for every later row.
    pub async fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::open(path).await?;
        let mut reader = AsyncReaderBuilder::new()
            .flexible(true)
            .create_reader(file);

        let headers = reader
            .headers()
            .await
            .map_err(|e| VaultError::Parse(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(Self {
            reader,
            headers,
            batch_size: batch_size.max(1),
            done: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Read the next batch. Returns `None` once the stream is
    /// exhausted. A malformed record fails the whole call; rows already
    /// handed out in earlier batches stay with the caller.
    pub async fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        if self.done {
            return Ok(None);
        }

        let mut rows = Vec::with_capacity(self.batch_size);
        let mut record = StringRecord::new();

        while rows.len() < self.batch_size {
            let more = self
                .reader
                .read_record(&mut record)
                .await
                .map_err(|e| VaultError::Parse(e.to_string()))?;
            if !more {
                self.done = true;
                break;
            }

            let fields = (0..self.headers.len()).map(|i| record.get(i));
            rows.push(payload_from_fields(&self.headers, fields));
        }

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(RowBatch {
            rows,
            cursor_bytes: self.reader.position().byte(),
        }))
    }
}
