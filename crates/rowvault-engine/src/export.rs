//! Streaming CSV export of the deduplicated store
//!
//! Walks the record store in key order through keyset pages, derives
//! the header from the first record's field names, and serializes every
//! later record against that fixed header: fields a later record adds
//! are dropped, header fields it lacks render empty. Rows stream
//! through the writer page by page, with a yield between pages so large
//! exports never monopolize the scheduler.

use std::path::Path;

use csv_async::AsyncWriterBuilder;
use serde_json::Value;
use tokio::fs::File;
use tracing::info;

use crate::db::records::RecordStore;
use crate::error::Result;
use crate::types::RowPayload;

const PAGE_SIZE: usize = 1000;

/// Streams the store back out as a delimited artifact
#[derive(Clone)]
pub struct Exporter {
    records: RecordStore,
}

impl Exporter {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Export up to `row_cap` records to `output`. Returns the number
    /// of data rows written.
    pub async fn export(&self, output: &Path, row_cap: usize) -> Result<u64> {
        let file = File::create(output).await?;
        let mut writer = AsyncWriterBuilder::new().create_writer(file);

        let mut header: Option<Vec<String>> = None;
        let mut after: Option<String> = None;
        let mut written: u64 = 0;

        while (written as usize) < row_cap {
            let page_size = PAGE_SIZE.min(row_cap - written as usize);
            let page = self.records.scan_page(after.as_deref(), page_size).await?;
            if page.is_empty() {
                break;
            }

            for record in &page {
                if header.is_none() {
                    let first: Vec<String> = record.payload.keys().cloned().collect();
                    writer
                        .write_record(&first)
                        .await
                        .map_err(csv_async_error)?;
                    header = Some(first);
                }

                let fields: Vec<String> = header
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|name| field_text(&record.payload, name))
                    .collect();
                writer.write_record(&fields).await.map_err(csv_async_error)?;
                written += 1;
            }

            after = page.last().map(|r| r.key.clone());
            tokio::task::yield_now().await;
        }

        writer.flush().await?;

        info!(
            output = %output.display(),
            rows = written,
            "export completed"
        );
        Ok(written)
    }
}

/// Render one header field from a payload; missing or null fields
/// render empty. The CSV writer handles quoting and escaping.
fn field_text(payload: &RowPayload, name: &str) -> String {
    match payload.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn csv_async_error(e: csv_async::Error) -> crate::error::VaultError {
    match e.into_kind() {
        csv_async::ErrorKind::Io(io) => crate::error::VaultError::Io(io),
        other => crate::error::VaultError::Parse(format!("CSV write error: {:?}", other)),
    }
}
