//! `rowvault preview` - bounded sample of the deduplicated store

use std::path::Path;

use anyhow::Context;
use comfy_table::{presets::UTF8_FULL, Table};
use rowvault_engine::db;
use rowvault_engine::Ingestor;

const PAYLOAD_PREVIEW_CHARS: usize = 80;

pub async fn run(db_path: &Path, limit: usize) -> anyhow::Result<()> {
    let pool = db::open(db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;
    let ingestor = Ingestor::new(pool);

    let records = ingestor.records().scan(limit).await?;
    if records.is_empty() {
        println!("Store is empty.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Key", "Source file", "Payload"]);

    for record in &records {
        let payload = serde_json::to_string(&record.payload)?;
        let shown: String = if payload.chars().count() > PAYLOAD_PREVIEW_CHARS {
            let truncated: String = payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
            format!("{}…", truncated)
        } else {
            payload
        };
        table.add_row(vec![&record.key, &record.source_file_id, &shown]);
    }

    println!("{table}");

    let total = ingestor.records().count().await?;
    println!("Showing {} of {} records", records.len(), total);
    Ok(())
}
