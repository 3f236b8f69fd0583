//! `rowvault files` - list, rename, reorder, delete stored uploads

use std::path::Path;

use anyhow::Context;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use rowvault_engine::{db, FileStatus, Ingestor, ReorderDirection};

use crate::progress::format_bytes;

async fn ingestor(db_path: &Path) -> anyhow::Result<Ingestor> {
    let pool = db::open(db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;
    Ok(Ingestor::new(pool))
}

pub async fn list(db_path: &Path) -> anyhow::Result<()> {
    let ingestor = ingestor(db_path).await?;
    let entries = ingestor.registry().list().await?;

    if entries.is_empty() {
        println!("No files stored yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Order", "Id", "Name", "Kind", "Size", "Rows seen", "Upserted", "Status", "Uploaded",
    ]);

    for entry in &entries {
        let status = match entry.status {
            FileStatus::Error => format!(
                "error: {}",
                entry.error_detail.as_deref().unwrap_or("unknown")
            ),
            other => other.as_str().to_string(),
        };
        table.add_row(vec![
            Cell::new(entry.ord),
            Cell::new(&entry.id),
            Cell::new(&entry.display_name),
            Cell::new(&entry.kind),
            Cell::new(format_bytes(entry.size as u64)),
            Cell::new(entry.rows_seen),
            Cell::new(entry.rows_upserted),
            Cell::new(status),
            Cell::new(entry.uploaded_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!("{table}");

    let total = ingestor.records().count().await?;
    println!("Deduplicated records: {}", total);
    Ok(())
}

pub async fn rename(db_path: &Path, id: &str, name: &str) -> anyhow::Result<()> {
    let ingestor = ingestor(db_path).await?;
    if ingestor.registry().rename(id, name).await? {
        println!("{} renamed to '{}'", style("✓").green(), name);
    } else {
        println!("No file with id '{}'; nothing to do.", id);
    }
    Ok(())
}

pub async fn reorder(db_path: &Path, id: &str, direction: &str) -> anyhow::Result<()> {
    let direction: ReorderDirection = direction
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let ingestor = ingestor(db_path).await?;
    if ingestor.registry().reorder(id, direction).await? {
        println!("{} order updated", style("✓").green());
    } else {
        println!("No move possible for '{}'; nothing to do.", id);
    }
    Ok(())
}

pub async fn delete(db_path: &Path, id: &str) -> anyhow::Result<()> {
    let ingestor = ingestor(db_path).await?;
    let removed = ingestor.registry().delete_cascade(id).await?;
    println!(
        "{} file deleted along with {} of its records",
        style("✓").green(),
        removed
    );
    Ok(())
}
