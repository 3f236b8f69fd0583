//! `rowvault export` - stream the deduplicated store to a CSV artifact

use std::path::Path;

use anyhow::Context;
use console::style;
use rowvault_engine::db::records::RecordStore;
use rowvault_engine::{db, Exporter};

use crate::progress::create_spinner;

pub async fn run(db_path: &Path, output: &Path, row_cap: usize) -> anyhow::Result<()> {
    let pool = db::open(db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;

    let exporter = Exporter::new(RecordStore::new(pool));

    let spinner = create_spinner(&format!("Exporting to {}", output.display()));
    let written = exporter
        .export(output, row_cap)
        .await
        .context("Export failed")?;
    spinner.finish_and_clear();

    println!(
        "{} exported {} rows to {}",
        style("✓").green(),
        written,
        output.display()
    );
    Ok(())
}
