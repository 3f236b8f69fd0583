//! `rowvault ingest` - sequential ingestion of queued uploads

use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;
use rowvault_engine::{db, IngestOptions, Ingestor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::progress::create_percent_bar;

pub async fn run(
    db_path: &Path,
    files: Vec<PathBuf>,
    key: String,
    revision_field: Option<String>,
    batch_size: usize,
) -> anyhow::Result<()> {
    let pool = db::open(db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;
    let ingestor = Ingestor::new(pool);

    let mut options = IngestOptions::new(key).with_batch_size(batch_size);
    if let Some(field) = revision_field {
        options = options.with_revision_field(field);
    }

    // One file at a time: bounded memory, no interleaved writes to the
    // same key from two files racing.
    let mut failures = 0usize;
    for path in files {
        let pb = create_percent_bar(&format!("Ingesting {}", path.display()));

        let (progress, mut events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = {
            let ingestor = ingestor.clone();
            let options = options.clone();
            let path = path.clone();
            tokio::spawn(async move { ingestor.ingest(&path, &options, progress, cancel).await })
        };

        while let Some(event) = events.recv().await {
            pb.set_position(event.percent as u64);
            pb.set_message(format!(
                "{} [{}] {}",
                path.display(),
                event.phase.as_str(),
                event.detail
            ));
        }

        match worker.await.context("Ingestion task panicked")? {
            Ok(report) => {
                pb.finish_and_clear();
                println!(
                    "{} {}: {} rows seen, {} upserted, {} records in store",
                    style("✓").green(),
                    path.display(),
                    report.rows_seen,
                    report.rows_upserted,
                    report.total_records
                );
            }
            Err(e) => {
                pb.abandon_with_message(format!("{}: {}", path.display(), e));
                eprintln!("{} {}: {}", style("✗").red(), path.display(), e);
                // A failure aborts only this file; remaining uploads
                // still get their chance.
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} file(s) failed to ingest", failures);
    }
    Ok(())
}
