//! Rowvault CLI Library
//!
//! Command-line shell over the Rowvault engine:
//!
//! - **Ingestion**: `rowvault ingest data/*.csv --key sku`
//! - **File management**: `rowvault files list|rename|reorder|delete`
//! - **Export**: `rowvault export deduped.csv`
//! - **Preview**: `rowvault preview --limit 20`
//!
//! The shell only calls the engine's public operations; it never
//! touches the store's persistence format.

pub mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rowvault - deduplicated keyed store for tabular uploads
#[derive(Parser, Debug)]
#[command(name = "rowvault")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Store database path
    #[arg(long, env = "ROWVAULT_DB", default_value = "rowvault.db", global = true)]
    pub db: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest one or more tabular uploads, one file at a time
    Ingest {
        /// Files to ingest (.csv streamed, .xlsx bounded)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Field holding the business key used to deduplicate rows
        #[arg(short, long)]
        key: String,

        /// Resolve key conflicts by comparing this field instead of
        /// pure last-write-wins
        #[arg(long)]
        revision_field: Option<String>,

        /// Rows per write transaction
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },

    /// Manage stored files
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },

    /// Export the deduplicated store as CSV
    Export {
        /// Output path
        output: PathBuf,

        /// Maximum number of rows to export
        #[arg(long, default_value_t = 600_000)]
        row_cap: usize,
    },

    /// Show a bounded sample of stored records
    Preview {
        /// Maximum records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// File management subcommands
#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List stored files in priority order
    List,

    /// Change a file's display name
    Rename {
        /// File id (see `files list`)
        id: String,
        /// New display name
        name: String,
    },

    /// Move a file up or down in the priority order
    Reorder {
        /// File id
        id: String,
        /// Direction: up or down
        direction: String,
    },

    /// Delete a file and every record it owns
    Delete {
        /// File id
        id: String,
    },
}
