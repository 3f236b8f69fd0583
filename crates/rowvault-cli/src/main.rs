//! Rowvault CLI - Main entry point

use clap::Parser;
use rowvault_cli::{Cli, Commands, FilesCommand};
use rowvault_common::logging::{init_logging, LogConfig, LogLevel};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        },
        ..LogConfig::default()
    };
    let log_config = log_config.from_env().unwrap_or_default();

    // The CLI should keep working even if logging setup fails
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Ingest {
            files,
            key,
            revision_field,
            batch_size,
        } => {
            rowvault_cli::commands::ingest::run(
                &cli.db,
                files.clone(),
                key.clone(),
                revision_field.clone(),
                *batch_size,
            )
            .await
        }

        Commands::Files { command } => match command {
            FilesCommand::List => rowvault_cli::commands::files::list(&cli.db).await,
            FilesCommand::Rename { id, name } => {
                rowvault_cli::commands::files::rename(&cli.db, id, name).await
            }
            FilesCommand::Reorder { id, direction } => {
                rowvault_cli::commands::files::reorder(&cli.db, id, direction).await
            }
            FilesCommand::Delete { id } => {
                rowvault_cli::commands::files::delete(&cli.db, id).await
            }
        },

        Commands::Export { output, row_cap } => {
            rowvault_cli::commands::export::run(&cli.db, output, *row_cap).await
        }

        Commands::Preview { limit } => {
            rowvault_cli::commands::preview::run(&cli.db, *limit).await
        }
    }
}
