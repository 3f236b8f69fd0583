//! Logging configuration and initialization
//!
//! Centralized tracing setup for all Rowvault binaries. Supports console
//! and/or daily-rotated file output, text or JSON formatting, and
//! environment-based overrides. Library code never prints; it emits
//! structured events (`info!`, `warn!`, ...) and this module decides
//! where they go.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Minimum level to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Emit JSON instead of human-readable text
    pub json: bool,
    /// When set, also write daily-rotated log files into this directory
    pub log_dir: Option<PathBuf>,
    /// Log file name prefix (e.g. "rowvault" -> "rowvault.2026-08-05.log")
    pub log_file_prefix: String,
    /// Extra filter directives (e.g. "sqlx=warn")
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            log_dir: None,
            log_file_prefix: "rowvault".to_string(),
            filter_directives: None,
        }
    }
}

impl LogConfig {
    /// Load overrides from `ROWVAULT_LOG_*` environment variables.
    ///
    /// - `ROWVAULT_LOG_LEVEL`: trace|debug|info|warn|error
    /// - `ROWVAULT_LOG_JSON`: true|false
    /// - `ROWVAULT_LOG_DIR`: directory for rotated log files
    /// - `ROWVAULT_LOG_FILTER`: extra filter directives
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("ROWVAULT_LOG_LEVEL") {
            self.level = level.parse()?;
        }
        if let Ok(json) = std::env::var("ROWVAULT_LOG_JSON") {
            self.json = json.parse().unwrap_or(false);
        }
        if let Ok(dir) = std::env::var("ROWVAULT_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(filter) = std::env::var("ROWVAULT_LOG_FILTER") {
            self.filter_directives = Some(filter);
        }
        Ok(self)
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at process startup; a second call returns an error from
/// `try_init` which callers may ignore.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',') {
            filter = filter.add_directive(
                directive
                    .parse()
                    .context("Failed to parse filter directive")?,
            );
        }
    }

    match &config.log_dir {
        None => {
            if config.json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(std::io::stderr).json())
                    .try_init()?;
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .try_init()?;
            }
        }
        Some(dir) => {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(dir, &config.log_file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // The guard must outlive the process for buffered writes to land.
            std::mem::forget(guard);

            if config.json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(std::io::stderr).json())
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false).json())
                    .try_init()?;
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .try_init()?;
            }
        }
    }

    Ok(())
}
