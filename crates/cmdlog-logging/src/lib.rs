//! Tracing subscriber setup for cmdlog hosts and tools
//!
//! The command log itself only emits `tracing` events. Every recorded
//! command is logged at INFO on target `cmdlog`; dispatcher lifecycle,
//! delivery failures and producer errors use the crate's module targets.
//! This crate wires those events to the console and/or rotating files.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Pretty Console**: Human-readable output for development
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//! - **RUST_LOG**: Overrides the configured default level
//!
//! # Quick Start
//!
//! ```ignore
//! use cmdlog_logging::{CmdlogSubscriberBuilder, LogConfig};
//!
//! // Simple setup with defaults (JSONL to console)
//! let _guard = CmdlogSubscriberBuilder::new().init();
//!
//! // Development mode with pretty human-readable output
//! let _guard = CmdlogSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//!
//! // JSONL files only, rotated daily under ./logs
//! let _guard = CmdlogSubscriberBuilder::new()
//!     .with_config(LogConfig::production("./logs".into()))
//!     .with_level("debug")
//!     .init();
//! ```

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be created
    #[error("failed to prepare log file: {0}")]
    Io(#[from] std::io::Error),

    /// A global subscriber is already installed
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and initializing the cmdlog logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct CmdlogSubscriberBuilder {
    config: LogConfig,
}

impl CmdlogSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    ///
    /// Default: JSONL output to console
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Initialize the subscriber globally
    ///
    /// Returns a guard that must be kept alive for the duration of the
    /// program when file output is enabled. Failures are printed to stderr
    /// and leave logging uninitialized.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    ///
    /// Returns an error if the log file cannot be created or a global
    /// subscriber has already been set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter_directive()));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            if self.config.console.pretty {
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(self.config.console.ansi)
                        .with_target(true)
                        .boxed(),
                );
            } else {
                layers.push(jsonl_layer(&self.config.jsonl, std::io::stdout).boxed());
            }
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            guard = Some(file_guard);
            layers.push(jsonl_layer(&self.config.jsonl, writer).boxed());
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for CmdlogSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn jsonl_layer<S, W>(config: &JsonlConfig, writer: W) -> impl Layer<S> + Send + Sync + use<S, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer)
}

/// Non-blocking file writer; truncates for `Never` rotation, appends otherwise
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let pair = match config.rotation {
        RotationStrategy::Never => {
            let file = File::create(config.single_file_path())?;
            tracing_appender::non_blocking(file)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &config.directory,
            &config.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &config.directory,
            &config.prefix,
        )),
    };
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = CmdlogSubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
    }

    #[test]
    fn test_default_is_jsonl() {
        let builder = CmdlogSubscriberBuilder::new();
        assert!(!builder.config.console.pretty); // JSONL by default
    }

    #[test]
    fn test_builder_with_config() {
        let builder = CmdlogSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config.default_level, "debug");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_level_overrides_config() {
        let builder = CmdlogSubscriberBuilder::new()
            .with_config(LogConfig::development())
            .with_level("trace");
        assert_eq!(builder.config.default_level, "trace");
        assert!(builder.config.console.pretty);
        assert!(builder.config.console.ansi);
    }

    #[test]
    fn test_single_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("logs"),
            prefix: "test".to_string(),
            rotation: RotationStrategy::Never,
        };

        let (mut writer, guard) = file_writer(&config).unwrap();
        writer.write_all(b"hello\n").unwrap();
        drop(guard);

        let written = fs::read_to_string(config.single_file_path()).unwrap();
        assert_eq!(written, "hello\n");
    }

    #[test]
    fn test_second_init_fails() {
        let _ = CmdlogSubscriberBuilder::new()
            .with_config(LogConfig::testing())
            .try_init();
        let result = CmdlogSubscriberBuilder::new()
            .with_config(LogConfig::testing())
            .try_init();
        assert!(matches!(result, Err(LoggingError::Init(_))));
    }
}
