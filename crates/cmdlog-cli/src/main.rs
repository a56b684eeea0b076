mod config;
mod replay;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cmdlog::{CmdLogConfig, CommandLog, FileSink, JsonFileSettings, Sink, Telemetry};
use cmdlog_logging::CmdlogSubscriberBuilder;
use tracing::{error, info};

use crate::config::{Cli, Command, FILE_SINK_ID};

/// Telemetry that forwards reports to the local log
struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn report(&self, error: &(dyn std::error::Error + 'static), breadcrumb: &str) {
        error!(error = %error, breadcrumb, "cmdlog error reported");
    }
}

/// Resolve sink id 1 to the `--sink-file` destination, when given
fn file_resolver(path: Option<PathBuf>) -> impl Fn(u64) -> Option<Arc<dyn Sink>> + Send + Sync {
    move |id| match &path {
        Some(path) if id == FILE_SINK_ID => Some(Arc::new(FileSink::new(path)) as Arc<dyn Sink>),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = CmdlogSubscriberBuilder::new()
        .with_config(cli.log_config())
        .with_level(&cli.log_level)
        .init();

    let config = CmdLogConfig::default().with_min_interval(Duration::from_secs(cli.interval));
    let log = CommandLog::new(
        config,
        Arc::new(JsonFileSettings::new(&cli.settings)),
        Arc::new(file_resolver(cli.sink_file.clone())),
    )
    .with_telemetry(Arc::new(LogTelemetry));

    match cli.command {
        Command::Replay {
            events,
            query,
            out_dir,
            linger,
        } => {
            log.start()?;

            let file = File::open(&events)
                .with_context(|| format!("Failed to open events file {}", events.display()))?;
            let summary = replay::replay(&log, BufReader::new(file))?;
            info!(
                read = summary.read,
                recorded = summary.recorded,
                malformed = summary.malformed,
                "Replay finished"
            );

            if log.active_sink().is_some() && linger > 0 {
                tokio::time::sleep(Duration::from_secs(linger)).await;
            }

            let report = log.query(&query);
            println!("{}", report.summary);
            println!("{}", report.body);
            println!("{}", log.cache_stats());

            if let Some(dir) = out_dir {
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(&report.file_name);
                std::fs::write(&path, &report.body)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                println!("Report written to {}", path.display());
            }

            log.shutdown().await;
        }
        Command::Content { enabled } => {
            log.set_log_content(enabled)?;
            if enabled {
                println!("Message content will now be logged.");
            } else {
                println!("Message content will no longer be logged.");
            }
        }
        Command::Sink { id } => {
            log.set_sink(id)
                .context("Failed to update the delivery sink")?;
            match id {
                Some(id) => println!("Commands will now be sent to sink {}.", id),
                None => println!("Commands will no longer be sent to a sink."),
            }
            log.shutdown().await;
        }
    }

    Ok(())
}
