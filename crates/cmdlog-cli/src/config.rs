use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmdlog::RecordFilter;
use cmdlog_logging::LogConfig;

/// Sink id that resolves to the `--sink-file` destination
pub const FILE_SINK_ID: u64 = 1;

#[derive(Parser)]
#[command(name = "cmdlog", about = "Replay command events and query the command log")]
pub struct Cli {
    /// Settings file (content logging flag and sink id)
    #[arg(long, default_value = "cmdlog.json")]
    pub settings: PathBuf,

    /// File that sink id 1 appends delivered pages to
    #[arg(long)]
    pub sink_file: Option<PathBuf>,

    /// Minimum seconds between two deliveries to the sink
    #[arg(long, default_value_t = 60)]
    pub interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Human-readable log output instead of JSONL
    #[arg(long)]
    pub pretty: bool,

    /// Write JSONL logs to daily files in this directory
    ///
    /// Without `--pretty` the console stays free for reports.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Logging setup for the chosen output flags; the level is applied separately
    pub fn log_config(&self) -> LogConfig {
        match (&self.log_dir, self.pretty) {
            (None, false) => LogConfig::default(),
            (None, true) => LogConfig::development(),
            (Some(dir), false) => LogConfig::production(dir.clone()),
            (Some(dir), true) => LogConfig {
                file: LogConfig::production(dir.clone()).file,
                ..LogConfig::development()
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Feed a JSONL stream of host events into the log, then run a query
    Replay {
        /// Events file, one JSON object per line
        events: PathBuf,
        /// all, user:<id>, server:<id> or command:<prefix>
        #[arg(long, default_value = "all", value_parser = parse_query)]
        query: RecordFilter,
        /// Also write the report body into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Seconds to keep delivering after the replay finishes
        #[arg(long, default_value_t = 1)]
        linger: u64,
    },
    /// Turn message content logging on or off
    Content {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Set the delivery sink, or clear it when no id is given
    Sink {
        id: Option<u64>,
    },
}

/// Parse a `--query` value into a filter
pub fn parse_query(value: &str) -> Result<RecordFilter, String> {
    if value == "all" {
        return Ok(RecordFilter::All);
    }

    let (shape, arg) = value.split_once(':').ok_or_else(|| {
        format!(
            "expected all, user:<id>, server:<id> or command:<prefix>, got '{}'",
            value
        )
    })?;

    let id = || {
        arg.parse::<u64>()
            .map_err(|e| format!("invalid id '{}': {}", arg, e))
    };

    match shape {
        "user" => id().map(RecordFilter::Actor),
        "server" => id().map(RecordFilter::Container),
        "command" if !arg.is_empty() => Ok(RecordFilter::CommandPrefix(arg.to_string())),
        "command" => Err("command prefix must not be empty".to_string()),
        other => Err(format!("unknown query '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(parse_query("all"), Ok(RecordFilter::All));
        assert_eq!(parse_query("user:42"), Ok(RecordFilter::Actor(42)));
        assert_eq!(parse_query("server:900"), Ok(RecordFilter::Container(900)));
        assert_eq!(
            parse_query("command:playlist create"),
            Ok(RecordFilter::CommandPrefix("playlist create".into()))
        );
        assert!(parse_query("user:alice").is_err());
        assert!(parse_query("command:").is_err());
        assert!(parse_query("channel:1").is_err());
        assert!(parse_query("everything").is_err());
    }

    #[test]
    fn test_cli_replay() {
        let cli = Cli::try_parse_from([
            "cmdlog",
            "--sink-file",
            "out.log",
            "replay",
            "events.jsonl",
            "--query",
            "user:7",
        ])
        .unwrap();

        assert_eq!(cli.settings, PathBuf::from("cmdlog.json"));
        assert_eq!(cli.interval, 60);
        match cli.command {
            Command::Replay { events, query, .. } => {
                assert_eq!(events, PathBuf::from("events.jsonl"));
                assert_eq!(query, RecordFilter::Actor(7));
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn test_cli_log_outputs() {
        let cli = Cli::try_parse_from(["cmdlog", "sink"]).unwrap();
        let config = cli.log_config();
        assert!(config.console.enabled && !config.console.pretty);
        assert!(config.file.is_none());

        let cli = Cli::try_parse_from(["cmdlog", "--log-dir", "logs", "sink"]).unwrap();
        let config = cli.log_config();
        assert!(!config.console.enabled);
        assert_eq!(config.file.unwrap().directory, PathBuf::from("logs"));

        let cli = Cli::try_parse_from(["cmdlog", "--pretty", "--log-dir", "logs", "sink"]).unwrap();
        let config = cli.log_config();
        assert!(config.console.enabled && config.console.pretty);
        assert_eq!(config.file.unwrap().prefix, "cmdlog");
    }

    #[test]
    fn test_cli_settings_commands() {
        let cli = Cli::try_parse_from(["cmdlog", "content", "true"]).unwrap();
        assert!(matches!(cli.command, Command::Content { enabled: true }));

        let cli = Cli::try_parse_from(["cmdlog", "sink"]).unwrap();
        assert!(matches!(cli.command, Command::Sink { id: None }));

        let cli = Cli::try_parse_from(["cmdlog", "sink", "1"]).unwrap();
        assert!(matches!(cli.command, Command::Sink { id: Some(1) }));
    }
}
