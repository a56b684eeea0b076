//! Replay of a JSONL host event stream into the command log
//!
//! Each line is one host event tagged by `kind`:
//!
//! ```text
//! {"kind":"command","actor":{"id":42,"name":"alice"},"command_name":"ping","message_id":1}
//! {"kind":"command_error","is_check_failure":true, ...}
//! {"kind":"app_command","interaction_kind":1, ...}
//! ```
//!
//! The host reports every failed command, but only check failures are
//! recorded.

use std::io::BufRead;

use anyhow::Context;
use cmdlog::{AppCommandEvent, CommandEvent, CommandLog};
use serde::Deserialize;
use tracing::{debug, warn};

/// One line of the event stream
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Command(CommandEvent),
    CommandError(FailedCommand),
    AppCommand(AppCommandEvent),
}

/// A failed text command as the host reports it
#[derive(Debug, Deserialize)]
pub struct FailedCommand {
    #[serde(flatten)]
    pub event: CommandEvent,
    /// Whether the failure came from a command check
    #[serde(default)]
    pub is_check_failure: bool,
}

/// Counters for one replay run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Non-blank lines read
    pub read: usize,
    /// Events that produced a stored record
    pub recorded: usize,
    /// Lines that could not be parsed
    pub malformed: usize,
}

/// Feed every event from `reader` into `log`
///
/// Malformed lines are logged and skipped; only I/O errors abort the replay.
pub fn replay(log: &CommandLog, reader: impl BufRead) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read event line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.read += 1;

        let event = match serde_json::from_str::<HostEvent>(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed event line");
                summary.malformed += 1;
                continue;
            }
        };

        if feed(log, &event) {
            summary.recorded += 1;
        }
    }

    Ok(summary)
}

fn feed(log: &CommandLog, event: &HostEvent) -> bool {
    match event {
        HostEvent::Command(event) => log.record_command(event),
        HostEvent::CommandError(failed) if failed.is_check_failure => {
            log.record_command_error(&failed.event)
        }
        HostEvent::CommandError(_) => {
            debug!("Ignoring command error that is not a check failure");
            false
        }
        HostEvent::AppCommand(event) => log.record_app_command(event),
    }
}
