//! Operator-facing reports
//!
//! Query results are packaged as a [`Report`]: a short summary line meant
//! for the operator, and a text body (one `[timestamp] render` line per
//! record) meant to be uploaded as a file.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};

use crate::record::{LogRecord, TIME_FORMAT};
use crate::store::RecordFilter;

/// How long the log has been collecting, and whether it is saturated
#[derive(Debug, Clone, Copy)]
pub struct TrackInfo {
    pub saturated: bool,
    pub capacity: usize,
    pub running_for: TimeDelta,
}

impl fmt::Display for TrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.saturated {
            write!(
                f,
                "Max log size reached. Only the last {} commands are stored.",
                humanize_number(self.capacity)
            )
        } else {
            write!(f, "Log started {} ago.", humanize_timedelta(self.running_for))
        }
    }
}

/// Result of an operator query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// One-line description including the cache saturation note
    pub summary: String,
    /// Full report text
    pub body: String,
    /// Suggested file name for the body
    pub file_name: String,
    /// Number of records in the body
    pub matched: usize,
}

impl Report {
    /// Build a report for `filter` from already filtered `records`
    pub fn generate(
        filter: &RecordFilter,
        records: &[Arc<LogRecord>],
        track: &TrackInfo,
        generated_at: DateTime<Local>,
    ) -> Self {
        let now = generated_at.format(TIME_FORMAT);

        let (subject, header, empty, file_name) = match filter {
            RecordFilter::All => (
                String::new(),
                format!("Generated at {}.", now),
                None,
                "cmdlog.txt".to_string(),
            ),
            RecordFilter::Actor(id) => (
                format!(" for user {}", id),
                format!("Generated at {} for user {}.", now, id),
                Some("It looks like I didn't find anything for that user."),
                format!("cmdlog_{}.txt", id),
            ),
            RecordFilter::Container(id) => (
                format!(" for server {}", id),
                format!("Generated at {} for server {}.", now, id),
                Some("It looks like I didn't find anything for that server."),
                format!("cmdlog_{}.txt", id),
            ),
            RecordFilter::CommandPrefix(prefix) => (
                format!(" for command '{}'", prefix),
                format!("Generated at {} for command '{}'.", now, prefix),
                Some("It looks like I didn't find anything for that command."),
                format!("cmdlog_{}.txt", prefix.replace(' ', "_")),
            ),
        };

        let lines = records
            .iter()
            .map(|r| format!("[{}] {}", r.timestamp(), r.render()))
            .collect::<Vec<_>>();

        let listing = match (lines.is_empty(), empty) {
            (true, Some(notice)) => notice.to_string(),
            _ => lines.join("\n"),
        };

        Self {
            summary: format!("Here is the command log{}. {}", subject, track),
            body: format!("{}\n{}", header, listing),
            file_name,
            matched: records.len(),
        }
    }
}

/// Current cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub count: usize,
    /// Approximate bytes held
    pub bytes: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache size: {} with {} commands.",
            humanize_bytes(self.bytes),
            humanize_number(self.count)
        )
    }
}

/// `1234567` -> `1,234,567`
pub fn humanize_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Binary byte size with one decimal, e.g. `48.2 MiB`
pub fn humanize_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

/// `TimeDelta` as `1 day, 2 hours, 5 minutes`
///
/// Sub-second deltas (and negative ones) read as `0 seconds`.
pub fn humanize_timedelta(delta: TimeDelta) -> String {
    const PERIODS: [(&str, &str, i64); 6] = [
        ("year", "years", 60 * 60 * 24 * 365),
        ("month", "months", 60 * 60 * 24 * 30),
        ("day", "days", 60 * 60 * 24),
        ("hour", "hours", 60 * 60),
        ("minute", "minutes", 60),
        ("second", "seconds", 1),
    ];

    let mut seconds = delta.num_seconds().max(0);
    let mut parts = Vec::new();
    for (singular, plural, length) in PERIODS {
        let value = seconds / length;
        seconds %= length;
        if value > 0 {
            parts.push(format!("{} {}", value, if value == 1 { singular } else { plural }));
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CommandEvent, EventUser};

    fn fixed_now() -> DateTime<Local> {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap()
    }

    fn track() -> TrackInfo {
        TrackInfo {
            saturated: false,
            capacity: 100_000,
            running_for: TimeDelta::minutes(90),
        }
    }

    fn record(command: &str) -> Arc<LogRecord> {
        let event = CommandEvent::new(EventUser::new(42, "alice"), command, 1);
        Arc::new(
            LogRecord::command(&event, false)
                .unwrap()
                .with_recorded_at(fixed_now()),
        )
    }

    #[test]
    fn test_full_report() {
        let report = Report::generate(
            &RecordFilter::All,
            &[record("ping"), record("help")],
            &track(),
            fixed_now(),
        );

        assert_eq!(report.file_name, "cmdlog.txt");
        assert_eq!(report.matched, 2);
        assert_eq!(
            report.summary,
            "Here is the command log. Log started 1 hour, 30 minutes ago."
        );
        assert_eq!(
            report.body,
            "Generated at 2024-06-01 12:00:00.\n\
             [2024-06-01 12:00:00] Text command 'ping' ran by 42 (alice) in our DMs.\n\
             [2024-06-01 12:00:00] Text command 'help' ran by 42 (alice) in our DMs."
        );
    }

    #[test]
    fn test_empty_user_report() {
        let report = Report::generate(&RecordFilter::Actor(7), &[], &track(), fixed_now());
        assert_eq!(report.file_name, "cmdlog_7.txt");
        assert_eq!(
            report.body,
            "Generated at 2024-06-01 12:00:00 for user 7.\n\
             It looks like I didn't find anything for that user."
        );
        assert!(report.summary.starts_with("Here is the command log for user 7. "));
    }

    #[test]
    fn test_command_report_file_name() {
        let filter = RecordFilter::CommandPrefix("playlist create".into());
        let report = Report::generate(&filter, &[], &track(), fixed_now());
        assert_eq!(report.file_name, "cmdlog_playlist_create.txt");
        assert!(report.body.ends_with("for that command."));
    }

    #[test]
    fn test_server_report() {
        let report = Report::generate(&RecordFilter::Container(9), &[], &track(), fixed_now());
        assert!(report.body.starts_with("Generated at 2024-06-01 12:00:00 for server 9."));
        assert!(report.body.ends_with("for that server."));
    }

    #[test]
    fn test_saturated_note() {
        let track = TrackInfo {
            saturated: true,
            ..track()
        };
        assert_eq!(
            track.to_string(),
            "Max log size reached. Only the last 100,000 commands are stored."
        );
    }

    #[test]
    fn test_humanize_number() {
        assert_eq!(humanize_number(0), "0");
        assert_eq!(humanize_number(999), "999");
        assert_eq!(humanize_number(1000), "1,000");
        assert_eq!(humanize_number(1234567), "1,234,567");
    }

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(512), "512 B");
        assert_eq!(humanize_bytes(1536), "1.5 KiB");
        assert_eq!(humanize_bytes(50 * 1024 * 1024), "50.0 MiB");
    }

    #[test]
    fn test_humanize_timedelta() {
        assert_eq!(humanize_timedelta(TimeDelta::zero()), "0 seconds");
        assert_eq!(humanize_timedelta(TimeDelta::seconds(1)), "1 second");
        assert_eq!(
            humanize_timedelta(TimeDelta::seconds(86400 + 7200 + 5)),
            "1 day, 2 hours, 5 seconds"
        );
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            count: 1500,
            bytes: 2048,
        };
        assert_eq!(stats.to_string(), "Cache size: 2.0 KiB with 1,500 commands.");
    }
}
