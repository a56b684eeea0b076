//! # cmdlog
//!
//! Bounded in-memory log of command events, with optional rate-limited
//! delivery of rendered batches to an external sink.
//!
//! ## Features
//!
//! - **Bounded store**: FIFO eviction once the capacity is reached
//! - **Rendering**: one-line human readable summaries per record
//! - **Rate-limited delivery**: at most one batch per interval, best-effort
//! - **Operator queries**: by user, container, or command prefix
//! - **Redacted telemetry**: failures never carry actor data
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cmdlog::{CmdLogConfig, CommandEvent, CommandLog, EventUser, MemorySettings, Sink};
//!
//! let log = CommandLog::new(
//!     CmdLogConfig::default(),
//!     Arc::new(MemorySettings::default()),
//!     Arc::new(|_id: u64| -> Option<Arc<dyn Sink>> { None }),
//! );
//! log.start()?;
//!
//! log.record_command(&CommandEvent::new(EventUser::new(42, "alice"), "ping", 1));
//! println!("{}", log.query_user(42).body);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod facade;
pub mod record;
pub mod report;
pub mod settings;
pub mod sink;
pub mod store;
pub mod telemetry;

pub use config::{CmdLogConfig, DEFAULT_MIN_INTERVAL};
pub use dispatch::Dispatcher;
pub use error::{CmdLogError, CmdLogResult, SinkError};
pub use event::{AppCommandEvent, CommandEvent, EventPlace, EventUser};
pub use facade::CommandLog;
pub use record::{Actor, AppInteraction, InteractionKind, LogRecord, Named, Origin, RecordKind};
pub use report::{CacheStats, Report, TrackInfo};
pub use settings::{JsonFileSettings, MemorySettings, Settings, SettingsStore};
pub use sink::{DEFAULT_PAGE_LENGTH, FileSink, MemorySink, Paginator, Sink, SinkResolver};
pub use store::{DEFAULT_CAPACITY, LogStore, RecordFilter};
pub use telemetry::Telemetry;
