//! The command log facade
//!
//! [`CommandLog`] ties the host's producer callbacks to the [`LogStore`]
//! and the (optional) [`Dispatcher`], and exposes the operator surface:
//! queries, cache stats, and the two persisted settings.
//!
//! Producer entry points are synchronous and infallible from the host's
//! point of view. Anything that goes wrong while building or storing a
//! record is logged, reported to telemetry, and swallowed.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::CmdLogConfig;
use crate::dispatch::Dispatcher;
use crate::error::{CmdLogError, CmdLogResult};
use crate::event::{AppCommandEvent, CommandEvent};
use crate::record::LogRecord;
use crate::report::{CacheStats, Report, TrackInfo};
use crate::settings::SettingsStore;
use crate::sink::SinkResolver;
use crate::store::{LogStore, RecordFilter};
use crate::telemetry::Telemetry;

/// Breadcrumb attached to producer-path telemetry reports
const PRODUCER_BREADCRUMB: &str = "producer path";

/// Command event log with optional sink delivery
pub struct CommandLog {
    config: CmdLogConfig,
    store: LogStore,
    settings: Arc<dyn SettingsStore>,
    resolver: Arc<dyn SinkResolver>,
    telemetry: Option<Arc<dyn Telemetry>>,
    /// Cached content-logging flag, loaded on first use
    log_content: RwLock<Option<bool>>,
    /// At most one active dispatcher
    dispatcher: Mutex<Option<Dispatcher>>,
    started_at: DateTime<Utc>,
}

impl CommandLog {
    /// Create a command log with an empty store and no active dispatcher
    ///
    /// Call [`start`](Self::start) to pick up a persisted sink.
    pub fn new(
        config: CmdLogConfig,
        settings: Arc<dyn SettingsStore>,
        resolver: Arc<dyn SinkResolver>,
    ) -> Self {
        Self {
            store: LogStore::with_capacity(config.capacity),
            config,
            settings,
            resolver,
            telemetry: None,
            log_content: RwLock::new(None),
            dispatcher: Mutex::new(None),
            started_at: Utc::now(),
        }
    }

    /// Attach an error telemetry collaborator
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Start delivery to the persisted sink, if one is configured
    ///
    /// A persisted sink that no longer resolves is logged and skipped.
    /// Fails with [`CmdLogError::NoRuntime`] when a sink is configured but
    /// there is no tokio runtime to deliver from.
    #[instrument(skip(self))]
    pub fn start(&self) -> CmdLogResult<()> {
        let settings = self.settings.load()?;

        let Some(sink_id) = settings.sink_id else {
            debug!("No sink configured, records stay in memory only");
            return Ok(());
        };

        match self.resolver.resolve(sink_id) {
            Some(sink) => {
                let mut dispatcher =
                    Dispatcher::new(sink_id, sink, &self.config, self.telemetry.clone());
                dispatcher.start()?;
                self.replace_dispatcher(Some(dispatcher));
                info!(sink_id, "Command log started with sink delivery");
            }
            None => {
                warn!(
                    sink_id,
                    "Commands will NOT be sent to a sink because it appears invalid"
                );
            }
        }
        Ok(())
    }

    /// Stop any active dispatcher and wait for it to exit
    pub async fn shutdown(&self) {
        let dispatcher = self.dispatcher.lock().take();
        if let Some(mut dispatcher) = dispatcher {
            dispatcher.shutdown().await;
        }
        info!("Command log shut down");
    }

    // ========== Producer entry points ==========

    /// Record a completed text command
    ///
    /// Returns whether a record was stored.
    pub fn record_command(&self, event: &CommandEvent) -> bool {
        let record = LogRecord::command(event, self.log_content());
        self.accept(Ok(record))
    }

    /// Record a text command that failed a check
    ///
    /// Returns whether a record was stored.
    pub fn record_command_error(&self, event: &CommandEvent) -> bool {
        let record = LogRecord::command_error(event, self.log_content());
        self.accept(Ok(record))
    }

    /// Record an application command interaction
    ///
    /// Returns whether a record was stored.
    pub fn record_app_command(&self, event: &AppCommandEvent) -> bool {
        self.accept(LogRecord::app_command(event))
    }

    fn accept(&self, built: CmdLogResult<Option<LogRecord>>) -> bool {
        match built {
            Ok(Some(record)) => {
                self.append(record);
                true
            }
            Ok(None) => {
                trace!("Actor could not be resolved, event not logged");
                false
            }
            Err(e) => {
                self.producer_error(&e);
                false
            }
        }
    }

    fn append(&self, record: LogRecord) {
        info!(target: "cmdlog", "{}", record);

        let record = Arc::new(record);
        self.store.append(Arc::clone(&record));
        if let Some(dispatcher) = self.dispatcher.lock().as_ref() {
            dispatcher.enqueue(record);
        }
    }

    fn producer_error(&self, e: &CmdLogError) {
        error!(error = %e, "Something went wrong processing a command");
        if let Some(telemetry) = &self.telemetry {
            telemetry.report(e, PRODUCER_BREADCRUMB);
        }
    }

    /// Content-logging flag, loaded from settings once and then cached
    ///
    /// The load runs under the cache's write lock, so a concurrent
    /// [`set_log_content`](Self::set_log_content) lands after it.
    fn log_content(&self) -> bool {
        if let Some(cached) = *self.log_content.read() {
            return cached;
        }

        let mut cached = self.log_content.write();
        if let Some(enabled) = *cached {
            return enabled;
        }

        match self.settings.load() {
            Ok(settings) => {
                *cached = Some(settings.log_content);
                settings.log_content
            }
            Err(e) => {
                drop(cached);
                self.producer_error(&e);
                false
            }
        }
    }

    // ========== Operator surface ==========

    /// Persist the content-logging flag; applies to records created from now on
    #[instrument(skip(self))]
    pub fn set_log_content(&self, enabled: bool) -> CmdLogResult<()> {
        let mut settings = self.settings.load()?;
        settings.log_content = enabled;
        self.settings.save(&settings)?;

        *self.log_content.write() = Some(enabled);
        info!(enabled, "Message content logging updated");
        Ok(())
    }

    /// Set or clear the delivery sink
    ///
    /// Setting a sink that does not resolve, or that we may not send to,
    /// fails without touching the persisted setting or the running
    /// dispatcher. So does calling it outside a tokio runtime. Clearing
    /// always stops delivery.
    ///
    /// The previous dispatcher is signalled to stop but not awaited: on a
    /// multi-threaded runtime it may still finish the page it is sending.
    /// Use [`shutdown`](Self::shutdown) to wait for delivery to end.
    #[instrument(skip(self))]
    pub fn set_sink(&self, sink_id: Option<u64>) -> CmdLogResult<()> {
        let Some(sink_id) = sink_id else {
            let mut settings = self.settings.load()?;
            settings.sink_id = None;
            self.settings.save(&settings)?;
            self.replace_dispatcher(None);
            info!("Sink cleared, records will no longer be delivered");
            return Ok(());
        };

        let sink = self
            .resolver
            .resolve(sink_id)
            .ok_or(CmdLogError::SinkUnavailable(sink_id))?;
        if !sink.can_send() {
            return Err(CmdLogError::SinkPermission(sink_id));
        }

        // A dispatcher that fails to start, or is dropped on a failed save,
        // leaves the persisted setting as it was
        let mut dispatcher = Dispatcher::new(sink_id, sink, &self.config, self.telemetry.clone());
        dispatcher.start()?;

        let mut settings = self.settings.load()?;
        settings.sink_id = Some(sink_id);
        self.settings.save(&settings)?;

        self.replace_dispatcher(Some(dispatcher));
        info!(
            sink_id,
            interval_secs = self.config.min_interval.as_secs(),
            "Records will now be delivered to the sink"
        );
        Ok(())
    }

    /// Swap the active dispatcher; the old one is stopped, not awaited
    fn replace_dispatcher(&self, next: Option<Dispatcher>) {
        let mut slot = self.dispatcher.lock();
        if let Some(mut previous) = slot.take() {
            previous.stop();
        }
        *slot = next;
    }

    /// Id of the sink currently being delivered to
    pub fn active_sink(&self) -> Option<u64> {
        self.dispatcher.lock().as_ref().map(Dispatcher::sink_id)
    }

    /// Whether new records currently capture message content
    pub fn content_logging(&self) -> bool {
        self.log_content()
    }

    /// Run an operator query
    pub fn query(&self, filter: &RecordFilter) -> Report {
        let records = self.store.query(filter);
        Report::generate(filter, &records, &self.track_info(), Local::now())
    }

    /// Dump every cached record
    pub fn query_all(&self) -> Report {
        self.query(&RecordFilter::All)
    }

    /// Records run by a user
    pub fn query_user(&self, user_id: u64) -> Report {
        self.query(&RecordFilter::Actor(user_id))
    }

    /// Records run inside a container
    pub fn query_container(&self, container_id: u64) -> Report {
        self.query(&RecordFilter::Container(container_id))
    }

    /// Records whose command name starts with `prefix`
    pub fn query_command(&self, prefix: &str) -> Report {
        self.query(&RecordFilter::CommandPrefix(prefix.to_string()))
    }

    /// Current cache occupancy
    pub fn cache_stats(&self) -> CacheStats {
        let bytes = self.store.total_size();
        debug!(bytes, "Cache size computed");
        CacheStats {
            count: self.store.count(),
            bytes,
        }
    }

    fn track_info(&self) -> TrackInfo {
        TrackInfo {
            saturated: self.store.is_saturated(),
            capacity: self.store.capacity(),
            running_for: Utc::now() - self.started_at,
        }
    }

    /// The underlying record store
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn config(&self) -> &CmdLogConfig {
        &self.config
    }
}
