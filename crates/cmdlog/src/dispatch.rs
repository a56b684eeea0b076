//! Rate-limited background delivery to a sink
//!
//! A [`Dispatcher`] owns one background task per active sink. Producers
//! hand it records through [`Dispatcher::enqueue`], which never blocks.
//! The task waits until at least `min_interval` has passed since its last
//! send, drains everything queued (waiting only for the first record), and
//! delivers the rendered batch as framed pages.
//!
//! Delivery is best-effort and at-most-once: a batch whose send fails is
//! logged, reported to telemetry in redacted form, and dropped. The loop
//! itself never exits on a delivery failure.
//!
//! The task checks its shutdown signal at every suspension point (interval
//! wait, queue wait, in-flight delivery), so [`Dispatcher::stop`] takes
//! effect promptly and an interrupted send is simply abandoned.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::CmdLogConfig;
use crate::error::{CmdLogError, CmdLogResult, SinkError};
use crate::record::LogRecord;
use crate::sink::{Paginator, Sink};
use crate::telemetry::Telemetry;

/// Delivers queued records to one sink
pub struct Dispatcher {
    /// Persisted id of the sink we deliver to
    sink_id: u64,
    sink: Arc<dyn Sink>,
    paginator: Paginator,
    min_interval: Duration,
    telemetry: Option<Arc<dyn Telemetry>>,
    /// Time of the last send; `None` until the first batch goes out
    last_send: Arc<Mutex<Option<Instant>>>,
    /// Pending queue sender (None while stopped)
    queue_tx: Option<mpsc::UnboundedSender<Arc<LogRecord>>>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
    /// Background task handle
    task: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a stopped dispatcher for `sink`
    pub fn new(
        sink_id: u64,
        sink: Arc<dyn Sink>,
        config: &CmdLogConfig,
        telemetry: Option<Arc<dyn Telemetry>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            sink_id,
            sink,
            paginator: Paginator::new(config.page_length),
            min_interval: config.min_interval,
            telemetry,
            last_send: Arc::new(Mutex::new(None)),
            queue_tx: None,
            shutdown_tx,
            task: None,
        }
    }

    pub fn sink_id(&self) -> u64 {
        self.sink_id
    }

    /// Start (or restart) the background task with an empty queue
    ///
    /// Fails with [`CmdLogError::NoRuntime`] outside a tokio runtime.
    pub fn start(&mut self) -> CmdLogResult<()> {
        let runtime = Handle::try_current().map_err(|_| CmdLogError::NoRuntime)?;
        self.stop();

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let task = DispatchTask {
            sink_id: self.sink_id,
            sink: Arc::clone(&self.sink),
            paginator: self.paginator,
            min_interval: self.min_interval,
            telemetry: self.telemetry.clone(),
            last_send: Arc::clone(&self.last_send),
            queue_rx,
            shutdown_rx: self.shutdown_tx.subscribe(),
        };

        self.queue_tx = Some(queue_tx);
        self.task = Some(runtime.spawn(task.run()));
        Ok(())
    }

    /// Signal the background task to stop and discard the pending queue
    ///
    /// Returns immediately; use [`shutdown`](Self::shutdown) to also wait
    /// for the task to finish.
    pub fn stop(&mut self) {
        if self.task.is_none() {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.queue_tx = None;
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Queue a record for the next batch
    ///
    /// Never blocks and never fails; records queued while stopped are
    /// dropped.
    pub fn enqueue(&self, record: Arc<LogRecord>) {
        let queued = match &self.queue_tx {
            Some(tx) => tx.send(record).is_ok(),
            None => false,
        };
        if !queued {
            trace!(sink_id = self.sink_id, "Dispatcher not running, record not queued");
        }
    }

    /// Whether the background task is alive
    pub fn is_running(&self) -> bool {
        self.queue_tx.is_some() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Time of the most recent send attempt
    pub fn last_send(&self) -> Option<Instant> {
        *self.last_send.lock()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the background loop
struct DispatchTask {
    sink_id: u64,
    sink: Arc<dyn Sink>,
    paginator: Paginator,
    min_interval: Duration,
    telemetry: Option<Arc<dyn Telemetry>>,
    last_send: Arc<Mutex<Option<Instant>>>,
    queue_rx: mpsc::UnboundedReceiver<Arc<LogRecord>>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl DispatchTask {
    async fn run(mut self) {
        info!(
            sink_id = self.sink_id,
            interval_secs = self.min_interval.as_secs(),
            "Dispatcher started"
        );

        loop {
            let wait = self.wait_time();
            if !wait.is_zero() {
                debug!(wait_secs = wait.as_secs_f64(), "Waiting for next safe send time");
                tokio::select! {
                    _ = self.shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            let first = tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                next = self.queue_rx.recv() => match next {
                    Some(record) => record,
                    None => break,
                },
            };

            let mut batch = vec![first];
            while let Ok(record) = self.queue_rx.try_recv() {
                batch.push(record);
            }

            *self.last_send.lock() = Some(Instant::now());

            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    debug!(records = batch.len(), "Abandoning in-flight batch");
                    break;
                }
                result = deliver(self.sink.as_ref(), &self.paginator, &batch) => {
                    match result {
                        Ok(pages) => debug!(records = batch.len(), pages, "Batch delivered"),
                        Err(e) => self.report_failure(e, &batch),
                    }
                }
            }
        }

        info!(sink_id = self.sink_id, "Dispatcher stopped");
    }

    /// Remaining time until the next send is allowed
    fn wait_time(&self) -> Duration {
        match *self.last_send.lock() {
            Some(at) => self.min_interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn report_failure(&self, error: SinkError, batch: &[Arc<LogRecord>]) {
        warn!(
            sink_id = self.sink_id,
            records = batch.len(),
            error = %error,
            "Failed to deliver batch to the sink; these records were dropped but remain \
             available through the operator queries"
        );

        if let Some(telemetry) = &self.telemetry {
            let breadcrumb = format!(
                "dispatcher delivery of {} records, first {}",
                batch.len(),
                batch.first().map(|r| r.safe_summary()).unwrap_or_default()
            );
            telemetry.report(&CmdLogError::Delivery(error), &breadcrumb);
        }
    }
}

/// Render, page and send a batch; returns the number of pages sent
async fn deliver(
    sink: &dyn Sink,
    paginator: &Paginator,
    batch: &[Arc<LogRecord>],
) -> Result<usize, SinkError> {
    let text = batch
        .iter()
        .map(|r| r.render())
        .collect::<Vec<_>>()
        .join("\n");

    let pages = paginator.chunk(&text);
    for page in &pages {
        sink.send(&Paginator::frame(page)).await?;
    }
    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CommandEvent, EventUser};
    use crate::sink::MemorySink;

    fn record(command: &str) -> Arc<LogRecord> {
        let event = CommandEvent::new(EventUser::new(1, "alice"), command, 1);
        Arc::new(LogRecord::command(&event, false).unwrap())
    }

    #[tokio::test]
    async fn test_deliver_frames_pages() {
        let sink = MemorySink::new();
        let pages = deliver(&sink, &Paginator::default(), &[record("a"), record("b")])
            .await
            .unwrap();

        assert_eq!(pages, 1);
        let sent = sink.pages();
        assert!(sent[0].starts_with("```\n"));
        assert!(sent[0].contains("'a'"));
        assert!(sent[0].contains("'b'"));
    }

    #[tokio::test]
    async fn test_enqueue_while_stopped_is_dropped() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = Dispatcher::new(1, sink, &CmdLogConfig::default(), None);
        dispatcher.enqueue(record("ping"));
        assert!(!dispatcher.is_running());
        assert!(dispatcher.last_send().is_none());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let sink = Arc::new(MemorySink::new());
        let mut dispatcher = Dispatcher::new(7, sink.clone(), &CmdLogConfig::default(), None);
        assert_eq!(dispatcher.sink_id(), 7);

        dispatcher.start().unwrap();
        assert!(dispatcher.is_running());

        dispatcher.shutdown().await;
        assert!(!dispatcher.is_running());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let sink = Arc::new(MemorySink::new());
        let mut dispatcher = Dispatcher::new(7, sink, &CmdLogConfig::default(), None);

        assert!(matches!(dispatcher.start(), Err(CmdLogError::NoRuntime)));
        assert!(!dispatcher.is_running());
        dispatcher.enqueue(record("ping"));
    }
}
