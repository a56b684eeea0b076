//! Sink abstraction and page splitting
//!
//! A [`Sink`] is the external, channel-like destination that rendered
//! batches are delivered to, one page at a time. Pages are produced by a
//! [`Paginator`], which keeps each framed page within the sink's size
//! limit.
//!
//! ## Implementations
//!
//! - [`FileSink`]: appends framed pages to a file
//! - [`MemorySink`]: in-memory sink with failure injection, for testing

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use crate::error::SinkError;

/// Default page size limit of the sink, in characters
pub const DEFAULT_PAGE_LENGTH: usize = 2000;

/// Characters added by [`Paginator::frame`]
const FENCE_OVERHEAD: usize = 8;

/// Destination for rendered pages
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver a single page
    ///
    /// # Errors
    ///
    /// Returns an error if the destination is unreachable or refuses the page.
    async fn send(&self, page: &str) -> Result<(), SinkError>;

    /// Whether we currently hold permission to send here
    fn can_send(&self) -> bool {
        true
    }
}

/// Maps a persisted sink id to a live sink
pub trait SinkResolver: Send + Sync {
    fn resolve(&self, sink_id: u64) -> Option<Arc<dyn Sink>>;
}

impl<F> SinkResolver for F
where
    F: Fn(u64) -> Option<Arc<dyn Sink>> + Send + Sync,
{
    fn resolve(&self, sink_id: u64) -> Option<Arc<dyn Sink>> {
        self(sink_id)
    }
}

/// Splits text into sink-sized pages
///
/// Splits prefer newline boundaries. The newline stays at the start of the
/// following page, so concatenating the pages gives back the input (pages
/// that are only whitespace are skipped).
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_length: usize,
}

impl Paginator {
    pub fn new(page_length: usize) -> Self {
        Self { page_length }
    }

    pub fn page_length(&self) -> usize {
        self.page_length
    }

    /// Split `text` into pages that still fit the limit once framed
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let limit = self.page_length.saturating_sub(FENCE_OVERHEAD).max(1);
        let mut pages = Vec::new();
        let mut rest = text;

        while let Some((cut, _)) = rest.char_indices().nth(limit) {
            let split = rest[..cut]
                .rfind('\n')
                .filter(|&i| i > 0)
                .unwrap_or(cut);
            let (page, tail) = rest.split_at(split);
            if !page.trim().is_empty() {
                pages.push(page.to_string());
            }
            rest = tail;
        }

        if !rest.trim().is_empty() {
            pages.push(rest.to_string());
        }
        pages
    }

    /// Wrap a page in a fenced code block
    pub fn frame(page: &str) -> String {
        format!("```\n{}\n```", page)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LENGTH)
    }
}

/// Sink that appends pages to a file
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&self, page: &str) -> Result<(), SinkError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::Unreachable(e.kind().to_string()))?;

        let line = format!("{}\n", page);
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Other(e.kind().to_string()))?;
        file.flush()
            .await
            .map_err(|e| SinkError::Other(e.kind().to_string()))
    }
}

/// In-memory sink for tests
///
/// Records every delivered page together with the (tokio) instant it
/// arrived, and can be told to fail a number of upcoming sends.
#[derive(Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<(Instant, String)>>,
    failures_left: AtomicUsize,
    denied: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Toggle the result of [`Sink::can_send`]
    pub fn set_can_send(&self, allowed: bool) {
        self.denied.store(!allowed, Ordering::SeqCst);
    }

    /// Delivered pages in order
    pub fn pages(&self) -> Vec<String> {
        self.deliveries.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Delivered pages with their arrival instants
    pub fn deliveries(&self) -> Vec<(Instant, String)> {
        self.deliveries.lock().clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn send(&self, page: &str) -> Result<(), SinkError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::Unreachable("injected failure".into()));
        }

        self.deliveries.lock().push((Instant::now(), page.to_string()));
        Ok(())
    }

    fn can_send(&self) -> bool {
        !self.denied.load(Ordering::SeqCst)
    }
}
