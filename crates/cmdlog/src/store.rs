//! Bounded in-memory record store
//!
//! Records are kept in insertion order. Once the store holds `capacity`
//! records, every append evicts the oldest one. There are no secondary
//! indexes: every query is a linear scan, which stays cheap because the
//! store is bounded.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::LogRecord;

/// Default maximum number of retained records
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Query shapes supported by the operator surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record
    All,
    /// Records whose actor id equals the given id
    Actor(u64),
    /// Records that ran inside the given container
    Container(u64),
    /// Records whose command name starts with the given prefix
    CommandPrefix(String),
}

impl RecordFilter {
    pub fn matches(&self, record: &LogRecord) -> bool {
        match self {
            Self::All => true,
            Self::Actor(id) => record.actor.id == *id,
            Self::Container(id) => record.container_id() == Some(*id),
            Self::CommandPrefix(prefix) => record.command_name.starts_with(prefix.as_str()),
        }
    }
}

/// Fixed-capacity FIFO store of [`LogRecord`]s
///
/// Appends and scans take a short lock; a scan always sees a consistent
/// snapshot and never a partially inserted record.
pub struct LogStore {
    records: RwLock<VecDeque<Arc<LogRecord>>>,
    capacity: usize,
}

impl LogStore {
    /// Create a store with [`DEFAULT_CAPACITY`]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding at most `capacity` records (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append a record, evicting the oldest one when full
    pub fn append(&self, record: Arc<LogRecord>) {
        let mut records = self.records.write();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Number of records currently held
    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the store is full and evicting on every append
    pub fn is_saturated(&self) -> bool {
        self.count() >= self.capacity
    }

    /// Sum of the estimated sizes of all held records
    pub fn total_size(&self) -> usize {
        self.records
            .read()
            .iter()
            .map(|r| r.estimated_size())
            .sum()
    }

    /// Records matching `predicate`, in insertion order
    pub fn filter<P>(&self, predicate: P) -> Vec<Arc<LogRecord>>
    where
        P: Fn(&LogRecord) -> bool,
    {
        self.records
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Records matching a [`RecordFilter`], in insertion order
    pub fn query(&self, filter: &RecordFilter) -> Vec<Arc<LogRecord>> {
        self.filter(|r| filter.matches(r))
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CommandEvent, EventPlace, EventUser};

    fn record(user: u64, command: &str, message_id: u64) -> Arc<LogRecord> {
        let actor = EventUser::new(user, format!("user{}", user));
        let event = CommandEvent::new(actor, command, message_id);
        Arc::new(LogRecord::command(&event, false).unwrap())
    }

    fn guild_record(user: u64, guild: u64) -> Arc<LogRecord> {
        let event = CommandEvent::new(EventUser::new(user, "someone"), "ping", 1)
            .in_channel(EventPlace::new(1, "general"), EventPlace::new(guild, "guild"));
        Arc::new(LogRecord::command(&event, false).unwrap())
    }

    fn message_ids(records: &[Arc<LogRecord>]) -> Vec<u64> {
        records
            .iter()
            .map(|r| match r.kind {
                crate::record::RecordKind::Command { message_id } => message_id,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_append_and_count() {
        let store = LogStore::new();
        assert_eq!(store.count(), 0);
        store.append(record(1, "ping", 1));
        store.append(record(2, "ping", 2));
        assert_eq!(store.count(), 2);
        assert!(!store.is_saturated());
    }

    #[test]
    fn test_fifo_eviction() {
        let store = LogStore::with_capacity(5);
        for i in 0..8 {
            store.append(record(1, "ping", i));
        }

        assert_eq!(store.count(), 5);
        assert!(store.is_saturated());
        // The three oldest are gone
        assert_eq!(message_ids(&store.query(&RecordFilter::All)), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = LogStore::with_capacity(0);
        store.append(record(1, "ping", 1));
        store.append(record(1, "ping", 2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(message_ids(&store.query(&RecordFilter::All)), vec![2]);
    }

    #[test]
    fn test_total_size_tracks_contents() {
        let store = LogStore::with_capacity(3);
        let mut last = 0;
        for i in 0..3 {
            store.append(record(1, "ping", i));
            let size = store.total_size();
            assert!(size >= last);
            last = size;
        }

        let max_record = record(1, "ping", 0).estimated_size();
        for i in 3..10 {
            store.append(record(1, "ping", i));
            assert!(store.total_size() <= 3 * max_record);
        }
    }

    #[test]
    fn test_filter_by_actor_keeps_order() {
        let store = LogStore::new();
        store.append(record(1, "ping", 1));
        store.append(record(2, "ping", 2));
        store.append(record(1, "help", 3));
        store.append(record(3, "ping", 4));
        store.append(record(1, "ping", 5));

        let results = store.query(&RecordFilter::Actor(1));
        assert_eq!(message_ids(&results), vec![1, 3, 5]);
        assert!(store.query(&RecordFilter::Actor(7)).is_empty());
    }

    #[test]
    fn test_filter_by_container() {
        let store = LogStore::new();
        store.append(guild_record(1, 900));
        store.append(record(1, "ping", 2));
        store.append(guild_record(2, 901));
        store.append(guild_record(3, 900));

        let results = store.query(&RecordFilter::Container(900));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.container_id() == Some(900)));
    }

    #[test]
    fn test_filter_by_command_prefix() {
        let store = LogStore::new();
        store.append(record(1, "playlist create", 1));
        store.append(record(1, "playlist", 2));
        store.append(record(1, "ping", 3));
        store.append(record(1, "play", 4));

        let results = store.query(&RecordFilter::CommandPrefix("playlist".into()));
        assert_eq!(message_ids(&results), vec![1, 2]);

        let results = store.query(&RecordFilter::CommandPrefix("play".into()));
        assert_eq!(message_ids(&results), vec![1, 2, 4]);
    }

    #[test]
    fn test_custom_predicate() {
        let store = LogStore::new();
        store.append(record(1, "ping", 1));
        store.append(record(2, "ping", 2));
        let results = store.filter(|r| r.actor.display_name == "user2");
        assert_eq!(message_ids(&results), vec![2]);
    }
}
