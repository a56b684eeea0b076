//! Configuration for the command log

use std::time::Duration;

use crate::sink::DEFAULT_PAGE_LENGTH;
use crate::store::DEFAULT_CAPACITY;

/// Minimum time between two sends to the sink
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`CommandLog`](crate::CommandLog)
#[derive(Debug, Clone)]
pub struct CmdLogConfig {
    /// Maximum number of records kept in memory
    pub capacity: usize,
    /// Minimum interval between sends to the sink
    pub min_interval: Duration,
    /// Sink page size limit, in characters
    pub page_length: usize,
}

impl Default for CmdLogConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            min_interval: DEFAULT_MIN_INTERVAL,
            page_length: DEFAULT_PAGE_LENGTH,
        }
    }
}

impl CmdLogConfig {
    /// Set the store capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the minimum send interval
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the sink page length
    pub fn with_page_length(mut self, page_length: usize) -> Self {
        self.page_length = page_length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CmdLogConfig::default();
        assert_eq!(config.capacity, 100_000);
        assert_eq!(config.min_interval, Duration::from_secs(60));
        assert_eq!(config.page_length, 2000);
    }

    #[test]
    fn test_builders() {
        let config = CmdLogConfig::default()
            .with_capacity(10)
            .with_min_interval(Duration::from_secs(5))
            .with_page_length(100);
        assert_eq!(config.capacity, 10);
        assert_eq!(config.min_interval, Duration::from_secs(5));
        assert_eq!(config.page_length, 100);
    }
}
