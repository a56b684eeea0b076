//! Error types for cmdlog

use thiserror::Error;

/// Errors raised by a sink while delivering a page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The destination could not be reached
    #[error("sink unreachable: {0}")]
    Unreachable(String),

    /// The destination no longer accepts pages from us
    #[error("permission to send was revoked")]
    PermissionDenied,

    /// A page exceeded the sink's size limit
    #[error("page of {len} chars exceeds limit of {limit}")]
    PageTooLarge { len: usize, limit: usize },

    /// Generic sink error
    #[error("sink error: {0}")]
    Other(String),
}

/// Errors that can occur in the command log
///
/// Messages built from event payloads carry only structural detail
/// (kinds, counts), never actor names, ids or content.
#[derive(Debug, Error)]
pub enum CmdLogError {
    /// Settings could not be read or written
    #[error("settings error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured sink id does not resolve to a destination
    #[error("sink {0} could not be resolved")]
    SinkUnavailable(u64),

    /// The sink exists but refuses pages
    #[error("no permission to send to sink {0}")]
    SinkPermission(u64),

    /// An event payload could not be turned into a record
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// No tokio runtime to host the dispatcher task
    #[error("no async runtime available to run the dispatcher")]
    NoRuntime,

    /// Delivery of a batch failed
    #[error("delivery failed: {0}")]
    Delivery(#[from] SinkError),
}

/// Result type alias for cmdlog operations
pub type CmdLogResult<T> = Result<T, CmdLogError>;
