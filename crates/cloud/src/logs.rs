//! Command interface for the append-only per-stream log backend.
//!
//! The backend hands back ordered, timestamped records paginated by an
//! opaque continuation token. A token equal to the one passed in means
//! the read position did not advance -- callers use that as a drain
//! terminator.

use async_trait::async_trait;
use serde::Serialize;

/// One log record produced by the remote build container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
}

/// One page of log records plus the token to resume from.
#[derive(Debug, Clone)]
pub struct LogPage {
    pub events: Vec<LogEvent>,
    pub next_token: Option<String>,
}

/// Errors from the log backend.
///
/// The two not-found variants are distinguished because the pump treats
/// them differently: a missing group is created, a missing stream simply
/// means the container has not emitted its first line yet.
#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("Log group '{0}' does not exist")]
    GroupNotFound(String),

    #[error("Log stream '{0}' does not exist")]
    StreamNotFound(String),

    #[error("Log backend error: {0}")]
    Backend(String),
}

/// Command interface to the log backend.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Create a log group. Idempotent: "already exists" is success.
    async fn create_log_group(&self, group: &str) -> Result<(), LogStoreError>;

    /// Fetch a page of records. `from_head` makes a token-less call start
    /// at the oldest record instead of the tail.
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogStoreError>;

    /// Delete a log stream. Idempotent: "does not exist" is success.
    async fn delete_log_stream(&self, group: &str, stream: &str) -> Result<(), LogStoreError>;
}
