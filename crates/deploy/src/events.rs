//! Event frames delivered over the live log channel.
//!
//! A connection sees any number of [`DeployEvent::Log`] frames and
//! notices, then exactly one terminal status frame, then closes.

use serde::Serialize;
use slipway_cloud::LogEvent;

/// Status markers carried by non-log frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamStatus {
    /// No task has been scheduled yet; the pump keeps looking.
    NoTask,
    /// The task never appeared within the wait window. Terminal.
    Timeout,
    /// A warning from one poll tick, or -- when it ends the stream -- a
    /// failure of the terminal-state check itself.
    Error,
    /// The task definition declares no logging configuration. Terminal.
    NoLogsConfig,
    /// The build task stopped and was classified as a success. Terminal.
    Finished,
    /// The build task stopped and was classified as a failure. Terminal.
    Failed,
    /// The missing log group was created; polling continues.
    CreatedLogGroup,
    /// Archival failed; the deployment outcome is unaffected.
    ArchiveError,
}

/// One frame on the live channel: either a log line or a status notice.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeployEvent {
    Log {
        /// Milliseconds since the Unix epoch.
        ts: i64,
        message: String,
    },
    Status {
        status: StreamStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl DeployEvent {
    /// Frame for one forwarded log record.
    pub fn log(record: &LogEvent) -> Self {
        DeployEvent::Log {
            ts: record.timestamp,
            message: record.message.clone(),
        }
    }

    /// Bare status frame.
    pub fn status(status: StreamStatus) -> Self {
        DeployEvent::Status {
            status,
            message: None,
        }
    }

    /// Status frame with a human-readable message.
    pub fn status_message(status: StreamStatus, message: impl Into<String>) -> Self {
        DeployEvent::Status {
            status,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_frame_serializes_flat() {
        let frame = DeployEvent::Log {
            ts: 1700000000000,
            message: "npm install".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"ts":1700000000000,"message":"npm install"}"#,
        );
    }

    #[test]
    fn status_frame_uses_kebab_case() {
        let frame = DeployEvent::status(StreamStatus::NoLogsConfig);
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"status":"no-logs-config"}"#,
        );
    }

    #[test]
    fn status_message_is_included_when_present() {
        let frame = DeployEvent::status_message(StreamStatus::Failed, "exit code 1");
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"status":"failed","message":"exit code 1"}"#,
        );
    }
}
