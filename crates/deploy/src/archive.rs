//! Full-stream drain and durable archival of a build's log history.
//!
//! On task completion the entire stream is re-read from the head and
//! persisted as one newline-delimited JSON blob per project, overwriting
//! any previous archive. The live stream is deleted afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use slipway_cloud::{BlobStore, BlobStoreError, LogEvent, LogStore, LogStoreError};
use slipway_core::naming;

use crate::locate::LogTarget;

/// Hard cap on drain iterations, guarding against a paginator that keeps
/// handing back fresh tokens.
const MAX_PAGES: usize = 1000;

/// Pause between successive page fetches so the drain does not hammer
/// the log backend.
const PAGE_PAUSE: Duration = Duration::from_millis(150);

/// Content type of archived log blobs.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/x-ndjson";

/// One line of an archived log blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRecord {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub message: String,
}

/// Result of a successful archival.
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    /// Storage key the blob was written to.
    pub key: String,
    pub record_count: usize,
}

/// Errors from the archival path.
///
/// Callers report these to the live client as a soft warning; archival
/// failure never changes the already-determined deployment outcome.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Log drain failed: {0}")]
    Drain(#[from] LogStoreError),

    #[error("Archive serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Archive upload failed: {0}")]
    Upload(#[from] BlobStoreError),
}

/// Drain a log stream from the beginning and persist it as one blob.
///
/// The drain stops on a missing token, a token equal to the previous one
/// (the backend's "no further records" signal), or the defensive page
/// cap. After a successful upload the live stream is deleted; a failure
/// of that cleanup is logged but does not fail the archival.
pub async fn archive_build_logs(
    logs: &dyn LogStore,
    blobs: &dyn BlobStore,
    target: &LogTarget,
    project_id: &str,
) -> Result<ArchiveOutcome, ArchiveError> {
    let mut records: Vec<LogEvent> = Vec::new();
    let mut token: Option<String> = None;

    for page_index in 0..MAX_PAGES {
        let page = logs
            .get_log_events(&target.group, &target.stream, token.as_deref(), true)
            .await?;
        records.extend(page.events);

        match page.next_token {
            None => break,
            Some(next) if token.as_deref() == Some(next.as_str()) => break,
            Some(next) => token = Some(next),
        }

        if page_index + 1 < MAX_PAGES {
            tokio::time::sleep(PAGE_PAUSE).await;
        }
    }

    let mut body = String::new();
    for record in &records {
        let line = serde_json::to_string(&ArchivedRecord {
            ts: record.timestamp,
            message: record.message.clone(),
        })?;
        body.push_str(&line);
        body.push('\n');
    }

    let key = naming::archive_key(project_id);
    blobs
        .put_object(&key, body.into_bytes(), ARCHIVE_CONTENT_TYPE)
        .await?;

    if let Err(e) = logs.delete_log_stream(&target.group, &target.stream).await {
        tracing::warn!(
            project_id,
            stream = %target.stream,
            error = %e,
            "Archived but could not delete the live log stream",
        );
    }

    Ok(ArchiveOutcome {
        key,
        record_count: records.len(),
    })
}

/// Parse an archived blob back into records.
///
/// Unparseable lines are skipped with a warning rather than failing the
/// whole read.
pub fn parse_archive(body: &str) -> Vec<ArchivedRecord> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable archive line");
                None
            }
        })
        .collect()
}
