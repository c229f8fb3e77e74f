//! Live log streaming: the per-connection state machine that follows one
//! deployment from task discovery to terminal status.
//!
//! Each client connection gets its own pump task driving
//! `locating-task -> locating-logs -> streaming -> terminal`. Frames go
//! out through an mpsc channel; the API layer turns them into SSE. The
//! cancellation token fires when the client disconnects, which stops all
//! polling immediately -- no timer outlives its connection.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use slipway_cloud::{BlobStore, ContainerOrchestrator, LogStore, LogStoreError};
use slipway_db::repositories::ProjectRepo;

use crate::archive::archive_build_logs;
use crate::events::{DeployEvent, StreamStatus};
use crate::locate::{find_task, resolve_log_target, LocateError};
use crate::outcome::{classify_stopped_task, mark_status};

/// Poll cadence and bounds for one pump run.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Delay between task-discovery attempts.
    pub locate_interval: Duration,
    /// Maximum task-discovery attempts before giving up.
    pub locate_attempts: u32,
    /// Delay between log fetch / status check ticks.
    pub poll_interval: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        // 40 x 3s gives the scheduler roughly two minutes to place the task.
        Self {
            locate_interval: Duration::from_secs(3),
            locate_attempts: 40,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Owned collaborators for one pump run; cheap to clone into the spawned
/// connection task.
#[derive(Clone)]
pub struct StreamContext {
    pub pool: PgPool,
    pub orchestrator: Arc<dyn ContainerOrchestrator>,
    pub logs: Arc<dyn LogStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: PumpConfig,
}

/// Drive one live log stream to completion.
///
/// Emits exactly one terminal frame per run, then returns (closing the
/// channel). Returns without a terminal frame only when the client is
/// gone -- the token is cancelled or the receiver dropped.
pub async fn run_log_stream(
    ctx: StreamContext,
    project_id: String,
    tx: mpsc::Sender<DeployEvent>,
    cancel: CancellationToken,
) {
    if let Some(terminal) = drive(&ctx, &project_id, &tx, &cancel).await {
        let _ = tx.send(terminal).await;
    }
    tracing::debug!(project_id = %project_id, "Log stream pump finished");
}

/// The pump body. Returns the terminal frame to emit, or `None` when the
/// client disconnected mid-flight.
async fn drive(
    ctx: &StreamContext,
    project_id: &str,
    tx: &mpsc::Sender<DeployEvent>,
    cancel: &CancellationToken,
) -> Option<DeployEvent> {
    // ---- locating-task ----
    let mut task_arn = None;
    for attempt in 0..ctx.config.locate_attempts {
        if cancel.is_cancelled() {
            return None;
        }

        match find_task(ctx.orchestrator.as_ref(), project_id).await {
            Ok(Some(arn)) => {
                task_arn = Some(arn);
                break;
            }
            Ok(None) => {
                // Normal window between submission and scheduler placement.
                if attempt == 0 {
                    send(
                        tx,
                        DeployEvent::status_message(
                            StreamStatus::NoTask,
                            "Waiting for the build task to be scheduled",
                        ),
                    )
                    .await?;
                }
            }
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Task lookup failed, retrying");
                send(
                    tx,
                    DeployEvent::status_message(StreamStatus::Error, format!("Task lookup failed: {e}")),
                )
                .await?;
            }
        }

        sleep_or_cancel(ctx.config.locate_interval, cancel).await?;
    }

    let Some(task_arn) = task_arn else {
        return Some(DeployEvent::status_message(
            StreamStatus::Timeout,
            "No build task appeared within the wait window",
        ));
    };

    // ---- locating-logs ----
    let target = match resolve_log_target(ctx.orchestrator.as_ref(), &task_arn).await {
        Ok(target) => target,
        Err(LocateError::NoLogsConfig(_)) => {
            return Some(DeployEvent::status_message(
                StreamStatus::NoLogsConfig,
                "The build task has no logging configuration",
            ));
        }
        Err(LocateError::Orchestrator(e)) => {
            return Some(DeployEvent::status_message(
                StreamStatus::Error,
                format!("Could not resolve the log stream: {e}"),
            ));
        }
    };

    tracing::info!(
        project_id,
        task_arn = %task_arn,
        stream = %target.stream,
        "Streaming build logs",
    );

    // ---- streaming ----
    let mut token: Option<String> = None;
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        // from_head anchors the token-less first read at the oldest record.
        match ctx
            .logs
            .get_log_events(&target.group, &target.stream, token.as_deref(), true)
            .await
        {
            Ok(page) => {
                for record in &page.events {
                    send(tx, DeployEvent::log(record)).await?;
                }
                token = page.next_token.or(token);
            }
            Err(LogStoreError::GroupNotFound(group)) => {
                // Normal race right after task start: create the group and
                // keep polling.
                match ctx.logs.create_log_group(&group).await {
                    Ok(()) => {
                        send(
                            tx,
                            DeployEvent::status_message(
                                StreamStatus::CreatedLogGroup,
                                format!("Created log group {group}"),
                            ),
                        )
                        .await?;
                    }
                    Err(e) => {
                        tracing::warn!(project_id, log_group = %group, error = %e, "Could not create missing log group");
                    }
                }
            }
            Err(LogStoreError::StreamNotFound(_)) => {
                // The container has not emitted its first line yet.
            }
            Err(e) => {
                send(
                    tx,
                    DeployEvent::status_message(StreamStatus::Error, format!("Log fetch failed: {e}")),
                )
                .await?;
            }
        }

        // Terminal-state check. Runs after the fetch but independently of
        // whether every record has arrived yet; the archive below is the
        // complete history either way.
        match ctx.orchestrator.describe_task(&task_arn).await {
            Ok(task) if task.is_stopped() => {
                let outcome = classify_stopped_task(&task);

                let archive_failure = match archive_build_logs(
                    ctx.logs.as_ref(),
                    ctx.blobs.as_ref(),
                    &target,
                    project_id,
                )
                .await
                {
                    Ok(archive) => {
                        tracing::info!(
                            project_id,
                            records = archive.record_count,
                            key = %archive.key,
                            "Build log archived",
                        );
                        if let Err(e) =
                            ProjectRepo::set_logs_key(&ctx.pool, project_id, &archive.key).await
                        {
                            tracing::error!(project_id, error = %e, "Failed to record archive key");
                        }
                        None
                    }
                    Err(e) => {
                        tracing::warn!(project_id, error = %e, "Build log archival failed");
                        Some(e)
                    }
                };

                // Status reconciliation happens regardless of archival.
                mark_status(&ctx.pool, project_id, outcome.project_status()).await;

                if let Some(e) = archive_failure {
                    let _ = tx
                        .send(DeployEvent::status_message(
                            StreamStatus::ArchiveError,
                            format!("Could not archive build logs: {e}"),
                        ))
                        .await;
                }

                return Some(match &task.stopped_reason {
                    Some(reason) => {
                        DeployEvent::status_message(outcome.stream_status(), reason.clone())
                    }
                    None => DeployEvent::status(outcome.stream_status()),
                });
            }
            Ok(_) => {}
            Err(e) => {
                // The one per-tick failure that must end the stream: with
                // no status check there is no way to ever finish.
                tracing::error!(project_id, error = %e, "Task status check failed");
                return Some(DeployEvent::status_message(
                    StreamStatus::Error,
                    format!("Task status check failed: {e}"),
                ));
            }
        }

        sleep_or_cancel(ctx.config.poll_interval, cancel).await?;
    }
}

/// Forward a frame; `None` when the receiver is gone.
async fn send(tx: &mpsc::Sender<DeployEvent>, event: DeployEvent) -> Option<()> {
    tx.send(event).await.ok()
}

/// Wait out one interval; `None` when cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Option<()> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        _ = tokio::time::sleep(duration) => Some(()),
    }
}
