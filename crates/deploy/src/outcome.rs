//! Success/failure classification of a stopped task and best-effort
//! project status writes.

use sqlx::PgPool;

use slipway_cloud::TaskOverview;
use slipway_db::models::project::ProjectStatus;
use slipway_db::repositories::ProjectRepo;

use crate::events::StreamStatus;

/// Stop code the platform uses for a task that never started.
const STOP_CODE_FAILED_TO_START: &str = "TaskFailedToStart";

/// Lowercase substrings of a stop reason that indicate a failed build.
const FAILURE_KEYWORDS: &[&str] = &["error", "cannot", "failed", "outofmemory", "out of memory"];

/// The classified outcome of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Finished,
    Failed,
}

impl DeployOutcome {
    /// Project status recorded for this outcome.
    pub fn project_status(self) -> ProjectStatus {
        match self {
            DeployOutcome::Finished => ProjectStatus::Finished,
            DeployOutcome::Failed => ProjectStatus::Failed,
        }
    }

    /// Terminal frame status emitted for this outcome.
    pub fn stream_status(self) -> StreamStatus {
        match self {
            DeployOutcome::Finished => StreamStatus::Finished,
            DeployOutcome::Failed => StreamStatus::Failed,
        }
    }
}

/// Classify a stopped task as finished or failed.
///
/// Applied once, at stop detection. A deployment failed iff any container
/// exited non-zero, the task never started, or the stop reason mentions a
/// failure keyword. A plain "Essential container in task exited" stop is
/// the normal end of a successful build.
pub fn classify_stopped_task(task: &TaskOverview) -> DeployOutcome {
    let bad_exit = task
        .containers
        .iter()
        .any(|c| c.exit_code.is_some_and(|code| code != 0));
    if bad_exit {
        return DeployOutcome::Failed;
    }

    if task.stop_code.as_deref() == Some(STOP_CODE_FAILED_TO_START) {
        return DeployOutcome::Failed;
    }

    if let Some(reason) = &task.stopped_reason {
        let reason = reason.to_ascii_lowercase();
        if FAILURE_KEYWORDS.iter().any(|keyword| reason.contains(keyword)) {
            return DeployOutcome::Failed;
        }
    }

    DeployOutcome::Finished
}

/// Record a project status transition, best-effort.
///
/// The remote task keeps running whatever happens to this bookkeeping
/// write, so a persistence failure is logged and swallowed.
pub async fn mark_status(pool: &PgPool, project_id: &str, status: ProjectStatus) {
    if let Err(e) = ProjectRepo::set_status(pool, project_id, status).await {
        tracing::error!(
            project_id,
            status = status.as_str(),
            error = %e,
            "Failed to persist project status",
        );
    }
}
