//! Task and log-stream discovery.
//!
//! [`find_task`] answers "which remote task belongs to this project right
//! now"; [`resolve_log_target`] answers "where is that task's log stream".
//! Both are single-shot queries -- retry policy belongs to the pump.

use slipway_cloud::{ContainerOrchestrator, OrchestratorError, TaskDesiredStatus};

/// Concrete address of one task's log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub group: String,
    pub stream: String,
}

/// Errors while resolving a task's log stream.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// The task definition declares no usable logging configuration.
    /// Terminal: this reflects configuration, not transient state.
    #[error("No logging configuration for task '{0}'")]
    NoLogsConfig(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Find the task currently associated with a project.
///
/// Queries for running tasks tagged with the project id first; when none
/// match, broadens to any state to cover the race where the task already
/// stopped before the client connected. `None` means "not yet scheduled"
/// -- a normal transient state, not an error.
pub async fn find_task(
    orchestrator: &dyn ContainerOrchestrator,
    project_id: &str,
) -> Result<Option<String>, OrchestratorError> {
    let running = orchestrator
        .list_tasks(project_id, Some(TaskDesiredStatus::Running))
        .await?;
    if let Some(arn) = running.into_iter().next() {
        return Ok(Some(arn));
    }

    let any = orchestrator.list_tasks(project_id, None).await?;
    Ok(any.into_iter().next())
}

/// Resolve the log group and concrete stream name for a task.
///
/// The stream name follows the platform's `prefix/containerName/taskId`
/// convention, with the container matched by the task's runtime container
/// name (falling back to the first declared container).
pub async fn resolve_log_target(
    orchestrator: &dyn ContainerOrchestrator,
    task_arn: &str,
) -> Result<LogTarget, LocateError> {
    let task = orchestrator.describe_task(task_arn).await?;

    let definition_arn = task
        .task_definition_arn
        .clone()
        .ok_or_else(|| LocateError::NoLogsConfig(task_arn.to_string()))?;
    let definition = orchestrator.describe_task_definition(&definition_arn).await?;

    let runtime_name = task.containers.first().map(|c| c.name.as_str());
    let container = runtime_name
        .and_then(|name| definition.containers.iter().find(|c| c.name == name))
        .or_else(|| definition.containers.first())
        .ok_or_else(|| LocateError::NoLogsConfig(task_arn.to_string()))?;

    let (Some(group), Some(prefix)) = (&container.log_group, &container.stream_prefix) else {
        return Err(LocateError::NoLogsConfig(task_arn.to_string()));
    };

    Ok(LogTarget {
        group: group.clone(),
        stream: format!("{prefix}/{}/{}", container.name, task.task_id()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use slipway_cloud::memory::MemoryOrchestrator;
    use slipway_cloud::LaunchSpec;

    fn spec(project_id: &str) -> LaunchSpec {
        LaunchSpec {
            task_definition: "builder".to_string(),
            container_name: "builder".to_string(),
            started_by: project_id.to_string(),
            env: vec![],
            subnets: vec![],
            security_groups: vec![],
            assign_public_ip: false,
        }
    }

    #[tokio::test]
    async fn find_task_returns_none_before_any_launch() {
        let orchestrator = MemoryOrchestrator::new();
        let found = find_task(&orchestrator, "demo-1").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn find_task_prefers_running_tasks() {
        let orchestrator = MemoryOrchestrator::new();
        let arn = orchestrator.launch_task(&spec("demo-1")).await.unwrap();
        orchestrator.set_task_status(&arn, "RUNNING");

        let found = find_task(&orchestrator, "demo-1").await.unwrap();
        assert_eq!(found.as_deref(), Some(arn.as_str()));
    }

    #[tokio::test]
    async fn find_task_broadens_to_stopped_tasks() {
        let orchestrator = MemoryOrchestrator::new();
        let arn = orchestrator.launch_task(&spec("demo-1")).await.unwrap();
        orchestrator.complete_task(&arn, 0, "EssentialContainerExited", "done");

        let found = find_task(&orchestrator, "demo-1").await.unwrap();
        assert_eq!(found.as_deref(), Some(arn.as_str()));
    }

    #[tokio::test]
    async fn find_task_ignores_other_projects() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator.launch_task(&spec("other")).await.unwrap();

        let found = find_task(&orchestrator, "demo-1").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn resolve_log_target_builds_stream_name() {
        let orchestrator = MemoryOrchestrator::new();
        let arn = orchestrator.launch_task(&spec("demo-1")).await.unwrap();

        let target = resolve_log_target(&orchestrator, &arn).await.unwrap();
        assert_eq!(target.group, "/slipway/builds");
        let task_id = arn.rsplit('/').next().unwrap();
        assert_eq!(target.stream, format!("build/builder/{task_id}"));
    }

    #[tokio::test]
    async fn resolve_log_target_without_log_config_is_terminal() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator.clear_log_config();
        let arn = orchestrator.launch_task(&spec("demo-1")).await.unwrap();

        let err = resolve_log_target(&orchestrator, &arn).await.unwrap_err();
        assert_matches!(err, LocateError::NoLogsConfig(_));
    }

    #[tokio::test]
    async fn resolve_log_target_for_unknown_task_is_an_orchestrator_error() {
        let orchestrator = MemoryOrchestrator::new();
        let err = resolve_log_target(&orchestrator, "arn:missing").await.unwrap_err();
        assert_matches!(
            err,
            LocateError::Orchestrator(OrchestratorError::TaskNotFound(_))
        );
    }
}
