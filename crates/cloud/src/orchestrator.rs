//! Command interface for the remote container orchestration platform.
//!
//! The platform is treated as an opaque remote system: launch a task,
//! list tasks by their started-by tag, describe a task, and describe the
//! task definition that produced it. Submission is single-attempt; any
//! retrying belongs to the caller.

use async_trait::async_trait;

/// Everything needed to submit one build task.
///
/// The target cluster is construction-time configuration of the
/// implementation, not part of the per-launch spec.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Task definition reference (family, family:revision, or ARN).
    pub task_definition: String,
    /// Name of the container receiving the environment overrides.
    pub container_name: String,
    /// Correlation tag; the project id.
    pub started_by: String,
    /// Environment variables for the build container. May carry secrets;
    /// must never be logged.
    pub env: Vec<(String, String)>,
    /// Subnets for awsvpc network placement.
    pub subnets: Vec<String>,
    /// Security groups for awsvpc network placement.
    pub security_groups: Vec<String>,
    /// Whether the task gets a public IP (needed to reach the Git host
    /// from a public subnet without a NAT gateway).
    pub assign_public_ip: bool,
}

/// Desired-state filter for task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskDesiredStatus {
    Running,
    Stopped,
}

/// One container's runtime outcome within a task.
#[derive(Debug, Clone)]
pub struct ContainerOverview {
    pub name: String,
    pub exit_code: Option<i32>,
}

/// Snapshot of a task's lifecycle state.
#[derive(Debug, Clone)]
pub struct TaskOverview {
    pub arn: String,
    /// Platform lifecycle status string, e.g. `PROVISIONING`, `RUNNING`,
    /// `STOPPED`.
    pub last_status: String,
    /// Platform stop code once stopped, e.g. `TaskFailedToStart`.
    pub stop_code: Option<String>,
    /// Human-readable stop reason once stopped.
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerOverview>,
    pub task_definition_arn: Option<String>,
}

impl TaskOverview {
    /// Whether the task has reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        self.last_status.eq_ignore_ascii_case("STOPPED")
    }

    /// Trailing path segment of the task ARN; used to compute the
    /// concrete log stream name.
    pub fn task_id(&self) -> &str {
        self.arn.rsplit('/').next().unwrap_or(&self.arn)
    }
}

/// Logging configuration declared for one container in a task definition.
///
/// `log_group`/`stream_prefix` are `None` when the container has no
/// awslogs configuration.
#[derive(Debug, Clone)]
pub struct ContainerLogConfig {
    pub name: String,
    pub log_group: Option<String>,
    pub stream_prefix: Option<String>,
}

/// The subset of a task definition the log locator needs.
#[derive(Debug, Clone)]
pub struct TaskDefinitionOverview {
    pub containers: Vec<ContainerLogConfig>,
}

/// Errors from the orchestration platform.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The platform rejected the launch request. Distinguished so the API
    /// layer can surface it as an upstream (502-class) failure.
    #[error("Task submission rejected: {0}")]
    Submit(String),

    /// A describe call targeted a task the platform does not know.
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    /// Any other platform-side failure.
    #[error("Orchestrator error: {0}")]
    Backend(String),
}

/// Command interface to the remote task platform.
#[async_trait]
pub trait ContainerOrchestrator: Send + Sync {
    /// Submit one task. Single attempt; returns the task handle (ARN).
    async fn launch_task(&self, spec: &LaunchSpec) -> Result<String, OrchestratorError>;

    /// List task handles carrying the given started-by tag, optionally
    /// filtered by desired state.
    async fn list_tasks(
        &self,
        started_by: &str,
        desired_status: Option<TaskDesiredStatus>,
    ) -> Result<Vec<String>, OrchestratorError>;

    /// Describe one task's current lifecycle state.
    async fn describe_task(&self, task_arn: &str) -> Result<TaskOverview, OrchestratorError>;

    /// Describe the task definition that produced a task.
    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> Result<TaskDefinitionOverview, OrchestratorError>;
}
