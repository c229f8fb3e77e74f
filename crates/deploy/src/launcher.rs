//! Task launcher: turns one deploy request into a remote build task.
//!
//! The project row is written before submission so a record exists even
//! when the remote platform rejects the launch. Token and commit lookups
//! are best-effort; only validation and the submission itself can fail
//! the operation.

use sqlx::PgPool;

use slipway_cloud::{ContainerOrchestrator, LaunchSpec, LogStore};
use slipway_core::error::CoreError;
use slipway_core::naming;
use slipway_core::types::DbId;
use slipway_db::models::project::{
    DeployRequest, ProjectStatus, UpsertProject, DEFAULT_BUILD_CMD, DEFAULT_INSTALL_CMD,
};
use slipway_db::repositories::{GitCredentialRepo, ProjectRepo};

use crate::git;
use crate::outcome::mark_status;

/// Git provider key under which access tokens are stored.
const TOKEN_PROVIDER: &str = "github";

/// The authenticated caller, as seen by the launcher.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: DbId,
    pub name: String,
    pub email: String,
}

/// Deployment-wide settings the launcher needs.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Domain suffix for derived deploy URLs.
    pub app_domain: String,
    /// Bucket the build container publishes the site into.
    pub bucket: String,
    /// Log group the build task definition writes to.
    pub log_group: String,
    /// Task definition reference for the build task.
    pub task_definition: String,
    /// Container receiving the environment overrides.
    pub container_name: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

/// Successful launch result.
#[derive(Debug, Clone)]
pub struct DeployReceipt {
    pub project_id: String,
    pub deploy_url: String,
    pub task_arn: String,
}

/// Errors from the launch path.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Input validation failed; nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Another deployment for this project currently holds the lease.
    #[error("A deployment for '{0}' is already in progress")]
    AlreadyRunning(String),

    /// The remote platform rejected the submission. The project is
    /// marked failed; the caller surfaces this as an upstream error.
    #[error("Task submission failed: {0}")]
    Submit(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Launch one build task for a project.
///
/// Order matters here:
/// 1. validate input (no side effects on rejection),
/// 2. best-effort token and commit lookups,
/// 3. upsert the project row as `queued` (acquiring the launch lease),
/// 4. best-effort log group pre-creation,
/// 5. submit the task, then record `running` or `failed`.
pub async fn launch_deployment(
    pool: &PgPool,
    orchestrator: &dyn ContainerOrchestrator,
    logs: &dyn LogStore,
    http: &reqwest::Client,
    config: &LaunchConfig,
    principal: &Principal,
    request: &DeployRequest,
) -> Result<DeployReceipt, LaunchError> {
    naming::validate_project_id(&request.project_id)?;
    if request.git_repository_url.trim().is_empty() {
        return Err(CoreError::Validation("git_repository_url must not be empty".into()).into());
    }

    let access_token =
        match GitCredentialRepo::find_token(pool, principal.user_id, TOKEN_PROVIDER).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(
                    user_id = principal.user_id,
                    error = %e,
                    "Could not load stored Git token, continuing without it",
                );
                None
            }
        };

    let commit = match git::fetch_latest_commit(
        http,
        &request.git_repository_url,
        access_token.as_deref(),
    )
    .await
    {
        Ok(commit) => commit,
        Err(e) => {
            tracing::warn!(
                project_id = %request.project_id,
                error = %e,
                "Could not fetch commit metadata, continuing without it",
            );
            None
        }
    };

    let upsert = UpsertProject {
        project_id: request.project_id.clone(),
        git_repository_url: request.git_repository_url.clone(),
        deploy_url: naming::deploy_url(&request.project_id, &config.app_domain),
        last_commit_hash: commit.as_ref().map(|c| c.hash.clone()),
        last_commit_message: commit.as_ref().map(|c| c.message.clone()),
        install_cmd: request
            .install_cmd
            .clone()
            .filter(|cmd| !cmd.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTALL_CMD.to_string()),
        build_cmd: request
            .build_cmd
            .clone()
            .filter(|cmd| !cmd.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUILD_CMD.to_string()),
        build_root: request.build_root.clone().filter(|root| !root.trim().is_empty()),
        owner_user_id: principal.user_id,
        owner_name: principal.name.clone(),
        owner_email: principal.email.clone(),
    };

    let project = ProjectRepo::upsert_for_launch(pool, &upsert)
        .await?
        .ok_or_else(|| LaunchError::AlreadyRunning(request.project_id.clone()))?;

    if let Err(e) = logs.create_log_group(&config.log_group).await {
        tracing::warn!(
            log_group = %config.log_group,
            error = %e,
            "Could not pre-create build log group",
        );
    }

    let mut env = vec![
        ("REPO_URL".to_string(), request.git_repository_url.clone()),
        ("PROJECT_ID".to_string(), request.project_id.clone()),
        ("DEPLOY_BUCKET".to_string(), config.bucket.clone()),
        ("INSTALL_CMD".to_string(), project.install_cmd.clone()),
        ("BUILD_CMD".to_string(), project.build_cmd.clone()),
    ];
    if let Some(root) = &project.build_root {
        env.push(("BUILD_ROOT".to_string(), root.clone()));
    }
    if let Some(token) = &access_token {
        // The task environment is the only channel carrying this secret.
        env.push(("GIT_TOKEN".to_string(), token.clone()));
    }

    let spec = LaunchSpec {
        task_definition: config.task_definition.clone(),
        container_name: config.container_name.clone(),
        started_by: request.project_id.clone(),
        env,
        subnets: config.subnets.clone(),
        security_groups: config.security_groups.clone(),
        assign_public_ip: config.assign_public_ip,
    };

    match orchestrator.launch_task(&spec).await {
        Ok(task_arn) => {
            mark_status(pool, &request.project_id, ProjectStatus::Running).await;
            tracing::info!(
                project_id = %request.project_id,
                task_arn = %task_arn,
                "Build task submitted",
            );
            Ok(DeployReceipt {
                project_id: request.project_id.clone(),
                deploy_url: project.deploy_url,
                task_arn,
            })
        }
        Err(e) => {
            // Best-effort: the failed marker must not mask the original
            // submission error.
            mark_status(pool, &request.project_id, ProjectStatus::Failed).await;
            tracing::error!(project_id = %request.project_id, error = %e, "Task submission failed");
            Err(LaunchError::Submit(e.to_string()))
        }
    }
}
