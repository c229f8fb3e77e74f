//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use slipway_core::types::{DbId, Timestamp};

/// Default install command when the caller supplies none.
pub const DEFAULT_INSTALL_CMD: &str = "npm install";

/// Default build command when the caller supplies none.
pub const DEFAULT_BUILD_CMD: &str = "npm run build";

/// Lifecycle status of a project's most recent deployment.
///
/// `Queued` is set before the remote task is submitted, `Running` once the
/// platform accepts it, and `Finished`/`Failed` when the log stream pump
/// observes the task stop. A fresh redeploy re-enters at `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

impl ProjectStatus {
    /// Lowercase wire/database spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Queued => "queued",
            ProjectStatus::Running => "running",
            ProjectStatus::Finished => "finished",
            ProjectStatus::Failed => "failed",
        }
    }
}

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub project_id: String,
    pub git_repository_url: String,
    pub deploy_url: String,
    pub status: ProjectStatus,
    pub last_commit_hash: Option<String>,
    pub last_commit_message: Option<String>,
    pub logs_s3_key: Option<String>,
    pub install_cmd: String,
    pub build_cmd: String,
    pub build_root: Option<String>,
    pub owner_user_id: DbId,
    pub owner_name: String,
    pub owner_email: String,
    pub auto_redeploy: bool,
    pub webhook_id: Option<String>,
    /// Never serialized; verification happens server-side only.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a deployment via `POST /api/v1/projects/deploy`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub project_id: String,
    pub git_repository_url: String,
    pub install_cmd: Option<String>,
    pub build_cmd: Option<String>,
    pub build_root: Option<String>,
}

/// Fully-resolved project values written by the launcher's upsert.
///
/// Built internally from a [`DeployRequest`] plus the authenticated
/// principal and best-effort commit metadata -- never deserialized from
/// client input directly.
#[derive(Debug, Clone)]
pub struct UpsertProject {
    pub project_id: String,
    pub git_repository_url: String,
    pub deploy_url: String,
    pub last_commit_hash: Option<String>,
    pub last_commit_message: Option<String>,
    pub install_cmd: String,
    pub build_cmd: String,
    pub build_root: Option<String>,
    pub owner_user_id: DbId,
    pub owner_name: String,
    pub owner_email: String,
}

/// DTO for `PUT /api/v1/projects/{project_id}/auto-redeploy`.
#[derive(Debug, Deserialize)]
pub struct AutoRedeployRequest {
    pub enabled: bool,
    /// Provider-side hook id, recorded when the caller has already
    /// registered the webhook with GitHub/GitLab.
    pub webhook_id: Option<String>,
}
