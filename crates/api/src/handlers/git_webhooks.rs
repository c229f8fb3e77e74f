//! Inbound Git-provider push webhooks that trigger automatic redeploys.
//!
//! Requests are authenticated by the project's stored webhook secret,
//! not by a user token: GitHub signs the raw body with HMAC-SHA256,
//! GitLab echoes the secret in a header. The only redeploy
//! de-duplication is the head-commit comparison -- delivery ids are not
//! tracked.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use slipway_core::error::CoreError;
use slipway_core::signing;
use slipway_db::models::project::{DeployRequest, Project};
use slipway_db::repositories::ProjectRepo;
use slipway_deploy::{launch_deployment, Principal};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The parts of a push notification the trigger cares about.
struct PushInfo {
    head_commit: String,
    message: Option<String>,
}

/// POST /api/v1/projects/{project_id}/webhooks/{provider}
///
/// Verify and act on one provider push delivery. Non-push events and
/// empty pushes acknowledge with 200 and do nothing; a push whose head
/// commit matches the last deployed one is skipped.
pub async fn provider_webhook(
    State(state): State<AppState>,
    Path((project_id, provider)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let project = ProjectRepo::find_by_project_id(&state.pool, &project_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id.clone(),
            })
        })?;

    if !project.auto_redeploy {
        return Err(AppError::BadRequest(
            "Auto-redeploy is disabled for this project".into(),
        ));
    }

    let secret = project.webhook_secret.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "No webhook secret configured for this project".into(),
        ))
    })?;

    let push = match provider.as_str() {
        "github" => {
            verify_github(secret, &headers, &body)?;
            if header_str(&headers, "x-github-event") != Some("push") {
                return Ok(Json(json!({ "message": "Ignoring non-push event" })));
            }
            parse_github_push(&body)?
        }
        "gitlab" => {
            verify_gitlab(secret, &headers)?;
            if header_str(&headers, "x-gitlab-event") != Some("Push Hook") {
                return Ok(Json(json!({ "message": "Ignoring non-push event" })));
            }
            parse_gitlab_push(&body)?
        }
        other => {
            return Err(AppError::BadRequest(format!("Unknown provider '{other}'")));
        }
    };

    let Some(push) = push else {
        return Ok(Json(json!({ "message": "Push with no commits, nothing to do" })));
    };

    if project.last_commit_hash.as_deref() == Some(push.head_commit.as_str()) {
        tracing::info!(
            project_id = %project_id,
            commit = %push.head_commit,
            "Duplicate push delivery skipped",
        );
        return Ok(Json(json!({ "message": "Same commit, skipping redeploy" })));
    }

    let receipt = launch_redeploy(&state, &project).await?;

    // The payload's head commit is what de-duplicates the next delivery;
    // record it even when the provider API lookup inside the launcher
    // came up empty.
    if let Err(e) = ProjectRepo::set_last_commit(
        &state.pool,
        &project.project_id,
        &push.head_commit,
        push.message.as_deref(),
    )
    .await
    {
        tracing::error!(project_id = %project_id, error = %e, "Failed to record deployed commit");
    }

    tracing::info!(
        project_id = %project_id,
        commit = %push.head_commit,
        task_arn = %receipt.task_arn,
        "Webhook redeploy triggered",
    );

    Ok(Json(json!({
        "message": "Redeploy triggered",
        "task_arn": receipt.task_arn,
    })))
}

/// Re-invoke the launcher with the project's stored configuration (never
/// the webhook payload's).
async fn launch_redeploy(
    state: &AppState,
    project: &Project,
) -> AppResult<slipway_deploy::DeployReceipt> {
    let principal = Principal {
        user_id: project.owner_user_id,
        name: project.owner_name.clone(),
        email: project.owner_email.clone(),
    };
    let request = DeployRequest {
        project_id: project.project_id.clone(),
        git_repository_url: project.git_repository_url.clone(),
        install_cmd: Some(project.install_cmd.clone()),
        build_cmd: Some(project.build_cmd.clone()),
        build_root: project.build_root.clone(),
    };

    Ok(launch_deployment(
        &state.pool,
        state.orchestrator.as_ref(),
        state.log_store.as_ref(),
        &state.http,
        &state.launch_config(),
        &principal,
        &request,
    )
    .await?)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn verify_github(secret: &str, headers: &HeaderMap, body: &[u8]) -> AppResult<()> {
    let signature = header_str(headers, "x-hub-signature-256").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing webhook signature".into()))
    })?;
    if !signing::verify_github_signature(secret, body, signature) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid webhook signature".into(),
        )));
    }
    Ok(())
}

fn verify_gitlab(secret: &str, headers: &HeaderMap) -> AppResult<()> {
    let token = header_str(headers, "x-gitlab-token").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing webhook token".into()))
    })?;
    if !signing::verify_gitlab_token(secret, token) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid webhook token".into(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GithubPush {
    after: Option<String>,
    #[serde(default)]
    commits: Vec<serde_json::Value>,
    head_commit: Option<GithubHeadCommit>,
}

#[derive(Debug, Deserialize)]
struct GithubHeadCommit {
    id: String,
    message: Option<String>,
}

fn parse_github_push(body: &[u8]) -> AppResult<Option<PushInfo>> {
    let payload: GithubPush = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Unparseable push payload: {e}")))?;

    if payload.commits.is_empty() {
        return Ok(None);
    }

    let (head_commit, message) = match (payload.head_commit, payload.after) {
        (Some(head), _) => (head.id, head.message),
        (None, Some(after)) => (after, None),
        (None, None) => return Ok(None),
    };

    Ok(Some(PushInfo {
        head_commit,
        message,
    }))
}

#[derive(Debug, Deserialize)]
struct GitlabPush {
    object_kind: Option<String>,
    after: Option<String>,
    #[serde(default)]
    commits: Vec<GitlabCommit>,
}

#[derive(Debug, Deserialize)]
struct GitlabCommit {
    id: String,
    message: Option<String>,
}

fn parse_gitlab_push(body: &[u8]) -> AppResult<Option<PushInfo>> {
    let payload: GitlabPush = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Unparseable push payload: {e}")))?;

    if payload.object_kind.as_deref() != Some("push") || payload.commits.is_empty() {
        return Ok(None);
    }

    let head_commit = match payload.after {
        Some(after) => after,
        None => match payload.commits.last() {
            Some(commit) => commit.id.clone(),
            None => return Ok(None),
        },
    };
    let message = payload
        .commits
        .last()
        .and_then(|commit| commit.message.clone());

    Ok(Some(PushInfo {
        head_commit,
        message,
    }))
}
