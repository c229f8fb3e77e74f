//! Project listing, inspection, settings, and deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use slipway_core::error::CoreError;
use slipway_core::signing;
use slipway_db::models::project::{AutoRedeployRequest, Project};
use slipway_db::repositories::ProjectRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a project and verify the caller owns it.
///
/// Shared by every per-project handler, including the deploy and log
/// endpoints in the sibling modules.
pub(crate) async fn load_owned(
    state: &AppState,
    user: &AuthUser,
    project_id: &str,
) -> AppResult<Project> {
    let project = ProjectRepo::find_by_project_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id.to_string(),
            })
        })?;

    if project.owner_user_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this project".into(),
        )));
    }

    Ok(project)
}

/// GET /api/v1/projects
///
/// List the caller's projects, newest first.
pub async fn list_projects(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let projects = ProjectRepo::list_by_owner(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{project_id}
pub async fn get_project(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let project = load_owned(&state, &user, &project_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{project_id}
///
/// Remove the project record. The archived log blob, if any, stays in
/// object storage.
pub async fn delete_project(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &user, &project_id).await?;
    ProjectRepo::delete(&state.pool, &project_id).await?;

    tracing::info!(project_id = %project_id, user_id = user.user_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Response for the auto-redeploy toggle. The secret appears exactly once,
/// when auto-redeploy is enabled.
#[derive(Debug, Serialize)]
struct AutoRedeployResponse {
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_secret: Option<String>,
}

/// PUT /api/v1/projects/{project_id}/auto-redeploy
///
/// Enable or disable webhook-triggered redeploys. Enabling generates a
/// fresh per-project webhook secret and returns it to the caller, who
/// configures it on the Git provider side.
pub async fn set_auto_redeploy(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<AutoRedeployRequest>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &user, &project_id).await?;

    let secret = input.enabled.then(signing::generate_webhook_secret);

    ProjectRepo::set_auto_redeploy(
        &state.pool,
        &project_id,
        input.enabled,
        input.webhook_id.as_deref().filter(|_| input.enabled),
        secret.as_deref(),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id.clone(),
        })
    })?;

    tracing::info!(
        project_id = %project_id,
        enabled = input.enabled,
        user_id = user.user_id,
        "Auto-redeploy toggled",
    );

    Ok(Json(DataResponse {
        data: AutoRedeployResponse {
            enabled: input.enabled,
            webhook_secret: secret,
        },
    }))
}
