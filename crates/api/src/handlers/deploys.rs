//! Deployment submission and redeploy.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use slipway_db::models::project::DeployRequest;
use slipway_deploy::{launch_deployment, DeployReceipt, Principal};

use crate::error::AppResult;
use crate::handlers::projects::load_owned;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful deploy submission.
#[derive(Debug, Serialize)]
struct DeployResponse {
    project_id: String,
    url: String,
    task_arn: String,
}

impl From<DeployReceipt> for DeployResponse {
    fn from(receipt: DeployReceipt) -> Self {
        Self {
            project_id: receipt.project_id,
            url: receipt.deploy_url,
            task_arn: receipt.task_arn,
        }
    }
}

fn principal_for(user: &AuthUser) -> Principal {
    Principal {
        user_id: user.user_id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

/// POST /api/v1/projects/deploy
///
/// Submit a deployment: upsert the project and launch its build task.
pub async fn submit_deployment(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<DeployRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = launch_deployment(
        &state.pool,
        state.orchestrator.as_ref(),
        state.log_store.as_ref(),
        &state.http,
        &state.launch_config(),
        &principal_for(&user),
        &input,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: DeployResponse::from(receipt),
        }),
    ))
}

/// POST /api/v1/projects/{project_id}/redeploy
///
/// Relaunch the build using the project's stored configuration.
pub async fn redeploy(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let project = load_owned(&state, &user, &project_id).await?;

    let request = DeployRequest {
        project_id: project.project_id.clone(),
        git_repository_url: project.git_repository_url.clone(),
        install_cmd: Some(project.install_cmd.clone()),
        build_cmd: Some(project.build_cmd.clone()),
        build_root: project.build_root.clone(),
    };

    let receipt = launch_deployment(
        &state.pool,
        state.orchestrator.as_ref(),
        state.log_store.as_ref(),
        &state.http,
        &state.launch_config(),
        &principal_for(&user),
        &request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: DeployResponse::from(receipt),
        }),
    ))
}
