//! Route definitions for the `/projects` resource.
//!
//! All endpoints require authentication except the provider webhook,
//! which authenticates by payload signature instead.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{deploys, git_webhooks, logs, projects};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                  -> list_projects
/// POST   /deploy                            -> submit_deployment
/// GET    /{project_id}                      -> get_project
/// DELETE /{project_id}                      -> delete_project
/// POST   /{project_id}/redeploy             -> redeploy
/// GET    /{project_id}/logs/stream          -> stream_logs (SSE)
/// GET    /{project_id}/logs                 -> get_archived_logs
/// GET    /{project_id}/logs/archives        -> list_archives
/// PUT    /{project_id}/auto-redeploy        -> set_auto_redeploy
/// POST   /{project_id}/webhooks/{provider}  -> provider_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects))
        .route("/deploy", post(deploys::submit_deployment))
        .route(
            "/{project_id}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/{project_id}/redeploy", post(deploys::redeploy))
        .route("/{project_id}/logs/stream", get(logs::stream_logs))
        .route("/{project_id}/logs", get(logs::get_archived_logs))
        .route("/{project_id}/logs/archives", get(logs::list_archives))
        .route("/{project_id}/auto-redeploy", put(projects::set_auto_redeploy))
        .route(
            "/{project_id}/webhooks/{provider}",
            post(git_webhooks::provider_webhook),
        )
}
