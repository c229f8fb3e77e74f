pub mod health;
pub mod projects;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /projects/...    deployments, logs, settings, webhooks
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/projects", projects::router())
}
