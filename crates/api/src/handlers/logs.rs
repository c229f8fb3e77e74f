//! Live log streaming (SSE) and archived log retrieval.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use slipway_cloud::BlobStoreError;
use slipway_core::error::CoreError;
use slipway_core::naming;
use slipway_deploy::archive::parse_archive;
use slipway_deploy::{run_log_stream, DeployEvent};

use crate::error::{AppError, AppResult};
use crate::handlers::projects::load_owned;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Frames buffered between the pump and a slow client.
const STREAM_BUFFER: usize = 256;

/// Cancels the pump when the SSE body is dropped, i.e. when the client
/// disconnects. This is what guarantees no polling timer outlives its
/// connection.
struct DisconnectGuard(CancellationToken);

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// SSE body: deploy-event frames rendered as JSON data lines.
struct LogEventStream {
    inner: ReceiverStream<DeployEvent>,
    _guard: DisconnectGuard,
}

impl Stream for LogEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(frame)) => {
                let data = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
                Poll::Ready(Some(Ok(Event::default().data(data))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// GET /api/v1/projects/{project_id}/logs/stream
///
/// Open the live log channel for a project's current deployment. The
/// connection carries JSON frames -- log lines and status notices -- and
/// closes right after the single terminal status frame.
pub async fn stream_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &user, &project_id).await?;

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let cancel = CancellationToken::new();
    tokio::spawn(run_log_stream(
        state.stream_context(),
        project_id.clone(),
        tx,
        cancel.clone(),
    ));

    tracing::info!(project_id = %project_id, user_id = user.user_id, "Live log channel opened");

    let stream = LogEventStream {
        inner: ReceiverStream::new(rx),
        _guard: DisconnectGuard(cancel),
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// GET /api/v1/projects/{project_id}/logs
///
/// Return the archived build log as parsed records. 404 until a
/// deployment has completed and archived.
pub async fn get_archived_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let project = load_owned(&state, &user, &project_id).await?;

    let key = project
        .logs_s3_key
        .unwrap_or_else(|| naming::archive_key(&project_id));

    match state.blob_store.get_object(&key).await {
        Ok(bytes) => {
            let body = String::from_utf8_lossy(&bytes);
            Ok(Json(DataResponse {
                data: parse_archive(&body),
            }))
        }
        Err(BlobStoreError::NotFound(_)) => Err(AppError::Core(CoreError::NotFound {
            entity: "Build log archive",
            id: project_id,
        })),
        Err(e) => Err(AppError::InternalError(e.to_string())),
    }
}

/// GET /api/v1/projects/{project_id}/logs/archives
///
/// List archive objects for a project (key, size, modification time).
pub async fn list_archives(
    user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &user, &project_id).await?;

    let objects = state
        .blob_store
        .list_objects(&naming::archive_key(&project_id))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(Json(DataResponse { data: objects }))
}
