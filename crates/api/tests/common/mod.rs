#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use slipway_api::auth::jwt::{generate_access_token, JwtConfig};
use slipway_api::config::{DeployConfig, ServerConfig};
use slipway_api::routes;
use slipway_api::state::AppState;
use slipway_cloud::memory::{MemoryBlobStore, MemoryLogStore, MemoryOrchestrator};

/// Build a test `ServerConfig` with safe defaults and in-memory deploy
/// targets.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        deploy: DeployConfig {
            app_domain: "apps.example.com".to_string(),
            bucket: "slipway-sites".to_string(),
            log_group: "/slipway/builds".to_string(),
            cluster: "builds".to_string(),
            task_definition: "slipway-builder".to_string(),
            container_name: "builder".to_string(),
            subnets: vec!["subnet-1".to_string()],
            security_groups: vec!["sg-1".to_string()],
            assign_public_ip: true,
        },
    }
}

/// The application under test plus handles to its in-memory cloud
/// backends for scripting and assertions.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: Arc<MemoryOrchestrator>,
    pub logs: Arc<MemoryLogStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Build the full application router with all middleware layers, using
/// the given database pool and in-memory cloud backends.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack that production uses.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let logs = Arc::new(MemoryLogStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());

    let state = AppState {
        pool,
        config: Arc::new(config),
        orchestrator: orchestrator.clone(),
        log_store: logs.clone(),
        blob_store: blobs.clone(),
        http: reqwest::Client::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        orchestrator,
        logs,
        blobs,
    }
}

/// Issue a signed access token for a test principal.
pub fn auth_token(user_id: i64, name: &str, email: &str) -> String {
    generate_access_token(user_id, name, email, &test_config().jwt)
        .expect("test token generation should not fail")
}

/// Send one request through the router.
pub async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };

    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should produce a response")
}

/// Read the full response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
