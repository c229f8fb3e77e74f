//! Integration tests for the Git-provider webhook redeploy trigger.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use sqlx::PgPool;
use tower::ServiceExt;

use slipway_db::models::project::{ProjectStatus, UpsertProject};
use slipway_db::repositories::ProjectRepo;

use common::{body_json, build_test_app, TestApp};

const SECRET: &str = "hook-s3cret";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seed a finished project with auto-redeploy on and a known secret.
async fn seed_project(pool: &PgPool, project_id: &str) {
    let upsert = UpsertProject {
        project_id: project_id.to_string(),
        git_repository_url: "https://git.internal/acme/site".to_string(),
        deploy_url: format!("https://{project_id}.apps.example.com"),
        last_commit_hash: Some("abc123".to_string()),
        last_commit_message: Some("initial commit".to_string()),
        install_cmd: "npm install".to_string(),
        build_cmd: "npm run build".to_string(),
        build_root: None,
        owner_user_id: 1,
        owner_name: "Ada".to_string(),
        owner_email: "ada@example.com".to_string(),
    };
    ProjectRepo::upsert_for_launch(pool, &upsert).await.unwrap().unwrap();
    ProjectRepo::set_status(pool, project_id, ProjectStatus::Finished)
        .await
        .unwrap();
    ProjectRepo::set_auto_redeploy(pool, project_id, true, None, Some(SECRET))
        .await
        .unwrap()
        .unwrap();
}

fn github_push_body(after: &str) -> String {
    json!({
        "ref": "refs/heads/main",
        "after": after,
        "commits": [{ "id": after }],
        "head_commit": { "id": after, "message": "update homepage" },
    })
    .to_string()
}

fn github_signature(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    let digest = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    format!("sha256={digest}")
}

async fn deliver_github(
    app: &TestApp,
    project_id: &str,
    event: &str,
    body: String,
    signature: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/projects/{project_id}/webhooks/github"))
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-hub-signature-256", signature)
        .body(Body::from(body))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn new_commit_triggers_redeploy_and_records_hash(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = github_push_body("def456");
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "demo-1", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Redeploy triggered");

    assert_eq!(app.orchestrator.launched_tasks().len(), 1);
    let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.last_commit_hash.as_deref(), Some("def456"));
    assert_eq!(project.status, ProjectStatus::Running);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn same_commit_is_skipped(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = github_push_body("abc123");
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "demo-1", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Same commit, skipping redeploy");

    assert!(app.orchestrator.launched_tasks().is_empty());
    let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.status, ProjectStatus::Finished);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bad_signature_is_unauthorized_without_mutation(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = github_push_body("def456");
    let signature = github_signature("wrong-secret", &body);
    let response = deliver_github(&app, "demo-1", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.orchestrator.launched_tasks().is_empty());

    let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.last_commit_hash.as_deref(), Some("abc123"));
    assert_eq!(project.status, ProjectStatus::Finished);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn non_push_events_are_acknowledged_and_ignored(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = json!({ "zen": "Keep it logically awesome." }).to_string();
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "demo-1", "ping", body, &signature).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Ignoring non-push event");
    assert!(app.orchestrator.launched_tasks().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_push_is_a_no_op(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = json!({
        "ref": "refs/heads/main",
        "after": "def456",
        "commits": [],
    })
    .to_string();
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "demo-1", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.orchestrator.launched_tasks().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn disabled_auto_redeploy_is_rejected(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;
    ProjectRepo::set_auto_redeploy(&pool, "demo-1", false, None, None)
        .await
        .unwrap()
        .unwrap();

    let body = github_push_body("def456");
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "demo-1", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.orchestrator.launched_tasks().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_project_is_not_found(pool: PgPool) {
    let app = build_test_app(pool);

    let body = github_push_body("def456");
    let signature = github_signature(SECRET, &body);
    let response = deliver_github(&app, "ghost", "push", body, &signature).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// GitLab
// ---------------------------------------------------------------------------

async fn deliver_gitlab(
    app: &TestApp,
    project_id: &str,
    token: &str,
    body: String,
) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/projects/{project_id}/webhooks/gitlab"))
        .header("content-type", "application/json")
        .header("x-gitlab-event", "Push Hook")
        .header("x-gitlab-token", token)
        .body(Body::from(body))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gitlab_token_authenticates_push(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = json!({
        "object_kind": "push",
        "after": "def456",
        "commits": [{ "id": "def456", "message": "update" }],
    })
    .to_string();

    let response = deliver_gitlab(&app, "demo-1", SECRET, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.orchestrator.launched_tasks().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gitlab_wrong_token_is_unauthorized(pool: PgPool) {
    let app = build_test_app(pool.clone());
    seed_project(&pool, "demo-1").await;

    let body = json!({
        "object_kind": "push",
        "after": "def456",
        "commits": [{ "id": "def456" }],
    })
    .to_string();

    let response = deliver_gitlab(&app, "demo-1", "nope", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.orchestrator.launched_tasks().is_empty());
}
