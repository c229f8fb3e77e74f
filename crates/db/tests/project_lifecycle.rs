//! Integration tests for the project repository against a real database.
//!
//! Exercises the launch upsert (including its lease guard), the status
//! transitions written by the pump, and the webhook/settings updates.

use sqlx::PgPool;
use slipway_db::models::project::{ProjectStatus, UpsertProject};
use slipway_db::repositories::{GitCredentialRepo, ProjectRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_upsert(project_id: &str) -> UpsertProject {
    UpsertProject {
        project_id: project_id.to_string(),
        git_repository_url: "https://github.com/acme/site".to_string(),
        deploy_url: format!("https://{project_id}.apps.example.com"),
        last_commit_hash: Some("abc123".to_string()),
        last_commit_message: Some("initial commit".to_string()),
        install_cmd: "npm install".to_string(),
        build_cmd: "npm run build".to_string(),
        build_root: None,
        owner_user_id: 1,
        owner_name: "Ada".to_string(),
        owner_email: "ada@example.com".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Launch upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn upsert_creates_queued_project(pool: PgPool) {
    let project = ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .expect("upsert should succeed")
        .expect("lease should be free for a new project");

    assert_eq!(project.project_id, "demo-1");
    assert_eq!(project.status, ProjectStatus::Queued);
    assert_eq!(project.deploy_url, "https://demo-1.apps.example.com");
    assert_eq!(project.owner_email, "ada@example.com");
    assert!(project.logs_s3_key.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn lease_blocks_relaunch_while_running(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();
    ProjectRepo::set_status(&pool, "demo-1", ProjectStatus::Running)
        .await
        .unwrap();

    let second = ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap();
    assert!(second.is_none(), "a fresh running project must hold the lease");
}

#[sqlx::test(migrations = "./migrations")]
async fn lease_blocks_relaunch_while_freshly_queued(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();

    let second = ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap();
    assert!(second.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn redeploy_reenters_after_terminal_status(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();
    ProjectRepo::set_status(&pool, "demo-1", ProjectStatus::Failed)
        .await
        .unwrap();

    let mut redeploy = new_upsert("demo-1");
    redeploy.last_commit_hash = Some("def456".to_string());
    redeploy.build_cmd = "npm run build:prod".to_string();

    let project = ProjectRepo::upsert_for_launch(&pool, &redeploy)
        .await
        .unwrap()
        .expect("terminal status releases the lease");

    assert_eq!(project.status, ProjectStatus::Queued);
    assert_eq!(project.last_commit_hash.as_deref(), Some("def456"));
    assert_eq!(project.build_cmd, "npm run build:prod");
}

#[sqlx::test(migrations = "./migrations")]
async fn redeploy_clears_stale_archive_key_but_keeps_deploy_url(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();
    ProjectRepo::set_logs_key(&pool, "demo-1", "logs/demo-1.ndjson")
        .await
        .unwrap();
    ProjectRepo::set_status(&pool, "demo-1", ProjectStatus::Finished)
        .await
        .unwrap();

    let mut redeploy = new_upsert("demo-1");
    // A hostile caller cannot rewrite the public address after creation.
    redeploy.deploy_url = "https://evil.example.com".to_string();

    let project = ProjectRepo::upsert_for_launch(&pool, &redeploy)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(project.deploy_url, "https://demo-1.apps.example.com");
    assert!(project.logs_s3_key.is_none());
}

// ---------------------------------------------------------------------------
// Status and bookkeeping writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn status_transitions_are_observable(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();

    for status in [
        ProjectStatus::Running,
        ProjectStatus::Finished,
    ] {
        ProjectRepo::set_status(&pool, "demo-1", status).await.unwrap();
        let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.status, status);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn set_logs_key_records_archive_location(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();
    ProjectRepo::set_logs_key(&pool, "demo-1", "logs/demo-1.ndjson")
        .await
        .unwrap();

    let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.logs_s3_key.as_deref(), Some("logs/demo-1.ndjson"));
}

#[sqlx::test(migrations = "./migrations")]
async fn set_last_commit_keeps_message_when_absent(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();

    ProjectRepo::set_last_commit(&pool, "demo-1", "def456", None)
        .await
        .unwrap();

    let project = ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.last_commit_hash.as_deref(), Some("def456"));
    assert_eq!(
        project.last_commit_message.as_deref(),
        Some("initial commit"),
    );
}

// ---------------------------------------------------------------------------
// Listing, settings, deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn list_by_owner_filters_other_users(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("mine-1"))
        .await
        .unwrap()
        .unwrap();
    let mut other = new_upsert("theirs-1");
    other.owner_user_id = 2;
    ProjectRepo::upsert_for_launch(&pool, &other).await.unwrap().unwrap();

    let mine = ProjectRepo::list_by_owner(&pool, 1).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].project_id, "mine-1");
}

#[sqlx::test(migrations = "./migrations")]
async fn auto_redeploy_toggle_stores_and_clears_secret(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();

    let enabled = ProjectRepo::set_auto_redeploy(&pool, "demo-1", true, Some("hook-9"), Some("s3cret"))
        .await
        .unwrap()
        .unwrap();
    assert!(enabled.auto_redeploy);
    assert_eq!(enabled.webhook_id.as_deref(), Some("hook-9"));
    assert_eq!(enabled.webhook_secret.as_deref(), Some("s3cret"));

    let disabled = ProjectRepo::set_auto_redeploy(&pool, "demo-1", false, None, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!disabled.auto_redeploy);
    assert!(disabled.webhook_id.is_none());
    assert!(disabled.webhook_secret.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_removes_row(pool: PgPool) {
    ProjectRepo::upsert_for_launch(&pool, &new_upsert("demo-1"))
        .await
        .unwrap()
        .unwrap();

    assert!(ProjectRepo::delete(&pool, "demo-1").await.unwrap());
    assert!(!ProjectRepo::delete(&pool, "demo-1").await.unwrap());
    assert!(ProjectRepo::find_by_project_id(&pool, "demo-1")
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Git credentials
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn credential_upsert_and_lookup(pool: PgPool) {
    assert!(GitCredentialRepo::find_token(&pool, 1, "github")
        .await
        .unwrap()
        .is_none());

    GitCredentialRepo::upsert(&pool, 1, "github", "ghp_first")
        .await
        .unwrap();
    GitCredentialRepo::upsert(&pool, 1, "github", "ghp_second")
        .await
        .unwrap();

    let token = GitCredentialRepo::find_token(&pool, 1, "github")
        .await
        .unwrap();
    assert_eq!(token.as_deref(), Some("ghp_second"));
}
