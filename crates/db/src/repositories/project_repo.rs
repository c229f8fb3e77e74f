//! Repository for the `projects` table.
//!
//! The launcher, the log stream pump, and the webhook/settings routes all
//! write here. Each path touches disjoint or monotonically-advancing
//! fields; the only guarded write is [`ProjectRepo::upsert_for_launch`],
//! which doubles as the per-project launch lease.

use sqlx::PgPool;
use slipway_core::types::DbId;

use crate::models::project::{Project, ProjectStatus, UpsertProject};

/// Column list for `projects` queries.
const COLUMNS: &str = "\
    id, project_id, git_repository_url, deploy_url, status, \
    last_commit_hash, last_commit_message, logs_s3_key, \
    install_cmd, build_cmd, build_root, \
    owner_user_id, owner_name, owner_email, \
    auto_redeploy, webhook_id, webhook_secret, \
    created_at, updated_at";

/// A `queued` row older than this is considered abandoned (submission
/// crashed before reaching the remote platform) and may be re-launched.
const QUEUED_LEASE_SECS: i64 = 120;

/// A `running` row older than this is considered orphaned (no pump ever
/// observed the task stop) and may be re-launched.
const RUNNING_LEASE_SECS: i64 = 1800;

/// Provides persistence operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Upsert a project at launch time, resetting it to `queued`.
    ///
    /// This write happens before the remote task is submitted so a record
    /// always exists even if submission later fails. The `ON CONFLICT`
    /// guard is the launch lease: when the existing row is already
    /// `queued`/`running` and fresh, no update happens and `None` is
    /// returned -- the caller must refuse to start a duplicate task.
    ///
    /// `deploy_url` is written only on insert; it is never re-derived for
    /// an existing project.
    pub async fn upsert_for_launch(
        pool: &PgPool,
        input: &UpsertProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects \
                 (project_id, git_repository_url, deploy_url, status, \
                  last_commit_hash, last_commit_message, \
                  install_cmd, build_cmd, build_root, \
                  owner_user_id, owner_name, owner_email) \
             VALUES ($1, $2, $3, 'queued', $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (project_id) DO UPDATE SET \
                 git_repository_url = EXCLUDED.git_repository_url, \
                 status = 'queued', \
                 last_commit_hash = EXCLUDED.last_commit_hash, \
                 last_commit_message = EXCLUDED.last_commit_message, \
                 logs_s3_key = NULL, \
                 install_cmd = EXCLUDED.install_cmd, \
                 build_cmd = EXCLUDED.build_cmd, \
                 build_root = EXCLUDED.build_root, \
                 owner_user_id = EXCLUDED.owner_user_id, \
                 owner_name = EXCLUDED.owner_name, \
                 owner_email = EXCLUDED.owner_email \
             WHERE projects.status NOT IN ('queued', 'running') \
                OR (projects.status = 'queued' \
                    AND projects.updated_at < NOW() - INTERVAL '{QUEUED_LEASE_SECS} seconds') \
                OR (projects.status = 'running' \
                    AND projects.updated_at < NOW() - INTERVAL '{RUNNING_LEASE_SECS} seconds') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.project_id)
            .bind(&input.git_repository_url)
            .bind(&input.deploy_url)
            .bind(&input.last_commit_hash)
            .bind(&input.last_commit_message)
            .bind(&input.install_cmd)
            .bind(&input.build_cmd)
            .bind(&input.build_root)
            .bind(input.owner_user_id)
            .bind(&input.owner_name)
            .bind(&input.owner_email)
            .fetch_optional(pool)
            .await
    }

    /// Set the lifecycle status of a project.
    ///
    /// Callers treat this as best-effort bookkeeping: the remote task
    /// keeps running regardless of whether this write succeeds.
    pub async fn set_status(
        pool: &PgPool,
        project_id: &str,
        status: ProjectStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET status = $2 WHERE project_id = $1")
            .bind(project_id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record the storage key of a successfully archived build log.
    pub async fn set_logs_key(
        pool: &PgPool,
        project_id: &str,
        logs_s3_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET logs_s3_key = $2 WHERE project_id = $1")
            .bind(project_id)
            .bind(logs_s3_key)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record the most recently deployed commit.
    pub async fn set_last_commit(
        pool: &PgPool,
        project_id: &str,
        hash: &str,
        message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE projects SET \
                 last_commit_hash = $2, \
                 last_commit_message = COALESCE($3, last_commit_message) \
             WHERE project_id = $1",
        )
        .bind(project_id)
        .bind(hash)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a project by its user-chosen id.
    pub async fn find_by_project_id(
        pool: &PgPool,
        project_id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE project_id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects owned by a user, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_user_id: DbId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE owner_user_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_user_id)
            .fetch_all(pool)
            .await
    }

    /// Enable or disable auto-redeploy.
    ///
    /// Enabling stores the freshly generated webhook secret (and the
    /// provider-side hook id when known); disabling clears both.
    pub async fn set_auto_redeploy(
        pool: &PgPool,
        project_id: &str,
        enabled: bool,
        webhook_id: Option<&str>,
        webhook_secret: Option<&str>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                 auto_redeploy = $2, \
                 webhook_id = $3, \
                 webhook_secret = $4 \
             WHERE project_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .bind(enabled)
            .bind(webhook_id)
            .bind(webhook_secret)
            .fetch_optional(pool)
            .await
    }

    /// Delete a project record.
    ///
    /// Returns `true` if a row was removed. The archived log blob, if
    /// any, is left in object storage.
    pub async fn delete(pool: &PgPool, project_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(project_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
