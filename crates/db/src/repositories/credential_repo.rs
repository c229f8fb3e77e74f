//! Repository for the `git_credentials` table.

use sqlx::PgPool;
use slipway_core::types::DbId;

use crate::models::credential::GitCredential;

/// Column list for `git_credentials` queries.
const COLUMNS: &str = "id, user_id, provider, access_token, created_at, updated_at";

/// Provides access to stored third-party Git tokens.
pub struct GitCredentialRepo;

impl GitCredentialRepo {
    /// Fetch a user's stored access token for a provider, if any.
    pub async fn find_token(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT access_token FROM git_credentials \
             WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(token,)| token))
    }

    /// Insert or replace a user's token for a provider.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        access_token: &str,
    ) -> Result<GitCredential, sqlx::Error> {
        let query = format!(
            "INSERT INTO git_credentials (user_id, provider, access_token) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, provider) DO UPDATE SET \
                 access_token = EXCLUDED.access_token \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GitCredential>(&query)
            .bind(user_id)
            .bind(provider)
            .bind(access_token)
            .fetch_one(pool)
            .await
    }
}
