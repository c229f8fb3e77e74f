//! Stored third-party Git access token model.

use sqlx::FromRow;
use slipway_core::types::{DbId, Timestamp};

/// A row from the `git_credentials` table.
///
/// Tokens are consumed read-only by the deploy launcher; this struct is
/// deliberately not `Serialize` so a token can never leak into an API
/// response.
#[derive(Debug, Clone, FromRow)]
pub struct GitCredential {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub access_token: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
