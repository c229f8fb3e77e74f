//! JWT access-token validation.
//!
//! Authentication itself (login, token issuance, OAuth) lives in a
//! separate identity service; this server only consumes HS256 tokens
//! whose claims identify the principal. [`generate_access_token`] exists
//! for tests and tooling.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use slipway_core::types::DbId;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Display name, snapshotted onto projects the user creates.
    pub name: String,
    /// Email, snapshotted onto projects the user creates.
    pub email: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for revocation / audit.
    pub jti: String,
}

/// Configuration for JWT validation (and test-token generation).
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS` | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
        }
    }
}

/// Generate an HS256 access token for the given principal.
pub fn generate_access_token(
    user_id: DbId,
    name: &str,
    email: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        email: email.to_string(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate a token and return its claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 60,
        }
    }

    #[test]
    fn round_trips_claims() {
        let token = generate_access_token(7, "Ada", "ada@example.com", &config()).unwrap();
        let claims = validate_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = generate_access_token(7, "Ada", "ada@example.com", &config()).unwrap();
        let other = JwtConfig {
            secret: "other-secret".to_string(),
            access_token_expiry_mins: 60,
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let expired = JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: -10,
        };
        let token = generate_access_token(7, "Ada", "ada@example.com", &expired).unwrap();
        assert!(validate_token(&token, &config()).is_err());
    }
}
