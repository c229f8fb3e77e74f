//! Webhook secret generation and payload authenticity checks.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the API layer and any future CLI tooling. GitHub deliveries are
//! verified with an HMAC-SHA256 signature over the raw body; GitLab
//! deliveries carry the shared secret verbatim in a header. Both checks
//! compare in constant time.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated per-project webhook secret.
pub const WEBHOOK_SECRET_LENGTH: usize = 40;

/// Generate a random alphanumeric webhook secret.
///
/// Stored on the project row and shown to the user exactly once when
/// auto-redeploy is enabled.
pub fn generate_webhook_secret() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(WEBHOOK_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// Verify a GitHub `X-Hub-Signature-256` header against the raw body.
///
/// The header has the form `sha256=<hex digest>`. Returns `false` for a
/// malformed header, a wrong-length digest, or a digest mismatch.
pub fn verify_github_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix("sha256=") else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(expected.as_bytes(), hex_digest.as_bytes())
}

/// Verify a GitLab `X-Gitlab-Token` header.
///
/// GitLab sends the shared secret verbatim; equality is still checked in
/// constant time so the comparison leaks nothing about the stored value.
pub fn verify_gitlab_token(secret: &str, token_header: &str) -> bool {
    constant_time_eq(secret.as_bytes(), token_header.as_bytes())
}

/// Constant-time byte comparison.
///
/// The accumulator visits every byte regardless of where the first
/// difference occurs. Length is checked first; the length of a hex
/// digest is not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compute a valid GitHub-style header for a body, for use in tests.
    fn sign_github(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn github_signature_round_trip() {
        let body = br#"{"ref":"refs/heads/main","after":"abc123"}"#;
        let header = sign_github("s3cret", body);
        assert!(verify_github_signature("s3cret", body, &header));
    }

    #[test]
    fn github_signature_rejects_wrong_secret() {
        let body = b"payload";
        let header = sign_github("s3cret", body);
        assert!(!verify_github_signature("other", body, &header));
    }

    #[test]
    fn github_signature_rejects_tampered_body() {
        let header = sign_github("s3cret", b"payload");
        assert!(!verify_github_signature("s3cret", b"payload2", &header));
    }

    #[test]
    fn github_signature_rejects_malformed_header() {
        assert!(!verify_github_signature("s3cret", b"payload", "sha1=abcdef"));
        assert!(!verify_github_signature("s3cret", b"payload", "sha256="));
        assert!(!verify_github_signature("s3cret", b"payload", ""));
    }

    #[test]
    fn gitlab_token_equality() {
        assert!(verify_gitlab_token("tok-1", "tok-1"));
        assert!(!verify_gitlab_token("tok-1", "tok-2"));
        assert!(!verify_gitlab_token("tok-1", "tok-11"));
    }

    #[test]
    fn generated_secrets_are_distinct_and_sized() {
        let a = generate_webhook_secret();
        let b = generate_webhook_secret();
        assert_eq!(a.len(), WEBHOOK_SECRET_LENGTH);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
