//! Project naming rules and derived addresses.
//!
//! The project id doubles as a DNS subdomain label and as the remote
//! task's started-by tag, so it is validated as a strict DNS label once
//! at creation time and never normalised afterwards.

use crate::error::CoreError;

/// Maximum length of a DNS label (RFC 1035).
pub const MAX_PROJECT_ID_LENGTH: usize = 63;

/// Validate a user-chosen project id.
///
/// Accepts lowercase ASCII alphanumerics and hyphens, 1-63 characters,
/// no leading or trailing hyphen. Anything else is rejected so the id
/// can be used verbatim as a subdomain label.
pub fn validate_project_id(project_id: &str) -> Result<(), CoreError> {
    if project_id.is_empty() || project_id.len() > MAX_PROJECT_ID_LENGTH {
        return Err(CoreError::Validation(format!(
            "project_id must be 1-{MAX_PROJECT_ID_LENGTH} characters"
        )));
    }

    if project_id.starts_with('-') || project_id.ends_with('-') {
        return Err(CoreError::Validation(
            "project_id must not start or end with a hyphen".into(),
        ));
    }

    if !project_id
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(CoreError::Validation(
            "project_id may only contain lowercase letters, digits, and hyphens".into(),
        ));
    }

    Ok(())
}

/// Derive the public deployment URL for a project.
///
/// Computed once at creation time from the configured application domain
/// and stored on the project row; it is never re-derived afterwards.
pub fn deploy_url(project_id: &str, app_domain: &str) -> String {
    format!("https://{project_id}.{app_domain}")
}

/// Storage key of a project's archived build log.
///
/// One object per project; each redeploy overwrites the previous archive.
pub fn archive_key(project_id: &str) -> String {
    format!("logs/{project_id}.ndjson")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_ids() {
        assert!(validate_project_id("demo-1").is_ok());
        assert!(validate_project_id("a").is_ok());
        assert!(validate_project_id("my-app-2024").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_project_id("").is_err());
        assert!(validate_project_id(&"a".repeat(64)).is_err());
        assert!(validate_project_id(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn rejects_uppercase_and_special_characters() {
        assert!(validate_project_id("Demo").is_err());
        assert!(validate_project_id("my_app").is_err());
        assert!(validate_project_id("my.app").is_err());
        assert!(validate_project_id("my app").is_err());
    }

    #[test]
    fn rejects_edge_hyphens() {
        assert!(validate_project_id("-demo").is_err());
        assert!(validate_project_id("demo-").is_err());
        assert!(validate_project_id("de-mo").is_ok());
    }

    #[test]
    fn deploy_url_embeds_project_and_domain() {
        assert_eq!(
            deploy_url("demo-1", "apps.example.com"),
            "https://demo-1.apps.example.com"
        );
    }

    #[test]
    fn archive_key_is_deterministic() {
        assert_eq!(archive_key("demo-1"), "logs/demo-1.ndjson");
        assert_eq!(archive_key("demo-1"), archive_key("demo-1"));
    }
}
