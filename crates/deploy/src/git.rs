//! Best-effort commit metadata lookup from the Git provider.
//!
//! Only GitHub URLs are recognised; anything else yields `Ok(None)` and
//! the project keeps null commit metadata. Callers treat every error
//! here as non-fatal.

use serde::Deserialize;

/// Head commit metadata for a repository.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
}

/// Errors from the Git provider lookup.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Git provider returned status {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct CommitSummary {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

/// Extract `owner/repo` from a GitHub repository URL.
///
/// Handles `https://github.com/owner/repo`, an optional `.git` suffix,
/// and the `git@github.com:owner/repo.git` SSH form. Returns `None` for
/// any other host.
pub fn github_repo_path(repo_url: &str) -> Option<String> {
    let rest = repo_url
        .strip_prefix("https://github.com/")
        .or_else(|| repo_url.strip_prefix("http://github.com/"))
        .or_else(|| repo_url.strip_prefix("git@github.com:"))?;

    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let rest = rest.trim_end_matches('/');

    let mut segments = rest.split('/');
    let owner = segments.next()?;
    let repo = segments.next()?;
    if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
        return None;
    }

    Some(format!("{owner}/{repo}"))
}

/// Fetch the latest commit for a repository.
///
/// Uses the stored access token when present so private repositories
/// resolve too. `Ok(None)` means the URL is not a recognised GitHub
/// repository; errors are for the caller to log and ignore.
pub async fn fetch_latest_commit(
    http: &reqwest::Client,
    repo_url: &str,
    access_token: Option<&str>,
) -> Result<Option<CommitInfo>, GitError> {
    let Some(path) = github_repo_path(repo_url) else {
        return Ok(None);
    };

    let mut request = http
        .get(format!("https://api.github.com/repos/{path}/commits?per_page=1"))
        .header("User-Agent", "slipway")
        .header("Accept", "application/vnd.github+json");
    if let Some(token) = access_token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(GitError::Status(response.status().as_u16()));
    }

    let commits: Vec<CommitSummary> = response.json().await?;
    Ok(commits.into_iter().next().map(|c| CommitInfo {
        hash: c.sha,
        message: c.commit.message,
    }))
}
