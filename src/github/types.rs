use serde::{Deserialize, Serialize};

/// A GitHub user as embedded in pull request payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

/// An open pull request as listed by the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// Globally unique id
    pub id: u64,
    /// Number within the repository
    pub number: u64,
    pub title: String,
    pub user: User,
}

/// A commit on a pull request. Only the count is used, so only the sha is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    /// Commit hash
    #[allow(dead_code)]
    pub sha: String,
}

/// A pull request joined with its commit count, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestDetail {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub commit_count: usize,
}

impl PullRequestDetail {
    pub fn new(pr: PullRequest, commit_count: usize) -> Self {
        Self {
            id: pr.id,
            number: pr.number,
            title: pr.title,
            author: pr.user.login,
            commit_count,
        }
    }
}
