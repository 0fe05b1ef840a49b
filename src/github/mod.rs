pub mod cache;
pub mod client;
pub mod types;

pub use client::UpstreamClient;
pub use types::{Commit, PullRequest, PullRequestDetail};

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid GitHub API base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Where the aggregator gets pull requests and their commits from.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, ApiError>;

    async fn list_pull_request_commits(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> Result<Vec<Commit>, ApiError>;
}

/// The GitHub REST API, reached through one shared [`UpstreamClient`].
pub struct GitHubApi {
    client: UpstreamClient,
    base_url: Url,
}

impl GitHubApi {
    pub fn new(config: &GitHubConfig, token: &str) -> Result<Self, GitHubError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|_| GitHubError::InvalidBaseUrl(config.api_base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidBaseUrl(config.api_base_url.clone()));
        }

        Ok(Self {
            client: UpstreamClient::new(config, token)?,
            base_url,
        })
    }

    #[cfg(test)]
    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// `{base}/repos/{owner}/{repo}/pulls?state=open`
    pub fn open_pulls_url(&self, owner: &str, repo: &str) -> String {
        let mut url = self.endpoint(&["repos", owner, repo, "pulls"]);
        url.set_query(Some("state=open"));
        url.into()
    }

    /// `{base}/repos/{owner}/{repo}/pulls/{number}/commits`
    pub fn pull_commits_url(&self, owner: &str, repo: &str, pull_number: u64) -> String {
        let number = pull_number.to_string();
        self.endpoint(&["repos", owner, repo, "pulls", &number, "commits"])
            .into()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in new(): the base can carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl PullRequestSource for GitHubApi {
    #[instrument(skip(self))]
    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let url = self.open_pulls_url(owner, repo);
        let pulls: Vec<PullRequest> = self.client.fetch_json(&url).await?;
        debug!(count = pulls.len(), "listed open pull requests");
        Ok(pulls)
    }

    #[instrument(skip(self))]
    async fn list_pull_request_commits(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> Result<Vec<Commit>, ApiError> {
        let url = self.pull_commits_url(owner, repo, pull_number);
        let commits: Vec<Commit> = self.client.fetch_json(&url).await?;
        debug!(count = commits.len(), "listed pull request commits");
        Ok(commits)
    }
}
