//! Stateless GitHub API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size cap of the events feed; a page shorter than this is the
/// terminal page.
pub const PAGE_SIZE: usize = 100;

/// One raw record from the events feed. Fields the payload omits arrive as
/// `None`; all other payload fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub created_at: Option<String>,
}

/// Outcome of fetching one page of the feed.
#[derive(Debug)]
pub enum PageOutcome {
    /// Records in the feed's native order: newest first by GitHub's
    /// convention, not independently verified.
    Page(Vec<RawEvent>),
    /// 404/422: no more usable data for this repository. Not an error.
    EndOfData,
}

/// Repository metadata used by the registration flow.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRepo {
    pub id: i64,
    pub full_name: String,
}

/// Read access to the GitHub events feed.
#[async_trait]
pub trait GitHubFeed: Send + Sync {
    /// Fetch one page of events for a repository. Any non-200 status other
    /// than 404/422 is a hard failure scoped to that repository.
    async fn fetch_page(&self, repo_name: &str, page: u32) -> Result<PageOutcome>;

    /// Resolve repository metadata (numeric id) by full name.
    async fn fetch_repository(&self, repo_name: &str) -> Result<RemoteRepo>;
}

pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client against `base_url` (normally [`GITHUB_API_URL`]),
    /// sending a bearer token when one is configured.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        // GitHub rejects requests without a User-Agent.
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "repowatch");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        request
    }
}

#[async_trait]
impl GitHubFeed for GitHubClient {
    async fn fetch_page(&self, repo_name: &str, page: u32) -> Result<PageOutcome> {
        let url = format!(
            "{}/repos/{}/events?per_page={}&page={}",
            self.base_url, repo_name, PAGE_SIZE, page
        );
        debug!(repo = repo_name, page, "fetching events page");

        let response = self.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(PageOutcome::Page(response.json().await?)),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => Ok(PageOutcome::EndOfData),
            status => Err(Error::GitHubStatus {
                status: status.as_u16(),
                repo: repo_name.to_string(),
            }),
        }
    }

    async fn fetch_repository(&self, repo_name: &str) -> Result<RemoteRepo> {
        let url = format!("{}/repos/{}", self.base_url, repo_name);
        let response = self.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(Error::GitHubStatus {
                status: status.as_u16(),
                repo: repo_name.to_string(),
            }),
        }
    }
}
