use thiserror::Error;

use crate::storage::StoreError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-200 response from the GitHub API, scoped to a single repository.
    /// 404/422 are not errors; they signal end-of-data and never reach here.
    #[error("GitHub API error ({status}) for {repo}")]
    GitHubStatus { status: u16, repo: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
