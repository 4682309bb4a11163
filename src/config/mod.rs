//! Configuration: defaults, optional TOML file, environment overrides

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::github::GITHUB_API_URL;
use crate::storage::StorageConfig;

/// Rolling window in days applied when neither config nor caller says
/// otherwise.
pub const DEFAULT_DAYS: i64 = 7;
/// Default cap on stored and analyzed events per (repository, event type).
pub const DEFAULT_EVENT_LIMIT: u64 = 500;
/// Default page budget per repository per fetch run.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Default port for the stats API.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    /// Bearer token for authenticated requests; unauthenticated works but
    /// is rate-limited hard by GitHub.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum pages to fetch per repository per run.
    pub page_limit: u32,
    /// Rolling window in days, bounding both ingestion and analysis.
    pub days: i64,
    /// Maximum events per (repository, event type): the ingestion cap and
    /// the analysis budget.
    pub event_limit: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            days: DEFAULT_DAYS,
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    /// Load configuration: the given file, or `repowatch.toml` in the
    /// working directory when present, or defaults. Environment overrides
    /// are merged last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new("repowatch.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.merge_env_vars();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Environment variables win over the config file.
    pub fn merge_env_vars(&mut self) {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Ok(api_url) = std::env::var("REPOWATCH_API_URL") {
            self.github.api_url = api_url;
        }
        if let Ok(data_dir) = std::env::var("REPOWATCH_DATA_DIR") {
            self.storage.data_dir = Some(data_dir.into());
        }
    }
}
