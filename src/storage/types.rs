//! Domain types owned by the storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub repository being monitored.
///
/// Created by the registration flow; read-only to ingestion and analysis.
/// `name`, `slug` and `gh_repo_id` are each unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    /// Full name, e.g. "octocat/Hello-World".
    pub name: String,
    /// URL-safe key derived from the name.
    pub slug: String,
    /// GitHub's numeric repository id.
    pub gh_repo_id: i64,
    pub active: bool,
}

/// Distinct GitHub event type (e.g. PushEvent, PullRequestEvent).
/// Created lazily the first time a tag is observed during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: u64,
    pub name: String,
}

/// A stored event. Carries GitHub's original timestamp, not the time of
/// saving. Identified by its (repository, event type, created_at) triple;
/// there is no synthetic id. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub repo_id: u64,
    pub event_type_id: u64,
    pub created_at: DateTime<Utc>,
}

/// Derive the unique URL-safe key for a repository name: lowercase,
/// alphanumerics kept, everything else dropped.
/// "tiangolo/fastapi" becomes "tiangolofastapi".
pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
