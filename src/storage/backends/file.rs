//! JSON-file storage backend
//!
//! Tables live as JSON documents under the data directory: `repos.json`,
//! `event_types.json` and one `events/<slug>.json` per repository. The full
//! state is loaded at open; each mutation rewrites the affected document
//! through a temp-file rename, so a concurrent reader sees the old or the
//! new document, never a partial one. A single writing process is assumed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::traits::{EventStore, RepositoryStore};
use crate::storage::types::{Event, EventType, Repository};

use super::state::State;

/// File-backed storage backend.
pub struct FileStore {
    base_dir: PathBuf,
    state: RwLock<State>,
}

impl FileStore {
    /// Open the store rooted at `base_dir`, creating it when missing.
    pub async fn open(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(base_dir.join("events")).await?;

        let repos: Vec<Repository> = read_json_or_default(&base_dir.join("repos.json")).await?;
        let event_types: Vec<EventType> =
            read_json_or_default(&base_dir.join("event_types.json")).await?;
        let mut events = HashMap::new();
        for repo in &repos {
            let stored: Vec<Event> =
                read_json_or_default(&events_path(&base_dir, &repo.slug)).await?;
            if !stored.is_empty() {
                events.insert(repo.id, stored);
            }
        }
        let state = State {
            repos,
            event_types,
            events,
        };

        debug!(
            dir = %base_dir.display(),
            repos = state.repos.len(),
            event_types = state.event_types.len(),
            "opened file store"
        );
        Ok(Self {
            base_dir,
            state: RwLock::new(state),
        })
    }

    fn repos_path(&self) -> PathBuf {
        self.base_dir.join("repos.json")
    }

    fn event_types_path(&self) -> PathBuf {
        self.base_dir.join("event_types.json")
    }
}

fn events_path(base_dir: &Path, slug: &str) -> PathBuf {
    base_dir.join("events").join(format!("{slug}.json"))
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> StoreResult<T> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Write through a temp file and rename, so readers observe the old or the
/// new document and nothing in between.
async fn write_json<T: Serialize>(path: &Path, data: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl RepositoryStore for FileStore {
    async fn add_repository(
        &self,
        name: &str,
        gh_repo_id: i64,
        active: bool,
    ) -> StoreResult<Repository> {
        let mut state = self.state.write().await;
        let repo = state.add_repository(name, gh_repo_id, active)?;
        write_json(&self.repos_path(), &state.repos).await?;
        Ok(repo)
    }

    async fn list_repositories(&self, active_only: bool) -> StoreResult<Vec<Repository>> {
        Ok(self.state.read().await.list_repositories(active_only))
    }

    async fn get_repository(&self, slug: &str) -> StoreResult<Option<Repository>> {
        Ok(self.state.read().await.get_repository(slug))
    }

    async fn remove_repository(&self, slug: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let removed = state.remove_repository(slug)?;
        write_json(&self.repos_path(), &state.repos).await?;

        match fs::remove_file(events_path(&self.base_dir, &removed.slug)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[async_trait]
impl EventStore for FileStore {
    async fn get_or_create_event_type(&self, name: &str) -> StoreResult<EventType> {
        let mut state = self.state.write().await;
        let (event_type, created) = state.get_or_create_event_type(name);
        if created {
            write_json(&self.event_types_path(), &state.event_types).await?;
        }
        Ok(event_type)
    }

    async fn event_exists(
        &self,
        repo_id: u64,
        event_type: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.state.read().await.event_exists(repo_id, event_type, created_at))
    }

    async fn count_events(&self, repo_id: u64, event_type_id: u64) -> StoreResult<u64> {
        Ok(self.state.read().await.count_events(repo_id, event_type_id))
    }

    async fn insert_event(
        &self,
        repo_id: u64,
        event_type_id: u64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.insert_event(repo_id, event_type_id, created_at)?;

        let slug = state
            .repos
            .iter()
            .find(|r| r.id == repo_id)
            .map(|r| r.slug.clone())
            .ok_or_else(|| StoreError::NotFound(format!("repository id {repo_id}")))?;
        let events = state.events.get(&repo_id).cloned().unwrap_or_default();
        write_json(&events_path(&self.base_dir, &slug), &events).await
    }

    async fn events_in_window(
        &self,
        repo_id: u64,
        event_type_id: u64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        Ok(self.state.read().await.events_in_window(repo_id, event_type_id, since))
    }

    async fn event_types_active_since(
        &self,
        repo_id: u64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<EventType>> {
        Ok(self.state.read().await.event_types_active_since(repo_id, since))
    }
}
