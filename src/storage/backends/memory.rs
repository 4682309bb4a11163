//! In-memory storage backend for tests and ephemeral runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::storage::error::StoreResult;
use crate::storage::traits::{EventStore, RepositoryStore};
use crate::storage::types::{EventType, Repository};

use super::state::State;

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn add_repository(
        &self,
        name: &str,
        gh_repo_id: i64,
        active: bool,
    ) -> StoreResult<Repository> {
        self.state.write().await.add_repository(name, gh_repo_id, active)
    }

    async fn list_repositories(&self, active_only: bool) -> StoreResult<Vec<Repository>> {
        Ok(self.state.read().await.list_repositories(active_only))
    }

    async fn get_repository(&self, slug: &str) -> StoreResult<Option<Repository>> {
        Ok(self.state.read().await.get_repository(slug))
    }

    async fn remove_repository(&self, slug: &str) -> StoreResult<()> {
        self.state.write().await.remove_repository(slug).map(|_| ())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn get_or_create_event_type(&self, name: &str) -> StoreResult<EventType> {
        // Single write section keeps insert-if-absent atomic.
        Ok(self.state.write().await.get_or_create_event_type(name).0)
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
        self.state.write().await.insert_event(repo_id, event_type_id, created_at)
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::storage::error::StoreError;

    use super::*;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn duplicate_repository_registration_is_rejected() {
        let store = MemoryStore::new();
        store.add_repository("octocat/Hello-World", 1296269, true).await.unwrap();

        let by_name = store.add_repository("octocat/Hello-World", 99, true).await;
        assert!(matches!(by_name, Err(StoreError::Conflict(_))));

        let by_id = store.add_repository("other/repo", 1296269, true).await;
        assert!(matches!(by_id, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_repositories_filters_inactive() {
        let store = MemoryStore::new();
        store.add_repository("a/one", 1, true).await.unwrap();
        store.add_repository("b/two", 2, false).await.unwrap();

        assert_eq!(store.list_repositories(true).await.unwrap().len(), 1);
        assert_eq!(store.list_repositories(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_repository_is_rejected_while_events_exist() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        store.insert_event(repo.id, push.id, ts(0)).await.unwrap();

        let result = store.remove_repository(&repo.slug).await;
        assert!(matches!(result, Err(StoreError::Protected(_))));

        // Still present afterwards.
        assert!(store.get_repository(&repo.slug).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_repository_without_events_succeeds() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        store.remove_repository(&repo.slug).await.unwrap();
        assert!(store.get_repository(&repo.slug).await.unwrap().is_none());

        let missing = store.remove_repository("nosuch").await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn insert_event_rejects_duplicate_triple() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        let push = store.get_or_create_event_type("PushEvent").await.unwrap();

        store.insert_event(repo.id, push.id, ts(0)).await.unwrap();
        let dup = store.insert_event(repo.id, push.id, ts(0)).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        // Same timestamp under a different type is a different triple.
        let issues = store.get_or_create_event_type("IssuesEvent").await.unwrap();
        store.insert_event(repo.id, issues.id, ts(0)).await.unwrap();
    }

    #[tokio::test]
    async fn event_exists_is_false_before_the_type_exists() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        assert!(!store.event_exists(repo.id, "PushEvent", ts(0)).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_get_or_create_resolves_to_one_type() {
        let store = Arc::new(MemoryStore::new());
        let (a, b) = tokio::join!(
            {
                let store = store.clone();
                async move { store.get_or_create_event_type("PushEvent").await }
            },
            {
                let store = store.clone();
                async move { store.get_or_create_event_type("PushEvent").await }
            },
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);
    }

    #[tokio::test]
    async fn events_in_window_is_most_recent_first_and_bounded() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        let push = store.get_or_create_event_type("PushEvent").await.unwrap();

        // Inserted out of order on purpose.
        for minute in [3, 1, 5, 2] {
            store.insert_event(repo.id, push.id, ts(minute)).await.unwrap();
        }

        let window = store.events_in_window(repo.id, push.id, ts(2)).await.unwrap();
        assert_eq!(window, vec![ts(5), ts(3), ts(2)]);

        let empty = store
            .events_in_window(repo.id, push.id, ts(5) + Duration::seconds(1))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn event_types_active_since_skips_stale_types() {
        let store = MemoryStore::new();
        let repo = store.add_repository("a/one", 1, true).await.unwrap();
        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        let issues = store.get_or_create_event_type("IssuesEvent").await.unwrap();

        store.insert_event(repo.id, push.id, ts(10)).await.unwrap();
        store.insert_event(repo.id, issues.id, ts(0)).await.unwrap();

        let active = store.event_types_active_since(repo.id, ts(5)).await.unwrap();
        assert_eq!(active, vec![push]);
    }
}
