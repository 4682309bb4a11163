//! Trait definitions for the monitor storage layer

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::types::{EventType, Repository};

/// Repository registry operations.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Register a repository. Fails with `Conflict` when the name, slug or
    /// GitHub id is already taken.
    async fn add_repository(
        &self,
        name: &str,
        gh_repo_id: i64,
        active: bool,
    ) -> StoreResult<Repository>;

    async fn list_repositories(&self, active_only: bool) -> StoreResult<Vec<Repository>>;

    async fn get_repository(&self, slug: &str) -> StoreResult<Option<Repository>>;

    /// Remove a repository. Rejected with `Protected` while events for it
    /// exist; events are never cascaded.
    async fn remove_repository(&self, slug: &str) -> StoreResult<()>;
}

/// Append-only event persistence keyed by (repository, event type,
/// created_at).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert-if-absent resolution of an event type tag. Atomic: concurrent
    /// callers observing the same new tag resolve to a single row.
    async fn get_or_create_event_type(&self, name: &str) -> StoreResult<EventType>;

    /// Whether an event with this exact triple is already stored. Keyed by
    /// the tag string so the check works before the type row exists.
    async fn event_exists(
        &self,
        repo_id: u64,
        event_type: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn count_events(&self, repo_id: u64, event_type_id: u64) -> StoreResult<u64>;

    /// Append one event. Fails with `Conflict` when the triple already
    /// exists; callers check `event_exists` first and treat this as a
    /// backstop.
    async fn insert_event(
        &self,
        repo_id: u64,
        event_type_id: u64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Timestamps of events since `since`, most recent first.
    async fn events_in_window(
        &self,
        repo_id: u64,
        event_type_id: u64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>>;

    /// Event types with at least one event for the repository since `since`.
    async fn event_types_active_since(
        &self,
        repo_id: u64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<EventType>>;
}

/// Unified storage interface consumed by the engine, the analyzer and the
/// CLI/HTTP surfaces.
pub trait MonitorStore: RepositoryStore + EventStore {}

impl<T: RepositoryStore + EventStore> MonitorStore for T {}
