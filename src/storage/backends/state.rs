//! Shared table representation used by the storage backends
//!
//! Backends wrap `State` in a lock; the file backend additionally persists
//! affected tables after each mutation. All mutations uphold the store
//! invariants: unique repository name/slug/id, unique event-type name,
//! unique (repository, event type, created_at) triple, and protect-on-delete
//! for repositories that still have events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::types::{slugify, Event, EventType, Repository};

#[derive(Debug, Default)]
pub(crate) struct State {
    pub repos: Vec<Repository>,
    pub event_types: Vec<EventType>,
    /// Events per repository id, in insertion order.
    pub events: HashMap<u64, Vec<Event>>,
}

impl State {
    pub fn add_repository(
        &mut self,
        name: &str,
        gh_repo_id: i64,
        active: bool,
    ) -> StoreResult<Repository> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(StoreError::Conflict(format!(
                "repository name '{name}' produces an empty slug"
            )));
        }
        if self
            .repos
            .iter()
            .any(|r| r.name == name || r.slug == slug || r.gh_repo_id == gh_repo_id)
        {
            return Err(StoreError::Conflict(format!(
                "repository '{name}' (GitHub id {gh_repo_id}) is already registered"
            )));
        }

        let id = self.repos.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let repo = Repository {
            id,
            name: name.to_string(),
            slug,
            gh_repo_id,
            active,
        };
        self.repos.push(repo.clone());
        Ok(repo)
    }

    pub fn list_repositories(&self, active_only: bool) -> Vec<Repository> {
        self.repos
            .iter()
            .filter(|r| r.active || !active_only)
            .cloned()
            .collect()
    }

    pub fn get_repository(&self, slug: &str) -> Option<Repository> {
        self.repos.iter().find(|r| r.slug == slug).cloned()
    }

    pub fn remove_repository(&mut self, slug: &str) -> StoreResult<Repository> {
        let index = self
            .repos
            .iter()
            .position(|r| r.slug == slug)
            .ok_or_else(|| StoreError::NotFound(format!("repository '{slug}'")))?;

        let id = self.repos[index].id;
        if self.events.get(&id).is_some_and(|events| !events.is_empty()) {
            return Err(StoreError::Protected(format!(
                "repository '{slug}' still has stored events"
            )));
        }

        self.events.remove(&id);
        Ok(self.repos.remove(index))
    }

    /// Insert-if-absent. Returns the type and whether it was created.
    pub fn get_or_create_event_type(&mut self, name: &str) -> (EventType, bool) {
        if let Some(existing) = self.event_types.iter().find(|t| t.name == name) {
            return (existing.clone(), false);
        }

        let id = self.event_types.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let event_type = EventType {
            id,
            name: name.to_string(),
        };
        self.event_types.push(event_type.clone());
        (event_type, true)
    }

    pub fn event_exists(&self, repo_id: u64, event_type: &str, created_at: DateTime<Utc>) -> bool {
        let Some(event_type) = self.event_types.iter().find(|t| t.name == event_type) else {
            return false;
        };
        self.events.get(&repo_id).is_some_and(|events| {
            events
                .iter()
                .any(|e| e.event_type_id == event_type.id && e.created_at == created_at)
        })
    }

    pub fn count_events(&self, repo_id: u64, event_type_id: u64) -> u64 {
        self.events.get(&repo_id).map_or(0, |events| {
            events
                .iter()
                .filter(|e| e.event_type_id == event_type_id)
                .count() as u64
        })
    }

    pub fn insert_event(
        &mut self,
        repo_id: u64,
        event_type_id: u64,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if !self.repos.iter().any(|r| r.id == repo_id) {
            return Err(StoreError::NotFound(format!("repository id {repo_id}")));
        }
        if !self.event_types.iter().any(|t| t.id == event_type_id) {
            return Err(StoreError::NotFound(format!("event type id {event_type_id}")));
        }

        let events = self.events.entry(repo_id).or_default();
        if events
            .iter()
            .any(|e| e.event_type_id == event_type_id && e.created_at == created_at)
        {
            return Err(StoreError::Conflict(format!(
                "event ({repo_id}, {event_type_id}, {created_at}) is already stored"
            )));
        }

        events.push(Event {
            repo_id,
            event_type_id,
            created_at,
        });
        Ok(())
    }

    pub fn events_in_window(
        &self,
        repo_id: u64,
        event_type_id: u64,
        since: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let mut timestamps: Vec<_> = self
            .events
            .get(&repo_id)
            .into_iter()
            .flatten()
            .filter(|e| e.event_type_id == event_type_id && e.created_at >= since)
            .map(|e| e.created_at)
            .collect();
        timestamps.sort_unstable_by(|a, b| b.cmp(a));
        timestamps
    }

    pub fn event_types_active_since(&self, repo_id: u64, since: DateTime<Utc>) -> Vec<EventType> {
        let Some(events) = self.events.get(&repo_id) else {
            return Vec::new();
        };
        self.event_types
            .iter()
            .filter(|t| {
                events
                    .iter()
                    .any(|e| e.event_type_id == t.id && e.created_at >= since)
            })
            .cloned()
            .collect()
    }
}
