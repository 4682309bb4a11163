//! Test fixtures shared by unit and integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::github::{GitHubFeed, PageOutcome, RawEvent, RemoteRepo};

/// One scripted response for [`ScriptedFeed`].
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    Page(Vec<RawEvent>),
    EndOfData,
    /// Hard error with this HTTP status.
    Status(u16),
}

/// GitHub feed double serving a fixed sequence of responses in order and
/// counting fetch calls. Requests past the end of the script behave as
/// end-of-data.
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<ScriptedPage>>,
    calls: AtomicU32,
}

impl ScriptedFeed {
    pub fn new(pages: impl IntoIterator<Item = ScriptedPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().collect()),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of `fetch_page` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GitHubFeed for ScriptedFeed {
    async fn fetch_page(&self, repo_name: &str, _page: u32) -> Result<PageOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().await.pop_front() {
            Some(ScriptedPage::Page(records)) => Ok(PageOutcome::Page(records)),
            Some(ScriptedPage::Status(status)) => Err(Error::GitHubStatus {
                status,
                repo: repo_name.to_string(),
            }),
            Some(ScriptedPage::EndOfData) | None => Ok(PageOutcome::EndOfData),
        }
    }

    async fn fetch_repository(&self, repo_name: &str) -> Result<RemoteRepo> {
        Ok(RemoteRepo {
            id: 1,
            full_name: repo_name.to_string(),
        })
    }
}

/// Raw event with the given type and RFC 3339 timestamp.
pub fn raw_event(event_type: &str, created_at: &str) -> RawEvent {
    RawEvent {
        event_type: Some(event_type.to_string()),
        created_at: Some(created_at.to_string()),
    }
}

/// A page of `n` events of one type, timestamps descending one minute
/// apart starting at `newest` — the feed's native newest-first shape.
pub fn descending_page(event_type: &str, newest: DateTime<Utc>, n: usize) -> Vec<RawEvent> {
    (0..n)
        .map(|i| raw_event(event_type, &(newest - Duration::minutes(i as i64)).to_rfc3339()))
        .collect()
}
