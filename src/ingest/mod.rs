//! Paginated event ingestion with dedup, windowing and per-type caps
//!
//! The traversal walks the events feed newest-first, page by page, and stops
//! at the first of: the page budget, end-of-data, an empty or short page, a
//! record older than the window boundary, a (repository, event type) pair at
//! its cap, or a page consisting entirely of already-stored records. The
//! window-boundary stop assumes the feed's newest-first ordering; a feed
//! violating it would cause missed records.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::github::{GitHubFeed, PageOutcome, RawEvent, PAGE_SIZE};
use crate::storage::{MonitorStore, Repository};

/// Summary of one repository's ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub new_events: u64,
    pub skipped_events: u64,
    /// Pages actually requested, including a request answered with
    /// end-of-data.
    pub pages_fetched: u32,
}

/// Why a traversal ended before its page budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// A record older than `min_date` was seen; the rolling window boundary
    /// is reached.
    WindowBoundary,
    /// A (repository, event type) pair hit the stored-events cap. Stops the
    /// whole traversal, not just that type.
    EventCapReached,
    /// Every record on the page was already stored; assume nothing new
    /// exists beyond it.
    DuplicatePage,
}

struct PageReport {
    added: u64,
    skipped: u64,
    stop: Option<StopReason>,
}

/// Drives pagination against the feed and persists deduplicated events.
pub struct IngestionEngine {
    feed: Arc<dyn GitHubFeed>,
    store: Arc<dyn MonitorStore>,
}

impl IngestionEngine {
    pub fn new(feed: Arc<dyn GitHubFeed>, store: Arc<dyn MonitorStore>) -> Self {
        Self { feed, store }
    }

    /// Fetch events for one repository within the given limits.
    ///
    /// `min_date` is the rolling window boundary: records older than it are
    /// never stored. `event_limit` caps stored events per (repository,
    /// event type). A hard feed failure aborts this call; every other stop
    /// condition is normal termination.
    pub async fn ingest(
        &self,
        repo: &Repository,
        page_limit: u32,
        min_date: DateTime<Utc>,
        event_limit: u64,
    ) -> Result<FetchSummary> {
        let mut summary = FetchSummary::default();

        for page in 1..=page_limit {
            let outcome = self.feed.fetch_page(&repo.name, page).await?;
            summary.pages_fetched += 1;

            let records = match outcome {
                PageOutcome::EndOfData => {
                    debug!(repo = %repo.name, page, "feed reports end of data");
                    break;
                }
                PageOutcome::Page(records) => records,
            };
            if records.is_empty() {
                break;
            }

            let page_len = records.len();
            let report = self.process_page(repo, records, min_date, event_limit).await?;
            summary.new_events += report.added;
            summary.skipped_events += report.skipped;

            if let Some(reason) = report.stop {
                debug!(repo = %repo.name, page, ?reason, "stopping traversal");
                break;
            }
            if page_len < PAGE_SIZE {
                break;
            }
        }

        debug!(
            repo = %repo.name,
            new_events = summary.new_events,
            skipped_events = summary.skipped_events,
            pages_fetched = summary.pages_fetched,
            "ingestion finished"
        );
        Ok(summary)
    }

    /// Ingest each repository in turn. A hard failure is recorded and the
    /// traversal continues with the next repository.
    pub async fn ingest_all(
        &self,
        repos: &[Repository],
        page_limit: u32,
        min_date: DateTime<Utc>,
        event_limit: u64,
    ) -> Vec<(Repository, Result<FetchSummary>)> {
        let mut results = Vec::with_capacity(repos.len());
        for repo in repos {
            let result = self.ingest(repo, page_limit, min_date, event_limit).await;
            if let Err(e) = &result {
                warn!(repo = %repo.name, "ingestion failed: {e}");
            }
            results.push((repo.clone(), result));
        }
        results
    }

    async fn process_page(
        &self,
        repo: &Repository,
        records: Vec<RawEvent>,
        min_date: DateTime<Utc>,
        event_limit: u64,
    ) -> Result<PageReport> {
        let page_len = records.len() as u64;
        let mut added = 0;
        let mut skipped = 0;

        for record in records {
            // Records missing either field are dropped silently; they count
            // toward neither new_events nor skipped_events.
            let (name, raw_timestamp) = match (record.event_type, record.created_at) {
                (Some(name), Some(ts)) if !name.is_empty() && !ts.is_empty() => (name, ts),
                _ => continue,
            };
            let Some(created_at) = normalize_timestamp(&raw_timestamp) else {
                continue;
            };

            if created_at < min_date {
                return Ok(PageReport {
                    added,
                    skipped,
                    stop: Some(StopReason::WindowBoundary),
                });
            }

            if self.store.event_exists(repo.id, &name, created_at).await? {
                skipped += 1;
                continue;
            }

            let event_type = self.store.get_or_create_event_type(&name).await?;
            if self.store.count_events(repo.id, event_type.id).await? >= event_limit {
                return Ok(PageReport {
                    added,
                    skipped,
                    stop: Some(StopReason::EventCapReached),
                });
            }

            self.store.insert_event(repo.id, event_type.id, created_at).await?;
            added += 1;
        }

        // Malformed records count toward the page length here, so a page
        // with any of them never triggers the duplicate-page stop.
        if added == 0 && skipped == page_len {
            return Ok(PageReport {
                added,
                skipped,
                stop: Some(StopReason::DuplicatePage),
            });
        }

        Ok(PageReport {
            added,
            skipped,
            stop: None,
        })
    }
}

/// Parse a feed timestamp to UTC. RFC 3339 first; a naive timestamp is
/// taken as UTC. `None` when unparseable.
fn normalize_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}
