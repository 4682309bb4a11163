//! Windowed inter-arrival statistics over stored events

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::storage::{MonitorStore, Repository};

/// One (repository, event type) statistics row, shaped for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct StatEntry {
    pub repository: String,
    pub repository_key: String,
    pub event_type: String,
    /// `None` when fewer than two events fall in the window.
    pub average_interval_seconds: Option<f64>,
    pub human_readable_interval: String,
    /// Events actually used, after the per-type budget is applied.
    pub event_count: usize,
}

/// Calculates the average time between events per repository and event
/// type, over a rolling window bounded by a number of days and a per-type
/// event budget.
pub struct Analyzer {
    limit: usize,
    cutoff: DateTime<Utc>,
}

impl Analyzer {
    /// Window of the last `days` days, considering at most `limit` events
    /// per (repository, event type). Both must be positive; boundaries
    /// validate before constructing an analyzer.
    pub fn new(days: i64, limit: usize) -> Self {
        Self::with_cutoff(Utc::now() - Duration::days(days), limit)
    }

    /// Analyzer with an explicit window boundary.
    pub fn with_cutoff(cutoff: DateTime<Utc>, limit: usize) -> Self {
        Self { limit, cutoff }
    }

    /// Stats for the given repository, or for all active repositories when
    /// `None`. Entry order is unspecified beyond grouping per repository.
    pub async fn stats(
        &self,
        store: &dyn MonitorStore,
        repo: Option<&Repository>,
    ) -> Result<Vec<StatEntry>> {
        let repos = match repo {
            Some(repo) => vec![repo.clone()],
            None => store.list_repositories(true).await?,
        };

        let mut entries = Vec::new();
        for repo in &repos {
            for event_type in store.event_types_active_since(repo.id, self.cutoff).await? {
                let mut timestamps = store
                    .events_in_window(repo.id, event_type.id, self.cutoff)
                    .await?;
                timestamps.truncate(self.limit);
                // Chronological order for the interval calculation.
                timestamps.reverse();

                let average = average_interval(&timestamps);
                entries.push(StatEntry {
                    repository: repo.name.clone(),
                    repository_key: repo.slug.clone(),
                    event_type: event_type.name,
                    average_interval_seconds: average,
                    human_readable_interval: format_duration(average),
                    event_count: timestamps.len(),
                });
            }
        }

        debug!(entries = entries.len(), "computed stats");
        Ok(entries)
    }
}

/// Mean gap in seconds between consecutive timestamps, which must be in
/// ascending order. `None` for fewer than two.
fn average_interval(timestamps: &[DateTime<Utc>]) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let total: f64 = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .sum();
    Some(total / (timestamps.len() - 1) as f64)
}

const UNITS: [(&str, u64); 6] = [
    ("year", 60 * 60 * 24 * 365),
    ("month", 60 * 60 * 24 * 30),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Render a duration in seconds as a concise human-readable string, e.g.
/// "1 hour, 5 minutes". Fractional seconds are truncated. Years are a fixed
/// 365 days and months a fixed 30; the breakdown is approximate, not
/// calendar-exact.
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return "N/A".to_string();
    };

    let mut remaining = seconds as u64;
    let mut parts = Vec::new();

    for (name, size) in UNITS {
        let value = remaining / size;
        if value > 0 {
            remaining -= value * size;
            parts.push(format!(
                "{} {}{}",
                value,
                name,
                if value == 1 { "" } else { "s" }
            ));
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::storage::{EventStore, MemoryStore, RepositoryStore};

    use super::*;

    #[test]
    fn format_duration_breaks_down_units_greedily() {
        assert_eq!(format_duration(Some(3661.0)), "1 hour, 1 minute, 1 second");
        assert_eq!(
            format_duration(Some(90061.0)),
            "1 day, 1 hour, 1 minute, 1 second"
        );
        assert_eq!(format_duration(Some(120.0)), "2 minutes");
        assert_eq!(format_duration(Some(7200.0)), "2 hours");
        assert_eq!(format_duration(Some(31_536_000.0)), "1 year");
        assert_eq!(format_duration(Some(2_592_000.0)), "1 month");
    }

    #[test]
    fn format_duration_edges() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(0.0)), "0 seconds");
        // Fractional seconds truncate.
        assert_eq!(format_duration(Some(59.9)), "59 seconds");
        assert_eq!(format_duration(Some(1.0)), "1 second");
    }

    #[test]
    fn average_interval_is_the_mean_of_consecutive_gaps() {
        let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let spaced: Vec<_> = (0..5).map(|i| base + Duration::seconds(60 * i)).collect();
        assert_eq!(average_interval(&spaced), Some(60.0));

        let uneven = vec![
            base,
            base + Duration::seconds(60),
            base + Duration::seconds(180),
        ];
        assert_eq!(average_interval(&uneven), Some(90.0));

        assert_eq!(average_interval(&[]), None);
        assert_eq!(average_interval(&[base]), None);
    }

    async fn seeded_store() -> (MemoryStore, Repository) {
        let store = MemoryStore::new();
        let repo = store
            .add_repository("tiangolo/fastapi", 197_493_803, true)
            .await
            .unwrap();
        (store, repo)
    }

    #[tokio::test]
    async fn stats_average_and_counts_per_type() {
        let (store, repo) = seeded_store().await;
        let now = Utc::now();

        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        for i in 1..=5 {
            store
                .insert_event(repo.id, push.id, now - Duration::minutes(i))
                .await
                .unwrap();
        }
        let fork = store.get_or_create_event_type("ForkEvent").await.unwrap();
        store
            .insert_event(repo.id, fork.id, now - Duration::minutes(1))
            .await
            .unwrap();

        let entries = Analyzer::new(7, 500).stats(&store, None).await.unwrap();
        assert_eq!(entries.len(), 2);

        let push_entry = entries.iter().find(|e| e.event_type == "PushEvent").unwrap();
        assert_eq!(push_entry.average_interval_seconds, Some(60.0));
        assert_eq!(push_entry.human_readable_interval, "1 minute");
        assert_eq!(push_entry.event_count, 5);
        assert_eq!(push_entry.repository, "tiangolo/fastapi");
        assert_eq!(push_entry.repository_key, "tiangolofastapi");

        // A single event yields no average.
        let fork_entry = entries.iter().find(|e| e.event_type == "ForkEvent").unwrap();
        assert_eq!(fork_entry.average_interval_seconds, None);
        assert_eq!(fork_entry.human_readable_interval, "N/A");
        assert_eq!(fork_entry.event_count, 1);
    }

    #[tokio::test]
    async fn stats_ignores_events_outside_the_window() {
        let (store, repo) = seeded_store().await;
        let now = Utc::now();

        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        store
            .insert_event(repo.id, push.id, now - Duration::days(30))
            .await
            .unwrap();
        store
            .insert_event(repo.id, push.id, now - Duration::days(31))
            .await
            .unwrap();

        // Only stale events: the type produces no entry at all.
        let entries = Analyzer::new(7, 500).stats(&store, None).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn stats_limit_keeps_the_most_recent_events() {
        let (store, repo) = seeded_store().await;
        let now = Utc::now();

        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        // Two-minute spacing for the newest three, then a large gap.
        for minutes in [2, 4, 6, 600] {
            store
                .insert_event(repo.id, push.id, now - Duration::minutes(minutes))
                .await
                .unwrap();
        }

        let entries = Analyzer::new(7, 3).stats(&store, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_count, 3);
        assert_eq!(entries[0].average_interval_seconds, Some(120.0));
    }

    #[tokio::test]
    async fn stats_scopes_to_active_or_requested_repositories() {
        let (store, active) = seeded_store().await;
        let dormant = store.add_repository("a/dormant", 7, false).await.unwrap();
        let now = Utc::now();

        let push = store.get_or_create_event_type("PushEvent").await.unwrap();
        store
            .insert_event(active.id, push.id, now - Duration::minutes(1))
            .await
            .unwrap();
        store
            .insert_event(dormant.id, push.id, now - Duration::minutes(1))
            .await
            .unwrap();

        let all = Analyzer::new(7, 500).stats(&store, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].repository_key, active.slug);

        // An explicitly requested repository is analyzed even if inactive.
        let scoped = Analyzer::new(7, 500)
            .stats(&store, Some(&dormant))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].repository_key, dormant.slug);
    }
}
