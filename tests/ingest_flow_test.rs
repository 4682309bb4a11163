//! End-to-end ingestion and analysis over the in-memory store

use std::sync::Arc;

use chrono::{Duration, Utc};

use repowatch::ingest::IngestionEngine;
use repowatch::stats::Analyzer;
use repowatch::storage::{EventStore, MemoryStore, RepositoryStore};
use repowatch::testing::{descending_page, raw_event, ScriptedFeed, ScriptedPage};

/// Two full pages, the second one entirely older than the window boundary.
/// The traversal stores page one, stops inside page two, and never asks for
/// page three.
#[tokio::test]
async fn two_page_traversal_stops_at_the_window_boundary() {
    let now = Utc::now();
    let min_date = now - Duration::days(7);

    let page_one = descending_page("PushEvent", now, 100);
    let page_two = descending_page("PushEvent", min_date - Duration::minutes(1), 100);

    let feed = Arc::new(ScriptedFeed::new(vec![
        ScriptedPage::Page(page_one),
        ScriptedPage::Page(page_two),
    ]));
    let store = Arc::new(MemoryStore::new());
    let repo = store
        .add_repository("octocat/Hello-World", 1296269, true)
        .await
        .unwrap();
    let engine = IngestionEngine::new(feed.clone(), store.clone());

    let summary = engine.ingest(&repo, 10, min_date, 500).await.unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.new_events, 100);
    assert_eq!(summary.skipped_events, 0);
    assert_eq!(feed.calls(), 2);

    let push = store.get_or_create_event_type("PushEvent").await.unwrap();
    assert_eq!(store.count_events(repo.id, push.id).await.unwrap(), 100);
}

/// Records newer than the boundary at the top of the second page are kept;
/// the first older record ends the traversal.
#[tokio::test]
async fn partial_second_page_keeps_records_inside_the_window() {
    let now = Utc::now();
    let min_date = now - Duration::days(7);

    let page_one = descending_page("PushEvent", now, 100);
    let mut page_two = descending_page("PushEvent", now - Duration::hours(2), 10);
    page_two.extend(descending_page(
        "PushEvent",
        min_date - Duration::minutes(1),
        90,
    ));

    let feed = Arc::new(ScriptedFeed::new(vec![
        ScriptedPage::Page(page_one),
        ScriptedPage::Page(page_two),
    ]));
    let store = Arc::new(MemoryStore::new());
    let repo = store
        .add_repository("octocat/Hello-World", 1296269, true)
        .await
        .unwrap();
    let engine = IngestionEngine::new(feed, store.clone());

    let summary = engine.ingest(&repo, 10, min_date, 500).await.unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.new_events, 110);
}

/// Re-running after an interrupted traversal re-derives the same decisions:
/// everything already stored is skipped, nothing is stored twice.
#[tokio::test]
async fn rerun_after_partial_ingestion_is_idempotent() {
    let now = Utc::now();
    let min_date = now - Duration::days(7);
    let page = descending_page("PushEvent", now, 100);

    let store = Arc::new(MemoryStore::new());
    let repo = store
        .add_repository("octocat/Hello-World", 1296269, true)
        .await
        .unwrap();

    // First run dies after one page (page budget stands in for a crash).
    let feed = Arc::new(ScriptedFeed::new(vec![ScriptedPage::Page(page.clone())]));
    let engine = IngestionEngine::new(feed, store.clone());
    let first = engine.ingest(&repo, 1, min_date, 500).await.unwrap();
    assert_eq!(first.new_events, 100);

    // Second run sees the same feed from page one again, plus the next page.
    let newer = descending_page("IssuesEvent", now + Duration::hours(1), 4);
    let feed = Arc::new(ScriptedFeed::new(vec![
        ScriptedPage::Page([newer.clone(), page[..96].to_vec()].concat()),
        ScriptedPage::Page(vec![raw_event(
            "PushEvent",
            &(now - Duration::hours(3)).to_rfc3339(),
        )]),
    ]));
    let engine = IngestionEngine::new(feed, store.clone());
    let second = engine.ingest(&repo, 10, min_date, 500).await.unwrap();

    assert_eq!(second.new_events, 5);
    assert_eq!(second.skipped_events, 96);

    let push = store.get_or_create_event_type("PushEvent").await.unwrap();
    let issues = store.get_or_create_event_type("IssuesEvent").await.unwrap();
    assert_eq!(store.count_events(repo.id, push.id).await.unwrap(), 101);
    assert_eq!(store.count_events(repo.id, issues.id).await.unwrap(), 4);
}

/// Ingested events flow straight into the analyzer.
#[tokio::test]
async fn ingested_events_are_visible_to_stats() {
    let now = Utc::now();
    let min_date = now - Duration::days(7);

    let feed = Arc::new(ScriptedFeed::new(vec![ScriptedPage::Page(
        descending_page("PushEvent", now - Duration::minutes(1), 10),
    )]));
    let store = Arc::new(MemoryStore::new());
    let repo = store
        .add_repository("tiangolo/fastapi", 197_493_803, true)
        .await
        .unwrap();
    let engine = IngestionEngine::new(feed, store.clone());
    engine.ingest(&repo, 10, min_date, 500).await.unwrap();

    let entries = Analyzer::new(7, 500)
        .stats(store.as_ref(), None)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.repository, "tiangolo/fastapi");
    assert_eq!(entry.repository_key, "tiangolofastapi");
    assert_eq!(entry.event_type, "PushEvent");
    assert_eq!(entry.event_count, 10);
    assert_eq!(entry.average_interval_seconds, Some(60.0));
    assert_eq!(entry.human_readable_interval, "1 minute");
}
