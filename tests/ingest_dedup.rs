// tests/ingest_dedup.rs
//
// Link-level deduplication: within a run, across feeds sharing a link, and
// against rows already persisted in the destination.

use std::collections::{HashMap, HashSet};

use news_collector::destination::MemoryDestination;
use news_collector::ingest::collect_destination;
use news_collector::ingest::types::{FeedEntry, FeedFetcher, MergeMode, LINK_COLUMN};
use news_collector::registry::FeedDescriptor;

#[derive(Default)]
struct FakeFetcher {
    entries: HashMap<String, Vec<FeedEntry>>,
    failing: HashSet<String>,
}

#[async_trait::async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch_entries(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
        if self.failing.contains(url) {
            anyhow::bail!("unreachable feed {url}");
        }
        Ok(self.entries.get(url).cloned().unwrap_or_default())
    }
}

fn feed(site: &str, url: &str) -> FeedDescriptor {
    FeedDescriptor {
        site: site.to_string(),
        top_category: "GENERAL".to_string(),
        feed_category: "General".to_string(),
        url: url.to_string(),
    }
}

fn entry(link: &str) -> FeedEntry {
    FeedEntry {
        title: Some(format!("title {link}")),
        summary: Some(format!("summary {link}")),
        link: Some(link.to_string()),
        published: None,
    }
}

fn links_of(rows: &[Vec<String>]) -> Vec<String> {
    rows.iter()
        .skip(1)
        .filter_map(|r| r.get(LINK_COLUMN).cloned())
        .collect()
}

#[tokio::test]
async fn duplicate_links_within_and_across_feeds_are_filtered() {
    let dest = MemoryDestination::new("t");
    let mut fetcher = FakeFetcher::default();
    fetcher.entries.insert(
        "http://a".into(),
        vec![entry("L1"), entry("L2"), entry("L1")], // dup within one feed
    );
    fetcher.entries.insert(
        "http://b".into(),
        vec![entry("L2"), entry("L3")], // dup across feeds
    );
    let feeds = vec![feed("A", "http://a"), feed("B", "http://b")];

    let report = collect_destination(&dest, &feeds, &fetcher, MergeMode::AppendOnly)
        .await
        .unwrap();

    assert_eq!(report.added, 3);
    assert_eq!(links_of(&dest.snapshot()), vec!["L1", "L2", "L3"]);
}

#[tokio::test]
async fn entries_without_a_link_are_dropped() {
    let dest = MemoryDestination::new("t");
    let mut fetcher = FakeFetcher::default();
    fetcher.entries.insert(
        "http://a".into(),
        vec![
            FeedEntry {
                link: None,
                ..entry("ignored")
            },
            FeedEntry {
                link: Some(String::new()),
                ..entry("ignored")
            },
            entry("L1"),
        ],
    );

    let report = collect_destination(
        &dest,
        &[feed("A", "http://a")],
        &fetcher,
        MergeMode::AppendOnly,
    )
    .await
    .unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(links_of(&dest.snapshot()), vec!["L1"]);
}

#[tokio::test]
async fn second_run_with_unchanged_feeds_adds_nothing() {
    let dest = MemoryDestination::new("t");
    let mut fetcher = FakeFetcher::default();
    fetcher
        .entries
        .insert("http://a".into(), vec![entry("L1"), entry("L2")]);
    let feeds = vec![feed("A", "http://a")];

    let first = collect_destination(&dest, &feeds, &fetcher, MergeMode::AppendOnly)
        .await
        .unwrap();
    assert_eq!(first.added, 2);

    let second = collect_destination(&dest, &feeds, &fetcher, MergeMode::AppendOnly)
        .await
        .unwrap();
    assert_eq!(second.added, 0, "second run must be a no-op");
    assert_eq!(dest.snapshot().len(), 3); // header + 2 rows, unchanged
}

#[tokio::test]
async fn growing_feed_only_contributes_the_new_entry() {
    // The documented scenario: first run sees A,B; second run sees A,B,C.
    let dest = MemoryDestination::new("t");
    let feeds = vec![feed("A", "http://a")];

    let mut fetcher = FakeFetcher::default();
    fetcher
        .entries
        .insert("http://a".into(), vec![entry("A"), entry("B")]);
    collect_destination(&dest, &feeds, &fetcher, MergeMode::AppendOnly)
        .await
        .unwrap();

    fetcher
        .entries
        .insert("http://a".into(), vec![entry("A"), entry("B"), entry("C")]);
    let second = collect_destination(&dest, &feeds, &fetcher, MergeMode::AppendOnly)
        .await
        .unwrap();

    assert_eq!(second.added, 1);
    assert_eq!(links_of(&dest.snapshot()), vec!["A", "B", "C"]);
    assert_eq!(dest.snapshot().len(), 4); // header + 3
}

#[tokio::test]
async fn idempotence_holds_in_full_resort_mode_too() {
    let dest = MemoryDestination::new("t");
    let mut fetcher = FakeFetcher::default();
    fetcher
        .entries
        .insert("http://a".into(), vec![entry("L1"), entry("L2")]);
    let feeds = vec![feed("A", "http://a")];

    collect_destination(&dest, &feeds, &fetcher, MergeMode::FullResort)
        .await
        .unwrap();
    let after_first = dest.snapshot();

    let second = collect_destination(&dest, &feeds, &fetcher, MergeMode::FullResort)
        .await
        .unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(dest.snapshot(), after_first);
}
