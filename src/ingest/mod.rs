// src/ingest/mod.rs
pub mod feed_xml;
pub mod fetch;
pub mod types;

use std::collections::HashSet;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::destination::Destination;
use crate::registry::FeedDescriptor;
use crate::ingest::types::{
    canonical_header, Article, FeedFetcher, MergeMode, DATETIME_FORMAT, LINK_COLUMN,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Collection runs started.");
        describe_counter!("ingest_entries_total", "Entries seen across all fetched feeds.");
        describe_counter!("ingest_new_articles_total", "Entries accepted and written.");
        describe_counter!(
            "ingest_skipped_known_total",
            "Entries skipped because their link was empty or already known."
        );
        describe_counter!("ingest_feed_errors_total", "Feed fetch/parse errors.");
        describe_counter!(
            "ingest_destination_errors_total",
            "Destination read/write failures."
        );
        describe_gauge!("ingest_last_run_ts", "Unix ts when a collection run last started.");
    });
}

/// Normalize extracted feed text: decode HTML entities, strip tags,
/// collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// One destination handle plus the feeds assigned to it. Jobs are fully
/// independent; nothing is shared between them within a run.
pub struct IngestJob {
    pub destination: Box<dyn Destination>,
    pub feeds: Vec<FeedDescriptor>,
    pub merge_mode: MergeMode,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DestinationReport {
    pub destination: String,
    pub added: usize,
    pub feed_errors: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunReport {
    pub destinations: Vec<DestinationReport>,
}

impl RunReport {
    pub fn total_added(&self) -> usize {
        self.destinations.iter().map(|d| d.added).sum()
    }

    pub fn failed_destinations(&self) -> usize {
        self.destinations
            .iter()
            .filter(|d| d.error.is_some())
            .count()
    }

    pub fn push_failure(&mut self, destination: &str, error: &anyhow::Error) {
        self.destinations.push(DestinationReport {
            destination: destination.to_string(),
            added: 0,
            feed_errors: 0,
            error: Some(format!("{error:#}")),
        });
    }

    /// One human-readable status line per destination.
    pub fn summary(&self) -> String {
        self.destinations
            .iter()
            .map(|d| match &d.error {
                Some(e) => format!("{}: failed ({e})", d.destination),
                None if d.added == 0 => format!("{}: no new articles", d.destination),
                None => format!("{}: added {} new articles", d.destination, d.added),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct DestinationState {
    rows: Vec<Vec<String>>,
    known_links: HashSet<String>,
}

/// Read the destination once and normalize its header.
///
/// An empty table gets the canonical header written before anything else.
/// A present-but-different row 0 is overwritten with the canonical header;
/// existing data rows are NOT remapped to the new column order even though
/// their columns may then mis-align. Known limitation, kept as documented
/// behavior.
async fn load_destination_state(dest: &dyn Destination) -> Result<DestinationState> {
    let rows = dest
        .read_all_rows()
        .await
        .with_context(|| format!("reading rows from '{}'", dest.name()))?;

    let header = canonical_header();
    if rows.is_empty() {
        dest.write_header(&header)
            .await
            .with_context(|| format!("writing header to '{}'", dest.name()))?;
    } else if rows[0] != header {
        dest.write_header(&header)
            .await
            .with_context(|| format!("rewriting header of '{}'", dest.name()))?;
    }

    let mut known_links = HashSet::new();
    for row in rows.iter().skip(1) {
        // Rows too short to carry the link column contribute nothing.
        if let Some(link) = row.get(LINK_COLUMN) {
            known_links.insert(link.clone());
        }
    }

    Ok(DestinationState { rows, known_links })
}

fn now_datetime() -> String {
    chrono::Local::now()
        .naive_local()
        .format(DATETIME_FORMAT)
        .to_string()
}

/// Descending sort on the `datetime` column, as a plain string comparison.
/// Valid because the format is zero-padded fixed-width; rows too short to
/// carry the column sort last. Stable, so equal timestamps keep their
/// insertion order.
pub fn sort_rows_by_datetime_desc(rows: &mut [Vec<String>]) {
    rows.sort_by(|a, b| b.first().cmp(&a.first()));
}

/// Run the full ingestion algorithm for one destination: load state, fetch
/// each assigned feed, filter against known links, persist the batch.
///
/// Feed failures are recovered here and only counted; destination I/O
/// failures bubble up to the caller.
pub async fn collect_destination(
    dest: &dyn Destination,
    feeds: &[FeedDescriptor],
    fetcher: &dyn FeedFetcher,
    merge_mode: MergeMode,
) -> Result<DestinationReport> {
    let DestinationState {
        rows,
        mut known_links,
    } = load_destination_state(dest).await?;

    let mut batch: Vec<Article> = Vec::new();
    let mut feed_errors = 0usize;

    for feed in feeds {
        tracing::info!(
            destination = dest.name(),
            site = %feed.site,
            category = %feed.feed_category,
            "fetching feed"
        );

        let entries = match fetcher.fetch_entries(&feed.url).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    error = ?e,
                    site = %feed.site,
                    url = %feed.url,
                    "feed fetch failed"
                );
                counter!("ingest_feed_errors_total").increment(1);
                feed_errors += 1;
                continue;
            }
        };
        counter!("ingest_entries_total").increment(entries.len() as u64);

        for entry in entries {
            let link = entry.link.unwrap_or_default();
            if link.is_empty() || known_links.contains(&link) {
                counter!("ingest_skipped_known_total").increment(1);
                continue;
            }

            let datetime = entry
                .published
                .map(|dt| dt.format(DATETIME_FORMAT).to_string())
                .unwrap_or_else(now_datetime);

            batch.push(Article {
                datetime,
                site: feed.site.clone(),
                category: feed.feed_category.clone(),
                title: entry.title.unwrap_or_default(),
                summary: entry.summary.unwrap_or_default(),
                link: link.clone(),
            });
            known_links.insert(link);
        }
    }

    let added = batch.len();
    if added == 0 {
        tracing::info!(destination = dest.name(), "no new articles");
    } else {
        let new_rows: Vec<Vec<String>> = batch.into_iter().map(Article::into_row).collect();
        match merge_mode {
            MergeMode::AppendOnly => {
                dest.append_rows(new_rows)
                    .await
                    .with_context(|| format!("appending rows to '{}'", dest.name()))?;
            }
            MergeMode::FullResort => {
                let mut table: Vec<Vec<String>> = rows.into_iter().skip(1).collect();
                table.extend(new_rows);
                sort_rows_by_datetime_desc(&mut table);

                let mut all = Vec::with_capacity(table.len() + 1);
                all.push(canonical_header());
                all.extend(table);
                dest.overwrite_rows(all)
                    .await
                    .with_context(|| format!("rewriting '{}'", dest.name()))?;
            }
        }
        counter!("ingest_new_articles_total").increment(added as u64);
        tracing::info!(destination = dest.name(), added, "added new articles");
    }

    Ok(DestinationReport {
        destination: dest.name().to_string(),
        added,
        feed_errors,
        error: None,
    })
}

/// Process every job in order. A failing destination is reported and the
/// remaining jobs still run.
pub async fn run_jobs(jobs: &[IngestJob], fetcher: &dyn FeedFetcher) -> RunReport {
    ensure_metrics_described();
    counter!("ingest_runs_total").increment(1);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    let mut report = RunReport::default();
    for job in jobs {
        match collect_destination(
            job.destination.as_ref(),
            &job.feeds,
            fetcher,
            job.merge_mode,
        )
        .await
        {
            Ok(dest_report) => report.destinations.push(dest_report),
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    destination = job.destination.name(),
                    "destination run failed"
                );
                counter!("ingest_destination_errors_total").increment(1);
                report.push_failure(job.destination.name(), &e);
            }
        }
    }
    report
}
