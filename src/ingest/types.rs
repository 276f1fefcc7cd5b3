// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDateTime;

/// Column order every destination table carries in row 0.
pub const CANONICAL_HEADER: [&str; 6] =
    ["datetime", "site", "category", "title", "summary", "link"];

/// Index of the `link` column within [`CANONICAL_HEADER`].
pub const LINK_COLUMN: usize = 5;

/// Timestamp format written to the `datetime` column. Zero-padded and
/// fixed-width, so lexicographic order on the string matches chronological
/// order.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn canonical_header() -> Vec<String> {
    CANONICAL_HEADER.iter().map(|s| s.to_string()).collect()
}

/// One item extracted from a fetched feed, before normalization.
/// `published` holds the entry's own clock components, timezone-naive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published: Option<NaiveDateTime>,
}

/// A fully normalized article, ready to be serialized as one table row.
/// Immutable once written to a destination; `link` is the unique key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub datetime: String,
    pub site: String,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl Article {
    /// Serialize in canonical column order.
    pub fn into_row(self) -> Vec<String> {
        vec![
            self.datetime,
            self.site,
            self.category,
            self.title,
            self.summary,
            self.link,
        ]
    }
}

/// How new rows are merged into a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Append the batch after the existing rows, in encounter order.
    AppendOnly,
    /// Merge old and new data rows, sort descending by the `datetime`
    /// string, and rewrite the whole table.
    FullResort,
}

impl std::str::FromStr for MergeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append_only" | "append" => Ok(MergeMode::AppendOnly),
            "full_resort" | "resort" => Ok(MergeMode::FullResort),
            other => Err(anyhow::anyhow!("unknown merge mode '{other}'")),
        }
    }
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse one feed's current entry window.
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>>;
}
