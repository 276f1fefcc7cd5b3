// src/ingest/fetch.rs
use anyhow::{Context, Result};
use reqwest::Client;

use crate::ingest::feed_xml::parse_feed;
use crate::ingest::types::{FeedEntry, FeedFetcher};

/// Fetches feeds over HTTP(S) and parses the body as RSS/Atom.
///
/// No timeout is configured; a hanging feed endpoint is an accepted risk of
/// the current design.
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching feed {url}"))?
            .error_for_status()
            .with_context(|| format!("feed {url} returned an error status"))?
            .text()
            .await
            .with_context(|| format!("reading feed body from {url}"))?;
        parse_feed(&body).with_context(|| format!("parsing feed {url}"))
    }
}
