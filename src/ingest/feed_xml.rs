// src/ingest/feed_xml.rs
//
// Best-effort RSS 2.0 / Atom parsing. Only link, title, summary, and the
// publication timestamp are consumed; everything else in the document is
// ignored.

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::clean_text;
use crate::ingest::types::FeedEntry;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}
/// Atom text constructs carry attributes (`type="html"`), so the value
/// lives in `$text` rather than deserializing as a bare string.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse a feed entry timestamp into its own naive clock components.
/// No timezone conversion: "09:30:00 +0900" stays 09:30:00.
pub fn parse_entry_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .or_else(|| OffsetDateTime::parse(ts, &Rfc3339).ok())
        .and_then(naive_components)
}

fn naive_components(odt: OffsetDateTime) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(odt.year(), u8::from(odt.month()) as u32, odt.day() as u32)?;
    let time =
        NaiveTime::from_hms_opt(odt.hour() as u32, odt.minute() as u32, odt.second() as u32)?;
    Some(NaiveDateTime::new(date, time))
}

/// Parse one fetched feed document, RSS 2.0 or Atom, into entries in
/// document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let cleaned = scrub_html_entities_for_xml(xml);
    match root_element(&cleaned).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(&cleaned).context("parsing rss feed xml")?;
            Ok(rss.channel.items.into_iter().map(rss_entry).collect())
        }
        Some("feed") => {
            let feed: AtomFeed = from_str(&cleaned).context("parsing atom feed xml")?;
            Ok(feed.entries.into_iter().map(atom_entry).collect())
        }
        Some(other) => Err(anyhow!("unsupported feed document root <{other}>")),
        None => Err(anyhow!("no root element in feed document")),
    }
}

fn rss_entry(item: RssItem) -> FeedEntry {
    FeedEntry {
        title: clean_opt(item.title),
        summary: clean_opt(item.description),
        link: nonempty_link(item.link),
        published: item.pub_date.as_deref().and_then(parse_entry_timestamp),
    }
}

fn atom_entry(entry: AtomEntry) -> FeedEntry {
    // Atom requires only `updated`; prefer `published` when both exist.
    let ts = entry.published.or(entry.updated);
    FeedEntry {
        title: clean_opt(entry.title.and_then(|t| t.value)),
        summary: clean_opt(entry.summary.and_then(|t| t.value)),
        link: alternate_link(&entry.links),
        published: ts.as_deref().and_then(parse_entry_timestamp),
    }
}

fn clean_opt(s: Option<String>) -> Option<String> {
    s.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

fn nonempty_link(link: Option<String>) -> Option<String> {
    link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

fn alternate_link(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.clone())
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

/// Local name of the document's first start tag.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Feeds in the wild ship HTML entities that are not valid XML; replace the
/// common ones before handing the document to the XML parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
