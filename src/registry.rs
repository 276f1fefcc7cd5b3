//! # Feed Source Registry
//!
//! An ordered, immutable list of feed descriptors plus the category →
//! sheet-title map that drives destination partitioning. Constructed once
//! at startup and passed into the engine by reference, so tests can inject
//! a fake registry.
//!
//! Resolution order for the registry definition:
//! 1. `$NEWS_FEEDS_PATH` (TOML)
//! 2. `config/feeds.toml`
//! 3. the built-in seed list
//!
//! Feed URLs are not validated here; an unreachable or malformed URL fails
//! at fetch time as a per-feed non-fatal error.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_FEEDS_PATH: &str = "NEWS_FEEDS_PATH";
const DEFAULT_FEEDS_PATH: &str = "config/feeds.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub site: String,
    /// Destination partition key (one sheet per top category).
    pub top_category: String,
    /// Sub-category recorded in the `category` column of each row.
    pub feed_category: String,
    pub url: String,
}

/// One destination partition: category key and the sheet title it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySheet {
    pub key: String,
    pub sheet: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    categories: Vec<CategorySheet>,
    feeds: Vec<FeedDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    categories: Vec<CategorySheet>,
    #[serde(default)]
    feeds: Vec<FeedDescriptor>,
}

impl FeedRegistry {
    pub fn new(categories: Vec<CategorySheet>, feeds: Vec<FeedDescriptor>) -> Self {
        Self { categories, feeds }
    }

    pub fn feeds(&self) -> &[FeedDescriptor] {
        &self.feeds
    }

    /// Ordered destination partitions. A mapped category with no feeds is
    /// still listed (its sheet gets ensured and header-normalized on every
    /// run, matching the partition-driven loop of the collector).
    pub fn categories(&self) -> &[CategorySheet] {
        &self.categories
    }

    /// Feeds assigned to one top-level category, in registry order.
    pub fn feeds_in(&self, key: &str) -> Vec<FeedDescriptor> {
        self.feeds
            .iter()
            .filter(|f| f.top_category == key)
            .cloned()
            .collect()
    }

    /// Feeds whose top category has no sheet mapping.
    pub fn unmapped_feeds(&self) -> Vec<FeedDescriptor> {
        self.feeds
            .iter()
            .filter(|f| !self.categories.iter().any(|c| c.key == f.top_category))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// The feed list of the original deployment.
    pub fn default_seed() -> Self {
        let categories = vec![
            CategorySheet {
                key: "IT".into(),
                sheet: "IT News".into(),
            },
            CategorySheet {
                key: "ECONOMY".into(),
                sheet: "Economy News".into(),
            },
            CategorySheet {
                key: "GENERAL".into(),
                sheet: "General News".into(),
            },
        ];
        let feeds = vec![
            FeedDescriptor {
                site: "ITmedia".into(),
                top_category: "IT".into(),
                feed_category: "ITmedia All".into(),
                url: "https://rss.itmedia.co.jp/rss/2.0/itmedia_all.xml".into(),
            },
            FeedDescriptor {
                site: "TechCrunch".into(),
                top_category: "IT".into(),
                feed_category: "TechCrunch Global".into(),
                url: "https://techcrunch.com/feed/".into(),
            },
            FeedDescriptor {
                site: "Toyo Keizai Online".into(),
                top_category: "ECONOMY".into(),
                feed_category: "General".into(),
                url: "http://toyokeizai.net/list/feed/rss".into(),
            },
            FeedDescriptor {
                site: "Diamond Online".into(),
                top_category: "ECONOMY".into(),
                feed_category: "General".into(),
                url: "https://diamond.jp/list/feed/rss".into(),
            },
            FeedDescriptor {
                site: "NHK".into(),
                top_category: "GENERAL".into(),
                feed_category: "Top Stories".into(),
                url: "http://www3.nhk.or.jp/rss/news/cat0.xml".into(),
            },
        ];
        Self { categories, feeds }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(s).context("parsing feed registry TOML")?;
        let categories = if file.categories.is_empty() {
            derive_categories(&file.feeds)
        } else {
            file.categories
        };
        Ok(Self {
            categories,
            feeds: file.feeds,
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed registry from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks; the built-in seed when neither a
    /// pointed-to nor a conventional file exists.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEEDS_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_FEEDS_PATH} points to a non-existent path"));
        }
        let conventional = PathBuf::from(DEFAULT_FEEDS_PATH);
        if conventional.exists() {
            return Self::load_from(&conventional);
        }
        Ok(Self::default_seed())
    }
}

/// Ordered unique top categories, each mapped to a sheet named after its
/// own key.
fn derive_categories(feeds: &[FeedDescriptor]) -> Vec<CategorySheet> {
    let mut out: Vec<CategorySheet> = Vec::new();
    for f in feeds {
        if !out.iter().any(|c| c.key == f.top_category) {
            out.push(CategorySheet {
                key: f.top_category.clone(),
                sheet: f.top_category.clone(),
            });
        }
    }
    out
}
