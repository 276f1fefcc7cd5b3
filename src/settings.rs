//! # Settings
//!
//! Explicit startup configuration, read from the process environment once
//! (after `dotenvy` has loaded `.env`) and passed into the rest of the
//! system by reference. Core logic never reads the environment itself.
//!
//! A missing required setting is a fatal startup error.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::ingest::types::MergeMode;

pub const ENV_CREDENTIALS: &str = "GOOGLE_CREDENTIALS";
pub const ENV_WORKBOOK_ID: &str = "SPREADSHEET_ID";
pub const ENV_DEFAULT_SHEET: &str = "DEFAULT_SHEET";
pub const ENV_BACKEND: &str = "NEWS_BACKEND";
pub const ENV_CSV_PATH: &str = "NEWS_CSV_PATH";
pub const ENV_MERGE_MODE: &str = "NEWS_MERGE_MODE";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

const DEFAULT_CSV_PATH: &str = "news_log.csv";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Where collected articles go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSettings {
    /// Remote workbook, one sheet per mapped category.
    Workbook {
        credentials_path: PathBuf,
        workbook_id: String,
        /// Sheet for feeds whose category has no mapping; such feeds are
        /// skipped when unset.
        default_sheet: Option<String>,
    },
    /// One local CSV table holding every feed.
    Csv { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: BackendSettings,
    pub merge_mode: MergeMode,
    pub bind_addr: SocketAddr,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let backend = match env_opt(ENV_BACKEND).as_deref().unwrap_or("workbook") {
            "workbook" | "sheets" => BackendSettings::Workbook {
                credentials_path: PathBuf::from(require_env(ENV_CREDENTIALS)?),
                workbook_id: require_env(ENV_WORKBOOK_ID)?,
                default_sheet: env_opt(ENV_DEFAULT_SHEET),
            },
            "csv" | "file" => BackendSettings::Csv {
                path: PathBuf::from(
                    env_opt(ENV_CSV_PATH).unwrap_or_else(|| DEFAULT_CSV_PATH.to_string()),
                ),
            },
            other => bail!("{ENV_BACKEND} has unknown value '{other}'"),
        };

        // The two original output modes: the workbook appends, the local
        // CSV table is fully re-sorted on every write.
        let merge_mode = match env_opt(ENV_MERGE_MODE) {
            Some(v) => {
                MergeMode::from_str(&v).with_context(|| format!("parsing {ENV_MERGE_MODE}"))?
            }
            None => match backend {
                BackendSettings::Workbook { .. } => MergeMode::AppendOnly,
                BackendSettings::Csv { .. } => MergeMode::FullResort,
            },
        };

        let bind_addr = env_opt(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("parsing {ENV_BIND_ADDR}"))?;

        Ok(Self {
            backend,
            merge_mode,
            bind_addr,
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_env(name: &str) -> Result<String> {
    match env_opt(name) {
        Some(v) => Ok(v),
        None => bail!("{name} is not set"),
    }
}
