// src/runner.rs
//
// Turns settings + registry into the per-run destination jobs and hands
// them to the engine. One job per mapped category for the workbook
// backend; a single job holding every feed for the CSV backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::destination::csv_file::CsvTable;
use crate::destination::workbook::SheetsClient;
use crate::ingest::fetch::HttpFeedFetcher;
use crate::ingest::types::{FeedFetcher, MergeMode};
use crate::ingest::{self, IngestJob, RunReport};
use crate::registry::FeedRegistry;
use crate::settings::{BackendSettings, Settings};

enum Plan {
    Csv(PathBuf),
    Workbook {
        client: SheetsClient,
        default_sheet: Option<String>,
    },
}

pub struct Collector {
    plan: Plan,
    merge_mode: MergeMode,
    registry: FeedRegistry,
    fetcher: Arc<dyn FeedFetcher>,
}

impl Collector {
    /// Build the collector once at startup. Credentials problems surface
    /// here, before the server starts taking requests.
    pub fn from_settings(settings: &Settings, registry: FeedRegistry) -> Result<Self> {
        let plan = match &settings.backend {
            BackendSettings::Workbook {
                credentials_path,
                workbook_id,
                default_sheet,
            } => Plan::Workbook {
                client: SheetsClient::from_credentials_file(credentials_path, workbook_id)?,
                default_sheet: default_sheet.clone(),
            },
            BackendSettings::Csv { path } => Plan::Csv(path.clone()),
        };
        Ok(Self {
            plan,
            merge_mode: settings.merge_mode,
            registry,
            fetcher: Arc::new(HttpFeedFetcher::new()),
        })
    }

    /// Swap the feed fetcher (tests).
    pub fn with_fetcher(mut self, fetcher: Arc<dyn FeedFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Run the full collection once, across every destination. Failures are
    /// folded into the report; one bad destination never stops the others.
    pub async fn run_once(&self) -> RunReport {
        let mut report = RunReport::default();
        let mut jobs: Vec<IngestJob> = Vec::new();

        match &self.plan {
            Plan::Csv(path) => match CsvTable::ensure(path) {
                Ok(dest) => jobs.push(IngestJob {
                    destination: Box::new(dest),
                    feeds: self.registry.feeds().to_vec(),
                    merge_mode: self.merge_mode,
                }),
                Err(e) => {
                    tracing::error!(error = ?e, path = %path.display(), "csv table unavailable");
                    report.push_failure(&path.display().to_string(), &e);
                }
            },
            Plan::Workbook {
                client,
                default_sheet,
            } => {
                for cat in self.registry.categories() {
                    match client.ensure_sheet(&cat.sheet).await {
                        Ok(dest) => jobs.push(IngestJob {
                            destination: Box::new(dest),
                            feeds: self.registry.feeds_in(&cat.key),
                            merge_mode: self.merge_mode,
                        }),
                        Err(e) => {
                            tracing::error!(error = ?e, sheet = %cat.sheet, "sheet unavailable");
                            report.push_failure(&cat.sheet, &e);
                        }
                    }
                }

                let unmapped = self.registry.unmapped_feeds();
                if !unmapped.is_empty() {
                    match default_sheet {
                        Some(title) => match client.ensure_sheet(title).await {
                            Ok(dest) => jobs.push(IngestJob {
                                destination: Box::new(dest),
                                feeds: unmapped,
                                merge_mode: self.merge_mode,
                            }),
                            Err(e) => {
                                tracing::error!(error = ?e, sheet = %title, "default sheet unavailable");
                                report.push_failure(title, &e);
                            }
                        },
                        None => {
                            tracing::warn!(
                                count = unmapped.len(),
                                "feeds without a category mapping skipped; no default sheet configured"
                            );
                        }
                    }
                }
            }
        }

        let engine_report = ingest::run_jobs(&jobs, self.fetcher.as_ref()).await;
        report.destinations.extend(engine_report.destinations);
        report
    }
}
