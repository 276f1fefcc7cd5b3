// src/destination/workbook.rs
//
// Remote workbook adapter over the Sheets values REST API. The client
// carries a pre-issued bearer token read from the credentials file; token
// acquisition/refresh is out of scope here.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::Destination;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

// Grid size used when creating a missing sheet.
const NEW_SHEET_ROWS: u32 = 2000;
const NEW_SHEET_COLS: u32 = 10;

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(alias = "access_token")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}
#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}
#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Cheap to clone; the underlying HTTP client is shared.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    token: String,
    workbook_id: String,
}

impl SheetsClient {
    /// Build a client from the credentials file (JSON carrying a bearer
    /// `token`) and the workbook id. Fails fast so a bad configuration is
    /// caught at startup, not mid-run.
    pub fn from_credentials_file(path: &Path, workbook_id: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading credentials from {}", path.display()))?;
        let creds: CredentialsFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing credentials file {}", path.display()))?;
        Ok(Self::new(&creds.token, workbook_id))
    }

    pub fn new(token: &str, workbook_id: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.to_string(),
            workbook_id: workbook_id.to_string(),
        }
    }

    /// Point the client at a different API host (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Idempotently obtain a handle to the named sheet, creating it when
    /// the workbook does not have it yet.
    pub async fn ensure_sheet(&self, title: &str) -> Result<SheetDestination> {
        let titles = self.sheet_titles().await?;
        if !titles.iter().any(|t| t == title) {
            self.add_sheet(title).await?;
        }
        Ok(SheetDestination {
            client: self.clone(),
            title: title.to_string(),
        })
    }

    async fn sheet_titles(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/spreadsheets/{}?fields=sheets.properties.title",
            self.base_url, self.workbook_id
        );
        let meta: SpreadsheetMeta = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("listing workbook sheets")?
            .error_for_status()
            .context("workbook metadata non-2xx")?
            .json()
            .await
            .context("decoding workbook metadata")?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<()> {
        let url = format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.base_url, self.workbook_id
        );
        let body = serde_json::json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        },
                    },
                },
            }],
        });
        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("creating sheet '{title}'"))?
            .error_for_status()
            .with_context(|| format!("creating sheet '{title}' non-2xx"))?;
        Ok(())
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            self.base_url,
            self.workbook_id,
            urlencoding::encode(range),
            suffix
        )
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "");
        let vr: ValueRange = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("reading values of {range}"))?
            .error_for_status()
            .with_context(|| format!("reading values of {range} non-2xx"))?
            .json()
            .await
            .with_context(|| format!("decoding values of {range}"))?;
        Ok(vr
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn put_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let url = self.values_url(range, "?valueInputOption=RAW");
        let body = serde_json::json!({ "values": rows });
        self.http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("writing values to {range}"))?
            .error_for_status()
            .with_context(|| format!("writing values to {range} non-2xx"))?;
        Ok(())
    }

    async fn append_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let url = self.values_url(range, ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS");
        let body = serde_json::json!({ "values": rows });
        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("appending values to {range}"))?
            .error_for_status()
            .with_context(|| format!("appending values to {range} non-2xx"))?;
        Ok(())
    }

    async fn clear_values(&self, range: &str) -> Result<()> {
        let url = self.values_url(range, ":clear");
        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .with_context(|| format!("clearing {range}"))?
            .error_for_status()
            .with_context(|| format!("clearing {range} non-2xx"))?;
        Ok(())
    }
}

fn cell_to_string(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// One sheet of the workbook, as seen by the ingestion engine.
pub struct SheetDestination {
    client: SheetsClient,
    title: String,
}

impl SheetDestination {
    /// The whole sheet as an A1 range. Embedded single quotes are doubled
    /// per A1 quoting rules.
    fn sheet_range(&self) -> String {
        format!("'{}'", self.title.replace('\'', "''"))
    }

    fn cell_range(&self, a1: &str) -> String {
        format!("{}!{}", self.sheet_range(), a1)
    }

    /// A1 span of one header row starting at A1, e.g. `A1:F1` for six
    /// columns. Header widths beyond column Z are not expected.
    fn header_span(len: usize) -> String {
        let last = (b'A' + (len.clamp(1, 26) as u8 - 1)) as char;
        format!("A1:{last}1")
    }
}

#[async_trait::async_trait]
impl Destination for SheetDestination {
    fn name(&self) -> &str {
        &self.title
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        self.client.get_values(&self.sheet_range()).await
    }

    async fn write_header(&self, header: &[String]) -> Result<()> {
        let range = self.cell_range(&Self::header_span(header.len()));
        self.client.put_values(&range, &[header.to_vec()]).await
    }

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        self.client.append_values(&self.sheet_range(), &rows).await
    }

    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        self.client.clear_values(&self.sheet_range()).await?;
        self.client.put_values(&self.cell_range("A1"), &rows).await
    }
}
