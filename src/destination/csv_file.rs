// src/destination/csv_file.rs
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Destination;

/// A destination backed by one local CSV file.
///
/// Rows are read with a flexible reader (no header inference, ragged rows
/// allowed) so the engine sees the physical table exactly as stored.
pub struct CsvTable {
    path: PathBuf,
    name: String,
}

impl CsvTable {
    /// Idempotently obtain a handle, creating an empty file when absent.
    pub fn ensure(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
        })
    }

    fn read_rows_sync(&self) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading {}", self.path.display()))?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok(rows)
    }

    fn write_rows_sync(&self, rows: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening {} for writing", self.path.display()))?;
        for row in rows {
            writer
                .write_record(row)
                .with_context(|| format!("writing {}", self.path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl Destination for CsvTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        self.read_rows_sync()
    }

    async fn write_header(&self, header: &[String]) -> Result<()> {
        let mut rows = self.read_rows_sync()?;
        if rows.is_empty() {
            rows.push(header.to_vec());
        } else {
            rows[0] = header.to_vec();
        }
        self.write_rows_sync(&rows)
    }

    async fn append_rows(&self, new_rows: Vec<Vec<String>>) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {} for append", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in &new_rows {
            writer
                .write_record(row)
                .with_context(|| format!("appending to {}", self.path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))
    }

    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        self.write_rows_sync(&rows)
    }
}
