// src/destination/mod.rs
pub mod csv_file;
pub mod workbook;

use anyhow::Result;

/// Read/write contract the ingestion engine needs from a durable table.
///
/// A handle points at one logical table (a CSV file, or one sheet of a
/// workbook). The engine only ever reads once per run and then appends or
/// rewrites; there are no update/delete operations.
#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    /// Label used in logs and run reports.
    fn name(&self) -> &str;

    /// All rows, header included if present. Empty vec when the table has
    /// no content yet.
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite row 0 with `header`, leaving every other row untouched.
    async fn write_header(&self, header: &[String]) -> Result<()>;

    /// Append data rows at the end, preserving existing rows and the given
    /// order.
    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<()>;

    /// Replace the entire contents with `rows` (header first).
    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: Destination + ?Sized> Destination for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        (**self).read_all_rows().await
    }

    async fn write_header(&self, header: &[String]) -> Result<()> {
        (**self).write_header(header).await
    }

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        (**self).append_rows(rows).await
    }

    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        (**self).overwrite_rows(rows).await
    }
}

// --- Test helper ---
pub struct MemoryDestination {
    name: String,
    pub rows: std::sync::Mutex<Vec<Vec<String>>>,
    fail_writes: bool,
}

impl MemoryDestination {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: std::sync::Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn with_rows(name: &str, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            rows: std::sync::Mutex::new(rows),
            fail_writes: false,
        }
    }

    /// A destination whose write operations always fail, for exercising
    /// per-destination error recovery.
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: std::sync::Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn write_header(&self, header: &[String]) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write refused by test destination '{}'", self.name);
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.is_empty() {
            rows.push(header.to_vec());
        } else {
            rows[0] = header.to_vec();
        }
        Ok(())
    }

    async fn append_rows(&self, new_rows: Vec<Vec<String>>) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write refused by test destination '{}'", self.name);
        }
        self.rows.lock().unwrap().extend(new_rows);
        Ok(())
    }

    async fn overwrite_rows(&self, new_rows: Vec<Vec<String>>) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write refused by test destination '{}'", self.name);
        }
        *self.rows.lock().unwrap() = new_rows;
        Ok(())
    }
}
