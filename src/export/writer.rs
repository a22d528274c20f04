//! Size-rotated CSV output
//!
//! This module writes flat records as CSV rows across a sequence of
//! numbered files, rolling over to the next file once the current one
//! reaches a byte threshold. The column set is a fixed schema supplied up
//! front: every file of a run carries the identical header, which is what
//! lets the files be concatenated afterwards.
//!
//! Two policy choices are deliberate, not accidental:
//! - a failed row write is logged and dropped, and the run continues;
//!   dropped rows are counted and surfaced in the run summary;
//! - the rotation bound is approximate. The size checked is the one
//!   observed on disk after the previous write, so a file may exceed the
//!   threshold by up to one row.

use std::path::PathBuf;

use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::flatten::FlatRecord;

/// CSV writer with file-size-based rotation
///
/// Appends one row per record to `{prefix}-{index}.csv`, `index` starting
/// at 1. Files are created lazily on the first write, so an empty run
/// produces no files, and a rotated-past file is never reopened.
pub struct RotatingCsvWriter {
    /// Output path prefix, directory component included
    prefix: PathBuf,
    /// Fixed, ordered output columns
    schema: Vec<String>,
    /// Rotation threshold in bytes
    threshold_bytes: u64,
    /// Current file index (1-based)
    file_index: u32,
    /// On-disk size of the current file, as observed after the last write
    current_size: u64,
    /// Rows written successfully
    documents_written: u64,
    /// Rows lost to write failures
    documents_dropped: u64,
}

impl RotatingCsvWriter {
    /// Create a writer.
    ///
    /// # Arguments
    /// * `prefix` - Output filename prefix, e.g. `out/notifications`
    /// * `schema` - Ordered column list, fixed for the whole run
    /// * `threshold_bytes` - Target file size triggering rotation
    pub fn new(prefix: impl Into<PathBuf>, schema: Vec<String>, threshold_bytes: u64) -> Self {
        Self {
            prefix: prefix.into(),
            schema,
            threshold_bytes,
            file_index: 1,
            current_size: 0,
            documents_written: 0,
            documents_dropped: 0,
        }
    }

    /// Append one record.
    ///
    /// An I/O failure is logged and leaves the file index and size
    /// unchanged; the record is dropped for this attempt and the run
    /// continues.
    pub async fn write(&mut self, record: &FlatRecord) {
        match self.try_write(record).await {
            Ok(()) => self.documents_written += 1,
            Err(e) => {
                self.documents_dropped += 1;
                warn!(
                    "Dropped record after write failure on {}: {e}",
                    self.file_path(self.file_index).display()
                );
            }
        }
    }

    /// Rows written successfully so far.
    pub fn documents_written(&self) -> u64 {
        self.documents_written
    }

    /// Rows lost to write failures so far.
    pub fn documents_dropped(&self) -> u64 {
        self.documents_dropped
    }

    /// Number of output files produced so far.
    pub fn files_written(&self) -> u32 {
        if self.documents_written > 0 {
            self.file_index
        } else {
            0
        }
    }

    fn file_path(&self, index: u32) -> PathBuf {
        let mut name = self.prefix.as_os_str().to_os_string();
        name.push(format!("-{index}.csv"));
        PathBuf::from(name)
    }

    async fn try_write(&mut self, record: &FlatRecord) -> std::io::Result<()> {
        let mut index = self.file_index;
        let mut path = self.file_path(index);
        let mut file_exists = tokio::fs::try_exists(&path).await.unwrap_or(false);

        // Rotation check uses the size observed after the previous write,
        // so the current file may overshoot the threshold by one row.
        if file_exists && self.current_size >= self.threshold_bytes {
            index += 1;
            path = self.file_path(index);
            file_exists = false;
            debug!("Rotating output to {}", path.display());
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await?;

        if !file_exists {
            file.write_all(self.header_row().as_bytes()).await?;
        }
        file.write_all(self.data_row(record).as_bytes()).await?;
        file.flush().await?;

        let size = tokio::fs::metadata(&path).await?.len();

        // Commit state only after the row is durably appended.
        self.file_index = index;
        self.current_size = size;
        Ok(())
    }

    fn header_row(&self) -> String {
        let mut row = self.schema.join(",");
        row.push('\n');
        row
    }

    /// Render one record against the schema: a cell per column in declared
    /// order, empty for missing fields. Record keys outside the schema are
    /// silently ignored; the schema is a stable contract even as source
    /// documents grow new fields.
    fn data_row(&self, record: &FlatRecord) -> String {
        let cells: Vec<String> = self
            .schema
            .iter()
            .map(|column| match record.get(column) {
                Some(value) => escape_csv_value(&render_value(value)),
                None => String::new(),
            })
            .collect();
        let mut row = cells.join(",");
        row.push('\n');
        row
    }
}

/// Render a value as CSV cell text.
///
/// Strings appear bare, null as an empty cell, and anything still
/// structured (arrays, nested mappings) as compact JSON so it survives
/// byte-identical into the output.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// Escape a CSV value if necessary.
fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        // Wrap in quotes and escape internal quotes by doubling them
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
