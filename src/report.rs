//! The metadata report.
//!
//! Every [`JobResult`] becomes one CSV row: the selected metadata fields,
//! hyperlinks to the origin and target, the status label and the
//! sanitization mask. Rows are appended in completion order, so they are not
//! sorted by row index.

use crate::error::{Error, Result};
use crate::job::JobResult;
use crate::options::FieldSelection;
use crate::utils::path::file_uri;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Columns appended after the selected metadata headers
pub const FIXED_COLUMNS: [&str; 4] = [
    "Origin Hyperlink",
    "Target Hyperlink",
    "Transfer Status",
    "Illegal_Char_Mask",
];

/// Destination for job results.
///
/// `record` is called concurrently from worker threads; implementations
/// serialize internally.
pub trait ReportSink: Sync {
    /// Persist one result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result could not be written. The scheduler
    /// logs it and keeps going.
    fn record(&self, result: &JobResult) -> Result<()>;
}

/// A rendered report row, kept in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Row index of the job
    pub row_index: usize,
    /// Whether the job succeeded
    pub success: bool,
    /// Cells as they would be written to the CSV
    pub cells: Vec<String>,
}

impl From<&JobResult> for ReportRow {
    fn from(result: &JobResult) -> Self {
        Self {
            row_index: result.row_index,
            success: result.is_success(),
            cells: result_row(result),
        }
    }
}

/// Collects rendered rows in memory.
impl ReportSink for Mutex<Vec<ReportRow>> {
    fn record(&self, result: &JobResult) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReportRow::from(result));
        Ok(())
    }
}

/// Build the report header from the job source header.
///
/// The first two source columns (origin and target) are never carried over;
/// `fields` picks among the rest.
#[must_use]
pub fn header_row(source_header: &[String], fields: &FieldSelection) -> Vec<String> {
    let extra = source_header.get(2..).unwrap_or_default();
    let mut row = fields.select(extra);
    row.extend(FIXED_COLUMNS.iter().map(|&c| c.to_owned()));
    row
}

/// Spreadsheet formula linking to `path`.
///
/// Returns an empty string for an empty path, so unresolved jobs get blank
/// link cells.
///
/// ```
/// use bulkxfer::hyperlink_formula;
/// use std::path::Path;
///
/// assert_eq!(
///     hyperlink_formula(Path::new(r"\\fs01\share\a.txt")),
///     r#"=HYPERLINK("file:///fs01/share/a.txt")"#,
/// );
/// ```
#[must_use]
pub fn hyperlink_formula(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        return String::new();
    }
    format!(r#"=HYPERLINK("{}")"#, file_uri(path).replace('"', "\"\""))
}

/// The data row written for `result`.
#[must_use]
pub fn result_row(result: &JobResult) -> Vec<String> {
    let mut row = result.selected_fields.clone();
    row.push(hyperlink_formula(&result.origin));
    row.push(hyperlink_formula(&result.target));
    row.push(result.status_label());
    row.push(result.mask.clone());
    row
}

/// A CSV report shared between worker threads.
///
/// Each row is written and flushed under a single lock, so a crash loses at
/// most the row being written.
pub struct CsvReport<W: Write + Send> {
    writer: Mutex<csv::Writer<W>>,
    path: PathBuf,
}

impl<W: Write + Send> std::fmt::Debug for CsvReport<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReport").field("path", &self.path).finish()
    }
}

impl CsvReport<BufWriter<File>> {
    /// Create (or truncate) the report file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::Report {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Self::with_path(BufWriter::new(file), path))
    }
}

impl<W: Write + Send> CsvReport<W> {
    /// Wrap an arbitrary writer.
    pub fn from_writer(writer: W) -> Self {
        Self::with_path(writer, Path::new(""))
    }

    fn with_path(writer: W, path: &Path) -> Self {
        Self {
            writer: Mutex::new(csv::Writer::from_writer(writer)),
            path: path.to_path_buf(),
        }
    }

    /// Path of the report file (empty for in-memory writers)
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the header row. Call once, before the batch starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the row cannot be written.
    pub fn write_header(&self, source_header: &[String], fields: &FieldSelection) -> Result<()> {
        self.write_row(&header_row(source_header, fields))
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if flushing fails.
    pub fn flush(&self) -> Result<()> {
        self.lock().flush().map_err(|e| self.error(e.into()))
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the final flush fails.
    pub fn into_inner(self) -> Result<W> {
        let path = self.path;
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
            .map_err(|e| Error::Report {
                path,
                source: e.into_error().into(),
            })
    }

    fn write_row(&self, row: &[String]) -> Result<()> {
        let mut writer = self.lock();
        writer.write_record(row).map_err(|e| self.error(e))?;
        writer.flush().map_err(|e| self.error(e.into()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, csv::Writer<W>> {
        // a panicking writer thread leaves the csv writer usable
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn error(&self, source: csv::Error) -> Error {
        Error::Report {
            path: self.path.clone(),
            source,
        }
    }
}

impl<W: Write + Send> ReportSink for CsvReport<W> {
    fn record(&self, result: &JobResult) -> Result<()> {
        self.write_row(&result_row(result))
    }
}
