//! Reading the job list.
//!
//! The job source is a CSV file with a header row. Column 1 is the origin,
//! column 2 the target, anything after that is metadata carried into the
//! report. Rows may have different lengths.

use crate::error::{Error, Result};
use crate::job::TransferJob;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A parsed job list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSource {
    /// Header row, as read
    pub header: Vec<String>,
    /// One job per data row, in file order
    pub jobs: Vec<TransferJob>,
}

impl JobSource {
    /// Parse a job list from any reader.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`csv::Error`] if the input is not valid CSV
    /// (for example invalid UTF-8).
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header = reader.headers()?.iter().map(str::to_owned).collect();
        let jobs = reader
            .records()
            .enumerate()
            .map(|(row, record)| {
                record.map(|r| TransferJob::from_fields(row, r.iter().map(str::to_owned)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { header, jobs })
    }

    /// Number of jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the source holds no jobs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Read the job list at `path`.
///
/// # Errors
///
/// Returns [`Error::JobSourceNotFound`] if the file does not exist and
/// [`Error::JobSource`] if it cannot be read or parsed.
pub fn read_job_source<P: AsRef<Path>>(path: P) -> Result<JobSource> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::JobSourceNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(Error::JobSource {
                path: path.to_path_buf(),
                source: e.into(),
            });
        }
    };

    let source = JobSource::from_reader(file).map_err(|source| Error::JobSource {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), jobs = source.len(), "loaded job source");
    Ok(source)
}
