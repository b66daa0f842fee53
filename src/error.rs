//! Error types for bulkxfer.
//!
//! There are two layers of failure:
//!
//! - [`Error`] covers run-level problems that stop a run before the batch
//!   starts: missing job source, bad configuration, an unwritable report.
//! - [`JobFailure`] (and the [`CopyError`] it wraps) covers a single job.
//!   Job failures never escape the job runner; their `Display` text is what
//!   ends up in the report's `Transfer Status` column.
//!
//! # Error Categories
//!
//! | Category | Errors |
//! |----------|--------|
//! | IO | [`Error::Io`], [`Error::Report`] |
//! | Input | [`Error::JobSourceNotFound`], [`Error::JobSource`] |
//! | Configuration | [`Error::ConfigNotFound`], [`Error::Config`], [`Error::InvalidOption`] |
//! | Runtime | [`Error::ThreadPool`] |
//! | Credentials | [`Error::Impersonation`], [`Error::ImpersonationUnsupported`] |

use crate::copy::CopyStrategy;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for bulkxfer run-level operations.
///
/// This is a type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that prevent a run from starting or completing its bookkeeping.
///
/// Individual transfer failures are not represented here; see [`JobFailure`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error outside of any single job
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Job source file does not exist
    #[error("Job source does not exist: {0}")]
    JobSourceNotFound(PathBuf),

    /// Job source could not be parsed
    #[error("Failed to read job source {path}: {source}")]
    JobSource {
        /// Path of the job source
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// Configuration file does not exist
    #[error("Configuration file does not exist: {0}")]
    ConfigNotFound(PathBuf),

    /// Configuration file could not be parsed
    #[error("Failed to read configuration {path}: {source}")]
    Config {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying INI error
        source: ini::Error,
    },

    /// A configuration option has a value that cannot be used
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidOption {
        /// Option name as it appears in the configuration
        name: &'static str,
        /// Raw value
        value: String,
        /// Why the value was rejected
        reason: &'static str,
    },

    /// Report file could not be created or written
    #[error("Failed to write report {path}: {source}")]
    Report {
        /// Report path (empty for in-memory writers)
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// Worker pool could not be created
    #[error("Failed to build worker pool with {threads} threads: {source}")]
    ThreadPool {
        /// Requested number of threads
        threads: usize,
        /// Underlying rayon error
        source: rayon::ThreadPoolBuildError,
    },

    /// Logon or impersonation for alternate credentials failed
    #[error("Failed to impersonate {user}: {reason}")]
    Impersonation {
        /// Account name in `DOMAIN\user` form
        user: String,
        /// Operating system message
        reason: String,
    },

    /// Impersonation is only available on Windows
    #[error("Impersonation is not supported on this platform (requested for {0})")]
    ImpersonationUnsupported(String),
}

/// Failure of a copy strategy.
///
/// Carries which strategy was running so that the report distinguishes
/// chunked failures (which may leave a truncated target) from direct ones.
#[derive(Error, Debug)]
#[error("{strategy} copy failed: {source}")]
pub struct CopyError {
    /// Strategy that was running when the error occurred
    pub strategy: CopyStrategy,
    /// Underlying IO error
    #[source]
    pub source: io::Error,
}

/// Why a single transfer job failed.
///
/// The `Display` output is the reason text written to the report after
/// `"Failure: "`.
#[derive(Error, Debug)]
pub enum JobFailure {
    /// The resolved origin does not exist
    #[error("Origin file does not exist: {}", .0.display())]
    OriginMissing(PathBuf),

    /// The resolved origin exists but is a directory or special file
    #[error("Origin path is not a file: {}", .0.display())]
    OriginNotAFile(PathBuf),

    /// Origin and target are the same file on disk
    #[error("Origin and target are the same file: {}", .0.display())]
    SameFile(PathBuf),

    /// The copy itself failed
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// Anything else: permission errors, malformed rows, panics
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<io::Error> for JobFailure {
    fn from(error: io::Error) -> Self {
        Self::Unexpected(error.to_string())
    }
}
