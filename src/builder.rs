//! Builder API for running a job list end to end.
//!
//! [`TransferBuilder`] ties the pieces together: it reads the job source,
//! applies the configuration, impersonates the configured account, creates
//! the per-run target directory, writes the report header, runs the batch
//! and flushes the report.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use bulkxfer::{TransferBuilder, TransferConfig};
//!
//! let config = TransferConfig::load("config.ini")?;
//! let summary = TransferBuilder::new("FileTransfers.csv")
//!     .config(config)
//!     .run()?;
//! println!(
//!     "{} of {} transfers succeeded, report at {}",
//!     summary.stats.succeeded,
//!     summary.stats.total,
//!     summary.report_path.display()
//! );
//! # Ok::<(), bulkxfer::Error>(())
//! ```
//!
//! ## Planning
//!
//! ```no_run
//! use bulkxfer::TransferBuilder;
//!
//! // Resolve and sanitize every row without touching the target tree
//! let plan = TransferBuilder::new("FileTransfers.csv").plan()?;
//! for entry in &plan.entries {
//!     if let Ok(resolved) = &entry.resolution {
//!         println!("{} -> {}", resolved.origin.display(), resolved.target.display());
//!     }
//! }
//! # Ok::<(), bulkxfer::Error>(())
//! ```

use crate::batch::{BatchScheduler, ProgressCallback, TransferStats};
use crate::config::TransferConfig;
use crate::context::RunContext;
use crate::error::{JobFailure, Result};
use crate::impersonate::{Credentials, impersonate_or_warn};
use crate::job::{ResolvedTransfer, TransferRunner};
use crate::options::{Scheduling, TransferOptions};
use crate::report::CsvReport;
use crate::source::read_job_source;
use crate::utils::path::{absolute_base, safe_path};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the job file's stem to name the report.
pub const REPORT_SUFFIX: &str = "_metadata.csv";

/// Default report location for a job file: `<stem>_metadata.csv` next to it.
///
/// ```
/// use bulkxfer::default_report_path;
/// use std::path::Path;
///
/// assert_eq!(
///     default_report_path(Path::new("in/FileTransfers.csv")),
///     Path::new("in/FileTransfers_metadata.csv"),
/// );
/// ```
#[must_use]
pub fn default_report_path(jobs_path: &Path) -> PathBuf {
    let stem = jobs_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    jobs_path.with_file_name(format!("{stem}{REPORT_SUFFIX}"))
}

/// Outcome of [`TransferBuilder::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Batch totals
    pub stats: TransferStats,
    /// Where the report was written
    pub report_path: PathBuf,
    /// Absolute target base used for relative targets
    pub target_base: PathBuf,
    /// Account impersonated during the run, if any
    pub impersonated: Option<String>,
}

/// One row of a [`Plan`].
#[derive(Debug)]
pub struct PlanEntry {
    /// Row index of the job
    pub row_index: usize,
    /// Where the row would be copied, or why it cannot be
    pub resolution: std::result::Result<ResolvedTransfer, JobFailure>,
}

/// What a run would do, computed without touching the target tree.
#[derive(Debug)]
pub struct Plan {
    /// Header of the job source
    pub header: Vec<String>,
    /// One entry per job, in source order
    pub entries: Vec<PlanEntry>,
    /// Report location
    pub report_path: PathBuf,
    /// Absolute target base (includes the timestamp directory, if enabled)
    pub target_base: PathBuf,
    /// Effective options
    pub options: TransferOptions,
}

/// A builder for configuring and executing a transfer run.
///
/// Starts from [`TransferConfig::default`]; call [`config`](Self::config) to
/// use a loaded configuration. Settings made on the builder afterwards take
/// precedence over the configuration.
pub struct TransferBuilder {
    jobs_path: PathBuf,
    config: TransferConfig,
    report_path: Option<PathBuf>,
    parallel: Option<usize>,
    scheduling: Scheduling,
    credentials: Option<Credentials>,
    fsync: bool,
    preserve_timestamps: bool,
    warn_handler: Option<fn(&str)>,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for TransferBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferBuilder")
            .field("jobs_path", &self.jobs_path)
            .field("config", &self.config)
            .field("report_path", &self.report_path)
            .field("parallel", &self.parallel)
            .field("scheduling", &self.scheduling)
            .field("credentials", &self.credentials)
            .field("fsync", &self.fsync)
            .field("preserve_timestamps", &self.preserve_timestamps)
            .finish_non_exhaustive()
    }
}

impl TransferBuilder {
    /// Create a builder for the job list at `jobs_path`.
    pub fn new<P: AsRef<Path>>(jobs_path: P) -> Self {
        Self {
            jobs_path: jobs_path.as_ref().to_path_buf(),
            config: TransferConfig::default(),
            report_path: None,
            parallel: None,
            scheduling: Scheduling::Waves,
            credentials: None,
            fsync: true,
            preserve_timestamps: true,
            warn_handler: None,
            progress: None,
        }
    }

    /// Use `config` for base paths, sanitization and defaults.
    #[must_use]
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Write the report to `path` instead of `<jobs stem>_metadata.csv`.
    #[must_use]
    pub fn report_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.report_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the configured number of concurrent jobs.
    #[must_use]
    pub fn parallel(mut self, threads: usize) -> Self {
        self.parallel = Some(threads);
        self
    }

    /// Start jobs as soon as a worker frees up instead of in waves.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.scheduling = Scheduling::Streaming;
        self
    }

    /// Impersonate `credentials` for the run, overriding the configuration.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Disable fsync after writing each target.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Do not copy modification and access times.
    #[must_use]
    pub fn no_timestamps(mut self) -> Self {
        self.preserve_timestamps = false;
        self
    }

    /// Set a warning handler for failed jobs.
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Call `callback` with `(completed, total)` after each job.
    #[must_use]
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Effective options: the configuration plus builder overrides.
    #[must_use]
    pub fn options(&self) -> TransferOptions {
        let mut options = self.config.to_options().with_scheduling(self.scheduling);
        if let Some(n) = self.parallel {
            options = options.with_parallel(n);
        }
        if !self.fsync {
            options = options.without_fsync();
        }
        if !self.preserve_timestamps {
            options = options.without_timestamps();
        }
        if let Some(handler) = self.warn_handler {
            options = options.with_warn_handler(handler);
        }
        options
    }

    /// Where the report will be written.
    #[must_use]
    pub fn resolved_report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| default_report_path(&self.jobs_path))
    }

    fn credentials_to_use(&self) -> Option<Credentials> {
        if let Some(credentials) = &self.credentials {
            return Some(credentials.clone());
        }
        match (&self.config.username, &self.config.password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            (Some(user), None) => {
                tracing::warn!(
                    user = %user,
                    "no password configured, proceeding with current user"
                );
                None
            }
            _ => None,
        }
    }

    fn bases(&self, target_base: &Path) -> Result<(PathBuf, PathBuf)> {
        Ok((
            absolute_base(&self.config.origin_path)?,
            absolute_base(target_base)?,
        ))
    }

    /// Resolve and sanitize every job without creating or copying anything.
    ///
    /// # Errors
    ///
    /// Fails if the job source cannot be read.
    pub fn plan(&self) -> Result<Plan> {
        let source = read_job_source(&self.jobs_path)?;
        let target_base = self.config.target_base(chrono::Local::now());
        let (origin_base, target_base) = self.bases(&target_base)?;
        let options = self.options();
        let runner = TransferRunner::new(&origin_base, &target_base, options.clone());

        let entries = source
            .jobs
            .iter()
            .map(|job| PlanEntry {
                row_index: job.row_index,
                resolution: runner.resolve(job),
            })
            .collect();

        Ok(Plan {
            header: source.header,
            entries,
            report_path: self.resolved_report_path(),
            target_base,
            options,
        })
    }

    /// Execute the run.
    ///
    /// Job failures do not make this fail; they are counted in the returned
    /// stats and described in the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the job source cannot be read, the timestamp
    /// directory or the report cannot be created, or the worker pool cannot
    /// be started.
    pub fn run(self) -> Result<RunSummary> {
        let source = read_job_source(&self.jobs_path)?;
        let options = self.options();
        let report_path = self.resolved_report_path();

        let guard = self.credentials_to_use().and_then(|c| impersonate_or_warn(&c));

        let target_base = self.config.target_base(chrono::Local::now());
        if self.config.auto_timestamp_dir {
            fs::create_dir_all(safe_path(&target_base))?;
            tracing::info!(path = %target_base.display(), "created run directory");
        }
        let (origin_base, target_base) = self.bases(&target_base)?;

        let report = CsvReport::create(&report_path)?;
        report.write_header(&source.header, &options.fields)?;

        let mut scheduler = BatchScheduler::new(options.parallel, options.scheduling);
        if let Some(callback) = self.progress {
            scheduler = scheduler.with_progress(callback);
        }
        let runner = TransferRunner::new(&origin_base, &target_base, options);
        let context = RunContext::new(runner, scheduler, guard);
        let impersonated = context.impersonating().map(str::to_owned);

        let stats = context.execute(&source.jobs, &report)?;
        report.flush()?;

        Ok(RunSummary {
            stats,
            report_path,
            target_base,
            impersonated,
        })
    }
}
