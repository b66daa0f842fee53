//! Transfer jobs and the job runner.
//!
//! A [`TransferJob`] is one row of the job list. [`TransferRunner`] turns it
//! into exactly one [`JobResult`], whatever happens along the way: every
//! failure, including a panic, becomes a value in the result. This is what
//! keeps one bad row from aborting the batch.

use crate::copy::{Transferred, transfer};
use crate::error::JobFailure;
use crate::options::TransferOptions;
use crate::sanitize::{Sanitized, sanitize};
use crate::utils::path::{join_file_name, resolve, safe_path, split_file_name};
use std::any::Any;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// One row of the job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    /// 0-based index of the data row (the header is not counted)
    pub row_index: usize,
    /// Raw origin reference (column 1)
    pub origin: String,
    /// Raw target reference (column 2)
    pub target: String,
    /// Remaining columns, in input order
    pub extra_fields: Vec<String>,
}

impl TransferJob {
    /// Build a job from the fields of one row.
    ///
    /// Missing origin or target columns become empty strings; the runner
    /// reports them as failures.
    pub fn from_fields<I>(row_index: usize, fields: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut fields = fields.into_iter();
        Self {
            row_index,
            origin: fields.next().unwrap_or_default(),
            target: fields.next().unwrap_or_default(),
            extra_fields: fields.collect(),
        }
    }
}

/// Outcome of a job.
#[derive(Debug)]
pub enum JobStatus {
    /// The file was copied
    Success(Transferred),
    /// The job failed; the reason is reported
    Failure(JobFailure),
}

/// The recorded outcome of one [`TransferJob`].
#[derive(Debug)]
pub struct JobResult {
    /// Row index of the job this result belongs to
    pub row_index: usize,
    /// Extra fields picked by the configured [`FieldSelection`](crate::FieldSelection)
    pub selected_fields: Vec<String>,
    /// Resolved origin (empty if the job failed before resolution)
    pub origin: PathBuf,
    /// Resolved, sanitized target (empty if the job failed before resolution)
    pub target: PathBuf,
    /// Success or failure
    pub status: JobStatus,
    /// Sanitization mask as `0`/`1` characters (empty if unresolved)
    pub mask: String,
}

impl JobResult {
    /// Whether the copy succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Success(_))
    }

    /// Bytes written to the target (0 on failure)
    #[must_use]
    pub fn bytes(&self) -> u64 {
        match &self.status {
            JobStatus::Success(done) => done.bytes,
            JobStatus::Failure(_) => 0,
        }
    }

    /// `"Success"` or `"Failure: <reason>"`
    #[must_use]
    pub fn status_label(&self) -> String {
        match &self.status {
            JobStatus::Success(_) => "Success".to_owned(),
            JobStatus::Failure(failure) => format!("Failure: {failure}"),
        }
    }

    fn unresolved(job: &TransferJob, selected_fields: Vec<String>, failure: JobFailure) -> Self {
        Self {
            row_index: job.row_index,
            selected_fields,
            origin: PathBuf::new(),
            target: PathBuf::new(),
            status: JobStatus::Failure(failure),
            mask: String::new(),
        }
    }
}

/// A job whose paths have been resolved and whose target filename has been
/// sanitized. Nothing has touched the filesystem yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransfer {
    /// Absolute, normalized origin
    pub origin: PathBuf,
    /// Absolute, normalized target with the sanitized filename
    pub target: PathBuf,
    /// Sanitization of the target filename
    pub sanitized: Sanitized,
}

/// Executes single jobs.
///
/// Implementations must never panic out of [`run`](JobRunner::run) and must
/// return exactly one result per call. The batch scheduler calls `run` from
/// several threads at once.
pub trait JobRunner: Sync {
    /// Execute `job` and describe what happened.
    fn run(&self, job: &TransferJob) -> JobResult;
}

/// The file transfer job runner.
///
/// Holds the base directories relative origins and targets are resolved
/// against, plus the [`TransferOptions`].
#[derive(Debug, Clone)]
pub struct TransferRunner {
    origin_base: PathBuf,
    target_base: PathBuf,
    options: TransferOptions,
}

impl TransferRunner {
    /// Create a runner.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        origin_base: P,
        target_base: Q,
        options: TransferOptions,
    ) -> Self {
        Self {
            origin_base: origin_base.as_ref().to_path_buf(),
            target_base: target_base.as_ref().to_path_buf(),
            options,
        }
    }

    /// Options this runner was built with
    #[must_use]
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Base directory for relative targets
    #[must_use]
    pub fn target_base(&self) -> &Path {
        &self.target_base
    }

    /// Resolve both paths of `job` and sanitize the target filename.
    ///
    /// Pure: nothing on disk is read or created.
    ///
    /// # Errors
    ///
    /// Fails with [`JobFailure::Unexpected`] if the row lacks an origin or
    /// target, or if the target resolves to something without a filename.
    pub fn resolve(&self, job: &TransferJob) -> Result<ResolvedTransfer, JobFailure> {
        if job.origin.trim().is_empty() {
            return Err(JobFailure::Unexpected("row has no origin field".to_owned()));
        }
        if job.target.trim().is_empty() {
            return Err(JobFailure::Unexpected("row has no target field".to_owned()));
        }

        let origin = resolve(&job.origin, &self.origin_base);
        let target = resolve(&job.target, &self.target_base);

        let (target_dir, raw_name) = split_file_name(&target).ok_or_else(|| {
            JobFailure::Unexpected(format!("target has no file name: {}", target.display()))
        })?;

        let sanitized = sanitize(
            &raw_name.to_string_lossy(),
            self.options.strip_illegal,
            self.options.collapse_extensions,
        );
        // An unaltered name keeps its original bytes, even if not UTF-8
        let name = if sanitized.was_altered {
            OsString::from(&sanitized.name)
        } else {
            raw_name
        };

        Ok(ResolvedTransfer {
            origin,
            target: join_file_name(&target_dir, &name),
            sanitized,
        })
    }

    fn execute(&self, resolved: &ResolvedTransfer) -> Result<Transferred, JobFailure> {
        if let Some(parent) = resolved.target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(safe_path(parent)).map_err(|e| {
                    JobFailure::Unexpected(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let origin_meta = match fs::metadata(safe_path(&resolved.origin)) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(JobFailure::OriginMissing(resolved.origin.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        if !origin_meta.is_file() {
            return Err(JobFailure::OriginNotAFile(resolved.origin.clone()));
        }
        // Opening the target would truncate the origin before it is read
        if same_file(&resolved.origin, &resolved.target) {
            return Err(JobFailure::SameFile(resolved.origin.clone()));
        }

        Ok(transfer(
            &resolved.origin,
            &resolved.target,
            &origin_meta,
            &self.options,
        )?)
    }

    fn run_unguarded(&self, job: &TransferJob, selected_fields: Vec<String>) -> JobResult {
        let resolved = match self.resolve(job) {
            Ok(resolved) => resolved,
            Err(failure) => return JobResult::unresolved(job, selected_fields, failure),
        };

        let status = match self.execute(&resolved) {
            Ok(done) => JobStatus::Success(done),
            Err(failure) => JobStatus::Failure(failure),
        };

        JobResult {
            row_index: job.row_index,
            selected_fields,
            mask: resolved.sanitized.mask_string(),
            origin: resolved.origin,
            target: resolved.target,
            status,
        }
    }

    fn log(&self, result: &JobResult) {
        match &result.status {
            JobStatus::Success(done) => tracing::debug!(
                row = result.row_index,
                origin = %result.origin.display(),
                target = %result.target.display(),
                strategy = %done.strategy,
                bytes = done.bytes,
                "transferred"
            ),
            JobStatus::Failure(failure @ JobFailure::Unexpected(_)) => tracing::error!(
                row = result.row_index,
                origin = %result.origin.display(),
                "{failure}"
            ),
            JobStatus::Failure(failure) => self
                .options
                .warn(&format!("Row {}: {failure}", result.row_index)),
        }
    }
}

impl JobRunner for TransferRunner {
    fn run(&self, job: &TransferJob) -> JobResult {
        let selected_fields = self.options.fields.select(&job.extra_fields);
        let result = contain_panics(job, selected_fields, |fields| self.run_unguarded(job, fields));
        self.log(&result);
        result
    }
}

/// Whether `target` already exists and is the same file as `origin`.
///
/// Both paths are canonicalized, which follows symlinks and `..` and, on
/// Windows, resolves the volume behind drive letters and shares.
fn same_file(origin: &Path, target: &Path) -> bool {
    match (
        fs::canonicalize(safe_path(origin)),
        fs::canonicalize(safe_path(target)),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Run `f`, converting a panic into an unresolved failure result.
pub(crate) fn contain_panics<F>(job: &TransferJob, selected_fields: Vec<String>, f: F) -> JobResult
where
    F: FnOnce(Vec<String>) -> JobResult,
{
    let fields = selected_fields.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| f(fields))) {
        Ok(result) => result,
        Err(payload) => JobResult::unresolved(
            job,
            selected_fields,
            JobFailure::Unexpected(panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "job panicked".to_owned()
    }
}

// =============================================================================
// Tests
// =============================================================================
