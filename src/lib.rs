//! # bulkxfer
//!
//! Bulk file transfer driven by a CSV job list.
//!
//! Each row of the job list names an origin file and a target path. Jobs run
//! on a bounded worker pool; every job produces exactly one row in a CSV
//! report with hyperlinks, a status and a mask of the characters that were
//! replaced in the target filename.
//!
//! ## Core Features
//!
//! - **Bounded concurrency**: Jobs run in barrier-synchronized waves of
//!   `parallel` jobs, or on a streaming pool with the same cap
//! - **Failure isolation**: A failing (or panicking) job becomes a report row,
//!   never a run failure
//! - **Filename sanitization**: Illegal and non-ASCII characters become `_`,
//!   stacked extensions collapse (`a.b.c.txt` -> `a.txt`)
//! - **Size-based copy strategy**: Small files go through a temp file and an
//!   atomic rename, large files are streamed in fixed-size chunks
//! - **UNC aware**: `\\server\share` paths are resolved on every platform
//! - **Impersonation**: Optional alternate Windows credentials, applied to
//!   every worker thread of the run
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use bulkxfer::{TransferBuilder, TransferConfig};
//!
//! let summary = TransferBuilder::new("FileTransfers.csv")
//!     .config(TransferConfig::load("config.ini")?)
//!     .parallel(8)
//!     .run()?;
//! println!("{} succeeded, {} failed", summary.stats.succeeded, summary.stats.failed);
//! # Ok::<(), bulkxfer::Error>(())
//! ```
//!
//! ## Component API
//!
//! The builder is a thin layer over the components, which can be used
//! directly:
//!
//! ```no_run
//! use bulkxfer::{BatchScheduler, CsvReport, Scheduling, TransferOptions, TransferRunner, read_job_source};
//!
//! let source = read_job_source("jobs.csv")?;
//! let options = TransferOptions::default().with_parallel(4);
//! let report = CsvReport::create("jobs_metadata.csv")?;
//! report.write_header(&source.header, &options.fields)?;
//!
//! let runner = TransferRunner::new("/srv/in", "/srv/out", options);
//! let stats = BatchScheduler::new(4, Scheduling::Waves).run_all(&source.jobs, &runner, &report)?;
//! report.flush()?;
//! # Ok::<(), bulkxfer::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Progress bar support with indicatif |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod batch;
mod builder;
mod config;
mod context;
mod copy;
mod error;
mod impersonate;
mod job;
mod options;
mod report;
mod sanitize;
mod source;
mod utils;

#[cfg(feature = "progress")]
mod progress;

pub use batch::{BatchScheduler, ProgressCallback, TransferStats, WorkerScope};
pub use builder::{
    Plan, PlanEntry, REPORT_SUFFIX, RunSummary, TransferBuilder, default_report_path,
};
pub use config::{TIMESTAMP_DIR_FORMAT, TransferConfig};
pub use context::RunContext;
pub use copy::{CopyOutcome, CopyStrategy, Transferred, transfer};
pub use error::{CopyError, Error, JobFailure, Result};
pub use impersonate::{
    Credentials, ImpersonationGuard, ThreadImpersonation, impersonate_or_warn,
};
pub use job::{JobResult, JobRunner, JobStatus, ResolvedTransfer, TransferJob, TransferRunner};
pub use options::{FieldSelection, Scheduling, TransferOptions};
pub use report::{
    CsvReport, FIXED_COLUMNS, ReportRow, ReportSink, header_row, hyperlink_formula, result_row,
};
pub use sanitize::{Sanitized, is_illegal, sanitize};
pub use source::{JobSource, read_job_source};
pub use utils::path::{file_uri, is_unc, normalize, resolve};

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::{create_progress_bar, progress_callback};
