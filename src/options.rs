//! Runtime options for transfer runs.
//!
//! This module provides [`TransferOptions`] for configuring the transfer
//! engine, [`FieldSelection`] for choosing which metadata columns reach the
//! report, and [`Scheduling`] for choosing the batch discipline.
//!
//! # Example
//!
//! ```
//! use bulkxfer::{FieldSelection, TransferOptions};
//!
//! let options = TransferOptions::default()
//!     .with_parallel(8)
//!     .with_chunk_size_mb(32)
//!     .with_fields(FieldSelection::Indices(vec![1, 3]));
//! ```

use std::str::FromStr;

const MIB: u64 = 1024 * 1024;

/// Which extra fields of a job row are carried into the report.
///
/// Indices are 1-based and count from the first column after the origin and
/// target columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Every extra field, in input order (default)
    #[default]
    All,
    /// Only the listed extra fields, in the listed order
    Indices(Vec<usize>),
}

impl FieldSelection {
    /// Pick the selected fields out of `fields`.
    ///
    /// Indices that point past the end of `fields` are skipped, so ragged
    /// rows never fail.
    #[must_use]
    pub fn select(&self, fields: &[String]) -> Vec<String> {
        match self {
            Self::All => fields.to_vec(),
            Self::Indices(indices) => indices
                .iter()
                .filter_map(|&i| i.checked_sub(1).and_then(|i| fields.get(i)))
                .cloned()
                .collect(),
        }
    }
}

impl FromStr for FieldSelection {
    type Err = std::convert::Infallible;

    /// Parse `All` (any case) or a comma-separated list of 1-based indices.
    ///
    /// Entries that are not positive integers are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let indices = s
            .split(',')
            .filter_map(|part| part.trim().parse::<usize>().ok())
            .filter(|&i| i > 0)
            .collect();
        Ok(Self::Indices(indices))
    }
}

/// How the batch scheduler bounds concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheduling {
    /// Fixed-size waves: wave K+1 starts only after every job of wave K
    /// has been recorded (default).
    #[default]
    Waves,
    /// A bounded pool that starts the next job as soon as a worker frees up.
    Streaming,
}

/// Options for transfer runs.
///
/// Use [`Default::default()`] to get the documented defaults, then customize
/// using the builder methods.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `parallel` | 4 | Concurrent jobs |
/// | `strip_illegal` | `true` | Replace illegal filename characters with `_` |
/// | `collapse_extensions` | `true` | `a.b.c.txt` becomes `a.txt` |
/// | `chunk_size` | 16 MiB | Buffer size for chunked copies |
/// | `large_file_threshold` | 100 MiB | Files at least this big are chunked |
/// | `fields` | `All` | Extra fields carried into the report |
/// | `fsync` | `true` | Sync targets to disk after writing |
/// | `preserve_timestamps` | `true` | Copy mtime/atime to the target |
/// | `scheduling` | `Waves` | Barrier-synchronized batches |
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct TransferOptions {
    /// Maximum number of jobs executing at once (default: 4)
    pub parallel: usize,

    /// Replace illegal characters in target filenames (default: true)
    pub strip_illegal: bool,

    /// Collapse multi-dot filenames to `first.last` (default: true)
    pub collapse_extensions: bool,

    /// Buffer size in bytes used by chunked copies (default: 16 MiB)
    pub chunk_size: usize,

    /// Files whose size is at least this many bytes use the chunked
    /// strategy (default: 100 MiB)
    pub large_file_threshold: u64,

    /// Extra fields carried into the report
    pub fields: FieldSelection,

    /// Whether to sync targets to disk after writing (default: true)
    pub fsync: bool,

    /// Whether to copy modification and access times (default: true)
    pub preserve_timestamps: bool,

    /// Batch discipline
    pub scheduling: Scheduling,

    /// Callback for warnings (optional)
    ///
    /// If not set, warnings are logged via `tracing`.
    pub warn_handler: Option<fn(&str)>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            strip_illegal: true,
            collapse_extensions: true,
            chunk_size: 16 * MIB as usize,
            large_file_threshold: 100 * MIB,
            fields: FieldSelection::All,
            fsync: true,
            preserve_timestamps: true,
            scheduling: Scheduling::Waves,
            warn_handler: None,
        }
    }
}

impl TransferOptions {
    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Set the number of concurrent jobs
    ///
    /// Value is clamped to at least 1.
    #[must_use]
    pub fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = n.max(1);
        self
    }

    /// Leave illegal characters in target filenames untouched
    #[must_use]
    pub fn without_strip_illegal(mut self) -> Self {
        self.strip_illegal = false;
        self
    }

    /// Keep multi-dot filenames as they are
    #[must_use]
    pub fn without_collapse_extensions(mut self) -> Self {
        self.collapse_extensions = false;
        self
    }

    /// Set the chunk size in bytes (clamped to at least 1)
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set the chunk size in MiB
    #[must_use]
    pub fn with_chunk_size_mb(self, mb: u64) -> Self {
        let bytes = usize::try_from(mb.saturating_mul(MIB)).unwrap_or(usize::MAX);
        self.with_chunk_size(bytes)
    }

    /// Set the large-file threshold in bytes
    #[must_use]
    pub fn with_large_file_threshold(mut self, bytes: u64) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    /// Set the large-file threshold in MiB
    #[must_use]
    pub fn with_large_file_threshold_mb(self, mb: u64) -> Self {
        self.with_large_file_threshold(mb.saturating_mul(MIB))
    }

    /// Choose which extra fields reach the report
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    /// Disable fsync for faster (but less durable) transfers
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Disable timestamp preservation
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.preserve_timestamps = false;
        self
    }

    /// Set the batch discipline
    #[must_use]
    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            tracing::warn!("{}", msg);
        }
    }
}
