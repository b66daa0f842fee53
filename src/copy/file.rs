//! Single file copy operations.
//!
//! [`transfer`] picks a [`CopyStrategy`] from the origin's size and runs it.
//! The caller (the job runner) has already checked that the origin exists
//! and is a regular file.

use crate::error::CopyError;
use crate::options::TransferOptions;
use crate::utils::path::safe_path;
use std::fmt;
use std::fs::{File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;

use super::utils::{preserve_permissions, preserve_timestamps};

/// How a file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Whole-file copy into a temp file, renamed over the target
    Direct,
    /// Fixed-size buffered streaming, metadata applied afterwards
    Chunked,
}

impl CopyStrategy {
    /// Choose the strategy for a file of `size` bytes.
    ///
    /// Files of at least `threshold` bytes are chunked.
    #[inline]
    #[must_use]
    pub fn select(size: u64, threshold: u64) -> Self {
        if size >= threshold {
            Self::Chunked
        } else {
            Self::Direct
        }
    }

    /// Human readable name, as used in failure reasons
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::Chunked => "Chunked",
        }
    }
}

impl fmt::Display for CopyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    /// Strategy that was used
    pub strategy: CopyStrategy,
    /// Number of bytes written to the target
    pub bytes: u64,
}

/// Result of running a copy strategy.
pub type CopyOutcome = std::result::Result<Transferred, CopyError>;

/// Copy `origin` to `target` with the strategy selected for its size.
///
/// `origin_meta` must be the metadata of `origin`; its length drives the
/// strategy choice and its permissions and timestamps are applied to the
/// target.
///
/// # Errors
///
/// Returns a [`CopyError`] tagged with the strategy that failed. A failed
/// chunked copy leaves whatever was already written in place.
pub fn transfer(
    origin: &Path,
    target: &Path,
    origin_meta: &Metadata,
    options: &TransferOptions,
) -> CopyOutcome {
    let strategy = CopyStrategy::select(origin_meta.len(), options.large_file_threshold);
    let result = match strategy {
        CopyStrategy::Direct => copy_direct(origin, target, origin_meta, options),
        CopyStrategy::Chunked => copy_chunked(origin, target, origin_meta, options),
    };

    match result {
        Ok(bytes) => Ok(Transferred { strategy, bytes }),
        Err(source) => Err(CopyError { strategy, source }),
    }
}

fn copy_direct(
    origin: &Path,
    target: &Path,
    origin_meta: &Metadata,
    options: &TransferOptions,
) -> io::Result<u64> {
    let mut src_file = File::open(safe_path(origin))?;

    // Temp file lives next to the target so the final rename stays on one volume
    let dst_parent = target.parent().unwrap_or(Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(safe_path(dst_parent))?;

    let bytes = io::copy(&mut src_file, temp_file.as_file_mut())?;

    if options.fsync {
        temp_file.as_file().sync_all()?;
    }
    preserve_permissions(origin_meta, temp_file.path())?;

    temp_file
        .persist(safe_path(target))
        .map_err(|e| e.error)?;

    if options.preserve_timestamps {
        apply_timestamps(origin_meta, target);
    }

    Ok(bytes)
}

fn copy_chunked(
    origin: &Path,
    target: &Path,
    origin_meta: &Metadata,
    options: &TransferOptions,
) -> io::Result<u64> {
    let mut src_file = File::open(safe_path(origin))?;
    let mut dst_file = File::create(safe_path(target))?;

    // Never allocate more than the file needs
    let file_len = usize::try_from(origin_meta.len()).unwrap_or(usize::MAX);
    let mut buffer = vec![0u8; options.chunk_size.min(file_len).max(1)];
    let copied = copy_chunks(&mut src_file, &mut dst_file, &mut buffer)?;

    if options.fsync {
        dst_file.sync_all()?;
    }
    drop(dst_file);

    preserve_permissions(origin_meta, &safe_path(target))?;
    if options.preserve_timestamps {
        apply_timestamps(origin_meta, target);
    }

    Ok(copied)
}

/// Stream `src` into `dst` one `buffer` at a time.
///
/// On error, everything written so far stays in `dst`.
fn copy_chunks<R: Read, W: Write>(
    src: &mut R,
    dst: &mut W,
    buffer: &mut [u8],
) -> io::Result<u64> {
    let mut copied: u64 = 0;
    loop {
        let read = match src.read(buffer) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buffer[..read])?;
        copied += read as u64;
    }
}

// Timestamp errors are not fatal: some shares refuse SetFileTime.
fn apply_timestamps(origin_meta: &Metadata, target: &Path) {
    if let Err(e) = preserve_timestamps(origin_meta, &safe_path(target)) {
        tracing::debug!(path = %target.display(), error = %e, "could not preserve timestamps");
    }
}

// =============================================================================
// Tests
// =============================================================================
