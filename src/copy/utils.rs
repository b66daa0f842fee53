//! Metadata helpers shared by both copy strategies.

use filetime::{FileTime, set_file_times};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Preserve file timestamps (mtime and atime)
pub(crate) fn preserve_timestamps(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(src_meta);
    let atime = FileTime::from_last_access_time(src_meta);
    set_file_times(dst, atime, mtime)
}

/// Copy permissions from the origin's metadata onto `dst`.
pub(crate) fn preserve_permissions(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    fs::set_permissions(dst, src_meta.permissions())
}

// =============================================================================
// Tests
// =============================================================================
