//! Path resolution for job rows.
//!
//! Origins and targets in a job list may be absolute, UNC (`\\server\share`)
//! or relative to a configured base directory. Everything here is pure path
//! algebra: nothing touches the filesystem and nothing can fail.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

const UNC_PREFIX: &str = r"\\";

/// Returns `true` if `raw` is a UNC path (`\\server\share\...`).
#[inline]
pub fn is_unc(raw: &str) -> bool {
    raw.starts_with(UNC_PREFIX)
}

/// Returns `true` if `raw` should not be joined under a base directory.
///
/// UNC paths count as absolute on every platform.
#[inline]
pub fn is_absolute(raw: &str) -> bool {
    is_unc(raw) || Path::new(raw).is_absolute()
}

/// Resolve a raw job path against `base` and normalize the result.
///
/// Absolute and UNC paths ignore `base`. Relative paths are joined under it.
///
/// # Example
///
/// ```
/// use bulkxfer::resolve;
/// use std::path::{Path, PathBuf};
///
/// # #[cfg(unix)]
/// assert_eq!(
///     resolve("reports/../q3//summary.pdf", Path::new("/srv/in")),
///     PathBuf::from("/srv/in/q3/summary.pdf"),
/// );
/// ```
pub fn resolve(raw: &str, base: &Path) -> PathBuf {
    if is_absolute(raw) {
        return normalize_raw(raw);
    }

    let base_str = base.to_string_lossy();
    if is_unc(&base_str) {
        return normalize_unc(&format!(r"{base_str}\{raw}"));
    }

    normalize(&base.join(raw))
}

fn normalize_raw(raw: &str) -> PathBuf {
    if is_unc(raw) {
        normalize_unc(raw)
    } else {
        normalize(Path::new(raw))
    }
}

/// Lexically normalize a path.
///
/// Repeated separators and `.` segments disappear, `..` removes the previous
/// normal component. `..` never climbs above a root; on a relative path with
/// nothing left to remove it is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Normalize a UNC path independently of the host platform.
///
/// The server and share segments form the root; `..` cannot remove them.
/// Both `\` and `/` are accepted as separators, `\` is emitted.
fn normalize_unc(raw: &str) -> PathBuf {
    let rest = raw.trim_start_matches(['\\', '/']);
    let mut segments = rest.split(['\\', '/']).filter(|s| !s.is_empty());

    let mut root: Vec<&str> = Vec::with_capacity(2);
    root.extend(segments.by_ref().take(2));

    let mut tail: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "." => {}
            ".." => {
                tail.pop();
            }
            other => tail.push(other),
        }
    }

    let mut out = String::from(UNC_PREFIX);
    out.push_str(&root.join(r"\"));
    for segment in tail {
        out.push('\\');
        out.push_str(segment);
    }
    PathBuf::from(out)
}

/// Make a configured base directory absolute.
///
/// An empty base means the current directory. UNC bases are kept as they are.
///
/// # Errors
///
/// Fails if the current directory cannot be determined.
pub fn absolute_base(base: &Path) -> std::io::Result<PathBuf> {
    if is_unc(&base.to_string_lossy()) {
        return Ok(normalize_unc(&base.to_string_lossy()));
    }
    if base.as_os_str().is_empty() {
        return std::env::current_dir();
    }
    Ok(normalize(&std::path::absolute(base)?))
}

/// Split a resolved path into its parent directory and file name.
///
/// Returns `None` when the path has no file name (a root, a bare UNC share,
/// or a trailing `..`). UNC paths are split on `\` on every platform.
pub(crate) fn split_file_name(path: &Path) -> Option<(PathBuf, OsString)> {
    let raw = path.to_string_lossy();
    if !cfg!(windows) && is_unc(&raw) {
        let (parent, name) = raw.rsplit_once('\\')?;
        // parent must still hold `\\server\share`
        let depth = parent.trim_start_matches('\\').split('\\').count();
        if depth < 2 || name.is_empty() {
            return None;
        }
        return Some((PathBuf::from(parent), OsString::from(name)));
    }

    let name = path.file_name()?;
    let parent = path.parent().unwrap_or(Path::new("."));
    Some((parent.to_path_buf(), name.to_os_string()))
}

/// Inverse of [`split_file_name`].
pub(crate) fn join_file_name(parent: &Path, name: &OsStr) -> PathBuf {
    let raw = parent.to_string_lossy();
    if !cfg!(windows) && is_unc(&raw) {
        return PathBuf::from(format!(r"{raw}\{}", name.to_string_lossy()));
    }
    parent.join(name)
}

/// Build a `file:///` URI for `path`, with `\` separators turned into `/`.
pub fn file_uri(path: &Path) -> String {
    let forward = path.to_string_lossy().replace('\\', "/");
    format!("file:///{}", forward.trim_start_matches('/'))
}

/// Convert a path for safe use with file operations.
///
/// On Windows, absolute paths get the extended-length prefix (`\\?\` or
/// `\\?\UNC\`) so deep target trees are not limited by MAX_PATH. Inputs are
/// expected to be normalized already, since the prefix disables the OS's own
/// normalization.
#[cfg(windows)]
pub fn safe_path(path: &Path) -> PathBuf {
    let raw = path.as_os_str().to_string_lossy();
    if raw.starts_with(r"\\?\") || !path.is_absolute() {
        return path.to_path_buf();
    }
    if let Some(unc) = raw.strip_prefix(UNC_PREFIX) {
        return PathBuf::from(format!(r"\\?\UNC\{unc}"));
    }
    PathBuf::from(format!(r"\\?\{raw}"))
}

/// Convert a path for safe use with file operations.
///
/// On non-Windows platforms, this simply returns a clone of the input path.
#[cfg(not(windows))]
pub fn safe_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
