//! INI configuration.
//!
//! The configuration file holds the base directories, the worker count, the
//! sanitization switches, the metadata selection and optional alternate
//! credentials. Keys live in a `[DEFAULT]` section (or before any section)
//! and are matched case-insensitively.
//!
//! ```ini
//! [DEFAULT]
//! OriginPath = \\fs01\intake
//! TargetPath = D:\archive
//! Threads = 8
//! AutoTimestampDir = True
//! MetadataFields = 1,3
//! ```

use crate::error::{Error, Result};
use crate::options::{FieldSelection, TransferOptions};
use chrono::{DateTime, Local};
use ini::{Ini, ParseOption};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Format of the per-run directory created under `TargetPath`.
pub const TIMESTAMP_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

const KEY_ORIGIN: &str = "OriginPath";
const KEY_TARGET: &str = "TargetPath";
const KEY_THREADS: &str = "Threads";
const KEY_TIMESTAMP_DIR: &str = "AutoTimestampDir";
const KEY_DOUBLE_EXT: &str = "SanitizeDoubleExt";
const KEY_STRIP: &str = "StripIllegalChars";
const KEY_FIELDS: &str = "MetadataFields";
const KEY_CHUNK: &str = "ChunkSizeMB";
const KEY_THRESHOLD: &str = "LargeFileThresholdMB";
const KEY_USERNAME: &str = "Username";
const KEY_PASSWORD: &str = "Password";

/// Settings loaded from the configuration file.
#[derive(Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Base for relative origins (empty: current directory)
    pub origin_path: PathBuf,
    /// Base for relative targets (empty: current directory)
    pub target_path: PathBuf,
    /// Concurrent jobs (default: 4)
    pub threads: usize,
    /// Put targets in a fresh `YYYYMMDD_HHMMSS` directory (default: false)
    pub auto_timestamp_dir: bool,
    /// Collapse multi-dot filenames (default: true)
    pub sanitize_double_ext: bool,
    /// Replace illegal filename characters (default: true)
    pub strip_illegal_chars: bool,
    /// Extra fields carried into the report (default: all)
    pub metadata_fields: FieldSelection,
    /// Chunk size for large files in MiB (default: 16)
    pub chunk_size_mb: u64,
    /// Files at least this many MiB are chunked (default: 100)
    pub large_file_threshold_mb: u64,
    /// Alternate account in `DOMAIN\user` form
    pub username: Option<String>,
    /// Password for `username`
    pub password: Option<String>,
}

impl std::fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferConfig")
            .field("origin_path", &self.origin_path)
            .field("target_path", &self.target_path)
            .field("threads", &self.threads)
            .field("auto_timestamp_dir", &self.auto_timestamp_dir)
            .field("sanitize_double_ext", &self.sanitize_double_ext)
            .field("strip_illegal_chars", &self.strip_illegal_chars)
            .field("metadata_fields", &self.metadata_fields)
            .field("chunk_size_mb", &self.chunk_size_mb)
            .field("large_file_threshold_mb", &self.large_file_threshold_mb)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            origin_path: PathBuf::new(),
            target_path: PathBuf::new(),
            threads: 4,
            auto_timestamp_dir: false,
            sanitize_double_ext: true,
            strip_illegal_chars: true,
            metadata_fields: FieldSelection::All,
            chunk_size_mb: 16,
            large_file_threshold_mb: 100,
            username: None,
            password: None,
        }
    }
}

impl TransferConfig {
    /// Load the configuration file at `path`.
    ///
    /// Backslashes are taken literally, so Windows and UNC paths need no
    /// escaping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] if the file does not exist,
    /// [`Error::Config`] if it is not valid INI, and
    /// [`Error::InvalidOption`] for unusable values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let opt = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_file_opt(path, opt).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let pairs = ini
            .iter()
            .filter(|(section, _)| section.is_none_or(|s| s.eq_ignore_ascii_case("default")))
            .flat_map(|(_, props)| props.iter());
        let config = Self::from_pairs(pairs)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Build a configuration from key/value pairs.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored. Later
    /// pairs override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for unusable values.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            let is = |name: &str| key.trim().eq_ignore_ascii_case(name);

            if is(KEY_ORIGIN) {
                config.origin_path = PathBuf::from(value);
            } else if is(KEY_TARGET) {
                config.target_path = PathBuf::from(value);
            } else if is(KEY_THREADS) {
                config.threads = parse_positive(KEY_THREADS, value)?;
            } else if is(KEY_TIMESTAMP_DIR) {
                config.auto_timestamp_dir = parse_bool(KEY_TIMESTAMP_DIR, value)?;
            } else if is(KEY_DOUBLE_EXT) {
                config.sanitize_double_ext = parse_bool(KEY_DOUBLE_EXT, value)?;
            } else if is(KEY_STRIP) {
                config.strip_illegal_chars = parse_bool(KEY_STRIP, value)?;
            } else if is(KEY_FIELDS) {
                config.metadata_fields = value.parse().unwrap_or_default();
            } else if is(KEY_CHUNK) {
                config.chunk_size_mb = parse_positive(KEY_CHUNK, value)?;
            } else if is(KEY_THRESHOLD) {
                config.large_file_threshold_mb = parse_positive(KEY_THRESHOLD, value)?;
            } else if is(KEY_USERNAME) {
                config.username = non_empty(value);
            } else if is(KEY_PASSWORD) {
                config.password = non_empty(value);
            } else {
                tracing::debug!(key, "ignoring unknown configuration key");
            }
        }
        Ok(config)
    }

    /// Write a configuration file holding the defaults.
    ///
    /// # Errors
    ///
    /// Fails if `path` already exists or cannot be written.
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let defaults = Self::default();
        let mut ini = Ini::new();
        ini.with_section(Some("DEFAULT"))
            .set(KEY_ORIGIN, "")
            .set(KEY_TARGET, "")
            .set(KEY_THREADS, defaults.threads.to_string())
            .set(KEY_TIMESTAMP_DIR, "False")
            .set(KEY_DOUBLE_EXT, "True")
            .set(KEY_STRIP, "True")
            .set(KEY_FIELDS, "All")
            .set(KEY_CHUNK, defaults.chunk_size_mb.to_string())
            .set(KEY_THRESHOLD, defaults.large_file_threshold_mb.to_string())
            .set(KEY_USERNAME, "")
            .set(KEY_PASSWORD, "");

        let mut file = File::create_new(path.as_ref())?;
        ini.write_to(&mut file)?;
        Ok(())
    }

    /// Runtime options derived from this configuration.
    #[must_use]
    pub fn to_options(&self) -> TransferOptions {
        let mut options = TransferOptions::default()
            .with_parallel(self.threads)
            .with_chunk_size_mb(self.chunk_size_mb)
            .with_large_file_threshold_mb(self.large_file_threshold_mb)
            .with_fields(self.metadata_fields.clone());
        if !self.strip_illegal_chars {
            options = options.without_strip_illegal();
        }
        if !self.sanitize_double_ext {
            options = options.without_collapse_extensions();
        }
        options
    }

    /// Target base for a run started at `now`.
    ///
    /// With `AutoTimestampDir`, this is a `YYYYMMDD_HHMMSS` directory under
    /// `TargetPath`; the caller creates it.
    #[must_use]
    pub fn target_base(&self, now: DateTime<Local>) -> PathBuf {
        if self.auto_timestamp_dir {
            self.target_path
                .join(now.format(TIMESTAMP_DIR_FORMAT).to_string())
        } else {
            self.target_path.clone()
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::InvalidOption {
            name,
            value: value.to_owned(),
            reason: "expected True or False",
        }),
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match value.parse::<T>() {
        Ok(n) if n != T::default() => Ok(n),
        _ => Err(Error::InvalidOption {
            name,
            value: value.to_owned(),
            reason: "expected a positive integer",
        }),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}
