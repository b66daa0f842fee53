//! Common test utilities for integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch workspace with `in/` and `out/` directories, a configuration
/// file pointing at them and a job list.
pub struct TestFixture {
    pub root: TempDir,
}

impl TestFixture {
    /// Create a fixture whose configuration only sets the base paths.
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Create a fixture with extra `Key = Value` lines in the configuration.
    pub fn with_config(extra: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(root.path().join("in")).expect("Failed to create origin dir");
        fs::create_dir_all(root.path().join("out")).expect("Failed to create target dir");

        let fixture = Self { root };
        let config = format!(
            "[DEFAULT]\nOriginPath = {}\nTargetPath = {}\n{extra}\n",
            fixture.origin().display(),
            fixture.target().display()
        );
        fs::write(fixture.config_path(), config).expect("Failed to write config");
        fixture
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn origin(&self) -> PathBuf {
        self.path("in")
    }

    pub fn target(&self) -> PathBuf {
        self.path("out")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("config.ini")
    }

    pub fn jobs_path(&self) -> PathBuf {
        self.path("FileTransfers.csv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.path("FileTransfers_metadata.csv")
    }

    /// Write a file under `in/`.
    pub fn origin_file(&self, rel: &str, content: impl AsRef<[u8]>) {
        let path = self.origin().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(path, content).expect("Failed to write file");
    }

    /// Write the job list.
    pub fn jobs(&self, csv: &str) {
        fs::write(self.jobs_path(), csv).expect("Failed to write job list");
    }

    /// `bxfer` running inside the workspace with a non-interactive stdin.
    pub fn bxfer(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("bxfer");
        cmd.current_dir(self.root.path())
            .env_remove("RUST_LOG")
            .env_remove("BXFER_PASSWORD")
            .write_stdin("")
            .arg("-c")
            .arg(self.config_path());
        cmd
    }

    /// Report rows (header excluded).
    pub fn report_rows(&self) -> Vec<String> {
        read_rows(&self.report_path())
    }
}

/// Non-header lines of a report file.
pub fn read_rows(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read report")
        .lines()
        .skip(1)
        .map(str::to_owned)
        .collect()
}

/// Header line of a report file.
pub fn read_header(path: &Path) -> String {
    fs::read_to_string(path)
        .expect("Failed to read report")
        .lines()
        .next()
        .unwrap_or_default()
        .to_owned()
}
