//! Error handling integration tests for bxfer CLI.
//!
//! Run-level problems (missing inputs, bad configuration, unwritable report)
//! fail the command; failing jobs never do.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_config_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jobs.csv"), "Origin,Target\n").unwrap();

    let mut cmd = cargo_bin_cmd!("bxfer");
    cmd.current_dir(dir.path())
        .write_stdin("")
        .arg("jobs.csv")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("error[invalid_input]"))
        .stderr(predicate::str::contains("Configuration file not found"));

    assert!(!dir.path().join("config.ini").exists());
}

#[test]
fn test_missing_job_list_argument() {
    let fx = TestFixture::new();

    fx.bxfer()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No job list given"));
}

#[test]
fn test_job_list_does_not_exist() {
    let fx = TestFixture::new();

    fx.bxfer()
        .arg(fx.path("nope.csv"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Job source does not exist"));
}

#[test]
fn test_invalid_config_value() {
    let fx = TestFixture::with_config("Threads = many");
    fx.jobs("Origin,Target\n");

    fx.bxfer()
        .arg(fx.jobs_path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("error[config]"))
        .stderr(predicate::str::contains("Invalid value for Threads"));
}

#[test]
fn test_failed_jobs_do_not_fail_command() {
    let fx = TestFixture::new();
    fx.origin_file("ok.txt", "fine");
    fs::create_dir_all(fx.origin().join("a_directory")).unwrap();
    fx.jobs(
        "Origin,Target\n\
         ok.txt,ok.txt\n\
         ghost.txt,ghost.txt\n\
         a_directory,dir.txt\n",
    );

    fx.bxfer()
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 1 of 3 files"))
        .stdout(predicate::str::contains("2 failed"));

    let rows = fx.report_rows();
    assert_eq!(rows.len(), 3);
    let ghost = fx.origin().join("ghost.txt");
    let missing = format!("Failure: Origin file does not exist: {}", ghost.display());
    assert!(rows.iter().any(|r| r.contains(&missing)));
    assert!(rows.iter().any(|r| r.contains("Failure: Origin path is not a file: ")));
}

#[test]
fn test_init_config_writes_defaults_once() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("site.ini");

    let mut cmd = cargo_bin_cmd!("bxfer");
    cmd.arg("--init-config")
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("with defaults"));

    let text = fs::read_to_string(&config).unwrap();
    assert!(text.contains("[DEFAULT]"));
    assert!(text.contains("Threads=4"));
    assert!(text.contains("MetadataFields=All"));

    let mut again = cargo_bin_cmd!("bxfer");
    again
        .arg("--init-config")
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unwritable_report_location() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer()
        .arg("--report")
        .arg(fx.path("no/such/dir/report.csv"))
        .arg(fx.jobs_path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error[report]"));

    assert!(!fx.target().join("a.txt").exists());
}

#[test]
fn test_username_without_password_runs_as_current_user() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer()
        .arg("--username")
        .arg(r"CORP\svc_transfer")
        .arg(fx.jobs_path())
        .assert()
        .success();

    assert!(fx.target().join("a.txt").is_file());
}

#[test]
fn test_invalid_output_mode() {
    let fx = TestFixture::new();

    fx.bxfer()
        .arg("--output")
        .arg("yaml")
        .arg(fx.jobs_path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_password_flag_is_not_accepted() {
    let fx = TestFixture::new();
    fx.jobs("Origin,Target\n");

    fx.bxfer()
        .arg("--username")
        .arg(r"CORP\svc_transfer")
        .arg("--password")
        .arg("hunter2")
        .arg(fx.jobs_path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_impersonation_failure_falls_back_to_current_user() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    let output = fx
        .bxfer()
        .env("BXFER_PASSWORD", "not-a-real-password")
        .arg("--username")
        .arg(r"NOSUCHDOMAIN\nobody")
        .arg("--output")
        .arg("json")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stderr(predicate::str::contains("proceeding with current user credentials"))
        .get_output()
        .stdout
        .clone();

    let payload: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(payload["impersonated"].is_null());
    assert_eq!(payload["succeeded"], 1);
}

#[test]
fn test_configured_username_without_password() {
    let fx = TestFixture::with_config(r"Username = CORP\svc_transfer");
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer()
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stderr(predicate::str::contains("no password given"));

    assert!(fx.target().join("a.txt").is_file());
}
