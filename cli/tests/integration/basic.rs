//! Basic functionality integration tests for bxfer CLI.

#[path = "../common/mod.rs"]
mod common;

use common::{TestFixture, read_header, read_rows};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

#[test]
fn test_transfers_files_and_writes_report() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "alpha");
    fx.origin_file("sub/b.txt", "bravo");
    fx.jobs("Origin,Target,Owner\na.txt,2024/a.txt,alice\nsub/b.txt,2024/q1/b.txt,bob\n");

    fx.bxfer()
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 2 files"))
        .stdout(predicate::str::contains("Metadata written to"));

    assert_eq!(
        fs::read_to_string(fx.target().join("2024/a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        fs::read_to_string(fx.target().join("2024/q1/b.txt")).unwrap(),
        "bravo"
    );

    assert_eq!(
        read_header(&fx.report_path()),
        "Owner,Origin Hyperlink,Target Hyperlink,Transfer Status,Illegal_Char_Mask"
    );
    let rows = fx.report_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.contains(",Success,")));
    assert!(rows.iter().any(|r| r.starts_with("alice,\"=HYPERLINK(\"\"file:///")));
}

#[test]
fn test_sanitizes_target_filename() {
    let fx = TestFixture::new();
    fx.origin_file("invoice.txt", "total: 42");
    fx.jobs("Origin,Target\ninvoice.txt,billing/inv<oice>:1.bak.txt\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert!(fx.target().join("billing/inv_oice_1.txt").is_file());
    let rows = fx.report_rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with(",Success,0001000011000000000"));
}

#[test]
fn test_sanitization_can_be_disabled() {
    let fx = TestFixture::with_config("SanitizeDoubleExt = False");
    fx.origin_file("a.txt", "x");
    fx.jobs("Origin,Target\na.txt,archive.2024.tar.gz\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert!(fx.target().join("archive.2024.tar.gz").is_file());
}

#[test]
fn test_large_file_uses_chunked_copy() {
    let fx = TestFixture::with_config("LargeFileThresholdMB = 1\nChunkSizeMB = 1");
    let content: Vec<u8> = (0..3 * 1024 * 1024 + 17).map(|i| (i % 251) as u8).collect();
    fx.origin_file("big.bin", &content);
    fx.jobs("Origin,Target\nbig.bin,big.bin\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert_eq!(fs::read(fx.target().join("big.bin")).unwrap(), content);
}

#[test]
fn test_json_summary() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "12345");
    fx.jobs("Origin,Target\na.txt,a.txt\nmissing.txt,m.txt\n");

    let output = fx
        .bxfer()
        .arg("--output")
        .arg("json")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(payload["schema_version"], "1.0");
    assert_eq!(payload["mode"], "execute");
    assert_eq!(payload["total"], 2);
    assert_eq!(payload["succeeded"], 1);
    assert_eq!(payload["failed"], 1);
    assert_eq!(payload["bytes_copied"], 5);
    assert_eq!(
        payload["report_path"],
        fx.report_path().display().to_string()
    );
}

#[test]
fn test_custom_report_path() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");
    let report = fx.path("reports.csv");

    fx.bxfer()
        .arg("--report")
        .arg(&report)
        .arg(fx.jobs_path())
        .assert()
        .success();

    assert_eq!(read_rows(&report).len(), 1);
    assert!(!fx.report_path().exists());
}

#[test]
fn test_metadata_field_selection() {
    let fx = TestFixture::with_config("MetadataFields = 3,1");
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target,Owner,Dept,Ticket\na.txt,a.txt,alice,finance,T-7\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert!(read_header(&fx.report_path()).starts_with("Ticket,Owner,Origin Hyperlink"));
    assert!(fx.report_rows()[0].starts_with("T-7,alice,"));
}

#[test]
fn test_timestamp_directory() {
    let fx = TestFixture::with_config("AutoTimestampDir = True");
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    let runs: Vec<_> = fs::read_dir(fx.target())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1);
    let name = runs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name.len(), 15);
    assert_eq!(&name[8..9], "_");
    assert!(runs[0].join("a.txt").is_file());
}

#[test]
fn test_threads_and_streaming_flags() {
    let fx = TestFixture::new();
    let mut csv = String::from("Origin,Target\n");
    for i in 0..25 {
        fx.origin_file(&format!("f{i}.txt"), format!("content {i}"));
        csv.push_str(&format!("f{i}.txt,copies/f{i}.txt\n"));
    }
    fx.jobs(&csv);

    for mode in [&["-j", "3"][..], &["-j", "5", "--streaming"][..]] {
        fx.bxfer()
            .args(mode)
            .arg("--no-sync")
            .arg(fx.jobs_path())
            .assert()
            .success();
        assert_eq!(fx.report_rows().len(), 25);
    }
    assert_eq!(
        fs::read_to_string(fx.target().join("copies/f24.txt")).unwrap(),
        "content 24"
    );
}

#[test]
fn test_log_file_receives_diagnostics() {
    let fx = TestFixture::new();
    fx.jobs("Origin,Target\nmissing.txt,m.txt\n");
    let log = fx.path("bxfer.log");

    fx.bxfer()
        .arg("-v")
        .arg("--log-file")
        .arg(&log)
        .arg(fx.jobs_path())
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("Origin file does not exist"));
}

#[test]
fn test_quiet_prints_nothing() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer()
        .arg("-q")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
