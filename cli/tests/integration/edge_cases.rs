//! Edge case integration tests for bxfer CLI.
//!
//! Malformed rows, awkward CSV quoting, colliding targets and serial runs.

#[path = "../common/mod.rs"]
mod common;

use common::TestFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_ragged_rows_fail_individually() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.origin_file("b.txt", "b");
    fx.jobs(
        "Origin,Target,Owner\n\
         a.txt,a.txt,alice\n\
         b.txt\n\
         b.txt,b.txt\n",
    );

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    let rows = fx.report_rows();
    assert_eq!(rows.len(), 3);
    assert!(
        rows.iter()
            .any(|r| r.contains("Failure: Unexpected error: row has no target field"))
    );
    assert!(fx.target().join("a.txt").is_file());
    assert!(fx.target().join("b.txt").is_file());
}

#[test]
fn test_directory_origin_is_rejected() {
    let fx = TestFixture::new();
    fs::create_dir_all(fx.origin().join("folder")).unwrap();
    fx.jobs("Origin,Target\nfolder,folder.txt\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    let rows = fx.report_rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains("Failure: Origin path is not a file"));
    assert!(!fx.target().join("folder.txt").exists());
}

#[test]
fn test_targets_colliding_after_sanitizing_both_succeed() {
    let fx = TestFixture::new();
    fx.origin_file("one.txt", "first");
    fx.origin_file("two.txt", "second");
    fx.jobs(
        "Origin,Target\n\
         one.txt,a<b.txt\n\
         two.txt,a>b.txt\n",
    );

    // both jobs land in the same wave
    fx.bxfer()
        .arg("-j")
        .arg("2")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 2 files"));

    let content = fs::read_to_string(fx.target().join("a_b.txt")).unwrap();
    assert!(content == "first" || content == "second", "{content}");
    let rows = fx.report_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.ends_with(",Success,0100000")));
}

#[test]
fn test_quoted_fields_with_commas() {
    let fx = TestFixture::new();
    fx.origin_file("q1, final.txt", "quoted");
    fx.jobs(
        "Origin,Target,Note\n\
         \"q1, final.txt\",\"reports/q1, final.txt\",\"says \"\"hi\"\"\"\n",
    );

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert_eq!(
        fs::read_to_string(fx.target().join("reports").join("q1, final.txt")).unwrap(),
        "quoted"
    );
    let rows = fx.report_rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("\"says \"\"hi\"\"\","));
}

#[test]
fn test_empty_job_list_writes_header_only() {
    let fx = TestFixture::new();
    fx.jobs("Origin,Target,Owner\n");

    fx.bxfer()
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 0 files"));

    assert_eq!(
        common::read_header(&fx.report_path()),
        "Owner,Origin Hyperlink,Target Hyperlink,Transfer Status,Illegal_Char_Mask"
    );
    assert!(fx.report_rows().is_empty());
}

#[test]
fn test_absolute_paths_ignore_bases() {
    let fx = TestFixture::new();
    let elsewhere = fx.path("elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    fs::write(elsewhere.join("abs.txt"), "absolute").unwrap();
    let dest = fx.path("dest/abs.txt");
    fx.jobs(&format!(
        "Origin,Target\n{},{}\n",
        elsewhere.join("abs.txt").display(),
        dest.display()
    ));

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert_eq!(fs::read_to_string(dest).unwrap(), "absolute");
    assert!(fs::read_dir(fx.target()).unwrap().next().is_none());
}

#[test]
fn test_non_ascii_target_name_is_sanitized() {
    let fx = TestFixture::new();
    fx.origin_file("cafe.txt", "coffee");
    fx.jobs("Origin,Target\ncafe.txt,caf\u{e9}.txt\n");

    fx.bxfer().arg(fx.jobs_path()).assert().success();

    assert!(fx.target().join("caf_.txt").is_file());
    let rows = fx.report_rows();
    assert!(rows[0].ends_with(",Success,00010000"));
}

#[test]
fn test_single_worker_processes_in_order() {
    let fx = TestFixture::new();
    let mut csv = String::from("Origin,Target\n");
    for i in 0..10 {
        fx.origin_file(&format!("f{i}.txt"), format!("{i}"));
        csv.push_str(&format!("f{i}.txt,f{i}.txt\n"));
    }
    fx.jobs(&csv);

    fx.bxfer().arg("-j").arg("1").arg(fx.jobs_path()).assert().success();

    let rows = fx.report_rows();
    assert_eq!(rows.len(), 10);
    for (i, row) in rows.iter().enumerate() {
        assert!(
            row.contains(&format!("f{i}.txt")),
            "row {i} out of order: {row}"
        );
    }
}
