//! Plan and output contract tests for bxfer CLI.

#[path = "../common/mod.rs"]
mod common;

use common::TestFixture;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

#[test]
fn test_plan_json_contract_and_no_mutation() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "hello plan");
    fx.jobs(
        "Origin,Target,Owner\n\
         a.txt,docs/a.txt,alice\n\
         b.txt,,bob\n",
    );

    let output = fx
        .bxfer()
        .arg("--plan")
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
    assert_eq!(payload["mode"], "plan");
    assert_eq!(payload["parallel"], 4);
    assert_eq!(
        payload["report_path"],
        fx.report_path().display().to_string()
    );
    assert_eq!(payload["target_base"], fx.target().display().to_string());
    assert_eq!(
        payload["header"],
        serde_json::json!(["Origin", "Target", "Owner"])
    );

    let items = payload["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["row"], 0);
    assert_eq!(
        items[0]["origin"],
        fx.origin().join("a.txt").display().to_string()
    );
    assert_eq!(
        items[0]["target"],
        fx.target().join("docs").join("a.txt").display().to_string()
    );
    assert_eq!(items[0]["renamed"], false);
    assert_eq!(items[0]["mask"], "00000");
    assert_eq!(items[1]["row"], 1);
    assert_eq!(
        items[1]["error"],
        "Unexpected error: row has no target field"
    );

    // Planning neither copies nor writes the report
    assert!(!fx.target().join("docs").exists());
    assert!(!fx.report_path().exists());
}

#[test]
fn test_plan_human_marks_renames_and_failures() {
    let fx = TestFixture::new();
    fx.origin_file("x.txt", "x");
    fx.jobs(
        "Origin,Target\n\
         x.txt,clean.txt\n\
         x.txt,what?.txt\n\
         ,orphan.txt\n",
    );

    fx.bxfer()
        .arg("-n")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan (3 jobs):"))
        .stdout(predicate::str::contains("  row 1: "))
        .stdout(predicate::str::contains("what_.txt  [renamed]"))
        .stdout(predicate::str::contains(
            "  row 2: fail: Unexpected error: row has no origin field",
        ))
        .stdout(predicate::str::contains(format!(
            "Report: {}",
            fx.report_path().display()
        )));

    assert!(fs::read_dir(fx.target()).unwrap().next().is_none());
}

#[test]
fn test_plan_respects_threads_override() {
    let fx = TestFixture::with_config("Threads = 2");
    fx.jobs("Origin,Target\n");

    let output = fx
        .bxfer()
        .arg("--plan")
        .arg("--output")
        .arg("json")
        .arg("-j")
        .arg("7")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(payload["parallel"], 7);
    assert!(payload["items"].as_array().unwrap().is_empty());
}

#[test]
fn test_dry_run_alias() {
    let fx = TestFixture::new();
    fx.origin_file("a.txt", "a");
    fx.jobs("Origin,Target\na.txt,a.txt\n");

    fx.bxfer()
        .arg("--dry-run")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan (1 jobs):"));

    assert!(!fx.target().join("a.txt").exists());
}

#[test]
fn test_plan_with_timestamp_dir_does_not_create_it() {
    let fx = TestFixture::with_config("AutoTimestampDir = True");
    fx.jobs("Origin,Target\n");

    let output = fx
        .bxfer()
        .arg("--plan")
        .arg("--output")
        .arg("json")
        .arg(fx.jobs_path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: Value = serde_json::from_slice(&output).unwrap();
    let base = payload["target_base"].as_str().unwrap();
    assert!(base.starts_with(&fx.target().display().to_string()));
    assert!(fs::read_dir(fx.target()).unwrap().next().is_none());
}
