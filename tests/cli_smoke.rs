//! CLI-level smoke tests for the `warden` binary (spec.md §6 CLI surface).

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn crawl_then_status_reports_clean_run() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.js"), "const x = 1;\n").unwrap();

    Command::cargo_bin("warden")
        .unwrap()
        .args(["crawl", "--root"])
        .arg(dir.path())
        .assert()
        .success();

    Command::cargo_bin("warden")
        .unwrap()
        .args(["status", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files_scanned"));
}

#[test]
fn status_with_no_prior_run_reports_absence() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("warden")
        .unwrap()
        .args(["status", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no run"));
}
