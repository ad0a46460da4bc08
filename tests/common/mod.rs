//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Helper to get an fpt command
pub fn fpt() -> Command {
    Command::new(cargo::cargo_bin!("fpt"))
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fpt().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Extract the first BAT- id from a command's stdout
pub fn extract_batch_id(stdout: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .split_whitespace()
        .find(|w| w.starts_with("BAT-"))
        .map(|s| s.trim_end_matches(|c: char| !c.is_ascii_alphanumeric()).to_string())
        .unwrap_or_default()
}

/// Helper to register an intake batch, returning its id
pub fn intake_batch(tmp: &TempDir, variety: &str, stated: f64, actual: f64) -> String {
    let output = fpt()
        .current_dir(tmp.path())
        .args([
            "batch",
            "intake",
            "--variety",
            variety,
            "--origin",
            "field-7",
            "--stated",
            &stated.to_string(),
            "--actual",
            &actual.to_string(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    extract_batch_id(&output.stdout)
}

/// Drive a batch to ready-for-packaging with its whole mass in grade A
pub fn make_ready_batch(tmp: &TempDir, variety: &str, mass: f64) -> String {
    let id = intake_batch(tmp, variety, mass, mass);

    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--inspector", "qa-1"])
        .assert()
        .success();

    fpt()
        .current_dir(tmp.path())
        .args(["grade", &id, "-g", &format!("a={}", mass)])
        .assert()
        .success();

    fpt()
        .current_dir(tmp.path())
        .args(["clean", &id, "--yes"])
        .assert()
        .success();

    id
}
