//! Corruption recovery tests for the pushup binary.
//!
//! These tests verify the system can handle:
//! - Corrupted settings files
//! - Settings with wrong-typed values
//! - Missing data directories
//! - Leftover temp files from interrupted writes

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MONDAY_MORNING: &str = "2026-01-12T09:00:00Z";

fn cli_at(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pushup"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--now")
        .arg(MONDAY_MORNING);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_settings_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("settings.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted settings");

    cli_at(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome"));

    // The next write replaces the corrupt file with a valid one
    cli_at(data_dir).arg("start").assert().success();
    let contents = fs::read_to_string(data_dir.join("settings.json")).unwrap();
    let settings: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(settings["challenge_started"], true);
}

#[test]
fn test_settings_not_an_object() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("settings.json"), "[1, 2, 3]").unwrap();

    cli_at(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome"));
}

#[test]
fn test_wrong_typed_values_read_as_absent() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let settings = serde_json::json!({
        "start_date": "not a date",
        "base_pushups": "forty",
        "daily_pushup_totals": { "bogus": 12, "2026-01-11": -3 },
        "timer_state": "sprinting",
        "challenge_started": "yes"
    });
    fs::write(data_dir.join("settings.json"), settings.to_string()).unwrap();

    cli_at(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome"));

    cli_at(data_dir)
        .arg("progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pushups logged yet"));
}

#[test]
fn test_empty_settings_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("settings.json"), "").unwrap();

    cli_at(data_dir).arg("start").assert().success();
    cli_at(data_dir)
        .args(["max-test", "25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Target: 25 pushups"));
}

#[test]
fn test_missing_data_dir_is_created() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("nested").join("pushup");

    cli_at(&data_dir).arg("start").assert().success();

    assert!(data_dir.join("settings.json").exists());
}

#[test]
fn test_leftover_temp_file_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir).arg("start").assert().success();
    cli_at(data_dir).args(["max-test", "30"]).assert().success();

    // Simulate a write interrupted before the rename
    fs::write(data_dir.join(".tmpABC123"), "{\"base_pushups\": 999").unwrap();

    let output = cli_at(data_dir)
        .args(["status", "--json"])
        .output()
        .expect("Failed to run status");
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["baseline"], 30);
    assert_eq!(status["mode"], "active");
}

#[test]
fn test_out_of_range_interval_does_not_crash() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir).arg("start").assert().success();
    cli_at(data_dir).args(["max-test", "30"]).assert().success();

    let path = data_dir.join("settings.json");
    let mut settings: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    settings["current_frequency"] = serde_json::json!(100_000_000);
    settings["time_remaining_seconds"] = serde_json::json!(0);
    fs::write(&path, settings.to_string()).unwrap();

    let output = cli_at(data_dir)
        .args(["status", "--json"])
        .output()
        .expect("Failed to run status");
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["mode"], "next_day");
    assert_eq!(status["interval_minutes"], 60);
}
