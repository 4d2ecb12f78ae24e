// crates/ilwe-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that run the ilwe binary.
// Purpose: Ensure commands load config, print results, and fail closed.
// Dependencies: ilwe binary
// ============================================================================

//! ## Overview
//! Runs the CLI binary against temporary configs with tiny instance families
//! so every command finishes quickly.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Path of the compiled `ilwe` binary.
fn ilwe_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ilwe"))
}

/// Writes a small-family config rooted in `dir` and returns its path.
fn write_config(dir: &Path, status: &str) -> PathBuf {
    let status_path = dir.join("status");
    fs::write(&status_path, status).unwrap();
    let config = format!(
        r#"
[experiment]
dimension = 8
attempts = 4
max_samples = 200
contamination_rates = [0.0]
methods = ["l2"]

[estimators]
timeout_ms = 5000

[store]
path = "{store}"

[logging]
sink = "none"

[control]
status_file = "{status}"
"#,
        store = dir.join("ilwe.db").display(),
        status = status_path.display(),
    );
    let path = dir.join("ilwe.toml");
    fs::write(&path, config).unwrap();
    path
}

/// Runs the binary with `--config` and the given arguments.
fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(ilwe_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run ilwe")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_validate_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "run");
    let output = run(&config, &["config", "validate"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config valid"), "unexpected stdout: {stdout}");
}

#[test]
fn config_validate_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ilwe.toml");
    fs::write(&config, "[experiment]\nattempts = 0\n").unwrap();
    let output = run(&config, &["config", "validate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"), "unexpected stderr: {stderr}");
}

#[test]
fn solve_prints_comparison_table() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "run");
    let output = run(
        &config,
        &["solve", "--samples", "40", "--contamination", "0", "--methods", "l2,cauchy"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("m=40 n=8"), "unexpected stdout: {stdout}");
    assert!(stdout.contains("| L2"), "unexpected stdout: {stdout}");
    assert!(stdout.contains("| cauchy"), "unexpected stdout: {stdout}");
}

#[test]
fn solve_rejects_out_of_range_rate() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "run");
    let output = run(&config, &["solve", "--contamination", "1.5"]);
    assert!(!output.status.success());
}

#[test]
fn search_then_report_reads_back_results() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "run");

    let output = run(&config, &["search"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("L2 p=0: m_good="), "unexpected stdout: {stdout}");

    let output = run(&config, &["report"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("| p "), "unexpected stdout: {stdout}");
    assert!(stdout.contains("| 0 "), "unexpected stdout: {stdout}");
}

#[test]
fn search_stops_when_status_file_is_not_run() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "stop");
    let output = run(&config, &["search"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("search stopped"), "unexpected stdout: {stdout}");
}

#[test]
fn recover_emits_json_report() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "run");
    let data = dir.path().join("data.json");
    let predictions = dir.path().join("predictions.json");
    // Secret [1, -1]; rows of rot(c) for c = [1, 0] and [0, 1].
    fs::write(
        &data,
        r#"{"s1": [[1, -1]], "y": [0, 0, 1, 0], "z": [1.0, -1.0, 1.0, 1.0],
            "c": [[1, 0], [1, 0], [0, 1], [0, 1]], "poly": [0, 0, 0, 0], "coeff": [0, 1, 1, 0]}"#,
    )
    .unwrap();
    fs::write(&predictions, "[1, 1, 1, 1]").unwrap();

    let output = run(
        &config,
        &[
            "recover",
            "--data",
            data.to_str().unwrap(),
            "--predictions",
            predictions.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["statistics"]["positives"], 4);
    assert_eq!(report["polynomials"][0]["equations"], 4);
}
