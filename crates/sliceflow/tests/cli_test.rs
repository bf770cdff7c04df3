//! Integration tests for the `sliceflow` CLI binary.
//!
//! Everything runs against the shipped four-switch scenario with the
//! user's configuration and environment isolated away.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sliceflow` binary with env isolation.
fn sliceflow_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sliceflow");
    cmd.env("HOME", "/tmp/sliceflow-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/sliceflow-cli-test-nonexistent")
        .env_remove("SLICEFLOW_PROFILE")
        .env_remove("SLICEFLOW_SCENARIO")
        .env_remove("SLICEFLOW_ADDRESS_MODE")
        .env_remove("SLICEFLOW_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn scenario() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios/four_switch.toml")
        .display()
        .to_string()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sliceflow_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    sliceflow_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("check")
            .and(predicate::str::contains("slices"))
            .and(predicate::str::contains("resolve"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_completions_zsh() {
    sliceflow_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── check ───────────────────────────────────────────────────────────

#[test]
fn test_check_summarizes_scenario() {
    sliceflow_cmd()
        .args(["check", &scenario(), "--color", "never"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("four-switch")
                .and(predicate::str::contains("4 elements, 10 hosts"))
                .and(predicate::str::contains("third")),
        );
}

#[test]
fn test_check_json_counts() {
    let output = sliceflow_cmd()
        .args(["check", &scenario(), "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["elements"], 4);
    assert_eq!(summary["hosts"], 10);
    assert_eq!(summary["slices"].as_array().unwrap().len(), 3);
}

#[test]
fn test_check_rejects_invalid_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
version = 1
name = "bad"

[[hosts]]
name = "h1"
mac = "00:00:00:00:00:01"
ip = "10.0.0.1"

[[elements]]
id = 1
name = "s1"
links = [{ port = 1, peer = "h9" }]
"#,
    )
    .unwrap();

    sliceflow_cmd()
        .args(["check", path.to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("h9"));
}

#[test]
fn test_missing_scenario_is_usage_error() {
    sliceflow_cmd()
        .arg("slices")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("scenario"));
}

// ── slices ──────────────────────────────────────────────────────────

#[test]
fn test_slices_plain_lists_names_in_order() {
    sliceflow_cmd()
        .args(["--scenario", &scenario(), "slices", "-o", "plain"])
        .assert()
        .success()
        .stdout("first\nsecond\nthird\n");
}

// ── resolve ─────────────────────────────────────────────────────────

#[test]
fn test_resolve_first_slice_route() {
    sliceflow_cmd()
        .args([
            "--scenario",
            &scenario(),
            "resolve",
            "-e",
            "s1",
            "-s",
            "h1",
            "-d",
            "h6",
            "--active",
            "first",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_resolve_without_active_slices_is_empty() {
    let output = sliceflow_cmd()
        .args([
            "--scenario",
            &scenario(),
            "resolve",
            "-e",
            "1",
            "-s",
            "h1",
            "-d",
            "h6",
            "-o",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["ports"], serde_json::json!([]));
    assert!(result["slice"].is_null());
}

#[test]
fn test_resolve_network_mode_accepts_ip_literals() {
    sliceflow_cmd()
        .args([
            "--scenario",
            &scenario(),
            "--address-mode",
            "network",
            "resolve",
            "-e",
            "s1",
            "-s",
            "10.0.0.1",
            "-d",
            "10.0.0.6",
            "-a",
            "first",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_resolve_unknown_slice_is_not_found() {
    sliceflow_cmd()
        .args([
            "--scenario",
            &scenario(),
            "resolve",
            "-e",
            "s1",
            "-s",
            "h1",
            "-d",
            "h6",
            "-a",
            "fourth",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("fourth"));
}

// ── run ─────────────────────────────────────────────────────────────

#[test]
fn test_run_bridges_connect_and_toggle() {
    let input = [
        r#"{"type":"connected","element":3}"#,
        r#"{"type":"toggle","slice":"first"}"#,
    ]
    .join("\n");

    let output = sliceflow_cmd()
        .args(["--scenario", &scenario(), "run"])
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let last = lines.last().unwrap();
    assert_eq!(last["type"], "toggled");
    assert_eq!(last["active"], serde_json::json!(["first"]));
    assert!(
        lines
            .iter()
            .any(|l| l["command"]["kind"] == "delete_all_rules" && l["element"] == 3)
    );
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    sliceflow_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_unknown_profile() {
    sliceflow_cmd()
        .args(["--profile", "lab", "--scenario", &scenario(), "slices"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("lab"));
}
