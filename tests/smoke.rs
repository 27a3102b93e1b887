//! Smoke tests -- verify the binary runs and each subcommand works.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ransomwatch() -> Command {
    let mut cmd = Command::cargo_bin("ransomwatch").unwrap();
    cmd.env_remove("RANSOMWATCH_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    ransomwatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ransomware detection"));
}

#[test]
fn test_cli_version() {
    ransomwatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ransomwatch"));
}

#[test]
fn test_monitor_subcommand_exists() {
    ransomwatch()
        .args(["monitor", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--simulate"))
        .stdout(predicate::str::contains("--watch"));
}

#[test]
fn test_monitor_rejects_unknown_mode() {
    ransomwatch()
        .args(["monitor", "--simulate", "chaotic"])
        .assert()
        .failure();
}

#[test]
fn test_features_prints_windows() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.json");
    std::fs::write(
        &input,
        r#"[
            {"timestamp": 100.0, "kind": "modified", "file": "a.docx"},
            {"timestamp": 101.0, "kind": "renamed", "file": "a.docx.locked"},
            {"timestamp": 102.0, "kind": "deleted", "file": "a.docx"},
            {"timestamp": 130.0, "kind": "created"}
        ]"#,
    )
    .unwrap();

    ransomwatch()
        .args(["features", "--input"])
        .arg(&input)
        .args(["--window", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 events, 2 windows"));
}

#[test]
fn test_features_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.json");
    std::fs::write(&input, r#"[{"timestamp": 1.0, "kind": "teleported"}]"#).unwrap();

    ransomwatch()
        .args(["features", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse events"));
}

#[test]
fn test_dataset_writes_jsonl() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("dataset.jsonl");

    ransomwatch()
        .args(["dataset", "--sequences", "3", "--seed", "7", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let text = std::fs::read_to_string(&output).unwrap();
    let labels: Vec<u64> = text
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["label"].as_u64().unwrap())
        .collect();
    assert!(labels.contains(&0));
    assert!(labels.contains(&1));
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ransomwatch.toml");
    std::fs::write(&path, "[alerts]\nalert_cooldown_seconds = 30\n").unwrap();

    ransomwatch()
        .arg("config")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("alert_cooldown_seconds = 30"))
        .stdout(predicate::str::contains("[accumulator]"));
}

#[test]
fn test_config_flag_missing_file_fails() {
    ransomwatch()
        .args(["config", "--config", "/nonexistent/ransomwatch.toml"])
        .assert()
        .failure();
}

#[test]
fn test_unreadable_env_config_warns_and_falls_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[alerts\nalert_cooldown_seconds = ").unwrap();

    ransomwatch()
        .env("RANSOMWATCH_CONFIG", &path)
        .arg("config")
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be loaded"))
        .stdout(predicate::str::contains("decay_window_seconds = 60.0"));
}

#[test]
fn test_features_window_defaults_to_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ransomwatch.toml");
    std::fs::write(&config, "[features]\nml_window_seconds = 100.0\n").unwrap();
    let input = dir.path().join("events.json");
    std::fs::write(
        &input,
        r#"[
            {"timestamp": 100.0, "kind": "modified"},
            {"timestamp": 130.0, "kind": "deleted"}
        ]"#,
    )
    .unwrap();

    ransomwatch()
        .arg("features")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 events, 1 windows"));

    // An explicit flag still wins.
    ransomwatch()
        .arg("features")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .args(["--window", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 events, 2 windows"));
}
