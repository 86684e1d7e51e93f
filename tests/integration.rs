//! Integration tests for the jira CLI
//!
//! Tests argument parsing, configuration handling and error reporting.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn jira() -> Command {
    let mut cmd = Command::cargo_bin("jira").expect("binary should build");
    cmd.env_remove("JIRA_CLI_CONFIG")
        .env_remove("PYJIRA_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("jira-cli.yaml");
    fs::write(
        &path,
        format!(
            "jira_base_url: {}\nuser: alice\ntoken: secret\n",
            base_url
        ),
    )
    .unwrap();
    path
}

/// Test that the binary can show help
#[test]
fn test_help_lists_commands() {
    jira()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("dashboard"))
        .stdout(predicate::str::contains("ls"))
        .stdout(predicate::str::contains("show"));
}

/// Test that version command works
#[test]
fn test_version_command() {
    jira()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
}

#[test]
fn test_ls_without_config_fails() {
    let dir = TempDir::new().unwrap();
    jira()
        .args(["--config"])
        .arg(dir.path().join("missing.yaml"))
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration file found"))
        .stderr(predicate::str::contains("jira configure"));
}

#[test]
fn test_configure_writes_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    jira()
        .env("JIRA_CLI_CONFIG", &path)
        .arg("configure")
        .write_stdin("https://jira.example.com\n\nalice\nsecret\nproject = DEMO\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("A config file has been created"));

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("https://jira.example.com"));
    assert!(written.contains("alice"));
    assert!(written.contains("project = DEMO"));
    assert!(!written.contains("cert_path"));
}

#[test]
fn test_show_reports_connection_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "http://127.0.0.1:9");

    jira()
        .arg("--config")
        .arg(&path)
        .args(["show", "DEMO-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DEMO-1"));
}

#[test]
fn test_dashboard_rejects_zero_interval() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "https://jira.example.com");

    jira()
        .arg("--config")
        .arg(&path)
        .args(["dashboard", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refresh interval must be positive"));
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "jira.example.com");

    jira()
        .arg("--config")
        .arg(&path)
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("jira_base_url"));
}

#[test]
fn test_legacy_config_variable_is_honoured() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.yaml");

    jira()
        .env("PYJIRA_CONFIG", &path)
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("legacy.yaml"));
}

#[test]
fn test_dashboard_with_missing_config_reports_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("typo").join("config.yaml");

    jira()
        .arg("--config")
        .arg(&path)
        .arg("dashboard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration file found"))
        .stderr(predicate::str::contains("panicked").not());

    assert!(!dir.path().join("typo").exists());
}
