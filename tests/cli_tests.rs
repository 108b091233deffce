//! CLI-level tests for mcpd
//!
//! Exercises the binary end to end for the flows that need neither root
//! privileges nor network access: config management, the health probe
//! contract's exit codes, and credential preconditions.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config_path = dir.path().join("mcp.toml");
    let secrets_path = dir.path().join("mcp.env");
    let runtime_dir = dir.path().join("runtime");

    let content = format!(
        r#"
[service]
unit_name = "mcp-cli-test"
secrets_path = "{}"
runtime_dir = "{}"

[cloud]
api_key_var = "MCPD_CLI_TEST_KEY"
"#,
        secrets_path.display(),
        runtime_dir.display()
    );
    std::fs::write(&config_path, content).expect("Failed to write test config");
    config_path
}

#[test]
fn test_help_lists_lifecycle_commands() {
    let mut cmd = Command::cargo_bin("mcpd").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn test_config_init_then_validate() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("mcp.toml");

    let mut init = Command::cargo_bin("mcpd").unwrap();
    init.env("MCP_CONFIG", &config_path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(config_path.exists());

    let mut validate = Command::cargo_bin("mcpd").unwrap();
    validate
        .env("MCP_CONFIG", &config_path)
        .args(["config", "validate", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""valid": true"#));
}

#[test]
fn test_config_init_refuses_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("mcp.toml");
    std::fs::write(&config_path, "[service]\nunit_name = \"keepme\"\n").unwrap();

    let mut init = Command::cargo_bin("mcpd").unwrap();
    init.env("MCP_CONFIG", &config_path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    // Untouched without --force
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("keepme"));
}

#[test]
fn test_doctor_unprovisioned_host_is_unhealthy() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    // No secrets file, no runtime dir, no heartbeat: the probe contract
    // requires a non-zero exit
    let mut doctor = Command::cargo_bin("mcpd").unwrap();
    doctor
        .env("MCP_CONFIG", &config_path)
        .env_remove("MCPD_CLI_TEST_KEY")
        .args(["doctor", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""command": "doctor""#))
        .stdout(predicate::str::contains(r#""healthy": false"#));
}

#[test]
fn test_doctor_state_category_reports_missing_heartbeat() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    let mut doctor = Command::cargo_bin("mcpd").unwrap();
    doctor
        .env("MCP_CONFIG", &config_path)
        .args(["doctor", "--category", "state", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Heartbeat fresh"));
}

#[test]
fn test_verify_without_credential_fails_fast() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    // Missing credential is a precondition failure, reported before any
    // network traffic happens
    let mut verify = Command::cargo_bin("mcpd").unwrap();
    verify
        .env("MCP_CONFIG", &config_path)
        .env_remove("MCPD_CLI_TEST_KEY")
        .arg("verify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MCPD_CLI_TEST_KEY"));
}

#[test]
fn test_ask_without_credential_fails_fast() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    let mut ask = Command::cargo_bin("mcpd").unwrap();
    ask.env("MCP_CONFIG", &config_path)
        .env_remove("MCPD_CLI_TEST_KEY")
        .args(["ask", "check disk usage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_boot_check_runs_without_patterns() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    let mut boot = Command::cargo_bin("mcpd").unwrap();
    boot.env("MCP_CONFIG", &config_path)
        .args(["boot-check", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""command": "boot-check""#));

    // The report landed in the configured runtime dir
    assert!(dir.path().join("runtime").join("boot_report.json").exists());
}
