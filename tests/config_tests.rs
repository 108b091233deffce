//! Configuration tests for mcpd
//!
//! Tests for TOML parsing, validation, and configuration handling.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use mcpd::config::McpConfig;
use mcpd::llm::classify::RequestNature;

/// Helper to set up a test directory
fn setup_test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Helper to create a config file
fn create_config_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("mcp.toml");
    fs::write(&path, content).expect("Failed to write config file");
    path
}

// ============================================================================
// Basic TOML Parsing Tests
// ============================================================================

#[test]
fn test_parse_minimal_config() {
    let config_toml = r#"
[service]
unit_name = "mcp"
"#;

    let parsed: Result<McpConfig, _> = toml::from_str(config_toml);
    assert!(parsed.is_ok(), "Minimal config should parse");

    let config = parsed.unwrap();
    assert_eq!(config.service.unit_name, "mcp");
    // Everything else falls back to defaults
    assert_eq!(config.cloud.host, "https://ollama.com");
    assert_eq!(config.models.confidence_threshold, 0.6);
}

#[test]
fn test_parse_full_config() {
    let config_toml = r#"
[service]
unit_name = "mcp-staging"
secrets_path = "/etc/mcp-staging.env"
unit_dir = "/etc/systemd/system"
runtime_dir = "/var/lib/mcp-staging"

[cloud]
host = "https://ollama.example.com"
api_key_var = "STAGING_API_KEY"

[models]
classifier = "tiny-classifier:latest"
server_operation = ["ops-model:70b", "ops-fallback:30b"]
code_generation = ["code-model:120b"]
explanatory = ["explain-model:8b"]
unknown = ["small-model:7b"]
confidence_threshold = 0.75

[limits]
command_timeout_secs = 60
heartbeat_period_secs = 5
heartbeat_stale_secs = 20
idle_limit_secs = 900
context_max_per_file = 30000
context_max_total = 120000
"#;

    let config: McpConfig = toml::from_str(config_toml).expect("Full config should parse");

    assert_eq!(config.service.unit_name, "mcp-staging");
    assert_eq!(
        config.service.runtime_dir.as_deref(),
        Some(std::path::Path::new("/var/lib/mcp-staging"))
    );
    assert_eq!(
        config.service.unit_path(),
        PathBuf::from("/etc/systemd/system/mcp-staging.service")
    );

    assert_eq!(config.cloud.host, "https://ollama.example.com");
    assert_eq!(config.cloud.api_key_var, "STAGING_API_KEY");

    assert_eq!(
        config.models.chain_for(RequestNature::ServerOperation),
        ["ops-model:70b".to_string(), "ops-fallback:30b".to_string()]
    );
    assert_eq!(config.models.confidence_threshold, 0.75);

    assert_eq!(config.limits.command_timeout_secs, 60);
    assert_eq!(config.limits.idle_limit_secs, 900);

    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config: McpConfig = toml::from_str("").expect("Empty config should parse");
    assert_eq!(config.service.unit_name, "mcp");
    assert_eq!(
        config.service.secrets_path,
        PathBuf::from("/etc/mcp.env")
    );
    assert_eq!(config.models.server_operation.len(), 2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_config_with_comments() {
    let config_toml = r#"
# Staging host configuration
[service]
# The unit systemd supervises
unit_name = "mcp"  # inline comment

[limits]
idle_limit_secs = 1200
"#;

    let config: McpConfig = toml::from_str(config_toml).expect("Config with comments should parse");
    assert_eq!(config.service.unit_name, "mcp");
    assert_eq!(config.limits.idle_limit_secs, 1200);
}

// ============================================================================
// Malformed Config Tests
// ============================================================================

#[test]
fn test_invalid_toml_syntax() {
    let invalid_toml = r#"
[service
unit_name = "mcp"
"#;

    let parsed: Result<McpConfig, _> = toml::from_str(invalid_toml);
    assert!(parsed.is_err(), "Invalid TOML syntax should fail");
}

#[test]
fn test_invalid_value_type() {
    let invalid_toml = r#"
[limits]
command_timeout_secs = "ninety"
"#;

    let parsed: Result<McpConfig, _> = toml::from_str(invalid_toml);
    assert!(parsed.is_err(), "Wrong value type should fail typed parsing");
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config_toml = r#"
[service]
unit_name = "mcp"
legacy_venv_path = "/home/ubuntu/mcp/venv"
"#;

    // Forward compatibility: stale keys from older installs must not break
    let parsed: Result<McpConfig, _> = toml::from_str(config_toml);
    assert!(parsed.is_ok());
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_validate_rejects_out_of_range_threshold() {
    let config_toml = r#"
[models]
confidence_threshold = 2.0
"#;
    let config: McpConfig = toml::from_str(config_toml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_empty_chain() {
    let config_toml = r#"
[models]
server_operation = []
"#;
    let config: McpConfig = toml::from_str(config_toml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_command_timeout() {
    let config_toml = r#"
[limits]
command_timeout_secs = 0
"#;
    let config: McpConfig = toml::from_str(config_toml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_stale_below_period() {
    let config_toml = r#"
[limits]
heartbeat_period_secs = 30
heartbeat_stale_secs = 10
"#;
    let config: McpConfig = toml::from_str(config_toml).unwrap();
    assert!(config.validate().is_err());
}

// ============================================================================
// Config File I/O Tests
// ============================================================================

#[test]
fn test_load_from_file() {
    let dir = setup_test_dir();
    let path = create_config_file(
        &dir,
        r#"
[service]
unit_name = "mcp-test"
"#,
    );

    let config = McpConfig::load_from(&path).expect("Should load config from file");
    assert_eq!(config.service.unit_name, "mcp-test");
}

#[test]
fn test_load_from_missing_file_returns_defaults() {
    let dir = setup_test_dir();
    let path = dir.path().join("absent.toml");

    let config = McpConfig::load_from(&path).expect("Missing file should mean defaults");
    assert_eq!(config.service.unit_name, "mcp");
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = setup_test_dir();
    let path = dir.path().join("mcp.toml");

    let mut config = McpConfig::default();
    config.service.unit_name = "mcp-rt".to_string();
    config.models.confidence_threshold = 0.8;
    config.save(&path).expect("Should save config");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# mcpd Configuration"));

    let reloaded = McpConfig::load_from(&path).expect("Should reload config");
    assert_eq!(reloaded.service.unit_name, "mcp-rt");
    assert_eq!(reloaded.models.confidence_threshold, 0.8);
}

#[test]
fn test_create_default_writes_valid_file() {
    let dir = setup_test_dir();
    let path = dir.path().join("mcp.toml");

    let created = McpConfig::create_default(&path).expect("Should create default config");
    assert!(path.exists());
    assert!(created.validate().is_ok());

    let reloaded = McpConfig::load_from(&path).expect("Default file should round-trip");
    assert_eq!(reloaded.service.unit_name, created.service.unit_name);
    assert_eq!(reloaded.models.classifier, created.models.classifier);
}
