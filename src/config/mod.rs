//! Configuration module for mcpd
//! Handles loading and parsing of the `/etc/mcp.toml` configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::classify::RequestNature;

/// Default configuration file location
pub const CONFIG_FILE: &str = "/etc/mcp.toml";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "MCP_CONFIG";

/// Main configuration structure for mcpd
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    /// Managed service settings (unit name, file locations)
    #[serde(default)]
    pub service: ServiceConfig,

    /// Cloud endpoint settings
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Model routing policy
    #[serde(default)]
    pub models: ModelsConfig,

    /// Operational limits (timeouts, heartbeat, context caps)
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Managed service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// systemd unit name (without the `.service` suffix)
    #[serde(default = "default_unit_name")]
    pub unit_name: String,

    /// Secrets file injected into the service environment
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,

    /// Directory where unit files are installed
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    /// Working directory holding state files and logs.
    /// When unset, resolved per-user at runtime.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            unit_name: default_unit_name(),
            secrets_path: default_secrets_path(),
            unit_dir: default_unit_dir(),
            runtime_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Full path of the installed unit file
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.service", self.unit_name))
    }

    /// Resolve the runtime directory.
    ///
    /// Root installs use the system location; unprivileged invocations
    /// (doctor, ask, tests) fall back to the per-user data directory.
    pub fn runtime_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.runtime_dir {
            return dir.clone();
        }
        if crate::utils::is_root() {
            PathBuf::from("/var/lib/mcp")
        } else {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mcp")
        }
    }
}

/// Cloud endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the Ollama-compatible cloud endpoint
    #[serde(default = "default_cloud_host")]
    pub host: String,

    /// Name of the environment variable holding the bearer credential
    #[serde(default = "default_api_key_var")]
    pub api_key_var: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            host: default_cloud_host(),
            api_key_var: default_api_key_var(),
        }
    }
}

/// Model routing policy: one classifier plus a fallback chain per request nature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used for intent classification
    #[serde(default = "default_classifier")]
    pub classifier: String,

    /// Fallback chain for server operation requests
    #[serde(default = "default_server_operation_chain")]
    pub server_operation: Vec<String>,

    /// Fallback chain for code generation requests
    #[serde(default = "default_code_generation_chain")]
    pub code_generation: Vec<String>,

    /// Fallback chain for explanatory requests
    #[serde(default = "default_explanatory_chain")]
    pub explanatory: Vec<String>,

    /// Fallback chain for unclassifiable requests
    #[serde(default = "default_unknown_chain")]
    pub unknown: Vec<String>,

    /// Classifications below this confidence are demoted to unknown
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier: default_classifier(),
            server_operation: default_server_operation_chain(),
            code_generation: default_code_generation_chain(),
            explanatory: default_explanatory_chain(),
            unknown: default_unknown_chain(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl ModelsConfig {
    /// Fallback chain for a classified request nature
    pub fn chain_for(&self, nature: RequestNature) -> &[String] {
        match nature {
            RequestNature::ServerOperation => &self.server_operation,
            RequestNature::CodeGeneration => &self.code_generation,
            RequestNature::Explanatory => &self.explanatory,
            RequestNature::Unknown => &self.unknown,
        }
    }
}

/// Operational limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Timeout for each planned shell command, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Interval between heartbeat writes by the serve loop, in seconds
    #[serde(default = "default_heartbeat_period")]
    pub heartbeat_period_secs: u64,

    /// Heartbeats older than this are unhealthy, in seconds
    #[serde(default = "default_heartbeat_stale")]
    pub heartbeat_stale_secs: u64,

    /// Idle time after which the watcher stops the service, in seconds
    #[serde(default = "default_idle_limit")]
    pub idle_limit_secs: u64,

    /// Per-file cap when attaching file context, in bytes
    #[serde(default = "default_context_max_per_file")]
    pub context_max_per_file: usize,

    /// Total cap when attaching file context, in bytes
    #[serde(default = "default_context_max_total")]
    pub context_max_total: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            heartbeat_period_secs: default_heartbeat_period(),
            heartbeat_stale_secs: default_heartbeat_stale(),
            idle_limit_secs: default_idle_limit(),
            context_max_per_file: default_context_max_per_file(),
            context_max_total: default_context_max_total(),
        }
    }
}

fn default_unit_name() -> String {
    "mcp".to_string()
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from("/etc/mcp.env")
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_cloud_host() -> String {
    "https://ollama.com".to_string()
}

fn default_api_key_var() -> String {
    "OLLAMA_API_KEY".to_string()
}

fn default_classifier() -> String {
    "nemotron-3-nano:30b-cloud".to_string()
}

fn default_server_operation_chain() -> Vec<String> {
    vec!["gpt-oss:120b".to_string(), "qwen3-next:80b".to_string()]
}

fn default_code_generation_chain() -> Vec<String> {
    vec![
        "devstral-2:123b-cloud".to_string(),
        "qwen3-coder:480b-cloud".to_string(),
    ]
}

fn default_explanatory_chain() -> Vec<String> {
    vec![
        "gemini-3-flash-preview:cloud".to_string(),
        "mistral-large-3".to_string(),
    ]
}

fn default_unknown_chain() -> Vec<String> {
    vec!["ministral-3:14b".to_string(), "glm-4.6".to_string()]
}

fn default_confidence_threshold() -> f64 {
    0.6
}

fn default_command_timeout() -> u64 {
    90
}

fn default_heartbeat_period() -> u64 {
    10
}

fn default_heartbeat_stale() -> u64 {
    30
}

fn default_idle_limit() -> u64 {
    1800
}

fn default_context_max_per_file() -> usize {
    60_000
}

fn default_context_max_total() -> usize {
    250_000
}

impl McpConfig {
    /// Resolve the configuration file path (env override first)
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: McpConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration if the file exists, otherwise return None
    pub fn load_if_exists() -> Result<Option<Self>> {
        let path = Self::path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::load_from(&path)?))
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        Ok(Self::load_if_exists()?.unwrap_or_default())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let header = "# mcpd Configuration\n# See https://github.com/mcpd/mcpd for documentation\n\n";
        let full_content = format!("{}{}", header, content);

        fs::write(path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Create a default configuration file
    pub fn create_default(path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.models.confidence_threshold) {
            anyhow::bail!(
                "confidence_threshold must be between 0.0 and 1.0 (got {})",
                self.models.confidence_threshold
            );
        }

        for (name, chain) in [
            ("server_operation", &self.models.server_operation),
            ("code_generation", &self.models.code_generation),
            ("explanatory", &self.models.explanatory),
            ("unknown", &self.models.unknown),
        ] {
            if chain.is_empty() {
                anyhow::bail!("model chain '{}' must not be empty", name);
            }
        }

        if self.limits.command_timeout_secs == 0 {
            anyhow::bail!("command_timeout_secs must be greater than zero");
        }

        if self.limits.heartbeat_stale_secs < self.limits.heartbeat_period_secs {
            anyhow::bail!(
                "heartbeat_stale_secs ({}) must not be below heartbeat_period_secs ({})",
                self.limits.heartbeat_stale_secs,
                self.limits.heartbeat_period_secs
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = McpConfig::default();
        assert_eq!(config.service.unit_name, "mcp");
        assert_eq!(config.cloud.api_key_var, "OLLAMA_API_KEY");
        assert_eq!(config.models.confidence_threshold, 0.6);
        assert_eq!(config.limits.command_timeout_secs, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[service]
unit_name = "mcp-staging"
secrets_path = "/etc/mcp-staging.env"

[models]
classifier = "tiny-classifier:latest"
unknown = ["small-model:7b"]
confidence_threshold = 0.8

[limits]
idle_limit_secs = 600
"#;

        let config: McpConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.service.unit_name, "mcp-staging");
        assert_eq!(config.models.classifier, "tiny-classifier:latest");
        assert_eq!(config.models.unknown, vec!["small-model:7b"]);
        assert_eq!(config.models.confidence_threshold, 0.8);
        assert_eq!(config.limits.idle_limit_secs, 600);
        // Untouched sections keep their defaults
        assert_eq!(config.limits.command_timeout_secs, 90);
        assert_eq!(config.models.server_operation.len(), 2);
    }

    #[test]
    fn test_chain_for_nature() {
        let config = ModelsConfig::default();
        assert_eq!(
            config.chain_for(RequestNature::ServerOperation),
            config.server_operation.as_slice()
        );
        assert_eq!(
            config.chain_for(RequestNature::Unknown),
            config.unknown.as_slice()
        );
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = McpConfig::default();
        config.models.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_chain() {
        let mut config = McpConfig::default();
        config.models.explanatory.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unit_path() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.unit_path(),
            PathBuf::from("/etc/systemd/system/mcp.service")
        );
    }
}
