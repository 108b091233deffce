use chrono::Utc;
use serde::Serialize;

use crate::checks::{CheckResult, CheckSeverity};

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Standardized output structure for all mcpd commands
#[derive(Debug, Clone, Serialize)]
pub struct McpOutput {
    pub command: String,
    pub success: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl McpOutput {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            success: true,
            timestamp: Utc::now().to_rfc3339(),
            healthy: None,
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = Some(healthy);
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Issue representation for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub name: String,
    pub category: String,
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl From<&CheckResult> for Issue {
    fn from(result: &CheckResult) -> Self {
        Self {
            name: result.name.clone(),
            category: result.category.clone(),
            severity: match result.severity {
                CheckSeverity::Pass => "pass".to_string(),
                CheckSeverity::Info => "info".to_string(),
                CheckSeverity::Warning => "warning".to_string(),
                CheckSeverity::Error => "error".to_string(),
            },
            message: result.message.clone(),
            suggested_fix: result.suggested_fix.clone(),
        }
    }
}
