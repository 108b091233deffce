//! Execution planning and report generation
//!
//! Both operations go through the chain-fallback invocation: the planner
//! turns a normalized request into a list of POSIX shell commands (or an
//! empty list when the request is unsafe), the reporter turns it into a
//! structured explanation. Schemas are tolerant of missing fields.

use anyhow::Result;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LlmClient;
use crate::state::StateStore;

/// Plan produced by the planner models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub output_file: Option<String>,
}

/// Report produced in report mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpsReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a SAFE Linux DevOps automation planner.

RETURN JSON ONLY IN THIS SCHEMA:
{
 "description": "string",
 "commands": ["string", ...],
 "output_file": "string or null"
}

MANDATORY SAFETY RULES
NEVER return commands that:
- delete or destroy system files
- remove packages
- format or repartition disks
- modify kernel or bootloader
- disable security systems
- create or modify sudoers
- create system users
- reboot or shutdown
- require interactive input
- perform hacking or exploitation
- handle secrets

If the request is unsafe, return "commands": [].

ALSO:
- Commands must be POSIX shell
- No here-docs unless explicitly required
- Never include credentials"#;

const REPORT_SYSTEM_PROMPT: &str = r#"You are a Linux/DevOps technical explainer.

YOU MUST RETURN VALID JSON ONLY:
{
 "summary": "string",
 "steps": ["string", ...],
 "risk": "low | medium | high"
}

RULES:
- Answer in the language of the request
- No markdown
- No code fences
- No emojis
- No commentary outside the JSON"#;

/// Ask the model chain for an execution plan.
pub fn build_execution_plan(
    client: &LlmClient,
    models: &[String],
    rewritten_request: &str,
    file_ctx: &BTreeMap<String, String>,
    spinner: Option<&ProgressBar>,
    store: Option<&StateStore>,
) -> Result<ExecutionPlan> {
    let payload = serde_json::json!({
        "rewritten_request": rewritten_request,
        "project_context": file_ctx,
    });

    let value = client.chat_with_fallback(models, PLANNER_SYSTEM_PROMPT, &payload, spinner, store)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Ask the model chain for a report.
pub fn generate_report(
    client: &LlmClient,
    models: &[String],
    rewritten_request: &str,
    file_ctx: &BTreeMap<String, String>,
    spinner: Option<&ProgressBar>,
    store: Option<&StateStore>,
) -> Result<OpsReport> {
    let payload = serde_json::json!({
        "rewritten_request": rewritten_request,
        "project_context": file_ctx,
    });

    let value = client.chat_with_fallback(models, REPORT_SYSTEM_PROMPT, &payload, spinner, store)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tolerates_missing_fields() {
        let plan: ExecutionPlan = serde_json::from_value(serde_json::json!({
            "description": "check disk usage"
        }))
        .unwrap();
        assert!(plan.commands.is_empty());
        assert!(plan.output_file.is_none());
    }

    #[test]
    fn test_plan_round_trip() {
        let plan: ExecutionPlan = serde_json::from_value(serde_json::json!({
            "description": "disk usage",
            "commands": ["df -h /"],
            "output_file": "/tmp/disk.txt"
        }))
        .unwrap();
        assert_eq!(plan.commands, vec!["df -h /"]);
        assert_eq!(plan.output_file.as_deref(), Some("/tmp/disk.txt"));
    }

    #[test]
    fn test_risk_level_parses_lowercase() {
        let report: OpsReport = serde_json::from_value(serde_json::json!({
            "summary": "restarting nginx is routine",
            "steps": ["systemctl restart nginx"],
            "risk": "medium"
        }))
        .unwrap();
        assert_eq!(report.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_report_defaults_to_low_risk() {
        let report: OpsReport =
            serde_json::from_value(serde_json::json!({"summary": "x"})).unwrap();
        assert_eq!(report.risk, RiskLevel::Low);
        assert!(report.steps.is_empty());
    }
}
