//! MCP tool handlers for mcpd

use anyhow::Result;
use serde_json::Value;

use crate::checks::{self, boot, CheckCategory, CheckSeverity};
use crate::cloud;
use crate::config::McpConfig;
use crate::engine::Engine;
use crate::output::Issue;
use crate::secrets;
use crate::state::StateStore;

/// Handle an operator request end to end
pub fn handle_request(args: &Value) -> Result<Value> {
    let text = args
        .get("text")
        .and_then(|v| v.as_str())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("'text' argument is required"))?;

    let config = McpConfig::load_or_default()?;
    let mut engine = Engine::new(config)?;

    // stdout carries JSON-RPC; no progress spinner here
    let outcome = engine.handle_input(text, false)?;

    Ok(serde_json::to_value(&outcome)?)
}

/// Run health checks and return structured results
pub fn health_status(args: &Value) -> Result<Value> {
    let config = McpConfig::load_or_default()?;

    let category = args
        .get("category")
        .and_then(|v| v.as_str())
        .and_then(parse_category);

    let include_cloud = args
        .get("cloud")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let results = checks::run_health_checks(&config, category, include_cloud);

    let issues: Vec<Issue> = results
        .iter()
        .filter(|r| r.severity != CheckSeverity::Pass)
        .map(Issue::from)
        .collect();

    Ok(serde_json::json!({
        "healthy": checks::is_healthy(&results),
        "issues": issues,
        "summary": {
            "total_checks": results.len(),
            "passed": results.iter().filter(|r| r.severity == CheckSeverity::Pass).count(),
            "warnings": results.iter().filter(|r| r.severity == CheckSeverity::Warning).count(),
            "errors": results.iter().filter(|r| r.severity == CheckSeverity::Error).count()
        }
    }))
}

fn parse_category(s: &str) -> Option<CheckCategory> {
    match s {
        "service" => Some(CheckCategory::Service),
        "state" => Some(CheckCategory::State),
        "secrets" => Some(CheckCategory::Secrets),
        "cloud" => Some(CheckCategory::Cloud),
        _ => None,
    }
}

/// Probe the cloud endpoint and classify the outcome
pub fn verify_cloud(_args: &Value) -> Result<Value> {
    let config = McpConfig::load_or_default()?;
    let api_key =
        secrets::ensure_credential(&config.service.secrets_path, &config.cloud.api_key_var)?;

    let response = match cloud::verify_cloud(&config.cloud.host, &api_key) {
        Ok(()) => serde_json::json!({
            "outcome": cloud::SUCCESS_LABEL,
            "host": config.cloud.host,
        }),
        Err(e) => serde_json::json!({
            "outcome": e.label(),
            "host": config.cloud.host,
            "message": e.to_string(),
            "remediation": e.remediation(),
        }),
    };

    Ok(response)
}

/// Run the pattern-driven boot check
pub fn run_boot_check(_args: &Value) -> Result<Value> {
    let config = McpConfig::load_or_default()?;
    let store = StateStore::new(config.service.runtime_dir());

    let report = boot::run_and_store(&store);
    let patterns_probed = report.checks.len();

    Ok(serde_json::json!({
        "report": report,
        "report_path": store.boot_report_path(),
        "patterns_probed": patterns_probed,
    }))
}

/// List recorded incidents, most recent last
pub fn list_incidents(args: &Value) -> Result<Value> {
    let config = McpConfig::load_or_default()?;
    let store = StateStore::new(config.service.runtime_dir());

    let limit = args
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(20) as usize;

    let incidents = store.load_incidents();
    let total = incidents.len();
    let start = total.saturating_sub(limit);

    Ok(serde_json::json!({
        "total": total,
        "incidents": &incidents[start..],
        "patterns": store.load_patterns(),
    }))
}
