//! Health checks for the managed service
//!
//! The doctor command and the health-probe contract are built on the same
//! rule: healthy means every check passes; any error makes the aggregate
//! unhealthy (non-zero exit). Check results carry a suggested fix where a
//! remediation is known.

pub mod boot;

use clap::ValueEnum;
use serde::Serialize;

use crate::cloud;
use crate::config::McpConfig;
use crate::secrets;
use crate::service;
use crate::state::{ServiceState, StateStore};
use crate::utils;

/// Valid check categories for the doctor command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckCategory {
    /// Service manager checks (unit registered, active, enabled)
    Service,
    /// State checks (runtime dir, heartbeat freshness, error log)
    State,
    /// Secrets checks (file present, credential non-empty)
    Secrets,
    /// Cloud endpoint probe
    Cloud,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CheckSeverity {
    Pass,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub category: String,
    pub severity: CheckSeverity,
    pub message: String,
    pub suggested_fix: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Pass,
            message: String::new(),
            suggested_fix: None,
        }
    }

    pub fn error(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Error,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn warning(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Warning,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn info(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Info,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: &str) -> Self {
        self.suggested_fix = Some(fix.to_string());
        self
    }
}

/// Heartbeat freshness check, pure so the rule is testable.
///
/// Missing state, missing heartbeat, and staleness are all unhealthy; the
/// probe contract treats them identically.
pub fn heartbeat_check(state: Option<&ServiceState>, now: f64, stale_secs: u64) -> CheckResult {
    let name = "Heartbeat fresh";
    match state {
        None => CheckResult::error(name, "state", "state.json missing or has no heartbeat")
            .with_fix("Start the service: systemctl start mcp"),
        Some(state) => {
            let age = state.heartbeat_age(now);
            if age > stale_secs as f64 {
                CheckResult::error(
                    name,
                    "state",
                    &format!("last heartbeat {:.0}s ago (limit {}s)", age, stale_secs),
                )
                .with_fix("Restart the service: systemctl restart mcp")
            } else {
                CheckResult::pass(name, "state")
            }
        }
    }
}

/// Run the health checks, optionally filtered by category.
///
/// The cloud probe only runs when its category is requested explicitly or
/// `include_cloud` is set; it costs a network round trip.
pub fn run_health_checks(
    config: &McpConfig,
    category: Option<CheckCategory>,
    include_cloud: bool,
) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let unit = &config.service.unit_name;
    let store = StateStore::new(config.service.runtime_dir());

    let run_service = category.is_none() || category == Some(CheckCategory::Service);
    let run_state = category.is_none() || category == Some(CheckCategory::State);
    let run_secrets = category.is_none() || category == Some(CheckCategory::Secrets);
    let run_cloud = category == Some(CheckCategory::Cloud) || (category.is_none() && include_cloud);

    if run_service {
        if !service::systemd_available() {
            results.push(
                CheckResult::error("systemctl available", "service", "systemctl not found on PATH")
                    .with_fix("Install systemd or run on a systemd-managed host"),
            );
        } else {
            results.push(CheckResult::pass("systemctl available", "service"));

            if !service::unit_registered(unit) {
                results.push(
                    CheckResult::error(
                        "Unit registered",
                        "service",
                        &format!("unit '{}' is not known to systemd", unit),
                    )
                    .with_fix("Run `mcpd install` to register the service"),
                );
            } else {
                results.push(CheckResult::pass("Unit registered", "service"));

                if service::is_active(unit) {
                    results.push(CheckResult::pass("Unit active", "service"));
                } else {
                    results.push(
                        CheckResult::error(
                            "Unit active",
                            "service",
                            &format!("unit '{}' is not active", unit),
                        )
                        .with_fix(&format!("systemctl start {}", unit)),
                    );
                }

                if service::is_enabled(unit) {
                    results.push(CheckResult::pass("Unit enabled", "service"));
                } else {
                    results.push(
                        CheckResult::warning(
                            "Unit enabled",
                            "service",
                            &format!("unit '{}' will not start at boot", unit),
                        )
                        .with_fix(&format!("systemctl enable {}", unit)),
                    );
                }
            }
        }
    }

    if run_secrets {
        let path = &config.service.secrets_path;
        if !path.exists() {
            results.push(
                CheckResult::error(
                    "Secrets file present",
                    "secrets",
                    &format!("{} does not exist", path.display()),
                )
                .with_fix("Run `mcpd install` to write the secrets file"),
            );
        } else {
            results.push(CheckResult::pass("Secrets file present", "secrets"));

            if secrets::read_var(path, &config.cloud.api_key_var).is_some() {
                results.push(CheckResult::pass("Credential set", "secrets"));
            } else {
                results.push(
                    CheckResult::error(
                        "Credential set",
                        "secrets",
                        &format!("{} is missing or empty", config.cloud.api_key_var),
                    )
                    .with_fix("Re-run `mcpd install` with a valid API key"),
                );
            }
        }
    }

    if run_state {
        let runtime_dir = store.runtime_dir();
        if runtime_dir.exists() {
            results.push(CheckResult::pass("Runtime directory present", "state"));
        } else {
            results.push(
                CheckResult::error(
                    "Runtime directory present",
                    "state",
                    &format!("{} does not exist", runtime_dir.display()),
                )
                .with_fix("Run `mcpd install` to create the runtime directory"),
            );
        }

        results.push(heartbeat_check(
            store.load_state_strict().as_ref(),
            utils::now_epoch(),
            config.limits.heartbeat_stale_secs,
        ));

        let log_path = store.error_log_path();
        if let Ok(metadata) = std::fs::metadata(&log_path) {
            if metadata.len() > 0 {
                let last_line = std::fs::read_to_string(&log_path)
                    .ok()
                    .and_then(|c| c.lines().last().map(|l| l.to_string()))
                    .unwrap_or_default();
                results.push(CheckResult::info(
                    "Error log",
                    "state",
                    &format!("{} bytes; last entry: {}", metadata.len(), last_line),
                ));
            }
        }
    }

    if run_cloud {
        results.push(cloud_check(config));
    }

    results
}

fn cloud_check(config: &McpConfig) -> CheckResult {
    let name = "Cloud endpoint";
    match secrets::ensure_credential(&config.service.secrets_path, &config.cloud.api_key_var) {
        Err(e) => CheckResult::error(name, "cloud", &format!("{:#}", e))
            .with_fix("Run `mcpd install` to provision the credential"),
        Ok(api_key) => match cloud::verify_cloud(&config.cloud.host, &api_key) {
            Ok(()) => CheckResult::pass(name, "cloud"),
            Err(e) => {
                CheckResult::error(name, "cloud", &format!("{} ({})", e, e.label()))
                    .with_fix(e.remediation())
            }
        },
    }
}

/// Aggregate verdict over a check run
pub fn is_healthy(results: &[CheckResult]) -> bool {
    !results.iter().any(|r| r.severity == CheckSeverity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_missing_state_is_error() {
        let result = heartbeat_check(None, 1000.0, 30);
        assert_eq!(result.severity, CheckSeverity::Error);
        assert!(result.suggested_fix.is_some());
    }

    #[test]
    fn test_heartbeat_fresh_passes() {
        let state = ServiceState {
            last_heartbeat: 990.0,
            last_activity: 990.0,
        };
        let result = heartbeat_check(Some(&state), 1000.0, 30);
        assert_eq!(result.severity, CheckSeverity::Pass);
    }

    #[test]
    fn test_heartbeat_stale_is_error() {
        let state = ServiceState {
            last_heartbeat: 900.0,
            last_activity: 900.0,
        };
        let result = heartbeat_check(Some(&state), 1000.0, 30);
        assert_eq!(result.severity, CheckSeverity::Error);
        assert!(result.message.contains("100s"));
    }

    #[test]
    fn test_heartbeat_exactly_at_limit_passes() {
        let state = ServiceState {
            last_heartbeat: 970.0,
            last_activity: 970.0,
        };
        let result = heartbeat_check(Some(&state), 1000.0, 30);
        assert_eq!(result.severity, CheckSeverity::Pass);
    }

    #[test]
    fn test_is_healthy_ignores_warnings() {
        let results = vec![
            CheckResult::pass("a", "x"),
            CheckResult::warning("b", "x", "meh"),
            CheckResult::info("c", "x", "fyi"),
        ];
        assert!(is_healthy(&results));
    }

    #[test]
    fn test_is_healthy_fails_on_any_error() {
        let results = vec![
            CheckResult::pass("a", "x"),
            CheckResult::error("b", "x", "broken"),
        ];
        assert!(!is_healthy(&results));
    }
}
