//! Update the managed service: stop, re-render the unit, restart, verify
//! health.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::checks::{self, CheckSeverity};
use crate::config::McpConfig;
use crate::output::{Issue, McpOutput, OutputFormat};
use crate::service::{self, UnitSpec};
use crate::utils;

pub fn run(format: OutputFormat) -> Result<()> {
    if !utils::is_root() {
        anyhow::bail!("update must run as root");
    }

    let config = McpConfig::load_or_default()?;
    config.validate()?;

    // Fatal precondition: nothing to update without an installed runtime dir
    let runtime_dir = config.service.runtime_dir();
    if !runtime_dir.exists() {
        anyhow::bail!(
            "runtime directory {} does not exist; run `mcpd install` first",
            runtime_dir.display()
        );
    }

    if format == OutputFormat::Text {
        println!("{}", "Updating mcp service...".cyan());
        println!();
    }

    let unit = &config.service.unit_name;

    // Stop, tolerating a unit that is not running
    if service::stop_ignore_missing(unit) {
        step_done(format, &format!("Stopped {}", unit));
    } else if format == OutputFormat::Text {
        println!("{} {} was not running", "→".cyan(), unit);
    }

    // Re-render the unit so config changes (paths, resource ceilings) land
    let exec_path = std::env::current_exe().context("Failed to resolve the mcpd binary path")?;
    let spec = UnitSpec::for_daemon(unit, &exec_path, &runtime_dir, &config.service.secrets_path);
    spec.write(&config.service.unit_path())?;
    service::daemon_reload()?;
    step_done(format, &format!("Rewrote {}", config.service.unit_path().display()));

    service::restart(unit)?;
    step_done(format, &format!("Restarted {}", unit));

    // Post-update health verification
    let results = checks::run_health_checks(&config, None, false);
    let healthy = checks::is_healthy(&results);

    if format == OutputFormat::Json {
        let issues: Vec<Issue> = results
            .iter()
            .filter(|r| r.severity != CheckSeverity::Pass)
            .map(Issue::from)
            .collect();

        let output = McpOutput::new("update")
            .with_success(healthy)
            .with_healthy(healthy)
            .with_issues(issues)
            .with_data(serde_json::json!({
                "unit_name": unit,
                "checks_total": results.len(),
            }));
        println!("{}", output.to_json()?);
    } else {
        println!();
        if healthy {
            println!("{}", "Update complete; service is healthy.".green().bold());
        } else {
            println!("{}", "Update finished but health checks failed:".red().bold());
            for result in results.iter().filter(|r| r.severity == CheckSeverity::Error) {
                println!("  {} {}: {}", "✗".red(), result.name, result.message);
            }
        }
    }

    if !healthy {
        std::process::exit(1);
    }

    Ok(())
}

fn step_done(format: OutputFormat, msg: &str) {
    if format == OutputFormat::Text {
        println!("{} {}", "✓".green(), msg);
    }
}
