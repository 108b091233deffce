//! Show current service status: unit state, heartbeat age, recorded
//! incidents and learned patterns.

use anyhow::Result;
use colored::Colorize;

use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};
use crate::service;
use crate::state::StateStore;
use crate::utils;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    let unit = &config.service.unit_name;
    let store = StateStore::new(config.service.runtime_dir());

    let registered = service::unit_registered(unit);
    let active = registered && service::is_active(unit);
    let enabled = registered && service::is_enabled(unit);

    let state = store.load_state_strict();
    let now = utils::now_epoch();
    let heartbeat_age = state.as_ref().map(|s| s.heartbeat_age(now));
    let idle_for = state.as_ref().map(|s| s.idle_for(now));

    let incidents = store.load_incidents();
    let patterns = store.load_patterns();

    if format == OutputFormat::Json {
        let output = McpOutput::new("status")
            .with_success(true)
            .with_data(serde_json::json!({
                "unit": {
                    "name": unit,
                    "registered": registered,
                    "active": active,
                    "enabled": enabled,
                },
                "state": {
                    "heartbeat_age_secs": heartbeat_age,
                    "idle_secs": idle_for,
                },
                "incidents": incidents.len(),
                "patterns": patterns,
                "runtime_dir": store.runtime_dir(),
            }));
        println!("{}", output.to_json()?);
    } else {
        println!("{}", "Service Status".bold().cyan());
        println!("{}", "═".repeat(50).dimmed());
        println!();

        println!("{}", "Unit".bold());
        let active_str = if active {
            "active".green()
        } else {
            "inactive".red()
        };
        println!("  {} ({})", unit.cyan(), active_str);
        if registered {
            println!(
                "  Enabled at boot: {}",
                if enabled { "yes".green() } else { "no".yellow() }
            );
        } else {
            println!(
                "  {} Not registered - run {} first",
                "⚠".yellow(),
                "mcpd install".cyan()
            );
        }
        println!();

        println!("{}", "Heartbeat".bold());
        match heartbeat_age {
            Some(age) => println!("  Last seen {}s ago", format!("{:.0}", age).cyan()),
            None => println!("  {}", "No heartbeat recorded".yellow()),
        }
        if let Some(idle) = idle_for {
            println!("  Idle for {:.0}s", idle);
        }
        println!();

        println!("{}", "Learned failures".bold());
        println!("  Incidents: {}", incidents.len());
        if patterns.is_empty() {
            println!("  Patterns: {}", "(none)".dimmed());
        } else {
            let tags: Vec<&str> = patterns.iter().map(|p| p.as_str()).collect();
            println!("  Patterns: {}", tags.join(", ").yellow());
        }
    }

    Ok(())
}
