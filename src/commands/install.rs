//! Install the managed service: secrets file, runtime directory, unit file,
//! enable + start, optional cloud verification.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, Write};

use crate::cloud;
use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};
use crate::secrets;
use crate::service::{self, UnitSpec};
use crate::state::StateStore;
use crate::utils;

pub fn run(api_key: Option<String>, no_verify: bool, format: OutputFormat) -> Result<()> {
    if !utils::is_root() {
        anyhow::bail!("install must run as root");
    }
    if !service::systemd_available() {
        anyhow::bail!("systemctl not found; install requires a systemd-managed host");
    }

    let config = McpConfig::load_or_default()?;
    config.validate()?;

    // Empty credential is a fatal precondition: nothing gets written.
    let api_key = match api_key {
        Some(key) => key,
        None => prompt_api_key(&config.cloud.api_key_var)?,
    };
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    if format == OutputFormat::Text {
        println!("{}", "Installing mcp service...".cyan());
        println!();
    }

    // Secrets file, mode 0600
    secrets::write_secrets(&config.service.secrets_path, &config.cloud.api_key_var, &api_key)?;
    step_done(format, &format!("Wrote {}", config.service.secrets_path.display()));

    // Runtime directory + seeded state files. Re-running leaves existing
    // state untouched.
    let runtime_dir = config.service.runtime_dir();
    std::fs::create_dir_all(&runtime_dir)
        .with_context(|| format!("Failed to create {}", runtime_dir.display()))?;
    let store = StateStore::new(&runtime_dir);
    store.seed(utils::now_epoch());
    step_done(format, &format!("Runtime directory {}", runtime_dir.display()));

    // Unit file pointing at this binary's serve mode
    let exec_path = std::env::current_exe().context("Failed to resolve the mcpd binary path")?;
    let spec = UnitSpec::for_daemon(
        &config.service.unit_name,
        &exec_path,
        &runtime_dir,
        &config.service.secrets_path,
    );
    let unit_path = config.service.unit_path();
    spec.write(&unit_path)?;
    step_done(format, &format!("Wrote {}", unit_path.display()));

    service::daemon_reload()?;
    service::enable(&config.service.unit_name)?;
    service::start(&config.service.unit_name)?;
    step_done(
        format,
        &format!("Service {} enabled and started", config.service.unit_name),
    );

    // Optional outbound credential verification
    let verification = if no_verify {
        None
    } else {
        Some(match cloud::verify_cloud(&config.cloud.host, &api_key) {
            Ok(()) => (cloud::SUCCESS_LABEL.to_string(), None),
            Err(e) => (e.label().to_string(), Some(e.remediation().to_string())),
        })
    };

    if format == OutputFormat::Json {
        let mut data = serde_json::json!({
            "secrets_path": config.service.secrets_path,
            "runtime_dir": runtime_dir,
            "unit_path": unit_path,
            "unit_name": config.service.unit_name,
        });
        if let Some((outcome, hint)) = &verification {
            data["cloud_verification"] = serde_json::json!({
                "outcome": outcome,
                "remediation": hint,
            });
        }

        let success = verification
            .as_ref()
            .map(|(outcome, _)| outcome == cloud::SUCCESS_LABEL)
            .unwrap_or(true);

        let output = McpOutput::new("install").with_success(success).with_data(data);
        println!("{}", output.to_json()?);
    } else {
        match &verification {
            Some((outcome, None)) => {
                println!("{} Cloud verification: {}", "✓".green(), outcome.green());
            }
            Some((outcome, Some(hint))) => {
                println!("{} Cloud verification: {}", "✗".red(), outcome.red());
                println!("  {} {}", "Fix:".cyan(), hint);
            }
            None => {}
        }
        println!();
        println!("{}", "Install complete.".green().bold());
        println!(
            "Run {} to check service health.",
            "mcpd doctor".cyan()
        );
    }

    Ok(())
}

fn prompt_api_key(var: &str) -> Result<String> {
    print!("Enter {}: ", var);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn step_done(format: OutputFormat, msg: &str) {
    if format == OutputFormat::Text {
        println!("{} {}", "✓".green(), msg);
    }
}
