//! One-shot cloud verification probe.
//!
//! Reports exactly one outcome from the fixed vocabulary and a remediation
//! hint when something is wrong. Exit code 0 only on success; there is no
//! automatic retry.

use anyhow::Result;
use colored::Colorize;

use crate::cloud;
use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};
use crate::secrets;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;

    let api_key =
        secrets::ensure_credential(&config.service.secrets_path, &config.cloud.api_key_var)?;

    if format == OutputFormat::Text {
        println!(
            "Verifying cloud endpoint {}...",
            config.cloud.host.cyan()
        );
        println!();
    }

    let result = cloud::verify_cloud(&config.cloud.host, &api_key);

    if format == OutputFormat::Json {
        let data = match &result {
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

        let output = McpOutput::new("verify")
            .with_success(result.is_ok())
            .with_data(data);
        println!("{}", output.to_json()?);
    } else {
        match &result {
            Ok(()) => {
                println!("{} {}", "✓".green().bold(), cloud::SUCCESS_LABEL.green());
                println!("  Credential accepted by {}", config.cloud.host);
            }
            Err(e) => {
                println!("{} {}", "✗".red().bold(), e.label().red());
                println!("  {}", e.to_string().dimmed());
                println!("  {} {}", "Fix:".cyan(), e.remediation());
            }
        }
    }

    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}
