//! Configuration commands for mcpd
//! Provides `mcpd config init` and `mcpd config validate` subcommands.

use anyhow::Result;
use colored::Colorize;

use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};

/// Config subcommand action
#[derive(Debug, Clone)]
pub enum ConfigAction {
    Init { force: bool },
    Validate,
}

/// Run the config command
pub fn run(action: ConfigAction, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Init { force } => run_init(force, format),
        ConfigAction::Validate => run_validate(format),
    }
}

/// Create the default configuration file
fn run_init(force: bool, format: OutputFormat) -> Result<()> {
    let path = McpConfig::path();

    // Check if file already exists
    if path.exists() && !force {
        if format == OutputFormat::Json {
            let output = McpOutput::new("config init")
                .with_success(false)
                .with_data(serde_json::json!({
                    "error": "Config file already exists",
                    "path": path,
                    "hint": "Use --force to overwrite"
                }));
            println!("{}", output.to_json()?);
        } else {
            println!(
                "{} {} already exists",
                "Error:".red().bold(),
                path.display().to_string().cyan()
            );
            println!("Use {} to overwrite.", "--force".cyan());
        }
        return Ok(());
    }

    let config = McpConfig::create_default(&path)?;

    if format == OutputFormat::Json {
        let output = McpOutput::new("config init")
            .with_success(true)
            .with_data(serde_json::json!({
                "path": path,
                "created": true,
                "config": {
                    "service": {
                        "unit_name": config.service.unit_name,
                        "secrets_path": config.service.secrets_path,
                    },
                    "models": {
                        "classifier": config.models.classifier,
                        "confidence_threshold": config.models.confidence_threshold,
                    }
                }
            }));
        println!("{}", output.to_json()?);
    } else {
        println!(
            "{} Created {}",
            "✓".green().bold(),
            path.display().to_string().cyan()
        );
        println!();
        println!("You can customize:");
        println!("  • {} - Unit name and file locations", "[service]".cyan());
        println!("  • {} - Cloud endpoint and credential variable", "[cloud]".cyan());
        println!("  • {} - Classifier and fallback chains", "[models]".cyan());
        println!("  • {} - Timeouts, heartbeat, context caps", "[limits]".cyan());
    }

    Ok(())
}

/// Validate the configuration file
fn run_validate(format: OutputFormat) -> Result<()> {
    let path = McpConfig::path();

    if !path.exists() {
        if format == OutputFormat::Json {
            let output = McpOutput::new("config validate")
                .with_success(false)
                .with_data(serde_json::json!({
                    "error": "Config file not found",
                    "path": path,
                    "hint": "Run `mcpd config init` to create one"
                }));
            println!("{}", output.to_json()?);
        } else {
            println!(
                "{} {} not found",
                "Error:".red().bold(),
                path.display().to_string().cyan()
            );
            println!("Run {} to create one.", "mcpd config init".cyan());
        }
        return Ok(());
    }

    match McpConfig::load_from(&path) {
        Ok(config) => match config.validate() {
            Ok(()) => {
                if format == OutputFormat::Json {
                    let output = McpOutput::new("config validate")
                        .with_success(true)
                        .with_data(serde_json::json!({
                            "path": path,
                            "valid": true,
                            "unit_name": config.service.unit_name,
                            "classifier": config.models.classifier,
                        }));
                    println!("{}", output.to_json()?);
                } else {
                    println!(
                        "{} {} is valid",
                        "✓".green().bold(),
                        path.display().to_string().cyan()
                    );
                    println!();
                    println!("  Unit: {}", config.service.unit_name.cyan());
                    println!("  Classifier: {}", config.models.classifier.dimmed());
                    println!(
                        "  Confidence threshold: {}",
                        config.models.confidence_threshold
                    );
                }
            }
            Err(e) => {
                if format == OutputFormat::Json {
                    let output = McpOutput::new("config validate")
                        .with_success(false)
                        .with_data(serde_json::json!({
                            "path": path,
                            "valid": false,
                            "error": e.to_string()
                        }));
                    println!("{}", output.to_json()?);
                } else {
                    println!(
                        "{} {} has validation errors",
                        "✗".red().bold(),
                        path.display().to_string().cyan()
                    );
                    println!("  {}", e);
                }
            }
        },
        Err(e) => {
            if format == OutputFormat::Json {
                let output = McpOutput::new("config validate")
                    .with_success(false)
                    .with_data(serde_json::json!({
                        "path": path,
                        "valid": false,
                        "error": e.to_string()
                    }));
                println!("{}", output.to_json()?);
            } else {
                println!(
                    "{} Failed to parse {}",
                    "✗".red().bold(),
                    path.display().to_string().cyan()
                );
                println!("  {}", e);
            }
        }
    }

    Ok(())
}
