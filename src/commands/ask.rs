//! One-shot request handling: classify, route, plan/execute or report.

use anyhow::Result;
use colored::Colorize;

use crate::config::McpConfig;
use crate::engine::{Engine, Outcome};
use crate::output::{McpOutput, OutputFormat};

pub fn run(text: &str, format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    let mut engine = Engine::new(config)?;

    let outcome = engine.handle_input(text, format == OutputFormat::Text)?;

    match format {
        OutputFormat::Json => {
            let output = McpOutput::new("ask")
                .with_success(true)
                .with_data(serde_json::to_value(&outcome)?);
            println!("{}", output.to_json()?);
        }
        OutputFormat::Text => print_outcome(&outcome),
    }

    Ok(())
}

/// Human rendering of an engine outcome
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NoExec { description } => {
            println!("{} {}", "No commands executed:".yellow().bold(), description);
        }
        Outcome::Execute {
            description,
            results,
            saved_to,
        } => {
            if !description.is_empty() {
                println!("{}", description.bold());
                println!();
            }
            for result in results {
                let status = if result.returncode == 0 {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!("{} {}", status, result.command.cyan());
                if !result.stdout.is_empty() {
                    println!("{}", result.stdout);
                }
                if !result.stderr.is_empty() {
                    println!("{}", result.stderr.red());
                }
                println!();
            }
            if let Some(path) = saved_to {
                println!("{} {}", "Saved to:".dimmed(), path);
            }
        }
        Outcome::Report { report } => {
            println!("{}", report.summary.bold());
            for (i, step) in report.steps.iter().enumerate() {
                println!("  {}. {}", i + 1, step);
            }
            println!();
            println!("Risk: {}", format!("{:?}", report.risk).to_lowercase());
        }
    }
}
