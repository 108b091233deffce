//! Run health checks on the managed service and report aggregate pass/fail.

use anyhow::Result;
use colored::Colorize;

use crate::checks::{run_health_checks, CheckCategory, CheckResult, CheckSeverity};
use crate::config::McpConfig;
use crate::output::{Issue, McpOutput, OutputFormat};

pub fn run(category: Option<CheckCategory>, include_cloud: bool, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Text {
        println!("{}", "Running service health checks...".cyan());
        println!();
    }

    let config = McpConfig::load_or_default()?;

    let results = run_health_checks(&config, category, include_cloud);

    let has_errors = results.iter().any(|r| r.severity == CheckSeverity::Error);

    match format {
        OutputFormat::Json => output_json(&results, has_errors)?,
        OutputFormat::Text => output_text(&results),
    }

    // Unhealthy is a non-zero exit: this is the health probe contract
    if has_errors {
        std::process::exit(1);
    }

    Ok(())
}

fn output_text(results: &[CheckResult]) {
    let mut errors = 0;
    let mut warnings = 0;
    let mut passed = 0;

    for result in results {
        let (icon, color) = match result.severity {
            CheckSeverity::Pass => {
                passed += 1;
                ("✓", "green")
            }
            CheckSeverity::Warning => {
                warnings += 1;
                ("⚠", "yellow")
            }
            CheckSeverity::Error => {
                errors += 1;
                ("✗", "red")
            }
            CheckSeverity::Info => ("ℹ", "blue"),
        };

        let icon_colored = match color {
            "green" => icon.green(),
            "yellow" => icon.yellow(),
            "red" => icon.red(),
            _ => icon.blue(),
        };

        println!("{} {}", icon_colored, result.name);

        if !result.message.is_empty() {
            println!("  {}", result.message.dimmed());
        }

        if let Some(ref fix) = result.suggested_fix {
            println!("  {} {}", "Fix:".cyan(), fix);
        }
    }

    println!();
    println!(
        "{}: {} passed, {} warnings, {} errors",
        "Summary".bold(),
        passed.to_string().green(),
        warnings.to_string().yellow(),
        errors.to_string().red()
    );

    if errors == 0 {
        println!();
        println!("{}", "Service is healthy.".green().bold());
    } else {
        println!();
        println!(
            "{} Fix the errors above, then re-run {}.",
            "→".cyan(),
            "mcpd doctor".cyan()
        );
    }
}

fn output_json(results: &[CheckResult], has_errors: bool) -> Result<()> {
    let issues: Vec<Issue> = results.iter().map(Issue::from).collect();

    let errors = results
        .iter()
        .filter(|r| r.severity == CheckSeverity::Error)
        .count();
    let warnings = results
        .iter()
        .filter(|r| r.severity == CheckSeverity::Warning)
        .count();
    let passed = results
        .iter()
        .filter(|r| r.severity == CheckSeverity::Pass)
        .count();

    let output = McpOutput::new("doctor")
        .with_success(!has_errors)
        .with_healthy(!has_errors)
        .with_issues(issues)
        .with_data(serde_json::json!({
            "summary": {
                "total": results.len(),
                "passed": passed,
                "warnings": warnings,
                "errors": errors
            }
        }));

    println!("{}", output.to_json()?);
    Ok(())
}
