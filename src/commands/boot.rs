//! Run the pattern-driven boot check and write the boot report.

use anyhow::Result;
use colored::Colorize;

use crate::checks::boot;
use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};
use crate::state::StateStore;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    let store = StateStore::new(config.service.runtime_dir());

    if format == OutputFormat::Text {
        println!("{}", "Running boot check...".cyan());
        println!();
    }

    let report = boot::run_and_store(&store);

    if format == OutputFormat::Json {
        let output = McpOutput::new("boot-check")
            .with_success(true)
            .with_data(serde_json::to_value(&report)?);
        println!("{}", output.to_json()?);
    } else {
        if report.checks.is_empty() {
            println!("{}", "No failure patterns learned yet; nothing to probe.".dimmed());
        } else {
            for name in report.checks.keys() {
                println!("{} probed {}", "✓".green(), name.yellow());
            }
        }
        println!();
        println!(
            "Report written to {}",
            store.boot_report_path().display().to_string().cyan()
        );
    }

    Ok(())
}
