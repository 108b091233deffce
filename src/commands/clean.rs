//! Remove the managed service from the host.
//!
//! Stopping/disabling a missing unit and deleting missing files are
//! idempotent: logged and skipped. Removing the runtime directory is
//! irreversible and requires an explicit affirmative; empty input
//! preserves it.

use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

use crate::config::McpConfig;
use crate::output::{McpOutput, OutputFormat};
use crate::service;
use crate::utils;

pub fn run(purge: bool, auto_yes: bool, format: OutputFormat) -> Result<()> {
    if !utils::is_root() {
        anyhow::bail!("clean must run as root");
    }

    let config = McpConfig::load_or_default()?;
    let unit = &config.service.unit_name;

    if format == OutputFormat::Text {
        println!("{}", "Cleaning up mcp service...".cyan());
        println!();
    }

    let mut removed: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    // Unit teardown: every step tolerates absence
    if service::stop_ignore_missing(unit) {
        note(format, &mut removed, &format!("stopped {}", unit));
    } else {
        note_skip(format, &mut skipped, &format!("{} was not running", unit));
    }

    if service::disable_ignore_missing(unit) {
        note(format, &mut removed, &format!("disabled {}", unit));
    } else {
        note_skip(format, &mut skipped, &format!("{} was not enabled", unit));
    }

    let unit_path = config.service.unit_path();
    if service::remove_file_ignore_missing(&unit_path)? {
        let _ = service::daemon_reload();
        note(format, &mut removed, &format!("removed {}", unit_path.display()));
    } else {
        note_skip(
            format,
            &mut skipped,
            &format!("{} did not exist", unit_path.display()),
        );
    }

    if service::remove_file_ignore_missing(&config.service.secrets_path)? {
        note(
            format,
            &mut removed,
            &format!("removed {}", config.service.secrets_path.display()),
        );
    } else {
        note_skip(
            format,
            &mut skipped,
            &format!("{} did not exist", config.service.secrets_path.display()),
        );
    }

    // Destructive part: the runtime directory holds learned state
    let runtime_dir = config.service.runtime_dir();
    let mut purged = false;

    if purge && runtime_dir.exists() {
        let confirmed = auto_yes || confirm_purge(&runtime_dir, format)?;
        if confirmed {
            std::fs::remove_dir_all(&runtime_dir)?;
            purged = true;
            note(format, &mut removed, &format!("removed {}", runtime_dir.display()));
        } else {
            note_skip(
                format,
                &mut skipped,
                &format!("{} preserved", runtime_dir.display()),
            );
        }
    } else if runtime_dir.exists() {
        note_skip(
            format,
            &mut skipped,
            &format!("{} preserved (use --purge to remove)", runtime_dir.display()),
        );
    }

    if format == OutputFormat::Json {
        let output = McpOutput::new("clean")
            .with_success(true)
            .with_data(serde_json::json!({
                "removed": removed,
                "skipped": skipped,
                "runtime_dir_purged": purged,
            }));
        println!("{}", output.to_json()?);
    } else {
        println!();
        println!("{}", "Cleanup complete.".green().bold());
    }

    Ok(())
}

fn confirm_purge(runtime_dir: &Path, format: OutputFormat) -> Result<bool> {
    // JSON mode has no interactive channel; default stays "preserve"
    if format == OutputFormat::Json {
        return Ok(false);
    }

    let size = dir_size(runtime_dir);
    println!();
    println!(
        "{} This permanently deletes {} ({}) including incidents and learned patterns.",
        "Warning:".yellow().bold(),
        runtime_dir.display(),
        format_size(size)
    );
    print!("Delete the runtime directory? [y/N] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0;
    for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            size += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn note(format: OutputFormat, removed: &mut Vec<String>, msg: &str) {
    if format == OutputFormat::Text {
        println!("  {} {}", "✓".green(), msg);
    }
    removed.push(msg.to_string());
}

fn note_skip(format: OutputFormat, skipped: &mut Vec<String>, msg: &str) {
    if format == OutputFormat::Text {
        println!("  {} {}", "→".cyan(), msg.dimmed());
    }
    skipped.push(msg.to_string());
}
