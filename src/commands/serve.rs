//! Daemon mode: the unit's ExecStart.
//!
//! Runs the boot check once, then writes a heartbeat every period until
//! terminated by the service manager. Request traffic enters through the
//! one-shot and MCP front-ends; this loop is the liveness anchor the
//! health probe and the idle watcher read.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;

use crate::checks::boot;
use crate::config::McpConfig;
use crate::output::OutputFormat;
use crate::secrets;
use crate::state::StateStore;
use crate::utils;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    config.validate()?;

    // The unit injects the secrets file; direct invocations load it here
    secrets::load_into_env(&config.service.secrets_path)?;

    let store = StateStore::new(config.service.runtime_dir());
    store.seed(utils::now_epoch());

    if format == OutputFormat::Text {
        println!(
            "{} runtime dir {}",
            "Serving.".cyan().bold(),
            store.runtime_dir().display()
        );
    }

    // Post-reboot inspection of learned failure patterns
    let report = boot::run_and_store(&store);
    if !report.checks.is_empty() {
        store.log_error(&format!(
            "BOOT_CHECK probed {} learned pattern(s)",
            report.checks.len()
        ));
    }

    let period = Duration::from_secs(config.limits.heartbeat_period_secs);
    loop {
        store.touch_heartbeat(utils::now_epoch());
        std::thread::sleep(period);
    }
}
