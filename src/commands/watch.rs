//! Idle watcher: stop the service after prolonged inactivity.
//!
//! Polls the activity timestamp once a minute; read failures are tolerated
//! (the state module already degrades to defaults). Exits after stopping
//! the unit so the watcher does not outlive its purpose.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;

use crate::config::McpConfig;
use crate::output::OutputFormat;
use crate::service;
use crate::state::StateStore;
use crate::utils;

const POLL_INTERVAL: Duration = Duration::from_secs(60);

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    let store = StateStore::new(config.service.runtime_dir());
    let idle_limit = config.limits.idle_limit_secs as f64;

    if format == OutputFormat::Text {
        println!(
            "{} stopping {} after {}s idle",
            "Watching.".cyan().bold(),
            config.service.unit_name.cyan(),
            config.limits.idle_limit_secs
        );
    }

    loop {
        let state = store.load_state();

        // A never-active service has nothing to idle out
        if state.last_activity > 0.0 && state.idle_for(utils::now_epoch()) > idle_limit {
            store.log_error(&format!(
                "IDLE_STOP {} after {:.0}s without activity",
                config.service.unit_name,
                state.idle_for(utils::now_epoch())
            ));
            if !service::stop_ignore_missing(&config.service.unit_name) {
                store.log_error("IDLE_STOP unit was not running");
            }
            if format == OutputFormat::Text {
                println!("{} idle limit reached; service stopped", "→".cyan());
            }
            return Ok(());
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
