//! Interactive prompt loop over the engine.
//!
//! Errors are logged and reported per line; the loop only ends on EOF or
//! an explicit quit.

use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};

use crate::commands::ask::print_outcome;
use crate::config::McpConfig;
use crate::engine::Engine;
use crate::output::OutputFormat;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = McpConfig::load_or_default()?;
    let mut engine = Engine::new(config)?;

    println!("{}", "mcp interactive mode".bold().cyan());
    println!("{}", "Type a request, or `quit` to leave.".dimmed());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\nmcp> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let text = line?.trim().to_string();

        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
            break;
        }

        match engine.handle_input(&text, true) {
            Ok(outcome) => {
                if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                } else {
                    print_outcome(&outcome);
                }
            }
            Err(e) => {
                engine.store().log_error(&format!("REPL_FAIL: {:#}", e));
                println!("{} {:#}", "Error:".red().bold(), e);
            }
        }
    }

    Ok(())
}
