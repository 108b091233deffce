use clap::{Parser, Subcommand};
use colored::Colorize;

mod checks;
mod cloud;
mod commands;
mod config;
mod context;
mod engine;
mod llm;
mod output;
mod secrets;
mod service;
mod state;
mod utils;

use commands::config::ConfigAction;

pub use output::OutputFormat;

/// mcpd - LLM-routed ops agent & provisioning doctor
/// Installs and supervises the mcp service, routes operator requests
/// through cloud model chains, and learns failure patterns across reboots.
#[derive(Parser)]
#[command(name = "mcpd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the service: secrets, runtime dir, unit file, start
    Install {
        /// API key to store (prompted interactively when omitted)
        #[arg(long)]
        api_key: Option<String>,

        /// Skip the cloud verification probe after install
        #[arg(long)]
        no_verify: bool,
    },

    /// Stop, re-render the unit, restart, and verify health
    Update,

    /// Run health checks on the managed service
    Doctor {
        /// Only check specific category
        #[arg(short, long, value_enum)]
        category: Option<checks::CheckCategory>,

        /// Include the cloud endpoint probe (network round trip)
        #[arg(long)]
        cloud: bool,
    },

    /// Remove the service (unit, secrets; runtime dir only with --purge)
    Clean {
        /// Also remove the runtime directory (asks for confirmation)
        #[arg(long)]
        purge: bool,

        /// Auto-approve the destructive removal
        #[arg(short, long)]
        yes: bool,
    },

    /// Verify the cloud credential and report one classified outcome
    Verify,

    /// Handle a single operator request
    Ask {
        /// The request text
        text: String,
    },

    /// Interactive request loop
    Cli,

    /// Show service status (unit, heartbeat, incidents, patterns)
    Status,

    /// Probe the host for learned failure patterns
    BootCheck,

    /// Run as the supervised daemon (heartbeat loop)
    Serve,

    /// Stop the service after prolonged inactivity
    Watch,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Create default /etc/mcp.toml configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

fn main() {
    let cli = Cli::parse();
    let format = OutputFormat::from_str(&cli.format);
    let is_json = format == OutputFormat::Json;

    if !is_json {
        println!("{}", "⚙ mcpd".bold().cyan());
        println!("{}", "LLM Ops Agent & Service Doctor".dimmed());
        println!();
    }

    let result = match cli.command {
        Commands::Install { api_key, no_verify } => {
            commands::install::run(api_key, no_verify, format)
        }
        Commands::Update => commands::update::run(format),
        Commands::Doctor { category, cloud } => commands::doctor::run(category, cloud, format),
        Commands::Clean { purge, yes } => commands::clean::run(purge, yes, format),
        Commands::Verify => commands::verify::run(format),
        Commands::Ask { text } => commands::ask::run(&text, format),
        Commands::Cli => commands::repl::run(format),
        Commands::Status => commands::status::run(format),
        Commands::BootCheck => commands::boot::run(format),
        Commands::Serve => commands::serve::run(format),
        Commands::Watch => commands::watch::run(format),
        Commands::Config { action } => {
            let config_action = match action {
                ConfigCommands::Init { force } => ConfigAction::Init { force },
                ConfigCommands::Validate => ConfigAction::Validate,
            };
            commands::config::run(config_action, format)
        }
    };

    if let Err(e) = result {
        if is_json {
            let error_output = serde_json::json!({
                "success": false,
                "error": e.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            eprintln!("{}", serde_json::to_string_pretty(&error_output).unwrap_or_default());
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}
