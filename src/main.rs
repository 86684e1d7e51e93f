//! jira - Command-line client for the Jira issue tracker.
//!
//! # Usage
//!
//! ```bash
//! jira configure          # Write the configuration file
//! jira ls                 # List issues assigned to the current user
//! jira ls --open-sprint   # ...limited to the open sprint
//! jira show <ISSUE>       # Show details, sub-tasks, comments and dev status
//! jira dashboard          # Interactive, auto-refreshing dashboard
//! ```

mod commands;
mod config;
mod jira;
mod logging;
mod render;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use logging::LogTarget;

/// Jira command line interface
///
/// List, inspect and watch the issues assigned to you.
#[derive(Parser)]
#[command(name = "jira")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file (defaults to ~/.jira-cli.yaml; PYJIRA_CONFIG
    /// and ~/.pyjira.yaml are still read)
    #[arg(long, global = true, env = "JIRA_CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the cli
    Configure,

    /// List all issues assigned to the current user
    Ls {
        /// Limit to the current sprint
        #[arg(short, long)]
        open_sprint: bool,
    },

    /// Show detailed information about a specific issue
    Show {
        /// Issue key (e.g., "PROJ-123")
        issue: String,
    },

    /// Start an interactive dashboard
    Dashboard {
        /// Refresh interval in seconds (overrides the config file)
        #[arg(short, long)]
        interval: Option<u64>,

        /// JQL query to watch (overrides the configured board filter)
        #[arg(long)]
        jql: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config::resolve_path(cli.config.as_deref())?;

    // The dashboard sets up its own file logging once its config has loaded.
    let _log_guard = match cli.command {
        Commands::Dashboard { .. } => None,
        _ => logging::init(cli.verbose, LogTarget::Stderr),
    };

    match cli.command {
        Commands::Configure => commands::configure::run(&config_path),
        Commands::Ls { open_sprint } => commands::ls::run(&config_path, open_sprint),
        Commands::Show { issue } => commands::show::run(&config_path, &issue),
        Commands::Dashboard { interval, jql } => {
            commands::dashboard::run(&config_path, cli.verbose, interval, jql)
        }
    }
}
