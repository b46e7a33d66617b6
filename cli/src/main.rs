// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! # taskdeck
//!
//! Command line client for an agent/task service.
//!
//! ## Commands
//!
//! - `taskdeck task list|show|watch|create` - Task operations
//! - `taskdeck agent list|create` - Agent operations
//! - `taskdeck health [--watch]` - Service health
//! - `taskdeck config show|validate|generate` - Configuration management
//!
//! Rendered output goes to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use taskdeck_cli::commands::{self, AgentCommand, ClientOverrides, ConfigCommand, TaskCommand};

/// taskdeck - follow agents and tasks from the terminal
#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TASKDECK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Service base URL (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    /// Bearer token (overrides config)
    #[arg(long, global = true, env = "TASKDECK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TASKDECK_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Task operations
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Agent management
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Check service health
    #[command(name = "health")]
    Health {
        /// Keep probing on the configured interval
        #[arg(short, long)]
        watch: bool,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let overrides = ClientOverrides {
        config_path: cli.config,
        api_base: cli.api_base,
        token: cli.token,
    };

    match cli.command {
        Some(Commands::Task { command }) => commands::task::handle_command(command, overrides).await,
        Some(Commands::Agent { command }) => {
            commands::agent::handle_command(command, overrides).await
        }
        Some(Commands::Health { watch }) => commands::health::run(watch, overrides).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, overrides).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
