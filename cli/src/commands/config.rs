// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use taskdeck_core::domain::client_config::{ClientConfig, CONFIG_PATH_ENV};

use super::ClientOverrides;

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./taskdeck.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, overrides: ClientOverrides) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(&overrides, paths),
        ConfigCommand::Validate { file } => {
            let path = file.or(overrides.config_path);
            validate(path)
        }
        ConfigCommand::Generate { output, force } => generate(output, force),
    }
}

fn show(overrides: &ClientOverrides, show_paths: bool) -> Result<()> {
    let mut config = ClientConfig::load_or_default(overrides.config_path.clone())
        .context("Failed to load configuration")?;
    overrides.apply(&mut config);

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &overrides.config_path {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        let discovered = ClientConfig::discover_config();
        for path in ClientConfig::search_paths() {
            let marker = if discovered.as_ref() == Some(&path) {
                " (in use)".green().to_string()
            } else {
                String::new()
            };
            println!("  {}{}", path.display(), marker);
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    print!("{}", render_config(&config)?);

    Ok(())
}

/// YAML view of `config` with the token masked.
fn render_config(config: &ClientConfig) -> Result<String> {
    let mut masked = config.clone();
    if masked.token.is_some() {
        masked.token = Some("********".to_string());
    }
    masked
        .to_yaml_string()
        .context("Failed to serialize configuration")
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ClientConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    std::fs::write(&output, MINIMAL_TEMPLATE)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
