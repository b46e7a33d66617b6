// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Agent management commands
//!
//! Commands: list, create

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use taskdeck_core::infrastructure::api_client::NewAgent;

use super::{ClientContext, ClientOverrides};
use crate::render;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List registered agents
    List,

    /// Register a new agent
    Create {
        /// Agent name
        #[arg(long)]
        name: String,

        /// What the agent does
        #[arg(long)]
        role: String,

        /// Knowledge domain the agent works in
        #[arg(long)]
        domain: String,
    },
}

pub async fn handle_command(command: AgentCommand, overrides: ClientOverrides) -> Result<()> {
    let ctx = ClientContext::connect(&overrides)?;

    match command {
        AgentCommand::List => list(&ctx).await,
        AgentCommand::Create { name, role, domain } => {
            create(&ctx, NewAgent::new(&name, &role, &domain)).await
        }
    }
}

async fn list(ctx: &ClientContext) -> Result<()> {
    let agents = ctx
        .api
        .list_agents()
        .await
        .context("Failed to list agents")?;
    print!("{}", render::render_agents(&agents));
    Ok(())
}

async fn create(ctx: &ClientContext, agent: NewAgent) -> Result<()> {
    println!("Creating agent: {}", agent.name.bold());

    let created = ctx
        .api
        .create_agent(&agent)
        .await
        .context("Failed to create agent")?;

    println!("Agent Created: {}", created.pretty());
    Ok(())
}
