// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Task operations commands
//!
//! Commands: list, show, watch, create

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use taskdeck_core::application::follow::Follow;
use taskdeck_core::application::merger;
use taskdeck_core::application::polling::{PollEvent, PollingScheduler};
use taskdeck_core::application::task_view::{TaskView, ViewUpdate};
use taskdeck_core::domain::stream::StreamError;
use taskdeck_core::domain::task::TaskId;
use taskdeck_core::infrastructure::api_client::{AccessLevel, NewTask};

use super::{ClientContext, ClientOverrides};
use crate::render;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// List tasks
    List {
        /// Refresh the list on the configured interval
        #[arg(short, long)]
        watch: bool,
    },

    /// Show one task with its agents and activities
    Show {
        /// Task ID
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },

    /// Follow a task live until it settles
    Watch {
        /// Task ID
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },

    /// Create a task and follow its progress
    Create {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Who can see the task
        #[arg(long, value_enum, default_value_t = AccessArg::Private)]
        access: AccessArg,

        /// Do not ask the worker to collect test artifacts
        #[arg(long)]
        no_artifacts: bool,

        /// Print the creation response and exit
        #[arg(long)]
        no_follow: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessArg {
    Private,
    Shared,
}

impl From<AccessArg> for AccessLevel {
    fn from(value: AccessArg) -> Self {
        match value {
            AccessArg::Private => AccessLevel::Private,
            AccessArg::Shared => AccessLevel::Shared,
        }
    }
}

pub async fn handle_command(command: TaskCommand, overrides: ClientOverrides) -> Result<()> {
    let ctx = ClientContext::connect(&overrides)?;

    match command {
        TaskCommand::List { watch } => list(&ctx, watch).await,
        TaskCommand::Show { task_id } => show(&ctx, TaskId::new(task_id)).await,
        TaskCommand::Watch { task_id } => watch(&ctx, TaskId::new(task_id)).await,
        TaskCommand::Create {
            title,
            description,
            access,
            no_artifacts,
            no_follow,
        } => {
            let mut task = NewTask::new(&title, &description).with_access(access.into());
            if no_artifacts {
                task = task.without_artifacts();
            }
            create(&ctx, task, no_follow).await
        }
    }
}

async fn list(ctx: &ClientContext, watch: bool) -> Result<()> {
    if !watch {
        let tasks = ctx.api.list_tasks().await.context("Failed to list tasks")?;
        print!("{}", render::render_task_list(&tasks));
        return Ok(());
    }

    let api = Arc::clone(&ctx.api);
    let mut schedule = PollingScheduler::start(
        "task-list",
        ctx.config.polling.list_policy(),
        move || {
            let api = Arc::clone(&api);
            async move {
                let result = api.list_tasks().await;
                if let Err(e) = &result {
                    warn!(error = %e, "Task list refresh failed");
                }
                result
            }
        },
        |_| false,
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = schedule.next() => match event {
                Some(PollEvent::Fetched(tasks)) => {
                    println!(
                        "{}",
                        format!("Tasks (refreshed {})", chrono::Local::now().format("%H:%M:%S")).bold()
                    );
                    println!("{}", render::render_task_list(&tasks));
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    schedule.shutdown().await;
    Ok(())
}

async fn show(ctx: &ClientContext, task_id: TaskId) -> Result<()> {
    let snapshot = ctx
        .api
        .get_task(&task_id)
        .await
        .with_context(|| format!("Failed to fetch task {}", task_id))?;
    print!("{}", render::render_task(&merger::seed(snapshot)));
    Ok(())
}

async fn watch(ctx: &ClientContext, task_id: TaskId) -> Result<()> {
    let opener = ctx.event_stream();
    let fallback = ctx.config.polling.view_fallback_policy();
    let mut view = TaskView::open(ctx.api.clone(), &opener, task_id.clone(), fallback).await;

    if view.state().is_none() {
        println!("{}", format!("Waiting for task {}...", task_id).dimmed());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = view.next() => {
                let Some(update) = update else { break };
                match &update {
                    ViewUpdate::Seeded(task) | ViewUpdate::Updated(task) => {
                        println!("{}", render::render_task(task));
                    }
                    ViewUpdate::FellBack(reason) => {
                        eprintln!("{}", fallback_notice(reason, fallback.interval).yellow());
                    }
                    ViewUpdate::Settled(_) => {}
                }
                if let Some(status) = settled_status(&update) {
                    println!(
                        "{}",
                        format!("✓ Task {} settled: {}", task_id, render::format_status(&status)).green()
                    );
                    break;
                }
            }
        }
    }

    view.close();
    Ok(())
}

/// Final status once `update` leaves nothing more to watch.
///
/// A stream that reports a settled status may stay open, so a settled
/// `Seeded` or `Updated` state ends the watch as well as `Settled`.
fn settled_status(update: &ViewUpdate) -> Option<String> {
    match update {
        ViewUpdate::Seeded(task) | ViewUpdate::Updated(task) if task.is_settled() => {
            Some(task.status.clone())
        }
        ViewUpdate::Settled(task) => Some(task.as_ref().map(|t| t.status.clone()).unwrap_or_default()),
        _ => None,
    }
}

fn fallback_notice(reason: &StreamError, interval: std::time::Duration) -> String {
    let hint = match reason {
        StreamError::Unauthorized => " (check your token)",
        _ => "",
    };
    format!(
        "Live updates unavailable: {}{}. Polling every {}s.",
        reason,
        hint,
        interval.as_secs_f32()
    )
}

async fn create(ctx: &ClientContext, task: NewTask, no_follow: bool) -> Result<()> {
    println!("Creating task: {}", task.title.bold());

    let created = ctx
        .api
        .create_task(&task)
        .await
        .context("Failed to create task")?;

    if no_follow {
        println!("Task Created: {}", created.pretty());
        return Ok(());
    }

    let mut follow = Follow::start(ctx.api.clone(), &created, ctx.config.polling.follow_policy());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                follow.cancel();
                break;
            }
            revision = follow.next() => match revision {
                Some(text) => println!("{}\n", text),
                None => break,
            },
        }
    }

    Ok(())
}
