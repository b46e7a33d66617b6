// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering of tasks, agents and health.

use colored::{ColoredString, Colorize};

use taskdeck_core::domain::task::{Task, TaskSnapshot};
use taskdeck_core::infrastructure::api_client::{AgentRecord, HealthStatus};

pub fn format_status(status: &str) -> ColoredString {
    match status {
        "" => "unknown".dimmed(),
        "pending" => "pending".yellow(),
        "running" => "running".blue(),
        "succeeded" | "completed" | "done" => status.green(),
        "failed" => "failed".red(),
        _ => status.normal(),
    }
}

/// Agent status colors: running blue, failed red, anything else green.
pub fn format_agent_status(status: &str) -> ColoredString {
    match status {
        "running" => status.blue(),
        "failed" => status.red(),
        _ => status.green(),
    }
}

pub fn format_health(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Ok => "OK".green(),
        HealthStatus::Error(code) => format!("Error (HTTP {})", code).red(),
        HealthStatus::Down => "Down".red(),
    }
}

pub fn render_task_list(tasks: &[TaskSnapshot]) -> String {
    if tasks.is_empty() {
        return format!("{}", "No tasks found".yellow());
    }

    let mut out = format!("{} tasks:\n", tasks.len());
    for task in tasks {
        out.push_str(&format!(
            "  {} {} {}\n",
            format!("[{}]", task.id).dimmed(),
            task.title.as_deref().unwrap_or("(untitled)").bold(),
            format_status(task.status())
        ));
        if let Some(created_at) = task.created_at.as_deref().filter(|c| !c.is_empty()) {
            out.push_str(&format!("      {}\n", created_at.dimmed()));
        }
    }
    out
}

pub fn render_task(task: &Task) -> String {
    let mut out = format!("{}\n", format!("Task {}", task.id).bold());

    if !task.title.is_empty() {
        out.push_str(&format!("  {}\n", task.title.bold()));
    }
    if !task.description.is_empty() {
        for line in task.description.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }

    out.push_str(&format!("  Status: {}", format_status(&task.status)));
    if task.has_running_agents() {
        out.push_str(&format!("  {}", "Running…".blue()));
    }
    out.push('\n');

    if !task.created_at.is_empty() {
        out.push_str(&format!("  Created: {}\n", task.created_at));
    }

    if !task.agents.is_empty() {
        out.push_str(&format!("\n{}\n", "Agent Status".bold()));
        for (name, status) in &task.agents {
            out.push_str(&format!("  {}: {}\n", name, format_agent_status(status)));
        }
    }

    out.push_str(&format!("\n{}\n", "Activities".bold()));
    if task.activities.is_empty() {
        out.push_str(&format!("  {}\n", "No activities yet.".dimmed()));
    } else {
        for activity in &task.activities {
            let header = match (activity.created_at.is_empty(), activity.agent.is_empty()) {
                (false, false) => format!("{} {}", activity.created_at, activity.agent),
                (false, true) => activity.created_at.clone(),
                (true, false) => activity.agent.clone(),
                (true, true) => String::new(),
            };
            if !header.is_empty() {
                out.push_str(&format!("  {}\n", header.dimmed()));
            }
            for line in activity.content.lines() {
                out.push_str(&format!("    {}\n", line));
            }
        }
    }

    out
}

pub fn render_agents(agents: &[AgentRecord]) -> String {
    if agents.is_empty() {
        return format!("{}", "No agents found".yellow());
    }

    let mut out = format!("{} agents:\n", agents.len());
    for agent in agents {
        let id = agent
            .id
            .as_ref()
            .map(|id| match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("  {} {}", format!("[{}]", id).dimmed(), agent.name.bold()));
        if let Some(description) = agent.description.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!(" - {}", description));
        }
        out.push('\n');
    }
    out
}
