// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0
//! Task state merger
//!
//! Pure reducers turning (current task state, inbound change) into the next
//! task state. Inputs are borrowed and never modified; every function returns
//! a fresh `Task`, so callers can detect changes by comparing values.
//!
//! Every `apply_*` accepts an absent prior state (`None`) and synthesizes a
//! minimal task carrying only the given id before applying the change.
//!
//! There is no version or timestamp comparison: whatever is applied last
//! wins. Activities are appended without deduplication.

use crate::domain::events::{ActivityUpdate, TaskEvent};
use crate::domain::task::{Activity, ActivityId, Task, TaskId, TaskSnapshot};

/// Convert a raw snapshot into the canonical task shape.
pub fn seed(snapshot: TaskSnapshot) -> Task {
    let activities = snapshot
        .activities
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, activity)| Activity {
            id: activity
                .id
                .unwrap_or_else(|| ActivityId::for_position(position)),
            agent: activity.agent,
            content: activity.content,
            created_at: activity.created_at,
        })
        .collect();

    Task {
        id: snapshot.id,
        title: snapshot.title.unwrap_or_default(),
        description: snapshot.description.unwrap_or_default(),
        status: snapshot.status.unwrap_or_default(),
        created_at: snapshot.created_at.unwrap_or_default(),
        activities,
        agents: snapshot.agents.unwrap_or_default(),
    }
}

fn base(state: Option<&Task>, id: &TaskId) -> Task {
    match state {
        Some(task) => task.clone(),
        None => Task::empty(id.clone()),
    }
}

pub fn apply_status(state: Option<&Task>, id: &TaskId, status: &str) -> Task {
    let mut next = base(state, id);
    next.status = status.to_string();
    next
}

pub fn apply_activity(state: Option<&Task>, id: &TaskId, activity: &ActivityUpdate) -> Task {
    let mut next = base(state, id);
    let activity_id = activity
        .id
        .clone()
        .unwrap_or_else(|| ActivityId::for_position(next.activities.len()));
    next.activities.push(Activity {
        id: activity_id,
        agent: activity.agent.clone(),
        content: activity.content.clone(),
        created_at: activity.created_at.clone(),
    });
    next
}

pub fn apply_agent_status(state: Option<&Task>, id: &TaskId, agent: &str, status: &str) -> Task {
    let mut next = base(state, id);
    next.agents.insert(agent.to_string(), status.to_string());
    next
}

/// Apply one stream event. Unknown events leave the state as it was.
pub fn apply_event(state: Option<&Task>, id: &TaskId, event: &TaskEvent) -> Option<Task> {
    match event {
        TaskEvent::Status { status } => Some(apply_status(state, id, status)),
        TaskEvent::Activity(activity) => Some(apply_activity(state, id, activity)),
        TaskEvent::AgentStatus { agent, status } => {
            Some(apply_agent_status(state, id, agent, status))
        }
        TaskEvent::Unknown => state.cloned(),
    }
}
