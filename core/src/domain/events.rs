// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Task stream events.
//!
//! Messages on `GET /events/tasks/{id}` are JSON objects tagged by `type`.
//! Each variant carries only the fields relevant to its tag; any other tag
//! lands in `TaskEvent::Unknown`.

use serde::{Deserialize, Serialize};

use crate::domain::task::ActivityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Status {
        status: String,
    },
    Activity(ActivityUpdate),
    AgentStatus {
        agent: String,
        status: String,
    },
    #[serde(other)]
    Unknown,
}

/// Payload of an `activity` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}

impl TaskEvent {
    /// Parse one stream message body.
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::Status { .. } => "status",
            TaskEvent::Activity(_) => "activity",
            TaskEvent::AgentStatus { .. } => "agent_status",
            TaskEvent::Unknown => "unknown",
        }
    }
}
