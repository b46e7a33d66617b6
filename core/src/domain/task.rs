// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Task aggregate as seen by the client.
//!
//! The server owns tasks; the client only ever holds a reconciled copy of
//! one task (`Task`) built from a snapshot plus stream events, or a list of
//! raw snapshots for the overview.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status values that mean the server is still working on a task.
pub const IN_FLIGHT_STATUSES: [&str; 2] = ["pending", "running"];

/// Opaque task identifier.
///
/// Servers send either a JSON number or a string; both are kept as text so
/// `42` and `"42"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_opaque(deserializer).map(TaskId)
    }
}

/// Opaque activity sequence id. Assigned by the client when the source omits one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl ActivityId {
    /// Id for an activity appended at zero-based `position`.
    pub fn for_position(position: usize) -> Self {
        Self((position + 1).to_string())
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ActivityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_opaque(deserializer).map(ActivityId)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

fn deserialize_opaque<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match OpaqueRepr::deserialize(deserializer)? {
        OpaqueRepr::Text(s) => s,
        OpaqueRepr::Unsigned(n) => n.to_string(),
        OpaqueRepr::Signed(n) => n.to_string(),
        OpaqueRepr::Float(n) => n.to_string(),
    })
}

/// One entry of a task's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub agent: String,
    pub content: String,
    pub created_at: String,
}

/// Canonical, fully populated task state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Open set: whatever the server sent last.
    pub status: String,
    pub created_at: String,
    /// Arrival order; append-only.
    pub activities: Vec<Activity>,
    /// Agent name -> latest status.
    pub agents: BTreeMap<String, String>,
}

impl Task {
    /// Minimal valid task: only the id is known.
    pub fn empty(id: TaskId) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            status: String::new(),
            created_at: String::new(),
            activities: Vec::new(),
            agents: BTreeMap::new(),
        }
    }

    /// True once the status is set and is neither `pending` nor `running`.
    pub fn is_settled(&self) -> bool {
        is_settled_status(&self.status)
    }

    /// True when at least one agent currently reports `running`.
    pub fn has_running_agents(&self) -> bool {
        self.agents.values().any(|status| status == "running")
    }
}

pub fn is_settled_status(status: &str) -> bool {
    !status.is_empty() && !IN_FLIGHT_STATUSES.contains(&status)
}

/// Activity as received on the wire, id optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    #[serde(default)]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}

/// Raw task object returned by `GET /api/tasks` and `GET /api/tasks/{id}`.
///
/// Only `id` is required; everything else defaults. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub activities: Option<Vec<ActivitySnapshot>>,
    #[serde(default)]
    pub agents: Option<BTreeMap<String, String>>,
}

impl TaskSnapshot {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    pub fn is_settled(&self) -> bool {
        is_settled_status(self.status())
    }
}
