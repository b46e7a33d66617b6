// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Task Source Interface
//!
//! Read contract the synchronization layer needs from the remote service.
//! Implemented over HTTP by `crate::infrastructure::api_client::TaskApiClient`;
//! tests substitute in-memory sources.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::task::{TaskId, TaskSnapshot};

#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch the full task collection.
    async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, ApiError>;

    /// Fetch one task including its activities and agents.
    async fn get_task(&self, id: &TaskId) -> Result<TaskSnapshot, ApiError>;
}

/// Body returned by a write endpoint: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Json(Value),
    Text(String),
}

impl ApiPayload {
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => ApiPayload::Json(value),
            Err(_) => ApiPayload::Text(body),
        }
    }

    /// Two-space indented JSON. A text body renders as a quoted JSON string.
    pub fn pretty(&self) -> String {
        match self {
            ApiPayload::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ApiPayload::Text(text) => Value::String(text.clone()).to_string(),
        }
    }

    /// The `id` field of a JSON object body, if it is a string or a number.
    pub fn id(&self) -> Option<TaskId> {
        let ApiPayload::Json(Value::Object(map)) = self else {
            return None;
        };
        match map.get("id")? {
            Value::String(s) if !s.is_empty() => Some(TaskId::new(s.as_str())),
            Value::Number(n) => Some(TaskId::new(n.to_string())),
            _ => None,
        }
    }
}

/// Errors surfaced by REST calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 from the server. Never retried.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::InvalidRequest(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
