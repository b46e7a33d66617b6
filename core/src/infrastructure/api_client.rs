// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for the task service REST API.
//!
//! Every request except the health probe carries `Authorization: Bearer
//! <token>` when a token is configured. A 401 from any endpoint becomes
//! `ApiError::Unauthorized`; nothing here retries.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::client_config::ClientConfig;
use crate::domain::source::{ApiError, ApiPayload, TaskSource};
use crate::domain::task::{TaskId, TaskSnapshot};

/// URL layout derived from the configured base.
///
/// REST paths live under `/api`, which is not added again when the base
/// already ends with it. Health and events hang off the base as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    rest: String,
}

impl Endpoints {
    pub fn new(api_base: &str) -> Result<Self, ApiError> {
        let base = api_base.trim().trim_end_matches('/').to_string();
        if base.is_empty() {
            return Err(ApiError::InvalidRequest("API base URL is empty".into()));
        }
        let rest = if base.ends_with("/api") {
            base.clone()
        } else {
            format!("{}/api", base)
        };
        Ok(Self { base, rest })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn tasks(&self) -> String {
        format!("{}/tasks", self.rest)
    }

    pub fn task(&self, id: &TaskId) -> String {
        format!("{}/tasks/{}", self.rest, id)
    }

    pub fn agents(&self) -> String {
        format!("{}/agents", self.rest)
    }

    pub fn health(&self) -> String {
        format!("{}/health", self.base)
    }

    pub fn task_events(&self, id: &TaskId) -> String {
        format!("{}/events/tasks/{}", self.base, id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Private,
    Shared,
}

/// Where the worker should look for test artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub junit_xml: Vec<String>,
    pub coverage_xml: String,
    pub smoke_log: String,
    pub e2e_log: String,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            junit_xml: vec![
                "artifacts/pytest.xml".to_string(),
                "artifacts/junit.xml".to_string(),
            ],
            coverage_xml: "artifacts/coverage.xml".to_string(),
            smoke_log: "artifacts/smoke.log".to_string(),
            e2e_log: "artifacts/e2e.log".to_string(),
        }
    }
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub access: AccessLevel,
    pub include_artifacts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_paths: Option<ArtifactPaths>,
}

impl NewTask {
    /// Title and description are trimmed; artifacts are included by default.
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            access: AccessLevel::default(),
            include_artifacts: true,
            artifact_paths: Some(ArtifactPaths::default()),
        }
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    pub fn without_artifacts(mut self) -> Self {
        self.include_artifacts = false;
        self.artifact_paths = None;
        self
    }
}

/// Body of `POST /api/agents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAgent {
    pub name: String,
    pub role: String,
    pub domain: String,
}

impl NewAgent {
    pub fn new(name: &str, role: &str, domain: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            role: role.trim().to_string(),
            domain: domain.trim().to_string(),
        }
    }
}

/// Entry of `GET /api/agents`. Fields the client does not know are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Outcome of `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
    /// Reachable but answered with a non-2xx status.
    Error(u16),
    /// Unreachable.
    Down,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

#[derive(Debug, Clone)]
pub struct TaskApiClient {
    client: Client,
    endpoints: Endpoints,
    token: Option<String>,
}

impl TaskApiClient {
    pub fn new(api_base: &str, token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            // no global timeout; the event stream is long-lived
            .build()?;

        Ok(Self {
            client,
            endpoints: Endpoints::new(api_base)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base, config.bearer_token().map(str::to_string))
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Shared HTTP connection pool, reused by the event stream connector.
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, ApiError> {
        let response = self
            .authorized(self.client.get(self.endpoints.tasks()))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<TaskSnapshot, ApiError> {
        let response = self
            .authorized(self.client.get(self.endpoints.task(id)))
            .send()
            .await?;
        read_json(response).await
    }

    /// Create a task. The body is returned as JSON when it parses, as text otherwise.
    pub async fn create_task(&self, task: &NewTask) -> Result<ApiPayload, ApiError> {
        let response = self
            .authorized(self.client.post(self.endpoints.tasks()))
            .json(task)
            .send()
            .await?;
        read_payload(response).await
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentRecord>, ApiError> {
        let response = self
            .authorized(self.client.get(self.endpoints.agents()))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn create_agent(&self, agent: &NewAgent) -> Result<ApiPayload, ApiError> {
        let response = self
            .authorized(self.client.post(self.endpoints.agents()))
            .json(agent)
            .send()
            .await?;
        read_payload(response).await
    }

    /// Probe `GET /health` without credentials.
    pub async fn health(&self) -> HealthStatus {
        match self.client.get(self.endpoints.health()).send().await {
            Ok(response) if response.status().is_success() => HealthStatus::Ok,
            Ok(response) => HealthStatus::Error(response.status().as_u16()),
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                HealthStatus::Down
            }
        }
    }
}

#[async_trait]
impl TaskSource for TaskApiClient {
    async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, ApiError> {
        TaskApiClient::list_tasks(self).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<TaskSnapshot, ApiError> {
        TaskApiClient::get_task(self, id).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = ensure_success(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn read_payload(response: Response) -> Result<ApiPayload, ApiError> {
    let body = ensure_success(response).await?.text().await?;
    Ok(ApiPayload::from_body(body))
}
