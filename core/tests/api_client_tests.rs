// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

use mockito::Matcher;
use serde_json::json;
use taskdeck_core::domain::source::{ApiError, ApiPayload};
use taskdeck_core::domain::task::TaskId;
use taskdeck_core::infrastructure::api_client::{
    AccessLevel, HealthStatus, NewAgent, NewTask, TaskApiClient,
};

#[tokio::test]
async fn test_get_task_sends_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tasks/42")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":42,"title":"Audit","status":"running","agents":{"writer":"running"}}"#)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), Some("secret".into())).unwrap();
    let snapshot = client.get_task(&TaskId::from(42)).await.unwrap();

    assert_eq!(snapshot.id, TaskId::from("42"));
    assert_eq!(snapshot.status(), "running");
    assert!(snapshot.activities.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tasks")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"[{"id":1,"status":"pending"},{"id":"2"}]"#)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), None).unwrap();
    let tasks = client.list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].id, TaskId::from(2));
    assert_eq!(tasks[1].status(), "");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_is_typed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tasks")
        .with_status(401)
        .with_body("token expired")
        .expect(1)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), Some("stale".into())).unwrap();
    let err = client.list_tasks().await.unwrap_err();

    assert!(err.is_unauthorized());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tasks/7")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), None).unwrap();
    match client.get_task(&TaskId::from(7)).await {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_read_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), None).unwrap();
    assert!(matches!(
        client.list_tasks().await,
        Err(ApiError::Decode(_))
    ));
}

#[tokio::test]
async fn test_api_suffixed_base_is_not_doubled() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/agents")
        .with_status(200)
        .with_body(r#"[{"id":1,"name":"researcher","description":"reads","owner_id":3}]"#)
        .create_async()
        .await;

    let base = format!("{}/api/", server.url());
    let client = TaskApiClient::new(&base, None).unwrap();
    let agents = client.list_agents().await.unwrap();

    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].name, "researcher");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_task_posts_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/tasks")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({
            "title": "Audit",
            "access": "shared",
            "include_artifacts": true
        })))
        .with_status(200)
        .with_body(r#"{"id":42,"title":"Audit"}"#)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), Some("secret".into())).unwrap();
    let created = client
        .create_task(&NewTask::new("Audit", "Check coverage").with_access(AccessLevel::Shared))
        .await
        .unwrap();

    assert_eq!(created.id(), Some(TaskId::from(42)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_agent_keeps_text_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/agents")
        .match_body(Matcher::Json(json!({
            "name": "writer",
            "role": "author",
            "domain": "docs"
        })))
        .with_status(200)
        .with_body("agent queued")
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), None).unwrap();
    let created = client
        .create_agent(&NewAgent::new(" writer ", "author", "docs"))
        .await
        .unwrap();

    assert_eq!(created, ApiPayload::Text("agent queued".into()));
}

#[tokio::test]
async fn test_health_is_sent_without_credentials() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), Some("secret".into())).unwrap();
    assert_eq!(client.health().await, HealthStatus::Ok);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_health_error_and_down() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(500)
        .create_async()
        .await;

    let client = TaskApiClient::new(&server.url(), None).unwrap();
    assert_eq!(client.health().await, HealthStatus::Error(500));

    let unreachable = TaskApiClient::new("http://127.0.0.1:1", None).unwrap();
    assert_eq!(unreachable.health().await, HealthStatus::Down);
}
