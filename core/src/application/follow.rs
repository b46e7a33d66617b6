// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Bounded follow of a freshly created task.
//!
//! After creation the client shows the server's response, then polls the
//! task until it settles or the attempt cap runs out. Each successful fetch
//! replaces the transcript; exhausting the cap appends one timeout line.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::application::polling::{PollEvent, PollPolicy, PollingScheduler, SchedulerHandle};
use crate::domain::source::{ApiPayload, TaskSource};
use crate::domain::task::{TaskId, TaskSnapshot};

/// Text shown to the user while a created task is followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowTranscript {
    text: String,
    timed_out: bool,
}

impl FollowTranscript {
    pub fn created(payload: &ApiPayload) -> Self {
        Self {
            text: format!("Task Created: {}", payload.pretty()),
            timed_out: false,
        }
    }

    pub fn polling_started(&mut self, id: &TaskId) {
        self.text
            .push_str(&format!("\n\nPolling task status (id={})...", id));
    }

    /// Replace the transcript with the fetched progress.
    pub fn record_fetch(&mut self, snapshot: &TaskSnapshot) {
        self.text = render_progress(snapshot);
    }

    /// Append the timeout notice. Only the first call has an effect.
    pub fn record_timeout(&mut self, attempts: u32) -> bool {
        if self.timed_out {
            return false;
        }
        self.timed_out = true;
        self.text
            .push_str(&format!("\n\nPolling timed out after {} attempts.", attempts));
        true
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

/// Summary block of a progress fetch. Absent fields are left out.
#[derive(Serialize)]
struct ProgressSummary<'a> {
    id: &'a TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

/// `Task: {id, title, status}` followed by the activity log, if any.
pub fn render_progress(snapshot: &TaskSnapshot) -> String {
    let summary = ProgressSummary {
        id: &snapshot.id,
        title: snapshot.title.as_deref(),
        status: snapshot.status.as_deref(),
    };
    let summary = serde_json::to_string_pretty(&summary).unwrap_or_default();
    let mut out = format!("Task: {}", summary);

    if let Some(activities) = snapshot.activities.as_ref().filter(|a| !a.is_empty()) {
        let lines: Vec<String> = activities
            .iter()
            .map(|a| format!("{} - {}", a.created_at, a.content))
            .collect();
        out.push_str("\n\nActivities:\n");
        out.push_str(&lines.join("\n\n"));
    }

    out
}

/// Drives the post-creation follow and exposes each transcript revision.
pub struct Follow {
    transcript: FollowTranscript,
    schedule: Option<SchedulerHandle<TaskSnapshot>>,
    announced: bool,
}

impl Follow {
    /// Start following the task described by `created`. Without an `id` in
    /// the response there is nothing to poll and only the creation text is
    /// produced.
    pub fn start(source: Arc<dyn TaskSource>, created: &ApiPayload, policy: PollPolicy) -> Self {
        let mut transcript = FollowTranscript::created(created);

        let schedule = created.id().map(|task_id| {
            transcript.polling_started(&task_id);
            info!(task_id = %task_id, "Following created task");
            PollingScheduler::start(
                "task-follow",
                policy,
                move || {
                    let source = Arc::clone(&source);
                    let task_id = task_id.clone();
                    async move { source.get_task(&task_id).await }
                },
                TaskSnapshot::is_settled,
            )
        });

        Self {
            transcript,
            schedule,
            announced: false,
        }
    }

    pub fn transcript(&self) -> &FollowTranscript {
        &self.transcript
    }

    pub fn is_following(&self) -> bool {
        self.schedule.is_some()
    }

    /// Next transcript revision, or `None` once the follow is over.
    pub async fn next(&mut self) -> Option<&str> {
        if !self.announced {
            self.announced = true;
            return Some(self.transcript.text());
        }

        let event = self.schedule.as_mut()?.next().await;
        match event {
            Some(PollEvent::Fetched(snapshot)) => {
                self.transcript.record_fetch(&snapshot);
                Some(self.transcript.text())
            }
            Some(PollEvent::TimedOut { attempts }) => {
                self.schedule = None;
                self.transcript.record_timeout(attempts);
                Some(self.transcript.text())
            }
            Some(PollEvent::Finished) | None => {
                self.schedule = None;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        if let Some(mut schedule) = self.schedule.take() {
            schedule.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::ApiError;
    use crate::domain::task::ActivitySnapshot;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StuckSource;

    #[async_trait]
    impl TaskSource for StuckSource {
        async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, ApiError> {
            Ok(Vec::new())
        }

        async fn get_task(&self, id: &TaskId) -> Result<TaskSnapshot, ApiError> {
            Ok(TaskSnapshot {
                id: id.clone(),
                title: Some("Audit".into()),
                description: None,
                status: Some("running".into()),
                created_at: None,
                activities: None,
                agents: None,
            })
        }
    }

    fn progress(activities: Option<Vec<ActivitySnapshot>>) -> TaskSnapshot {
        TaskSnapshot {
            id: TaskId::from(7),
            title: Some("Audit".into()),
            description: Some("ignored".into()),
            status: Some("running".into()),
            created_at: None,
            activities,
            agents: None,
        }
    }

    #[test]
    fn test_created_text_includes_polling_notice() {
        let payload = ApiPayload::from_body(r#"{"id":7}"#.to_string());
        let mut transcript = FollowTranscript::created(&payload);
        transcript.polling_started(&TaskId::from(7));
        assert_eq!(
            transcript.text(),
            "Task Created: {\n  \"id\": 7\n}\n\nPolling task status (id=7)..."
        );
    }

    #[test]
    fn test_created_text_quotes_plain_body() {
        let payload = ApiPayload::from_body("accepted".to_string());
        assert_eq!(FollowTranscript::created(&payload).text(), "Task Created: \"accepted\"");
    }

    #[test]
    fn test_missing_fields_are_left_out_of_summary() {
        let mut snapshot = progress(None);
        snapshot.title = None;
        assert_eq!(
            render_progress(&snapshot),
            "Task: {\n  \"id\": \"7\",\n  \"status\": \"running\"\n}"
        );

        snapshot.status = None;
        assert_eq!(render_progress(&snapshot), "Task: {\n  \"id\": \"7\"\n}");
    }

    #[test]
    fn test_fetch_replaces_transcript() {
        let payload = ApiPayload::from_body(r#"{"id":7}"#.to_string());
        let mut transcript = FollowTranscript::created(&payload);
        transcript.record_fetch(&progress(None));
        assert!(transcript.text().starts_with("Task: {"));
        assert!(!transcript.text().contains("Task Created"));
        assert!(!transcript.text().contains("Activities"));
        assert!(!transcript.text().contains("ignored"));
    }

    #[test]
    fn test_activities_are_listed_with_timestamps() {
        let activity = |at: &str, content: &str| ActivitySnapshot {
            id: None,
            agent: "researcher".into(),
            content: content.into(),
            created_at: at.into(),
        };
        let rendered = render_progress(&progress(Some(vec![
            activity("10:00", "started"),
            activity("10:05", "done"),
        ])));
        assert!(rendered.ends_with("\n\nActivities:\n10:00 - started\n\n10:05 - done"));
    }

    #[test]
    fn test_timeout_is_appended_once() {
        let payload = ApiPayload::from_body(r#"{"id":7}"#.to_string());
        let mut transcript = FollowTranscript::created(&payload);
        assert!(transcript.record_timeout(60));
        assert!(!transcript.record_timeout(60));
        assert_eq!(
            transcript
                .text()
                .matches("Polling timed out after 60 attempts.")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_follow_without_id_only_announces() {
        let payload = ApiPayload::from_body(r#"{"status":"queued"}"#.to_string());
        let mut follow = Follow::start(Arc::new(StuckSource), &payload, PollPolicy::every(Duration::from_millis(1)));
        assert!(!follow.is_following());
        assert_eq!(follow.next().await, Some("Task Created: {\n  \"status\": \"queued\"\n}"));
        assert_eq!(follow.next().await, None);
    }

    #[tokio::test]
    async fn test_stuck_task_times_out_after_cap() {
        let payload = ApiPayload::from_body(r#"{"id":7}"#.to_string());
        let policy = PollPolicy::every(Duration::from_millis(1)).with_max_attempts(5);
        let mut follow = Follow::start(Arc::new(StuckSource), &payload, policy);

        let mut revisions = Vec::new();
        while let Some(text) = follow.next().await {
            revisions.push(text.to_string());
        }

        // announcement + 5 fetches + timeout
        assert_eq!(revisions.len(), 7);
        let last = revisions.last().unwrap();
        assert!(last.starts_with("Task: {"));
        assert!(last.ends_with("\n\nPolling timed out after 5 attempts."));
        assert!(follow.transcript().timed_out());
    }
}
