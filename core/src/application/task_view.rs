// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Live view of a single task.
//!
//! `TaskView` owns the whole synchronization pipeline for one task id:
//!
//! ```text
//! snapshot fetch ──> seed ──> event stream ──> merger ──> ViewUpdate
//!                                  │
//!                      (open error / stream failure)
//!                                  ▼
//!                         fallback polling ──> ViewUpdate
//! ```
//!
//! Updates are applied one at a time from `next()`, so the reconciled state
//! needs no locking. Stream events and poll results are not ordered against
//! each other; the last one applied wins.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::merger;
use crate::application::polling::{PollEvent, PollPolicy, PollingScheduler, SchedulerHandle};
use crate::domain::source::TaskSource;
use crate::domain::stream::{EventStreamOpener, StreamError, StreamHandle, StreamUpdate};
use crate::domain::task::{Task, TaskId, TaskSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Initial state from the snapshot fetch.
    Seeded(Task),
    /// State after a stream event or a poll fetch.
    Updated(Task),
    /// The stream is gone; the view now polls.
    FellBack(StreamError),
    /// Fallback polling stopped (terminal status or attempt cap).
    Settled(Option<Task>),
}

enum Feed {
    Streaming(StreamHandle),
    Polling(SchedulerHandle<TaskSnapshot>),
    Idle,
}

enum Step {
    Stream(Option<StreamUpdate>),
    Poll(Option<PollEvent<TaskSnapshot>>),
}

pub struct TaskView {
    task_id: TaskId,
    source: Arc<dyn TaskSource>,
    fallback: PollPolicy,
    state: Option<Task>,
    pending: VecDeque<ViewUpdate>,
    feed: Feed,
    closed: bool,
}

impl TaskView {
    /// Fetch the snapshot, seed the state and connect the event stream.
    ///
    /// A failed snapshot leaves the state absent; the stream still opens. An
    /// opener error switches to `fallback` polling right away.
    pub async fn open(
        source: Arc<dyn TaskSource>,
        opener: &dyn EventStreamOpener,
        task_id: TaskId,
        fallback: PollPolicy,
    ) -> Self {
        let mut view = Self {
            task_id,
            source,
            fallback,
            state: None,
            pending: VecDeque::new(),
            feed: Feed::Idle,
            closed: false,
        };

        match view.source.get_task(&view.task_id).await {
            Ok(snapshot) => {
                let task = merger::seed(snapshot);
                view.state = Some(task.clone());
                view.pending.push_back(ViewUpdate::Seeded(task));
            }
            Err(e) => {
                warn!(task_id = %view.task_id, error = %e, "Initial task fetch failed");
            }
        }

        match opener.open(&view.task_id) {
            Ok(stream) => {
                info!(task_id = %view.task_id, "Task view streaming");
                view.feed = Feed::Streaming(stream);
            }
            Err(e) => {
                warn!(task_id = %view.task_id, error = %e, "Could not open task event stream");
                view.fall_back(e);
            }
        }

        view
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Current reconciled state, if any source has produced one yet.
    pub fn state(&self) -> Option<&Task> {
        self.state.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.feed, Feed::Polling(_))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next change to the view, or `None` once closed or nothing feeds it.
    pub async fn next(&mut self) -> Option<ViewUpdate> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(update) = self.pending.pop_front() {
                return Some(update);
            }

            let step = match &mut self.feed {
                Feed::Streaming(stream) => Step::Stream(stream.next().await),
                Feed::Polling(schedule) => Step::Poll(schedule.next().await),
                Feed::Idle => return None,
            };

            match step {
                Step::Stream(Some(StreamUpdate::Event(event))) => {
                    match merger::apply_event(self.state.as_ref(), &self.task_id, &event) {
                        Some(task) => {
                            debug!(task_id = %self.task_id, kind = event.kind(), "Applied task event");
                            self.state = Some(task.clone());
                            return Some(ViewUpdate::Updated(task));
                        }
                        None => continue,
                    }
                }
                Step::Stream(Some(StreamUpdate::Failed(error))) => {
                    warn!(task_id = %self.task_id, error = %error, "Task event stream failed");
                    self.fall_back(error);
                }
                Step::Stream(None) => self.fall_back(StreamError::Ended),
                Step::Poll(Some(PollEvent::Fetched(snapshot))) => {
                    let task = merger::seed(snapshot);
                    self.state = Some(task.clone());
                    return Some(ViewUpdate::Updated(task));
                }
                Step::Poll(Some(PollEvent::Finished)) | Step::Poll(Some(PollEvent::TimedOut { .. })) => {
                    info!(task_id = %self.task_id, "Task view fallback polling settled");
                    self.feed = Feed::Idle;
                    return Some(ViewUpdate::Settled(self.state.clone()));
                }
                Step::Poll(None) => {
                    self.feed = Feed::Idle;
                    return None;
                }
            }
        }
    }

    /// Tear down the stream and any polling. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pending.clear();
        match std::mem::replace(&mut self.feed, Feed::Idle) {
            Feed::Streaming(mut stream) => stream.close(),
            Feed::Polling(mut schedule) => {
                schedule.cancel();
            }
            Feed::Idle => {}
        }
        info!(task_id = %self.task_id, "Task view closed");
    }

    fn fall_back(&mut self, reason: StreamError) {
        let source = Arc::clone(&self.source);
        let task_id = self.task_id.clone();
        let schedule = PollingScheduler::start(
            "task-view-fallback",
            self.fallback,
            move || {
                let source = Arc::clone(&source);
                let task_id = task_id.clone();
                async move { source.get_task(&task_id).await }
            },
            TaskSnapshot::is_settled,
        );

        info!(task_id = %self.task_id, reason = %reason, "Task view falling back to polling");
        // replacing the feed drops (and closes) a dead stream
        self.feed = Feed::Polling(schedule);
        self.pending.push_back(ViewUpdate::FellBack(reason));
    }
}

impl Drop for TaskView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::ApiError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    /// Serves scripted responses in order, repeating the last one.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<TaskSnapshot, String>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<TaskSnapshot, String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, ApiError> {
            Ok(Vec::new())
        }

        async fn get_task(&self, _id: &TaskId) -> Result<TaskSnapshot, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            };
            next.map_err(ApiError::Transport)
        }
    }

    /// Replays messages, then fails with `end` or stays open until closed.
    struct ScriptedOpener {
        messages: Vec<&'static str>,
        end: Option<StreamError>,
    }

    impl EventStreamOpener for ScriptedOpener {
        fn open(&self, task_id: &TaskId) -> Result<StreamHandle, StreamError> {
            let messages = self.messages.clone();
            let end = self.end.clone();
            Ok(StreamHandle::spawn(task_id.clone(), move |sender| async move {
                for message in messages {
                    sender.deliver(message).await;
                }
                match end {
                    Some(error) => sender.fail(error).await,
                    None => sender.cancelled().await,
                }
            }))
        }
    }

    /// Stays open until closed and records when its producer is released.
    struct HeldOpener {
        released: Arc<AtomicBool>,
    }

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl EventStreamOpener for HeldOpener {
        fn open(&self, task_id: &TaskId) -> Result<StreamHandle, StreamError> {
            let flag = ReleaseFlag(Arc::clone(&self.released));
            Ok(StreamHandle::spawn(task_id.clone(), move |sender| async move {
                let _flag = flag;
                sender.cancelled().await;
            }))
        }
    }

    struct BrokenOpener;

    impl EventStreamOpener for BrokenOpener {
        fn open(&self, _task_id: &TaskId) -> Result<StreamHandle, StreamError> {
            Err(StreamError::InvalidEndpoint("no base url".into()))
        }
    }

    fn snapshot(status: &str) -> TaskSnapshot {
        TaskSnapshot {
            id: TaskId::from(42),
            title: Some("Audit".into()),
            description: None,
            status: Some(status.into()),
            created_at: None,
            activities: Some(Vec::new()),
            agents: None,
        }
    }

    fn slow_fallback() -> PollPolicy {
        PollPolicy::every(Duration::from_secs(3600))
    }

    async fn next_update(view: &mut TaskView) -> Option<ViewUpdate> {
        timeout(Duration::from_secs(2), view.next())
            .await
            .expect("view update timed out")
    }

    #[tokio::test]
    async fn test_stream_events_merge_into_seeded_state() {
        let source = ScriptedSource::new(vec![Ok(snapshot("pending"))]);
        let opener = ScriptedOpener {
            messages: vec![
                r#"{"type":"activity","agent":"researcher","content":"started"}"#,
                "{broken",
                r#"{"type":"heartbeat"}"#,
                r#"{"type":"status","status":"succeeded"}"#,
            ],
            end: None,
        };

        let mut view = TaskView::open(source, &opener, TaskId::from(42), slow_fallback()).await;

        match next_update(&mut view).await {
            Some(ViewUpdate::Seeded(task)) => assert_eq!(task.status, "pending"),
            other => panic!("expected seed, got {:?}", other),
        }
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => {
                assert_eq!(task.activities.len(), 1);
                assert_eq!(task.activities[0].agent, "researcher");
                assert_eq!(task.activities[0].content, "started");
            }
            other => panic!("expected activity, got {:?}", other),
        }
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => {
                assert_eq!(task.status, "succeeded");
                assert_eq!(task.activities.len(), 1);
            }
            other => panic!("expected status, got {:?}", other),
        }

        assert!(!view.is_polling());
        view.close();
        assert_eq!(view.next().await, None);
    }

    #[tokio::test]
    async fn test_open_failure_polls_within_one_tick() {
        let source = ScriptedSource::new(vec![Ok(snapshot("pending")), Ok(snapshot("succeeded"))]);
        let mut view =
            TaskView::open(source.clone(), &BrokenOpener, TaskId::from(42), slow_fallback()).await;

        assert!(view.is_polling());
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Seeded(_))));
        assert_eq!(
            next_update(&mut view).await,
            Some(ViewUpdate::FellBack(StreamError::InvalidEndpoint(
                "no base url".into()
            )))
        );
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => assert_eq!(task.status, "succeeded"),
            other => panic!("expected fallback fetch, got {:?}", other),
        }
        match next_update(&mut view).await {
            Some(ViewUpdate::Settled(Some(task))) => assert!(task.is_settled()),
            other => panic!("expected settle, got {:?}", other),
        }
        assert_eq!(view.next().await, None);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_stream_failure_switches_to_polling() {
        let source = ScriptedSource::new(vec![Ok(snapshot("pending")), Ok(snapshot("failed"))]);
        let opener = ScriptedOpener {
            messages: vec![r#"{"type":"agent_status","agent":"writer","status":"running"}"#],
            end: Some(StreamError::Transport("connection reset".into())),
        };

        let mut view = TaskView::open(source, &opener, TaskId::from(42), slow_fallback()).await;

        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Seeded(_))));
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => assert!(task.has_running_agents()),
            other => panic!("expected agent status, got {:?}", other),
        }
        assert_eq!(
            next_update(&mut view).await,
            Some(ViewUpdate::FellBack(StreamError::Transport(
                "connection reset".into()
            )))
        );
        assert!(view.is_polling());
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => assert_eq!(task.status, "failed"),
            other => panic!("expected poll result, got {:?}", other),
        }
        assert!(matches!(
            next_update(&mut view).await,
            Some(ViewUpdate::Settled(Some(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_snapshot_leaves_state_absent() {
        let source = ScriptedSource::new(vec![Err("connection refused".into())]);
        let opener = ScriptedOpener {
            messages: vec![r#"{"type":"status","status":"running"}"#],
            end: None,
        };

        let mut view = TaskView::open(source, &opener, TaskId::from(42), slow_fallback()).await;
        assert!(view.state().is_none());

        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => {
                assert_eq!(task.id, TaskId::from(42));
                assert_eq!(task.status, "running");
                assert!(task.activities.is_empty());
                assert!(task.agents.is_empty());
            }
            other => panic!("expected synthesized task, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_stops_fallback_polling() {
        let source = ScriptedSource::new(vec![Ok(snapshot("running"))]);
        let mut view = TaskView::open(
            source.clone(),
            &BrokenOpener,
            TaskId::from(42),
            PollPolicy::every(Duration::from_millis(5)),
        )
        .await;

        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Seeded(_))));
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::FellBack(_))));
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Updated(_))));

        view.close();
        view.close();
        assert!(view.is_closed());
        assert_eq!(view.next().await, None);

        let after_close = source.calls();
        sleep(Duration::from_millis(40)).await;
        assert!(source.calls() <= after_close + 1);
    }

    #[tokio::test]
    async fn test_stream_terminal_status_is_visible_while_stream_stays_open() {
        let source = ScriptedSource::new(vec![Ok(snapshot("pending"))]);
        let opener = ScriptedOpener {
            messages: vec![r#"{"type":"status","status":"succeeded"}"#],
            end: None,
        };

        let mut view =
            TaskView::open(source.clone(), &opener, TaskId::from(42), slow_fallback()).await;

        match next_update(&mut view).await {
            Some(ViewUpdate::Seeded(task)) => assert!(!task.is_settled()),
            other => panic!("expected seed, got {:?}", other),
        }
        match next_update(&mut view).await {
            Some(ViewUpdate::Updated(task)) => {
                assert_eq!(task.status, "succeeded");
                assert!(task.is_settled());
            }
            other => panic!("expected status, got {:?}", other),
        }
        assert!(!view.is_polling());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_dropping_view_releases_stream() {
        let released = Arc::new(AtomicBool::new(false));
        let opener = HeldOpener {
            released: Arc::clone(&released),
        };
        let source = ScriptedSource::new(vec![Ok(snapshot("running"))]);

        let mut view = TaskView::open(source, &opener, TaskId::from(42), slow_fallback()).await;
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Seeded(_))));
        assert!(!released.load(Ordering::SeqCst));

        drop(view);
        timeout(Duration::from_secs(1), async {
            while !released.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("stream producer outlived the view");
    }

    #[tokio::test]
    async fn test_dropping_view_stops_fallback_polling() {
        let source = ScriptedSource::new(vec![Ok(snapshot("running"))]);
        let mut view = TaskView::open(
            source.clone(),
            &BrokenOpener,
            TaskId::from(42),
            PollPolicy::every(Duration::from_millis(5)),
        )
        .await;

        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Seeded(_))));
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::FellBack(_))));
        assert!(matches!(next_update(&mut view).await, Some(ViewUpdate::Updated(_))));
        drop(view);

        sleep(Duration::from_millis(10)).await;
        let after_drop = source.calls();
        sleep(Duration::from_millis(40)).await;
        assert_eq!(source.calls(), after_drop);
    }
}
