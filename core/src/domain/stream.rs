// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Event stream port.
//!
//! A `StreamHandle` is the owned end of one task event subscription. It
//! yields zero or more `StreamUpdate::Event`s and at most one
//! `StreamUpdate::Failed`, after which it is dead. The producing side gets a
//! `StreamSender`; `StreamSender::fail` consumes the sender, so a producer
//! cannot report a second terminal error.
//!
//! Closing the handle (explicitly or by drop) cancels the producer and
//! discards anything still buffered: nothing is observable after `close()`.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::events::TaskEvent;
use crate::domain::task::TaskId;

/// Buffered updates per stream before the producer waits on the consumer.
pub const STREAM_BUFFER: usize = 64;

/// Opens task event streams. One call, one connection; no retries.
pub trait EventStreamOpener: Send + Sync {
    /// Start streaming events for `task_id`.
    ///
    /// `Err` means the stream could not even be constructed; the caller should
    /// fall back to polling right away. Connection failures are reported later
    /// through the handle.
    fn open(&self, task_id: &TaskId) -> Result<StreamHandle, StreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Event(TaskEvent),
    Failed(StreamError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Invalid stream endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Stream rejected with HTTP {0}")]
    Rejected(u16),

    #[error("Stream transport error: {0}")]
    Transport(String),

    #[error("Stream ended")]
    Ended,
}

/// Producer side of a task event stream.
pub struct StreamSender {
    task_id: TaskId,
    tx: mpsc::Sender<StreamUpdate>,
    token: CancellationToken,
}

impl StreamSender {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Resolves when the owning handle closes.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// Parse a raw message body and forward it.
    ///
    /// Malformed JSON and unknown event types are dropped; the stream stays
    /// up. Returns `false` once nobody is listening anymore.
    pub async fn deliver(&self, data: &str) -> bool {
        match TaskEvent::parse(data) {
            Ok(TaskEvent::Unknown) => {
                debug!(task_id = %self.task_id, "Ignoring stream message with unknown type");
                !self.is_cancelled()
            }
            Ok(event) => self.send_event(event).await,
            Err(e) => {
                debug!(task_id = %self.task_id, error = %e, "Dropping malformed stream message");
                !self.is_cancelled()
            }
        }
    }

    pub async fn send_event(&self, event: TaskEvent) -> bool {
        self.send(StreamUpdate::Event(event)).await
    }

    /// Report the terminal error. Consumes the sender.
    pub async fn fail(self, error: StreamError) {
        let _ = self.send(StreamUpdate::Failed(error)).await;
    }

    async fn send(&self, update: StreamUpdate) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.tx.send(update) => sent.is_ok(),
        }
    }
}

/// Owned subscription to one task's events.
pub struct StreamHandle {
    task_id: TaskId,
    receiver: Option<mpsc::Receiver<StreamUpdate>>,
    token: CancellationToken,
    producer: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Spawn `producer` with the sending half and return the owning handle.
    pub fn spawn<F, Fut>(task_id: TaskId, producer: F) -> Self
    where
        F: FnOnce(StreamSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let token = CancellationToken::new();
        let sender = StreamSender {
            task_id: task_id.clone(),
            tx,
            token: token.clone(),
        };
        let join = tokio::spawn(producer(sender));

        Self {
            task_id,
            receiver: Some(rx),
            token,
            producer: Some(join),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// False once closed or after the terminal error was yielded.
    pub fn is_open(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next update, or `None` when the stream is dead or closed.
    ///
    /// A producer that stops without reporting an error is surfaced as
    /// `StreamError::Ended`, so the caller always learns the stream is gone.
    pub async fn next(&mut self) -> Option<StreamUpdate> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Some(StreamUpdate::Failed(error)) => {
                self.terminate();
                Some(StreamUpdate::Failed(error))
            }
            Some(update) => Some(update),
            None => {
                self.terminate();
                Some(StreamUpdate::Failed(StreamError::Ended))
            }
        }
    }

    /// Stop the stream. Safe to call repeatedly and before the connection is up.
    pub fn close(&mut self) {
        if self.receiver.is_none() && self.producer.is_none() {
            return;
        }
        info!(task_id = %self.task_id, "Closing task event stream");
        self.terminate();
    }

    fn terminate(&mut self) {
        self.token.cancel();
        self.receiver = None;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}
