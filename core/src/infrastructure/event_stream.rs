// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Server-sent event connector for `GET /events/tasks/{id}`.
//!
//! One HTTP connection per opened stream. The response body is decoded as
//! `text/event-stream`, each `data` payload is parsed into a `TaskEvent`, and
//! the first transport error, rejection or end of body is reported once as
//! the stream's terminal failure. Reconnecting is left to the caller.

use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::domain::stream::{EventStreamOpener, StreamError, StreamHandle, StreamSender};
use crate::domain::task::TaskId;
use crate::infrastructure::api_client::{Endpoints, TaskApiClient};

#[derive(Debug, Clone)]
pub struct HttpEventStream {
    client: Client,
    endpoints: Endpoints,
    token: Option<String>,
}

impl HttpEventStream {
    pub fn new(client: Client, endpoints: Endpoints, token: Option<String>) -> Self {
        Self {
            client,
            endpoints,
            token,
        }
    }

    /// Connector sharing the API client's connection pool and credentials.
    pub fn from_api_client(api: &TaskApiClient) -> Self {
        Self::new(
            api.http().clone(),
            api.endpoints().clone(),
            api.token().map(str::to_string),
        )
    }

    fn stream_url(&self, task_id: &TaskId) -> Result<Url, StreamError> {
        let raw = self.endpoints.task_events(task_id);
        let url = Url::parse(&raw).map_err(|e| StreamError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(StreamError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in {}",
                other, raw
            ))),
        }
    }
}

impl EventStreamOpener for HttpEventStream {
    fn open(&self, task_id: &TaskId) -> Result<StreamHandle, StreamError> {
        let url = self.stream_url(task_id)?;
        let client = self.client.clone();
        let token = self.token.clone();

        info!(task_id = %task_id, url = %url, "Opening task event stream");
        Ok(StreamHandle::spawn(task_id.clone(), move |sender| {
            pump(client, url, token, sender)
        }))
    }
}

async fn pump(client: Client, url: Url, token: Option<String>, sender: StreamSender) {
    let mut request = client.get(url).header(ACCEPT, "text/event-stream");
    if let Some(token) = &token {
        request = request.bearer_auth(token);
    }

    let response = tokio::select! {
        biased;
        _ = sender.cancelled() => return,
        response = request.send() => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            warn!(task_id = %sender.task_id(), error = %e, "Task event stream connection failed");
            sender.fail(StreamError::Transport(e.to_string())).await;
            return;
        }
    };

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        sender.fail(StreamError::Unauthorized).await;
        return;
    }
    if !status.is_success() {
        sender.fail(StreamError::Rejected(status.as_u16())).await;
        return;
    }

    debug!(task_id = %sender.task_id(), "Task event stream connected");
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = sender.cancelled() => return,
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for data in decoder.feed(&bytes) {
                    if !sender.deliver(&data).await {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                sender.fail(StreamError::Transport(e.to_string())).await;
                return;
            }
            None => {
                sender.fail(StreamError::Ended).await;
                return;
            }
        }
    }
}

/// Longest line the decoder buffers before discarding it.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental `text/event-stream` decoder.
///
/// Yields the `data` payload of each dispatched event. Multi-line data is
/// joined with `\n`; comments and `event`/`id`/`retry` fields are skipped.
/// A line longer than the cap is dropped up to its terminating newline.
#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Vec<String>,
    max_line: usize,
    overflowed: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            line: Vec::new(),
            data: Vec::new(),
            max_line,
            overflowed: false,
        }
    }

    /// Feed one network chunk and collect every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut dispatched = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if std::mem::take(&mut self.overflowed) {
                    continue;
                }
                let line = std::mem::take(&mut self.line);
                if let Some(data) = self.process_line(&line) {
                    dispatched.push(data);
                }
            } else if !self.overflowed {
                if self.line.len() >= self.max_line {
                    warn!(max_line = self.max_line, "Dropping oversized event stream line");
                    self.line = Vec::new();
                    self.overflowed = true;
                } else {
                    self.line.push(byte);
                }
            }
        }
        dispatched
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<String> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let data = self.data.join("\n");
            self.data.clear();
            return Some(data);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}
