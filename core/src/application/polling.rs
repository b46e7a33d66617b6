// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Fixed-interval polling with deterministic cancellation.
//!
//! One primitive serves every refresh loop in the client: the task list
//! refresher, the bounded follow after task creation, the task view's
//! fallback when its stream dies, and the health watch.
//!
//! A schedule runs in its own tokio task and reports through the returned
//! `SchedulerHandle`:
//!
//! - the first fetch happens on the first tick, right after start;
//! - `Ok` values are delivered as `PollEvent::Fetched`; a value matching the
//!   terminal predicate is followed by `PollEvent::Finished`;
//! - `Err` values are logged and swallowed, but still count as attempts;
//! - reaching `max_attempts` emits a single `PollEvent::TimedOut`.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const POLL_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until cancelled or a terminal value arrives.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent<T> {
    Fetched(T),
    /// The last fetched value was terminal; the schedule stopped.
    Finished,
    /// The attempt cap was reached without a terminal value.
    TimedOut { attempts: u32 },
}

struct StopSignal {
    token: CancellationToken,
    fired: AtomicBool,
}

impl StopSignal {
    /// Returns true only for the call that actually stopped the schedule.
    fn fire(&self, name: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        info!(schedule = name, "Polling schedule cancelled");
        true
    }

    fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Cloneable trigger for stopping a schedule from another code path.
#[derive(Clone)]
pub struct SchedulerStopper {
    name: &'static str,
    signal: Arc<StopSignal>,
}

impl SchedulerStopper {
    pub fn stop(&self) -> bool {
        self.signal.fire(self.name)
    }
}

pub struct PollingScheduler;

impl PollingScheduler {
    /// Start polling `fetch` according to `policy`.
    pub fn start<T, E, F, Fut, P>(
        name: &'static str,
        policy: PollPolicy,
        fetch: F,
        is_terminal: P,
    ) -> SchedulerHandle<T>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        P: Fn(&T) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(POLL_BUFFER);
        let signal = Arc::new(StopSignal {
            token: CancellationToken::new(),
            fired: AtomicBool::new(false),
        });

        info!(
            schedule = name,
            interval_ms = u64::try_from(policy.interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts = ?policy.max_attempts,
            "Starting polling schedule"
        );

        let token = signal.token.clone();
        let task = tokio::spawn(run(name, policy, fetch, is_terminal, tx, token));

        SchedulerHandle {
            name,
            signal,
            receiver: Some(rx),
            task: Some(task),
        }
    }
}

async fn run<T, E, F, Fut, P>(
    name: &'static str,
    policy: PollPolicy,
    mut fetch: F,
    is_terminal: P,
    tx: mpsc::Sender<PollEvent<T>>,
    token: CancellationToken,
) where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    // tokio panics on a zero period
    let period = policy.interval.max(Duration::from_millis(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        attempts = attempts.saturating_add(1);

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            outcome = fetch() => outcome,
        };

        match outcome {
            Ok(value) => {
                let terminal = is_terminal(&value);
                if !emit(&tx, &token, PollEvent::Fetched(value)).await {
                    break;
                }
                if terminal {
                    debug!(schedule = name, attempts, "Terminal value reached");
                    emit(&tx, &token, PollEvent::Finished).await;
                    break;
                }
            }
            Err(e) => {
                debug!(schedule = name, attempt = attempts, error = %e, "Poll tick failed");
            }
        }

        if let Some(max_attempts) = policy.max_attempts {
            if attempts >= max_attempts {
                info!(schedule = name, attempts, "Polling schedule exhausted its attempts");
                emit(&tx, &token, PollEvent::TimedOut { attempts }).await;
                break;
            }
        }
    }

    debug!(schedule = name, attempts, "Polling schedule stopped");
}

async fn emit<T>(
    tx: &mpsc::Sender<PollEvent<T>>,
    token: &CancellationToken,
    event: PollEvent<T>,
) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}

/// Owned handle to a running schedule. Dropping it cancels the schedule.
pub struct SchedulerHandle<T> {
    name: &'static str,
    signal: Arc<StopSignal>,
    receiver: Option<mpsc::Receiver<PollEvent<T>>>,
    task: Option<JoinHandle<()>>,
}

impl<T> SchedulerHandle<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Next event, or `None` once the schedule has stopped or was cancelled.
    pub async fn next(&mut self) -> Option<PollEvent<T>> {
        if self.signal.is_fired() {
            self.receiver = None;
            return None;
        }
        let receiver = self.receiver.as_mut()?;
        let event = receiver.recv().await;
        // a stopper may have fired while we were waiting
        if event.is_none() || self.signal.is_fired() {
            self.receiver = None;
            return None;
        }
        event
    }

    pub fn stopper(&self) -> SchedulerStopper {
        SchedulerStopper {
            name: self.name,
            signal: Arc::clone(&self.signal),
        }
    }

    /// Stop the schedule. Returns true if this call performed the stop.
    pub fn cancel(&mut self) -> bool {
        self.receiver = None;
        self.signal.fire(self.name)
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_fired()
    }

    /// Cancel and wait for the polling task to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for SchedulerHandle<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
