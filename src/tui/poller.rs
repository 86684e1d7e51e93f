//! Background polling of the query collaborator.
//!
//! The poll loop runs on a tokio runtime owned by the event handler. Each
//! tick runs the blocking fetch on the blocking pool under a timeout, then
//! forwards the result to the render loop. Polls never overlap: the next
//! tick is only awaited once the current fetch finished or timed out.

use chrono::{DateTime, Local};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::details::{DetailResult, IssueDetails};
use super::event::Event;
use super::snapshot::IssueSnapshot;

/// Source of issue snapshots for the dashboard.
pub trait QueryCollaborator: Send + Sync {
    /// Fetch the current set of issues. May block; called off the UI thread.
    fn fetch_assigned_issues(&self) -> Result<IssueSnapshot, FetchFailure>;

    /// Short description of what is being watched, for the header.
    fn describe(&self) -> String {
        "assigned issues".to_string()
    }

    /// Load description, sub-tasks, comments and development info for one
    /// issue. May block; called off the UI thread.
    fn fetch_issue_details(&self, key: &str) -> Result<IssueDetails, FetchFailure> {
        Err(FetchFailure::new(format!("no details available for {}", key)))
    }

    /// Switch to another query. Returns false when the query is fixed.
    fn set_query(&self, _query: &str) -> bool {
        false
    }
}

/// A failed poll, with a reason fit for the status line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct FetchFailure {
    pub reason: String,
}

impl FetchFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self::new(format!("timed out after {:.1}s", after.as_secs_f64()))
    }
}

/// Outcome of one poll, stamped with when it completed and which query
/// generation produced it.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub at: DateTime<Local>,
    pub generation: u64,
    pub outcome: Result<IssueSnapshot, FetchFailure>,
}

impl PollResult {
    pub fn success(snapshot: IssueSnapshot) -> Self {
        Self {
            at: Local::now(),
            generation: 0,
            outcome: Ok(snapshot),
        }
    }

    pub fn failure(failure: FetchFailure) -> Self {
        Self {
            at: Local::now(),
            generation: 0,
            outcome: Err(failure),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

/// Poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

/// Cloneable stop signal shared by the render loop, the input reader and
/// the poller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `collaborator` every `settings.interval` until cancelled or the
/// receiving side hangs up. The first poll happens immediately. Results are
/// tagged with `generation`.
pub async fn poll_loop(
    collaborator: Arc<dyn QueryCollaborator>,
    settings: PollSettings,
    generation: u64,
    sender: mpsc::Sender<Event>,
    cancel: CancelToken,
) {
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let fetcher = Arc::clone(&collaborator);
        let fetch = tokio::task::spawn_blocking(move || fetcher.fetch_assigned_issues());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = tokio::time::timeout(settings.fetch_timeout, fetch) => match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => Err(FetchFailure::new(format!("poll task failed: {}", join_error))),
                Err(_) => Err(FetchFailure::timed_out(settings.fetch_timeout)),
            },
        };

        match &outcome {
            Ok(snapshot) => debug!(issues = snapshot.len(), "poll succeeded"),
            Err(failure) => warn!(reason = %failure, "poll failed"),
        }
        let result = match outcome {
            Ok(snapshot) => PollResult::success(snapshot),
            Err(failure) => PollResult::failure(failure),
        }
        .with_generation(generation);
        if sender.send(Event::Poll(result)).is_err() {
            break;
        }
    }

    debug!("poll loop finished");
}

/// Load details for `key` once, under `timeout`, and forward the result.
pub async fn fetch_details(
    collaborator: Arc<dyn QueryCollaborator>,
    key: String,
    timeout: Duration,
    sender: mpsc::Sender<Event>,
    cancel: CancelToken,
) {
    let fetch_key = key.clone();
    let fetch = tokio::task::spawn_blocking(move || collaborator.fetch_issue_details(&fetch_key));

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = tokio::time::timeout(timeout, fetch) => match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(FetchFailure::new(format!("detail task failed: {}", join_error))),
            Err(_) => Err(FetchFailure::timed_out(timeout)),
        },
    };

    if let Err(failure) = &outcome {
        warn!(%key, reason = %failure, "loading issue details failed");
    }
    let _ = sender.send(Event::Details(DetailResult { key, outcome }));
}
