//! Application state for the TUI dashboard.

use chrono::{DateTime, Local};
use ratatui::widgets::TableState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::details::{DetailResult, DetailState};
use super::poller::{FetchFailure, PollResult};
use super::snapshot::{reselect, IssueRecord, IssueSnapshot};

/// How a row changed in the latest successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Added,
    StatusChanged,
}

/// Message type for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
}

/// Cursor, scroll offset and selected key. Survives polls.
#[derive(Debug, Default)]
pub struct ViewState {
    pub table: TableState,
    pub selected_key: Option<String>,
    /// Rows visible in the table at the last draw.
    pub page_size: usize,
}

impl ViewState {
    pub fn cursor(&self) -> Option<usize> {
        self.table.selected()
    }

    #[allow(dead_code)]
    pub fn offset(&self) -> usize {
        self.table.offset()
    }
}

/// The last poll that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollFailure {
    pub at: DateTime<Local>,
    pub failure: FetchFailure,
}

/// Main application state.
pub struct App {
    /// Issues from the latest successful poll.
    pub snapshot: IssueSnapshot,

    pub view: ViewState,

    /// Rows added or changed by the latest successful poll.
    pub changes: HashMap<String, RowChange>,

    /// When the displayed snapshot was fetched.
    pub last_success: Option<DateTime<Local>>,

    /// Set when the latest poll failed; cleared by the next success.
    pub last_failure: Option<PollFailure>,

    /// What the dashboard is watching.
    pub source: String,

    /// Whether app should quit.
    pub should_quit: bool,

    /// Message to display (auto-clears after timeout).
    pub message: Option<(String, MessageType, Instant)>,

    /// Message display duration.
    pub message_timeout: Duration,

    /// Whether help overlay is visible.
    pub show_help: bool,

    /// Whether the detail pane is visible.
    pub show_detail: bool,

    /// Details for the selected issue while the detail pane is open.
    pub detail: Option<DetailState>,

    /// Query being edited, if the JQL prompt is open.
    pub query_input: Option<String>,

    /// Bumped on every query change; polls for older queries are ignored.
    query_generation: u64,

    /// Whether the next successful poll is diffed against the current one.
    /// False until the first load and right after the query changes.
    mark_changes: bool,

    /// Issue whose details should be loaded.
    detail_request: Option<String>,

    /// Query the user asked to switch to.
    query_request: Option<String>,
}

impl App {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            snapshot: IssueSnapshot::default(),
            view: ViewState::default(),
            changes: HashMap::new(),
            last_success: None,
            last_failure: None,
            source: source.into(),
            should_quit: false,
            message: None,
            message_timeout: Duration::from_secs(5),
            show_help: false,
            show_detail: false,
            detail: None,
            query_input: None,
            query_generation: 0,
            mark_changes: false,
            detail_request: None,
            query_request: None,
        }
    }

    /// Tick handler - called when no other event arrived.
    pub fn tick(&mut self) {
        if let Some((_, _, created)) = &self.message {
            if created.elapsed() >= self.message_timeout {
                self.message = None;
            }
        }
    }

    /// Whether any poll has succeeded yet.
    pub fn has_loaded(&self) -> bool {
        self.last_success.is_some()
    }

    /// Apply a poll result. A success replaces the snapshot wholesale; a
    /// failure leaves snapshot and view untouched.
    pub fn apply_poll(&mut self, result: PollResult) {
        if result.generation != self.query_generation {
            debug!(generation = result.generation, "dropping poll for a previous query");
            return;
        }
        match result.outcome {
            Ok(snapshot) => self.replace_snapshot(snapshot, result.at),
            Err(failure) => {
                warn!(reason = %failure, "keeping previous snapshot");
                self.last_failure = Some(PollFailure {
                    at: result.at,
                    failure,
                });
            }
        }
    }

    fn replace_snapshot(&mut self, next: IssueSnapshot, at: DateTime<Local>) {
        let diff = self.snapshot.diff(&next);
        let cursor = self.view.cursor().unwrap_or(0);
        let position = reselect(
            &self.snapshot,
            &next,
            self.view.selected_key.as_deref(),
            cursor,
        );

        // First load, and the first load of a new query, mark nothing as new.
        self.changes = if self.mark_changes {
            diff.added
                .iter()
                .map(|key| (key.clone(), RowChange::Added))
                .chain(
                    diff.status_changed
                        .iter()
                        .map(|key| (key.clone(), RowChange::StatusChanged)),
                )
                .collect()
        } else {
            HashMap::new()
        };

        if self.mark_changes {
            if let Some(summary) = diff.summary() {
                debug!(%summary, "snapshot changed");
                self.set_message(summary, MessageType::Success);
            }
        }

        self.snapshot = next;
        self.last_success = Some(at);
        self.last_failure = None;
        self.mark_changes = true;
        self.set_cursor(position);
    }

    fn set_cursor(&mut self, position: Option<usize>) {
        self.view.table.select(position);
        self.view.selected_key = position
            .and_then(|p| self.snapshot.at(p))
            .map(|record| record.key.clone());
        self.want_details();
    }

    /// Queue a detail load for the selected issue if the pane shows
    /// anything else.
    fn want_details(&mut self) {
        if !self.show_detail {
            return;
        }
        let Some(key) = self.view.selected_key.clone() else {
            self.detail = None;
            return;
        };
        if self.detail.as_ref().map(DetailState::key) == Some(key.as_str()) {
            return;
        }
        self.detail = Some(DetailState::Loading(key.clone()));
        self.detail_request = Some(key);
    }

    /// Apply loaded details. Results for an issue that is no longer shown
    /// are dropped.
    pub fn apply_details(&mut self, result: DetailResult) {
        let current = self.detail.as_ref().map(DetailState::key);
        if current != Some(result.key.as_str()) {
            debug!(key = %result.key, "dropping stale issue details");
            return;
        }
        self.detail = Some(match result.outcome {
            Ok(details) => DetailState::Loaded(details),
            Err(failure) => DetailState::Failed {
                key: result.key,
                failure,
            },
        });
    }

    /// Generation that polls for the current query carry.
    pub fn query_generation(&self) -> u64 {
        self.query_generation
    }

    /// Issue whose details should be loaded next, if any.
    pub fn take_detail_request(&mut self) -> Option<String> {
        self.detail_request.take()
    }

    /// Query the user submitted, if any.
    pub fn take_query_request(&mut self) -> Option<String> {
        self.query_request.take()
    }

    /// Open the JQL prompt with the current query.
    pub fn begin_query_edit(&mut self) {
        self.query_input = Some(self.source.clone());
    }

    pub fn cancel_query_edit(&mut self) {
        self.query_input = None;
    }

    /// Close the prompt and request the edited query unless it is blank or
    /// unchanged.
    pub fn submit_query_edit(&mut self) {
        let Some(input) = self.query_input.take() else {
            return;
        };
        let query = input.trim();
        if !query.is_empty() && query != self.source {
            self.query_request = Some(query.to_string());
        }
    }

    /// Start watching a new query. The next successful poll is a fresh
    /// baseline, so nothing is marked as changed.
    pub fn set_source(&mut self, query: String) {
        self.set_message(format!("Watching {}", query), MessageType::Success);
        self.source = query;
        self.query_generation += 1;
        self.mark_changes = false;
        self.last_failure = None;
        self.changes.clear();
    }

    /// Select the previous issue.
    pub fn select_previous(&mut self) {
        if let Some(cursor) = self.view.cursor() {
            self.set_cursor(Some(cursor.saturating_sub(1)));
        } else {
            self.select_first();
        }
    }

    /// Select the next issue.
    pub fn select_next(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        let last = self.snapshot.len() - 1;
        let next = self.view.cursor().map(|c| (c + 1).min(last)).unwrap_or(0);
        self.set_cursor(Some(next));
    }

    /// Select the first issue.
    pub fn select_first(&mut self) {
        if !self.snapshot.is_empty() {
            self.set_cursor(Some(0));
        }
    }

    /// Select the last issue.
    pub fn select_last(&mut self) {
        if !self.snapshot.is_empty() {
            self.set_cursor(Some(self.snapshot.len() - 1));
        }
    }

    /// Move one page up.
    pub fn page_up(&mut self) {
        if let Some(cursor) = self.view.cursor() {
            let page = self.view.page_size.max(1);
            self.set_cursor(Some(cursor.saturating_sub(page)));
        }
    }

    /// Move one page down.
    pub fn page_down(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        let page = self.view.page_size.max(1);
        let last = self.snapshot.len() - 1;
        let next = self.view.cursor().map(|c| (c + page).min(last)).unwrap_or(0);
        self.set_cursor(Some(next));
    }

    /// Get the currently selected issue.
    pub fn selected_issue(&self) -> Option<&IssueRecord> {
        self.view
            .selected_key
            .as_deref()
            .and_then(|key| self.snapshot.get(key))
    }

    /// Set a message to display.
    pub fn set_message(&mut self, text: String, msg_type: MessageType) {
        self.message = Some((text, msg_type, Instant::now()));
    }

    /// Toggle help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Toggle the detail pane. Opening it loads the selected issue.
    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
        if self.show_detail {
            self.want_details();
        } else {
            self.detail = None;
        }
    }
}
