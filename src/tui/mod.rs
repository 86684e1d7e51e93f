//! Interactive issue dashboard.
//!
//! A background poller refreshes the issue snapshot on a fixed interval
//! while the main thread renders and handles input, so the UI stays
//! responsive during slow requests.

pub mod app;
pub mod details;
pub mod event;
pub mod poller;
pub mod snapshot;
pub mod ui;

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use app::{App, MessageType};
use event::{Event, EventHandler};
use poller::{CancelToken, PollSettings, QueryCollaborator};

/// Longest the render loop waits for an event before redrawing.
const TICK_RATE: Duration = Duration::from_millis(250);

/// Fetch timeout used when none is configured.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("refresh interval must be positive")]
    ZeroInterval,
}

/// Timing for a dashboard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
}

impl DashboardOptions {
    pub fn new(refresh_interval: Duration) -> Result<Self, DashboardError> {
        if refresh_interval.is_zero() {
            return Err(DashboardError::ZeroInterval);
        }
        Ok(Self {
            refresh_interval,
            fetch_timeout: clamp_timeout(refresh_interval, DEFAULT_FETCH_TIMEOUT),
        })
    }

    /// Set the fetch timeout. Values not shorter than the refresh interval
    /// are clamped to three quarters of it so polls never overlap.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = clamp_timeout(self.refresh_interval, timeout);
        self
    }

    fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.refresh_interval,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

fn clamp_timeout(interval: Duration, timeout: Duration) -> Duration {
    if !timeout.is_zero() && timeout < interval {
        timeout
    } else {
        interval * 3 / 4
    }
}

/// Switches the terminal into and out of dashboard mode.
pub trait TerminalMode {
    fn enter(&mut self) -> io::Result<()>;
    fn restore(&mut self) -> io::Result<()>;
}

/// Raw mode on the alternate screen.
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        let raw = disable_raw_mode();
        let screen = execute!(io::stdout(), LeaveAlternateScreen, Show);
        raw.and(screen)
    }
}

/// The collaborator a dashboard polls, with its cadence.
struct IssueSource {
    collaborator: Arc<dyn QueryCollaborator>,
    settings: PollSettings,
}

/// A running dashboard session.
///
/// Dropping the dashboard stops it and restores the terminal.
pub struct Dashboard<B: Backend, M: TerminalMode> {
    terminal: Terminal<B>,
    mode: M,
    app: App,
    events: EventHandler,
    cancel: CancelToken,
    source: Option<IssueSource>,
    active: bool,
}

impl Dashboard<CrosstermBackend<Stdout>, CrosstermMode> {
    /// Take over the terminal and start polling `collaborator`.
    pub fn start(
        collaborator: Arc<dyn QueryCollaborator>,
        options: DashboardOptions,
    ) -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        let mut dashboard = Self::start_on(terminal, CrosstermMode, collaborator, options)?;
        dashboard.events.spawn_input();
        dashboard.events.spawn_signal_watch();
        Ok(dashboard)
    }
}

impl<B: Backend, M: TerminalMode> Dashboard<B, M> {
    /// Enter dashboard mode on `terminal` without any event sources.
    pub fn new(
        terminal: Terminal<B>,
        mut mode: M,
        source: impl Into<String>,
    ) -> Result<Self> {
        let cancel = CancelToken::new();
        let events = EventHandler::new(TICK_RATE, cancel.clone())?;
        mode.enter()?;

        let mut dashboard = Self {
            terminal,
            mode,
            app: App::new(source),
            events,
            cancel,
            source: None,
            active: true,
        };
        dashboard.terminal.clear()?;
        Ok(dashboard)
    }

    /// Enter dashboard mode and start polling `collaborator`.
    pub fn start_on(
        terminal: Terminal<B>,
        mode: M,
        collaborator: Arc<dyn QueryCollaborator>,
        options: DashboardOptions,
    ) -> Result<Self> {
        let mut dashboard = Self::new(terminal, mode, collaborator.describe())?;
        info!(
            interval = ?options.refresh_interval,
            timeout = ?options.fetch_timeout,
            "dashboard started"
        );
        let settings = options.poll_settings();
        let generation = dashboard.app.query_generation();
        dashboard
            .events
            .spawn_poller(Arc::clone(&collaborator), settings, generation);
        dashboard.source = Some(IssueSource {
            collaborator,
            settings,
        });
        Ok(dashboard)
    }

    /// Handle for stopping the dashboard from elsewhere.
    #[allow(dead_code)]
    pub fn stop_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Sender for injecting events into the loop.
    #[allow(dead_code)]
    pub fn event_sender(&self) -> std::sync::mpsc::Sender<Event> {
        self.events.sender()
    }

    #[allow(dead_code)]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Render and handle events until the user quits, a termination signal
    /// arrives or the stop handle fires. Always stops before returning.
    pub fn run(&mut self) -> Result<()> {
        let result = self.event_loop();
        let stopped = self.stop();
        result.and(stopped)
    }

    fn event_loop(&mut self) -> Result<()> {
        while self.active && !self.cancel.is_cancelled() {
            let app = &mut self.app;
            if let Err(err) = self.terminal.draw(|frame| ui::draw(frame, app)) {
                warn!(error = %err, "failed to draw dashboard");
                app.set_message(format!("Render failed: {}", err), MessageType::Error);
            }

            match self.events.next()? {
                Event::Tick => self.app.tick(),
                Event::Key(key) => handle_key(&mut self.app, key),
                Event::Poll(result) => self.app.apply_poll(result),
                Event::Details(result) => self.app.apply_details(result),
                Event::Resize => {
                    if let Err(err) = self.terminal.autoresize() {
                        warn!(error = %err, "failed to resize dashboard");
                    }
                }
                Event::Terminate => self.app.should_quit = true,
            }

            if self.app.should_quit {
                break;
            }
            self.dispatch_requests();
        }
        Ok(())
    }

    /// Hand query changes and detail loads queued by the app to the
    /// background runtime.
    fn dispatch_requests(&mut self) {
        let query = self.app.take_query_request();
        let detail = self.app.take_detail_request();
        let Some(source) = &self.source else {
            return;
        };

        if let Some(query) = query {
            if source.collaborator.set_query(&query) {
                info!(%query, "query changed");
                self.app.set_source(query);
                self.events.spawn_poller(
                    Arc::clone(&source.collaborator),
                    source.settings,
                    self.app.query_generation(),
                );
            } else {
                self.app
                    .set_message("This query cannot be changed".to_string(), MessageType::Error);
            }
        }

        if let Some(key) = detail {
            self.events.spawn_detail_fetch(
                Arc::clone(&source.collaborator),
                key,
                source.settings.fetch_timeout,
            );
        }
    }

    /// Stop polling and input, then restore the terminal. Safe to call
    /// more than once.
    pub fn stop(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.events.shutdown();

        if !self.active {
            return Ok(());
        }
        self.active = false;

        let restored = self.mode.restore();
        let cursor = self.terminal.show_cursor();
        info!("dashboard stopped");
        restored?;
        cursor?;
        Ok(())
    }
}

impl<B: Backend, M: TerminalMode> Drop for Dashboard<B, M> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "failed to restore terminal");
        }
    }
}

/// Apply a key press to the app state.
fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if let Some(input) = app.query_input.as_mut() {
        match key.code {
            KeyCode::Esc => app.cancel_query_edit(),
            KeyCode::Enter => app.submit_query_edit(),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char('u') if ctrl => input.clear(),
            KeyCode::Char(c) if !ctrl => input.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        // Quit / Close overlays
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else if app.show_detail {
                app.toggle_detail();
            } else {
                app.should_quit = true;
            }
        }
        KeyCode::Char('q') => {
            if !app.show_help {
                app.should_quit = true;
            }
        }
        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        // Panels
        KeyCode::Enter | KeyCode::Char('d') => {
            if !app.show_help {
                app.toggle_detail();
            }
        }
        KeyCode::Char('/') => {
            if !app.show_help {
                app.begin_query_edit();
            }
        }
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::details::{DetailState, IssueDetails};
    use crate::tui::poller::{FetchFailure, PollResult};
    use crate::tui::snapshot::{IssueRecord, IssueSnapshot};
    use ratatui::backend::TestBackend;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Records mode transitions.
    #[derive(Clone, Default)]
    struct RecordingMode {
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl TerminalMode for RecordingMode {
        fn enter(&mut self) -> io::Result<()> {
            self.calls.lock().unwrap().push("enter");
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.calls.lock().unwrap().push("restore");
            Ok(())
        }
    }

    /// Never answers within a test's lifetime.
    struct Hanging;

    impl QueryCollaborator for Hanging {
        fn fetch_assigned_issues(&self) -> Result<IssueSnapshot, FetchFailure> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(IssueSnapshot::default())
        }
    }

    fn terminal() -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(100, 20)).unwrap()
    }

    fn options() -> DashboardOptions {
        DashboardOptions::new(Duration::from_secs(30)).unwrap()
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn screen(dashboard: &Dashboard<TestBackend, RecordingMode>) -> String {
        let buffer = dashboard.terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_stop_right_after_start_restores_terminal() {
        let mode = RecordingMode::default();
        let calls = mode.calls.clone();

        let started = Instant::now();
        let mut dashboard =
            Dashboard::start_on(terminal(), mode, Arc::new(Hanging), options()).unwrap();
        dashboard.stop().unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(*calls.lock().unwrap(), vec!["enter", "restore"]);
    }

    #[test]
    fn test_stop_is_idempotent_and_drop_does_not_restore_twice() {
        let mode = RecordingMode::default();
        let calls = mode.calls.clone();

        let mut dashboard = Dashboard::new(terminal(), mode, "q").unwrap();
        dashboard.stop().unwrap();
        dashboard.stop().unwrap();
        drop(dashboard);

        assert_eq!(*calls.lock().unwrap(), vec!["enter", "restore"]);
    }

    #[test]
    fn test_drop_restores_terminal() {
        let mode = RecordingMode::default();
        let calls = mode.calls.clone();

        let dashboard = Dashboard::new(terminal(), mode, "q").unwrap();
        drop(dashboard);

        assert_eq!(*calls.lock().unwrap(), vec!["enter", "restore"]);
    }

    #[test]
    fn test_run_applies_polls_and_quits_on_q() {
        let mode = RecordingMode::default();
        let calls = mode.calls.clone();
        let mut dashboard = Dashboard::new(terminal(), mode, "q").unwrap();

        let sender = dashboard.event_sender();
        sender
            .send(Event::Poll(PollResult::success(IssueSnapshot::new(vec![
                IssueRecord::new("A", "To Do").with_summary("Alpha"),
                IssueRecord::new("B", "In Progress").with_summary("Beta"),
            ]))))
            .unwrap();
        sender.send(key(KeyCode::Down)).unwrap();
        sender
            .send(Event::Poll(PollResult::failure(FetchFailure::new("timeout"))))
            .unwrap();
        sender.send(key(KeyCode::Char('q'))).unwrap();

        dashboard.run().unwrap();

        let app = dashboard.app();
        assert!(app.should_quit);
        assert_eq!(app.selected_issue().map(|r| r.key.as_str()), Some("B"));
        assert_eq!(app.snapshot.len(), 2);
        assert!(app.last_failure.is_some());

        let text = screen(&dashboard);
        assert!(text.contains("Beta"));
        assert!(text.contains("Last update failed at"));
        assert_eq!(*calls.lock().unwrap(), vec!["enter", "restore"]);
    }

    #[test]
    fn test_stop_handle_ends_run() {
        let mut dashboard =
            Dashboard::new(terminal(), RecordingMode::default(), "q").unwrap();
        let handle = dashboard.stop_handle();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });

        let started = Instant::now();
        dashboard.run().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_terminate_event_quits() {
        let mut dashboard =
            Dashboard::new(terminal(), RecordingMode::default(), "q").unwrap();
        dashboard.event_sender().send(Event::Terminate).unwrap();
        dashboard.run().unwrap();
        assert!(dashboard.app().should_quit);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            DashboardOptions::new(Duration::ZERO),
            Err(DashboardError::ZeroInterval)
        ));
    }

    #[test]
    fn test_fetch_timeout_shorter_than_interval() {
        let opts = DashboardOptions::new(Duration::from_secs(4))
            .unwrap()
            .with_fetch_timeout(Duration::from_secs(10));
        assert_eq!(opts.fetch_timeout, Duration::from_secs(3));

        let opts = DashboardOptions::new(Duration::from_secs(60))
            .unwrap()
            .with_fetch_timeout(Duration::from_secs(20));
        assert_eq!(opts.fetch_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_key_handling() {
        let mut app = App::new("q");
        app.apply_poll(PollResult::success(IssueSnapshot::new(vec![
            IssueRecord::new("A", "s"),
            IssueRecord::new("B", "s"),
        ])));

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE));
        assert_eq!(app.view.cursor(), Some(1));

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.should_quit, "q is ignored while help is open");

        handle_key(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.show_help);

        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.show_detail);
        handle_key(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.show_detail);
        assert!(!app.should_quit);

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    /// Answers immediately; the query can be changed.
    struct Switchable {
        query: Mutex<String>,
    }

    impl Switchable {
        fn new(query: &str) -> Self {
            Self {
                query: Mutex::new(query.to_string()),
            }
        }
    }

    impl QueryCollaborator for Switchable {
        fn fetch_assigned_issues(&self) -> Result<IssueSnapshot, FetchFailure> {
            let query = self.query.lock().unwrap().clone();
            Ok(IssueSnapshot::new(vec![
                IssueRecord::new(format!("{}-1", query), "To Do")
            ]))
        }

        fn describe(&self) -> String {
            self.query.lock().unwrap().clone()
        }

        fn fetch_issue_details(&self, key: &str) -> Result<IssueDetails, FetchFailure> {
            Ok(IssueDetails {
                key: key.to_string(),
                description: format!("details of {}", key),
                ..IssueDetails::default()
            })
        }

        fn set_query(&self, query: &str) -> bool {
            *self.query.lock().unwrap() = query.to_string();
            true
        }
    }

    fn stop_after(dashboard: &Dashboard<TestBackend, RecordingMode>, delay: Duration) {
        let handle = dashboard.stop_handle();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            handle.cancel();
        });
    }

    #[test]
    fn test_detail_pane_loads_selected_issue() {
        let collaborator = Arc::new(Switchable::new("OPS"));
        let mut dashboard = Dashboard::start_on(
            terminal(),
            RecordingMode::default(),
            collaborator,
            options(),
        )
        .unwrap();
        dashboard.event_sender().send(key(KeyCode::Enter)).unwrap();
        stop_after(&dashboard, Duration::from_millis(1000));

        dashboard.run().unwrap();

        let app = dashboard.app();
        assert!(app.show_detail);
        assert!(matches!(
            &app.detail,
            Some(DetailState::Loaded(details)) if details.description == "details of OPS-1"
        ));
    }

    #[test]
    fn test_query_edit_switches_collaborator_query() {
        let collaborator = Arc::new(Switchable::new("OPS"));
        let mut dashboard = Dashboard::start_on(
            terminal(),
            RecordingMode::default(),
            collaborator.clone(),
            options(),
        )
        .unwrap();

        let sender = dashboard.event_sender();
        sender.send(key(KeyCode::Char('/'))).unwrap();
        for _ in 0..3 {
            sender.send(key(KeyCode::Backspace)).unwrap();
        }
        for c in "DEV".chars() {
            sender.send(key(KeyCode::Char(c))).unwrap();
        }
        sender.send(key(KeyCode::Enter)).unwrap();
        stop_after(&dashboard, Duration::from_millis(1000));

        dashboard.run().unwrap();

        assert_eq!(*collaborator.query.lock().unwrap(), "DEV");
        let app = dashboard.app();
        assert_eq!(app.source, "DEV");
        assert!(app.snapshot.get("DEV-1").is_some());
        assert!(app.changes.is_empty());
    }

    #[test]
    fn test_fixed_query_reports_error() {
        let mut dashboard = Dashboard::start_on(
            terminal(),
            RecordingMode::default(),
            Arc::new(Hanging),
            options(),
        )
        .unwrap();
        let sender = dashboard.event_sender();
        sender.send(key(KeyCode::Char('/'))).unwrap();
        sender.send(key(KeyCode::Char('x'))).unwrap();
        sender.send(key(KeyCode::Enter)).unwrap();
        stop_after(&dashboard, Duration::from_millis(300));

        dashboard.run().unwrap();

        let (text, kind, _) = dashboard.app().message.clone().unwrap();
        assert_eq!(text, "This query cannot be changed");
        assert_eq!(kind, MessageType::Error);
    }

    #[test]
    fn test_resize_keeps_dashboard_running() {
        let mut dashboard = Dashboard::start_on(
            terminal(),
            RecordingMode::default(),
            Arc::new(Switchable::new("OPS")),
            options(),
        )
        .unwrap();
        dashboard.event_sender().send(Event::Resize).unwrap();
        stop_after(&dashboard, Duration::from_millis(300));

        dashboard.run().unwrap();

        let app = dashboard.app();
        assert!(!app.should_quit);
        assert!(!matches!(app.message, Some((_, MessageType::Error, _))));
    }

    #[test]
    fn test_query_prompt_captures_keys() {
        let mut app = App::new("abc");
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('/'), KeyModifiers::NONE));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.should_quit);
        assert_eq!(app.query_input.as_deref(), Some("abcq"));

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(app.query_input.as_deref(), Some(""));

        handle_key(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(app.query_input.is_none());
        assert!(!app.should_quit);
    }
}
