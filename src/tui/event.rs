//! Event handling for the TUI dashboard.

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::details::DetailResult;
use super::poller::{
    fetch_details, poll_loop, CancelToken, PollResult, PollSettings, QueryCollaborator,
};

/// How long the input thread waits for a terminal event before re-checking
/// the cancellation token.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// No other event arrived within the tick rate.
    Tick,
    /// Key press event.
    Key(KeyEvent),
    /// Terminal resize.
    Resize,
    /// A poll of the query collaborator completed.
    Poll(PollResult),
    /// Details for one issue finished loading.
    Details(DetailResult),
    /// The process was asked to terminate.
    Terminate,
}

/// Merges terminal input, poll results and signals into one stream.
pub struct EventHandler {
    /// Event receiver.
    receiver: mpsc::Receiver<Event>,
    /// Kept so sources can be attached later and the channel never closes.
    sender: mpsc::Sender<Event>,
    /// Input reader thread, if terminal input is captured.
    input_handle: Option<thread::JoinHandle<()>>,
    /// Runtime hosting the poll loop and signal watcher.
    runtime: Option<Runtime>,
    cancel: CancelToken,
    /// Stops only the current poll loop, so the query can be swapped.
    poller_cancel: Option<CancelToken>,
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a handler with no sources attached.
    ///
    /// # Arguments
    /// * `tick_rate` - Longest wait in [`next`](Self::next) before a `Tick`
    /// * `cancel` - Stops every source once triggered
    pub fn new(tick_rate: Duration, cancel: CancelToken) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jira-poller")
            .enable_all()
            .build()?;

        Ok(Self {
            receiver,
            sender,
            input_handle: None,
            runtime: Some(runtime),
            cancel,
            poller_cancel: None,
            tick_rate,
        })
    }

    /// Sender for injecting events.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sender.clone()
    }

    /// Start reading terminal input on a background thread.
    pub fn spawn_input(&mut self) {
        if self.input_handle.is_some() {
            return;
        }
        let sender = self.sender.clone();
        let cancel = self.cancel.clone();
        self.input_handle = Some(thread::spawn(move || {
            while !cancel.is_cancelled() {
                // Poll with a timeout so cancellation is noticed promptly
                match event::poll(INPUT_POLL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        warn!(error = %err, "terminal input poll failed");
                        thread::sleep(INPUT_POLL);
                        continue;
                    }
                }

                let event = match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        Event::Key(key)
                    }
                    Ok(CrosstermEvent::Resize(_, _)) => Event::Resize,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(error = %err, "failed to read terminal event");
                        continue;
                    }
                };

                if sender.send(event).is_err() {
                    break;
                }
            }
            debug!("input reader finished");
        }));
    }

    /// Start polling `collaborator` on the runtime, replacing any poll loop
    /// already running. The first poll happens immediately.
    pub fn spawn_poller(
        &mut self,
        collaborator: Arc<dyn QueryCollaborator>,
        settings: PollSettings,
        generation: u64,
    ) {
        if let Some(previous) = self.poller_cancel.take() {
            previous.cancel();
        }
        let Some(runtime) = &self.runtime else {
            return;
        };
        let poller_cancel = CancelToken::new();
        let global = self.cancel.clone();
        let local = poller_cancel.clone();
        let sender = self.sender.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = global.cancelled() => {}
                _ = poll_loop(collaborator, settings, generation, sender, local) => {}
            }
        });
        self.poller_cancel = Some(poller_cancel);
    }

    /// Load details for `key` in the background.
    pub fn spawn_detail_fetch(
        &mut self,
        collaborator: Arc<dyn QueryCollaborator>,
        key: String,
        timeout: Duration,
    ) {
        if let Some(runtime) = &self.runtime {
            runtime.spawn(fetch_details(
                collaborator,
                key,
                timeout,
                self.sender.clone(),
                self.cancel.clone(),
            ));
        }
    }

    /// Turn SIGTERM, SIGINT and SIGHUP into [`Event::Terminate`].
    #[cfg(unix)]
    pub fn spawn_signal_watch(&mut self) {
        use tokio::signal::unix::{signal, SignalKind};

        let Some(runtime) = &self.runtime else {
            return;
        };
        let sender = self.sender.clone();
        let cancel = self.cancel.clone();
        runtime.spawn(async move {
            let (mut term, mut int, mut hup) = match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
                signal(SignalKind::hangup()),
            ) {
                (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
                _ => {
                    warn!("could not install signal handlers");
                    return;
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = term.recv() => {}
                _ = int.recv() => {}
                _ = hup.recv() => {}
            }
            debug!("termination signal received");
            let _ = sender.send(Event::Terminate);
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_signal_watch(&mut self) {}

    /// Wait for the next event, yielding a `Tick` when none arrives within
    /// the tick rate.
    pub fn next(&self) -> Result<Event> {
        match self.receiver.recv_timeout(self.tick_rate) {
            Ok(event) => Ok(event),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(Event::Tick),
            Err(err) => Err(err.into()),
        }
    }

    /// Stop every source. In-flight fetches are abandoned, not awaited.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(poller_cancel) = self.poller_cancel.take() {
            poller_cancel.cancel();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        if let Some(handle) = self.input_handle.take() {
            if handle.join().is_err() {
                warn!("input reader panicked");
            }
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
