//! Interactive ingestion session.
//!
//! `IngestionSession` owns the form values, the single in-flight request,
//! the current digest and the transient error banner. It runs on one task:
//! the network call and the dismiss timer are spawned, and report back
//! through a channel that the owner drains with [`IngestionSession::process_next`].
//!
//! ```text
//! Idle --submit--> Submitting --ok--> Idle (result replaced, selection reset)
//!                             --err-> Idle (error shown, dismiss timer armed)
//!                             --cancel-> Idle (nothing surfaced)
//! ```
//!
//! Every spawned task carries a generation number; completions whose
//! generation no longer matches the live request or timer are dropped.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{CancelSignal, ErrorKind, IngestError, IngestTransport};
use crate::domain::{IngestRequest, IngestResult, PatternMode};
use crate::selection::TreeSelection;
use crate::size_scale::{self, DEFAULT_SIZE_KB, MAX_SIZE_KB, SLIDER_MAX};

/// How long an error stays visible when nothing replaces it.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Error shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// `None` for a deliberate cancellation.
    pub fn from_ingest_error(err: &IngestError) -> Option<Self> {
        let kind = err.kind()?;
        let message = match (kind, err.status()) {
            (ErrorKind::Network, Some(status)) => {
                format!("Failed to ingest repository (HTTP {}). Please try again.", status)
            }
            _ => kind.user_message().to_string(),
        };
        Some(Self::new(kind, message))
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Current values of the submission form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValues {
    pub repository_url: String,
    pub pattern_mode: PatternMode,
    pub pattern: String,
    pub slider_position: u32,
    /// Cutoff entered directly in KB. Sent as-is instead of the slider value.
    pub size_kb: Option<u32>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            repository_url: String::new(),
            pattern_mode: PatternMode::Exclude,
            pattern: String::new(),
            slider_position: size_scale::size_to_position(f64::from(DEFAULT_SIZE_KB)),
            size_kb: Some(DEFAULT_SIZE_KB),
        }
    }
}

impl FormValues {
    pub fn max_file_size_kb(&self) -> u32 {
        self.size_kb
            .unwrap_or_else(|| size_scale::position_to_size(self.slider_position))
    }

    /// Set an exact cutoff; the slider moves to the nearest position.
    pub fn set_size_kb(&mut self, size_kb: u32) {
        let size_kb = size_kb.clamp(1, MAX_SIZE_KB);
        self.slider_position = size_scale::size_to_position(f64::from(size_kb));
        self.size_kb = Some(size_kb);
    }

    pub fn to_request(&self) -> Option<IngestRequest> {
        IngestRequest::new(
            self.repository_url.clone(),
            self.pattern_mode,
            self.pattern.clone(),
            self.max_file_size_kb(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Submitting,
}

/// Result of calling [`IngestionSession::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Dispatched,
    /// A request is already in flight; nothing was sent.
    AlreadySubmitting,
    /// The repository URL is empty; nothing was sent.
    MissingRepository,
}

/// What a processed event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    Succeeded,
    Failed(ErrorKind),
    ErrorDismissed,
    /// A late or cancelled completion that was ignored.
    Discarded,
}

/// Display surface notified of session transitions.
pub trait SessionObserver: Send {
    fn on_submitting(&mut self, _request: &IngestRequest) {}
    fn on_result(&mut self, result: &IngestResult);
    fn on_error(&mut self, error: &SessionError);
    fn on_error_dismissed(&mut self) {}
}

#[derive(Debug)]
enum SessionEvent {
    Completed {
        generation: u64,
        outcome: Result<IngestResult, IngestError>,
    },
    DismissError {
        generation: u64,
    },
}

struct InFlight {
    generation: u64,
    cancel: CancelSignal,
    task: JoinHandle<()>,
}

struct DismissTimer {
    generation: u64,
    task: JoinHandle<()>,
}

pub struct IngestionSession {
    transport: Arc<dyn IngestTransport>,
    observer: Box<dyn SessionObserver>,
    dismiss_after: Duration,
    form: FormValues,
    selection: TreeSelection,
    result: Option<IngestResult>,
    error: Option<SessionError>,
    in_flight: Option<InFlight>,
    dismiss: Option<DismissTimer>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl IngestionSession {
    pub fn new(transport: Arc<dyn IngestTransport>, observer: Box<dyn SessionObserver>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let form = FormValues::default();
        Self {
            transport,
            observer,
            dismiss_after: DEFAULT_DISMISS_AFTER,
            selection: TreeSelection::new(String::new(), form.pattern_mode),
            form,
            result: None,
            error: None,
            in_flight: None,
            dismiss: None,
            generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn with_dismiss_after(mut self, dismiss_after: Duration) -> Self {
        self.dismiss_after = dismiss_after;
        self
    }

    pub fn with_form(mut self, form: FormValues) -> Self {
        self.selection.set_mode(form.pattern_mode);
        self.form = form;
        self
    }

    // ========== Accessors ==========

    pub fn state(&self) -> SessionState {
        if self.in_flight.is_some() {
            SessionState::Submitting
        } else {
            SessionState::Idle
        }
    }

    pub fn in_flight_count(&self) -> usize {
        usize::from(self.in_flight.is_some())
    }

    /// Whether a request or a dismiss timer can still produce an event.
    pub fn has_pending_work(&self) -> bool {
        self.in_flight.is_some() || self.dismiss.is_some()
    }

    pub fn form(&self) -> &FormValues {
        &self.form
    }

    pub fn result(&self) -> Option<&IngestResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn selection(&self) -> &TreeSelection {
        &self.selection
    }

    // ========== Form edits ==========

    pub fn set_repository_url(&mut self, url: impl Into<String>) {
        self.form.repository_url = url.into();
    }

    /// Overwrite the pattern text. The tree selection is left alone; the next
    /// toggle replaces the text again.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.form.pattern = pattern.into();
    }

    /// Switch exclude/include. The selected paths and pattern text are kept.
    pub fn set_pattern_mode(&mut self, mode: PatternMode) {
        self.form.pattern_mode = mode;
        self.selection.set_mode(mode);
    }

    pub fn set_slider_position(&mut self, position: u32) {
        self.form.slider_position = position.min(SLIDER_MAX);
        self.form.size_kb = None;
    }

    pub fn set_max_file_size_kb(&mut self, size_kb: u32) {
        self.form.set_size_kb(size_kb);
    }

    /// Toggle a tree line and write the resulting pattern into the form.
    pub fn toggle_tree_line(&mut self, line: &str) -> bool {
        if !self.selection.toggle(line) {
            return false;
        }
        self.form.pattern = self.selection.pattern();
        true
    }

    /// Toggle the tree line at `index` (0-based, header included).
    pub fn toggle_tree_index(&mut self, index: usize) -> bool {
        if !self.selection.toggle_index(index) {
            return false;
        }
        self.form.pattern = self.selection.pattern();
        true
    }

    // ========== Request lifecycle ==========

    /// Dispatch the current form as a new request.
    ///
    /// Clears any visible error right away. The previous result stays until
    /// the new one arrives.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.in_flight.is_some() {
            debug!("Ignoring submit while a request is in flight");
            return SubmitOutcome::AlreadySubmitting;
        }

        let Some(request) = self.form.to_request() else {
            warn!("Ignoring submit without a repository URL");
            return SubmitOutcome::MissingRepository;
        };

        self.clear_error();

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancelSignal::new();

        info!("Submitting {}", request.repository_url());
        self.observer.on_submitting(&request);

        let transport = Arc::clone(&self.transport);
        let task_cancel = cancel.clone();
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let call = tokio::spawn(async move { transport.submit(&request, &task_cancel).await });
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Ingest task failed: {}", e);
                    Err(IngestError::Unknown(e.to_string()))
                }
            };
            let _ = tx.send(SessionEvent::Completed {
                generation,
                outcome,
            });
        });

        self.in_flight = Some(InFlight {
            generation,
            cancel,
            task,
        });
        SubmitOutcome::Dispatched
    }

    /// Abort the in-flight request. No result or error is surfaced for it.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        in_flight.cancel.cancel();
        in_flight.task.abort();
        info!("Cancelled ingest request #{}", in_flight.generation);
        true
    }

    /// Wait for the next request completion or timer expiry and apply it.
    ///
    /// Returns `None` right away when nothing is pending.
    pub async fn process_next(&mut self) -> Option<SessionUpdate> {
        if !self.has_pending_work() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.handle_event(event))
    }

    /// Process events until no request is in flight.
    pub async fn settle(&mut self) -> Option<SessionUpdate> {
        let mut last = None;
        while self.in_flight.is_some() {
            last = self.process_next().await;
        }
        last
    }

    fn handle_event(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::Completed {
                generation,
                outcome,
            } => {
                let live = self
                    .in_flight
                    .as_ref()
                    .is_some_and(|f| f.generation == generation);
                if !live {
                    debug!("Discarding stale completion for request #{}", generation);
                    return SessionUpdate::Discarded;
                }
                self.in_flight = None;

                match outcome {
                    Ok(result) => {
                        self.apply_result(result);
                        SessionUpdate::Succeeded
                    }
                    Err(err) => match SessionError::from_ingest_error(&err) {
                        Some(session_error) => {
                            warn!("Ingest request #{} failed: {}", generation, err);
                            let kind = session_error.kind;
                            self.show_error(session_error);
                            SessionUpdate::Failed(kind)
                        }
                        None => SessionUpdate::Discarded,
                    },
                }
            }
            SessionEvent::DismissError { generation } => {
                let live = self
                    .dismiss
                    .as_ref()
                    .is_some_and(|t| t.generation == generation);
                if !live {
                    return SessionUpdate::Discarded;
                }
                self.dismiss = None;
                if self.error.take().is_some() {
                    debug!("Error dismissed after {:?}", self.dismiss_after);
                    self.observer.on_error_dismissed();
                }
                SessionUpdate::ErrorDismissed
            }
        }
    }

    fn apply_result(&mut self, result: IngestResult) {
        self.selection.reset(result.tree.clone());
        self.observer.on_result(&result);
        self.result = Some(result);
    }

    fn show_error(&mut self, session_error: SessionError) {
        self.cancel_dismiss_timer();
        self.observer.on_error(&session_error);
        self.error = Some(session_error);

        self.generation += 1;
        let generation = self.generation;
        let delay = self.dismiss_after;
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::DismissError { generation });
        });
        self.dismiss = Some(DismissTimer { generation, task });
    }

    fn cancel_dismiss_timer(&mut self) {
        if let Some(timer) = self.dismiss.take() {
            timer.task.abort();
        }
    }

    fn clear_error(&mut self) {
        self.cancel_dismiss_timer();
        if self.error.take().is_some() {
            self.observer.on_error_dismissed();
        }
    }
}

impl Drop for IngestionSession {
    fn drop(&mut self) {
        self.cancel();
        self.cancel_dismiss_timer();
    }
}
