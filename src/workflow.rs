//! The analysis workflow: `Idle → Processing → Ready`, with failures
//! returning to `Idle` carrying a message.
//!
//! ```text
//!            submit (valid file)
//!   ┌──────┐ ───────────────────▶ ┌────────────┐  success  ┌─────────┐
//!   │ Idle │                      │ Processing │ ────────▶ │ Ready   │
//!   └──────┘ ◀─────────────────── └────────────┘           └─────────┘
//!     ▲  │       failure(error)                                 │
//!     │  └─ submit (rejected file): stays Idle, last_error set  │
//!     └──────────────────────────── reset ──────────────────────┘
//! ```
//!
//! A [`Workflow`] owns the single [`WorkflowState`] and is its only
//! mutator. The state sits behind a mutex that is never held across an
//! await, so the workflow can be shared between tasks: a second `submit`
//! while one is in flight sees `Processing` and is ignored, which keeps the
//! system at one extraction request at a time.
//!
//! Observer callbacks always run after the lock is released, so an
//! observer may read [`Workflow::state`] from inside a callback. Dropping a
//! `submit` future mid-flight (for example under `tokio::time::timeout`)
//! puts the workflow back in `Idle` with a cancellation message.

use crate::analyze::process;
use crate::config::AnalysisConfig;
use crate::error::{DocNotesError, ErrorKind};
use crate::observer::{NoopObserver, WorkflowObserver};
use crate::output::AnalysisResult;
use crate::pipeline::input::UploadCandidate;
use crate::pipeline::validate::validate;
use crate::present::{self, ExportArtifact};
use crate::service::{resolve_service, ExtractionService};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// The single source of truth for what the system is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Awaiting input. Carries the message of the last failed submission.
    Idle { last_error: Option<String> },
    /// One extraction request is in flight.
    Processing,
    /// Analysis finished; holds exactly one result.
    Ready(Arc<AnalysisResult>),
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::idle()
    }
}

impl WorkflowState {
    /// `Idle` with no error: the state at start-up and after `reset`.
    pub fn idle() -> Self {
        WorkflowState::Idle { last_error: None }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle { .. } => "idle",
            WorkflowState::Processing => "processing",
            WorkflowState::Ready(_) => "ready",
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            WorkflowState::Idle { last_error } => last_error.as_deref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            WorkflowState::Ready(result) => Some(result),
            _ => None,
        }
    }
}

/// What happened to a call to [`Workflow::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The workflow reached `Ready` with this result.
    Completed(Arc<AnalysisResult>),
    /// The file was rejected before processing; the workflow stayed `Idle`.
    Rejected { kind: ErrorKind, message: String },
    /// Processing failed; the workflow went back to `Idle` with the message.
    Failed { kind: ErrorKind, message: String },
    /// The workflow was not `Idle` (busy or showing a result); nothing happened.
    Ignored,
}

/// Owner and sole mutator of the [`WorkflowState`].
pub struct Workflow {
    service: Arc<dyn ExtractionService>,
    instruction: String,
    observer: Arc<dyn WorkflowObserver>,
    state: Mutex<WorkflowState>,
}

impl Workflow {
    /// Create a workflow in `Idle`, resolving the extraction service from `config`.
    pub fn new(config: &AnalysisConfig) -> Result<Self, DocNotesError> {
        let service = resolve_service(config)?;
        Ok(Self::with_service(service, config))
    }

    /// Create a workflow in `Idle` around an already-resolved service.
    pub fn with_service(service: Arc<dyn ExtractionService>, config: &AnalysisConfig) -> Self {
        Self {
            service,
            instruction: config.instruction_text().to_string(),
            observer: config
                .observer
                .clone()
                .unwrap_or_else(|| Arc::new(NoopObserver)),
            state: Mutex::new(WorkflowState::idle()),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.lock().clone()
    }

    /// Validate, encode and analyse one file.
    ///
    /// Only acts when the workflow is `Idle`; otherwise returns
    /// [`SubmitOutcome::Ignored`]. A rejected file leaves the workflow
    /// `Idle` with the rejection as `last_error`. An accepted file always
    /// passes through `Processing` before ending in `Ready` or back in
    /// `Idle { last_error }`, including when the returned future is dropped
    /// before the service answers.
    pub async fn submit(&self, candidate: UploadCandidate) -> SubmitOutcome {
        self.observer.on_submit(&candidate.name);

        match self.begin(&candidate) {
            Begin::Ignored => return SubmitOutcome::Ignored,
            Begin::Rejected(e) => {
                return SubmitOutcome::Rejected {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
            Begin::Started => {}
        }

        let in_flight = InFlight::new(self);
        let result = self.run(&candidate).await;
        in_flight.disarm();
        self.finish(result)
    }

    /// Return from `Ready` to `Idle`, discarding the result.
    ///
    /// Returns `false` (and changes nothing) in any other state.
    pub fn reset(&self) -> bool {
        let new_state = {
            let mut state = self.lock();
            if !matches!(*state, WorkflowState::Ready(_)) {
                debug!("reset ignored in state {}", state.label());
                return false;
            }
            *state = WorkflowState::idle();
            state.clone()
        };
        info!("Workflow reset: result discarded");
        self.observer.on_transition(&new_state);
        true
    }

    /// The Markdown export of the current result. Only available in `Ready`.
    pub fn export(&self) -> Result<ExportArtifact, DocNotesError> {
        let state = self.state();
        let result = state.result().ok_or(DocNotesError::NotReady)?;
        Ok(present::export_artifact(result))
    }

    /// The printable rendering of the current result. Only available in `Ready`.
    pub fn print(&self) -> Result<String, DocNotesError> {
        let state = self.state();
        let result = state.result().ok_or(DocNotesError::NotReady)?;
        Ok(present::render_print(result))
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// `Idle → Processing` for an accepted file, `Idle → Idle(error)` for a
    /// rejected one. The check and the transition happen under one lock;
    /// the observer hears about it once the lock is gone.
    fn begin(&self, candidate: &UploadCandidate) -> Begin {
        let (begin, accepted, new_state) = {
            let mut state = self.lock();
            if !matches!(*state, WorkflowState::Idle { .. }) {
                debug!(
                    "Ignoring submission of '{}' while {}",
                    candidate.name,
                    state.label()
                );
                return Begin::Ignored;
            }

            match validate(candidate) {
                Ok(kind) => {
                    *state = WorkflowState::Processing;
                    (Begin::Started, Some(kind), state.clone())
                }
                Err(e) => {
                    warn!("{}", e);
                    *state = WorkflowState::Idle {
                        last_error: Some(e.to_string()),
                    };
                    (Begin::Rejected(e), None, state.clone())
                }
            }
        };
        if let Some(kind) = accepted {
            self.observer.on_accepted(&candidate.name, kind);
        }
        self.observer.on_transition(&new_state);
        begin
    }

    /// Encode strictly before extracting; one request per document.
    async fn run(&self, candidate: &UploadCandidate) -> Result<AnalysisResult, DocNotesError> {
        process(
            self.service.as_ref(),
            candidate,
            &self.instruction,
            self.observer.as_ref(),
        )
        .await
    }

    /// `Processing → Ready` or `Processing → Idle(error)`.
    fn finish(&self, result: Result<AnalysisResult, DocNotesError>) -> SubmitOutcome {
        let (outcome, new_state) = {
            let mut state = self.lock();
            debug_assert_eq!(*state, WorkflowState::Processing);
            match result {
                Ok(result) => {
                    let result = Arc::new(result);
                    info!("Analysis ready: '{}'", result.metadata.title);
                    *state = WorkflowState::Ready(Arc::clone(&result));
                    (SubmitOutcome::Completed(result), state.clone())
                }
                Err(e) => {
                    warn!("Analysis failed: {}", e);
                    let message = e.to_string();
                    *state = WorkflowState::Idle {
                        last_error: Some(message.clone()),
                    };
                    (
                        SubmitOutcome::Failed {
                            kind: e.kind(),
                            message,
                        },
                        state.clone(),
                    )
                }
            }
        };
        self.observer.on_transition(&new_state);
        outcome
    }

    /// `Processing → Idle(cancelled)` for a submission dropped before `finish`.
    fn abandon(&self) {
        let new_state = {
            let mut state = self.lock();
            if *state != WorkflowState::Processing {
                return;
            }
            *state = WorkflowState::Idle {
                last_error: Some(DocNotesError::Cancelled.to_string()),
            };
            state.clone()
        };
        warn!("Analysis cancelled while processing");
        self.observer.on_transition(&new_state);
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        // The state is always left consistent before any panic point.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Begin {
    Started,
    Rejected(DocNotesError),
    Ignored,
}

/// Held across the extraction await. Dropped while armed, it returns the
/// workflow from `Processing` to `Idle`.
struct InFlight<'a> {
    workflow: &'a Workflow,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(workflow: &'a Workflow) -> Self {
        Self {
            workflow,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.workflow.abandon();
        }
    }
}
