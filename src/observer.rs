//! Observer trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::config::AnalysisConfigBuilder::observer`] to follow a
//! submission as it moves through the workflow: a CLI spinner, a UI that
//! re-renders on every state change, or a log sink.
//!
//! State transitions are the unit of observability. Every change of
//! [`WorkflowState`], including a rejected file updating
//! `Idle { last_error }`, is reported through
//! [`WorkflowObserver::on_transition`] after the new state is stored.
//!
//! # Example
//!
//! ```rust
//! use docnotes::{WorkflowObserver, WorkflowState};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountTransitions(AtomicUsize);
//!
//! impl WorkflowObserver for CountTransitions {
//!     fn on_transition(&self, _state: &WorkflowState) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::pipeline::encode::MediaType;
use crate::pipeline::validate::DocumentKind;
use crate::workflow::WorkflowState;
use std::sync::Arc;

/// Receives workflow events. All methods default to no-ops.
///
/// Implementations must be `Send + Sync`; a [`crate::workflow::Workflow`]
/// can be shared across tasks.
pub trait WorkflowObserver: Send + Sync {
    /// A file was offered for analysis.
    fn on_submit(&self, name: &str) {
        let _ = name;
    }

    /// The validator accepted the file.
    fn on_accepted(&self, name: &str, kind: DocumentKind) {
        let _ = (name, kind);
    }

    /// The file was read and encoded; the extraction request is next.
    fn on_encoded(&self, media_type: MediaType, encoded_len: usize) {
        let _ = (media_type, encoded_len);
    }

    /// The workflow state changed.
    fn on_transition(&self, state: &WorkflowState) {
        let _ = state;
    }
}

/// A no-op observer, used when none is configured.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ObserverHandle = Arc<dyn WorkflowObserver>;
