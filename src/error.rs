//! Error types for the docnotes library.
//!
//! Every failure in the analysis pipeline is terminal for the submission
//! that caused it: nothing is retried inside the core and no partial
//! [`crate::output::AnalysisResult`] is ever built. A single enum,
//! [`DocNotesError`], therefore covers the whole pipeline. Its `Display`
//! text is the human-readable message the workflow stores in
//! `Idle { last_error }`.
//!
//! [`ErrorKind`] groups the variants into coarse classes so callers (and
//! the optional retry decorator) can branch without matching every field.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docnotes library.
#[derive(Debug, Error)]
pub enum DocNotesError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The candidate file is neither a PDF nor Markdown/plain text.
    #[error(
        "Unsupported file format: '{name}' (declared type: {})\nUpload a PDF or a Markdown (.md) file.",
        display_media_type(.media_type)
    )]
    UnsupportedFormat { name: String, media_type: String },

    /// Reading the candidate's bytes failed.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The extraction service answered without any content.
    #[error("The analysis service returned an empty response. Try again or use a smaller document.")]
    EmptyResponse,

    /// The response was not a well-formed object matching the schema.
    #[error("The analysis service returned a malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// The extraction call itself failed (HTTP error status or transport error).
    #[error("Analysis service error{}: {message}", status_suffix(.status))]
    ServiceError { status: Option<u16>, message: String },

    /// The submission was dropped before the service answered.
    #[error("Analysis cancelled before the service answered")]
    Cancelled,

    // ── Configuration errors ──────────────────────────────────────────────
    /// No usable extraction backend could be resolved.
    #[error("Extraction provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not write the exported notes file.
    #[error("Failed to write notes file '{}': {source}", .path.display())]
    ExportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Export or print was requested while no result is available.
    #[error("No analysis result is available yet; export and print require a finished analysis")]
    NotReady,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`DocNotesError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    Io,
    EmptyResponse,
    MalformedResponse,
    Service,
    Cancelled,
    Configuration,
    Export,
    Internal,
}

impl DocNotesError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocNotesError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            DocNotesError::Io { .. } => ErrorKind::Io,
            DocNotesError::EmptyResponse => ErrorKind::EmptyResponse,
            DocNotesError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            DocNotesError::ServiceError { .. } => ErrorKind::Service,
            DocNotesError::Cancelled => ErrorKind::Cancelled,
            DocNotesError::ProviderNotConfigured { .. } | DocNotesError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            DocNotesError::ExportWriteFailed { .. } | DocNotesError::NotReady => ErrorKind::Export,
            DocNotesError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a retry layer could reasonably try the same request again.
    ///
    /// Only service-level failures qualify: rate limiting (429), server
    /// errors (5xx) and transport failures with no status at all. Empty and
    /// malformed responses are final.
    pub fn is_transient(&self) -> bool {
        match self {
            DocNotesError::ServiceError { status: None, .. } => true,
            DocNotesError::ServiceError {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        DocNotesError::MalformedResponse {
            detail: detail.into(),
        }
    }
}

fn display_media_type(media_type: &str) -> &str {
    if media_type.is_empty() {
        "<none>"
    } else {
        media_type
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}
