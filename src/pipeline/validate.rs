//! File validation: accept PDFs and Markdown/plain text, reject the rest.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. extension `.md` / `.markdown`
//! 2. declared type `application/pdf`, or extension `.pdf`
//! 3. declared type in [`ALLOWED_MEDIA_TYPES`]
//!
//! Browsers frequently report an empty type for Markdown files, so the
//! Markdown extension is checked before any media type. Validation is pure:
//! it reads neither the file nor its bytes.

use crate::error::DocNotesError;
use crate::pipeline::input::UploadCandidate;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Media types accepted on their own, regardless of extension.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["text/markdown", "text/plain", PDF_MEDIA_TYPE];

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// What the validator decided the candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Markdown,
    PlainText,
}

/// Classify a candidate, or reject it with [`DocNotesError::UnsupportedFormat`].
pub fn validate(candidate: &UploadCandidate) -> Result<DocumentKind, DocNotesError> {
    let ext = candidate.extension();
    let declared = candidate.declared_type();

    let kind = if ext
        .as_deref()
        .is_some_and(|e| MARKDOWN_EXTENSIONS.contains(&e))
    {
        Some(DocumentKind::Markdown)
    } else if declared == PDF_MEDIA_TYPE || ext.as_deref() == Some("pdf") {
        Some(DocumentKind::Pdf)
    } else if ALLOWED_MEDIA_TYPES.contains(&declared.as_str()) {
        Some(match declared.as_str() {
            "text/markdown" => DocumentKind::Markdown,
            "text/plain" => DocumentKind::PlainText,
            _ => DocumentKind::Pdf,
        })
    } else {
        None
    };

    match kind {
        Some(kind) => {
            debug!("Accepted '{}' as {:?}", candidate.name, kind);
            Ok(kind)
        }
        None => {
            debug!(
                "Rejected '{}' (declared type {:?})",
                candidate.name, candidate.media_type
            );
            Err(DocNotesError::UnsupportedFormat {
                name: candidate.name.clone(),
                media_type: candidate.media_type.clone(),
            })
        }
    }
}
