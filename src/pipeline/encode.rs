//! Transport encoding: document bytes → base64 text + resolved media tag.
//!
//! Structured-output APIs accept documents as base64 inline data embedded
//! in the JSON request body. The standard alphabet with padding is used, so
//! decoding reproduces the original bytes exactly.
//!
//! The extraction boundary only understands two media tags, PDF and plain
//! text. Markdown is plain text as far as the model is concerned, so any
//! Markdown alias is normalised to `text/plain` here and never sent as is.

use crate::error::DocNotesError;
use crate::pipeline::input::UploadCandidate;
use crate::pipeline::validate::PDF_MEDIA_TYPE;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const MARKDOWN_ALIASES: &[&str] = &["text/markdown", "text/x-markdown"];

/// The closed set of media tags the extraction service receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    PlainText,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => PDF_MEDIA_TYPE,
            MediaType::PlainText => "text/plain",
        }
    }

    /// Resolve the tag for a candidate.
    ///
    /// Declared PDF wins, then declared Markdown/plain text; otherwise the
    /// extension decides (`.pdf` or plain text).
    pub fn resolve(candidate: &UploadCandidate) -> Self {
        let declared = candidate.declared_type();
        if declared == PDF_MEDIA_TYPE {
            MediaType::Pdf
        } else if declared == "text/plain" || MARKDOWN_ALIASES.contains(&declared.as_str()) {
            MediaType::PlainText
        } else if candidate.extension().as_deref() == Some("pdf") {
            MediaType::Pdf
        } else {
            MediaType::PlainText
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document ready to be attached to an extraction request.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub media_type: MediaType,
    /// Standard base64 (with padding) of the original bytes.
    pub data: String,
}

// The payload can be megabytes of base64; keep it out of logs.
impl fmt::Debug for EncodedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedDocument")
            .field("media_type", &self.media_type)
            .field("data", &format_args!("<{} base64 chars>", self.data.len()))
            .finish()
    }
}

impl EncodedDocument {
    /// Encode bytes that are already in memory.
    pub fn from_bytes(media_type: MediaType, bytes: &[u8]) -> Self {
        Self {
            media_type,
            data: STANDARD.encode(bytes),
        }
    }
}

/// Read the candidate to completion and encode it.
///
/// Suspends once while the content is read. A read failure surfaces as
/// [`DocNotesError::Io`] and is not retried.
pub async fn encode(candidate: &UploadCandidate) -> Result<EncodedDocument, DocNotesError> {
    let bytes = candidate.read_bytes().await?;
    let media_type = MediaType::resolve(candidate);
    let doc = EncodedDocument::from_bytes(media_type, &bytes);
    debug!(
        "Encoded '{}' as {} → {} bytes base64",
        candidate.name,
        media_type,
        doc.data.len()
    );
    Ok(doc)
}

/// Decode the transport text back into the original bytes.
pub fn decode(doc: &EncodedDocument) -> Result<Vec<u8>, DocNotesError> {
    STANDARD
        .decode(&doc.data)
        .map_err(|e| DocNotesError::Internal(format!("invalid base64 payload: {e}")))
}
