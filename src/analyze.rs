//! One-shot entry points: analyse a single document without keeping a
//! [`crate::workflow::Workflow`] around.
//!
//! These run the same stages as a workflow submission (validate, encode,
//! extract) but return the typed [`DocNotesError`] instead of folding it
//! into `Idle { last_error }`. Use the workflow when something needs to
//! watch state; use these from scripts and batch-free tooling.

use crate::config::AnalysisConfig;
use crate::error::DocNotesError;
use crate::observer::{NoopObserver, WorkflowObserver};
use crate::output::AnalysisResult;
use crate::pipeline::encode::encode;
use crate::pipeline::extract::extract;
use crate::pipeline::input::UploadCandidate;
use crate::pipeline::schema::analysis_schema;
use crate::pipeline::validate::validate;
use crate::service::{resolve_service, ExtractionService};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Analyse a file on disk.
///
/// The media type is inferred from the extension.
///
/// # Errors
/// - [`DocNotesError::UnsupportedFormat`] before any I/O for a rejected file
/// - [`DocNotesError::Io`] when the file cannot be read
/// - [`DocNotesError::ProviderNotConfigured`] when no service can be resolved
/// - [`DocNotesError::EmptyResponse`] / [`DocNotesError::MalformedResponse`]
///   for an unusable answer
pub async fn analyze(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, DocNotesError> {
    analyze_candidate(UploadCandidate::from_path(path, None), config).await
}

/// Analyse an in-memory document.
///
/// # Example
/// ```rust,no_run
/// use docnotes::{analyze_bytes, AnalysisConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalysisConfig::default();
/// let notes = b"# Thermodynamics\n\nEnergy is conserved.".to_vec();
/// let result = analyze_bytes("notes.md", "text/markdown", notes, &config).await?;
/// println!("{}", result.executive_summary);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_bytes(
    name: impl Into<String>,
    media_type: impl Into<String>,
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, DocNotesError> {
    analyze_candidate(UploadCandidate::from_bytes(name, media_type, bytes), config).await
}

/// Analyse any [`UploadCandidate`].
pub async fn analyze_candidate(
    candidate: UploadCandidate,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, DocNotesError> {
    let noop = NoopObserver;
    let observer: &dyn WorkflowObserver = match config.observer {
        Some(ref o) => o.as_ref(),
        None => &noop,
    };

    observer.on_submit(&candidate.name);
    let kind = validate(&candidate)?;
    observer.on_accepted(&candidate.name, kind);

    // Resolved after validation: a rejected file needs no credentials.
    let service = resolve_service(config)?;
    process(
        service.as_ref(),
        &candidate,
        config.instruction_text(),
        observer,
    )
    .await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, DocNotesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocNotesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(path, config))
}

/// Encode, then extract. Shared by the workflow and the one-shot helpers.
pub(crate) async fn process(
    service: &dyn ExtractionService,
    candidate: &UploadCandidate,
    instruction: &str,
    observer: &dyn WorkflowObserver,
) -> Result<AnalysisResult, DocNotesError> {
    let start = Instant::now();

    let document = encode(candidate).await?;
    observer.on_encoded(document.media_type, document.data.len());

    let result = extract(service, &document, analysis_schema(), instruction).await?;
    info!(
        "Analysed '{}' in {:?}: {} concepts, {} chapters, {} topics",
        candidate.name,
        start.elapsed(),
        result.key_concepts.len(),
        result.chapter_breakdown.len(),
        result.topic_stats.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::output::fixtures::{sample_json, sample_result};
    use crate::service::ExtractionRequest;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records the media type of every request and replies with `reply`.
    struct Recording {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExtractionService for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            request: &ExtractionRequest<'_>,
        ) -> Result<Option<String>, DocNotesError> {
            self.seen
                .lock()
                .unwrap()
                .push(request.document.media_type.as_str().to_string());
            Ok(Some(self.reply.clone()))
        }
    }

    fn config_with(reply: String) -> (AnalysisConfig, Arc<Recording>) {
        let service = Arc::new(Recording {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let config = AnalysisConfig::builder()
            .service(service.clone())
            .build()
            .unwrap();
        (config, service)
    }

    #[tokio::test]
    async fn markdown_bytes_are_sent_as_plain_text() {
        let (config, service) = config_with(sample_json().to_string());
        let result = analyze_bytes("notes.md", "", b"# Notes".to_vec(), &config)
            .await
            .unwrap();
        assert_eq!(result, sample_result());
        assert_eq!(*service.seen.lock().unwrap(), vec!["text/plain"]);
    }

    #[tokio::test]
    async fn pdf_path_is_read_and_sent_as_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let (config, service) = config_with(sample_json().to_string());
        analyze(&path, &config).await.unwrap();
        assert_eq!(*service.seen.lock().unwrap(), vec!["application/pdf"]);
    }

    #[tokio::test]
    async fn rejected_file_never_reaches_the_service() {
        let (config, service) = config_with(sample_json().to_string());
        let err = analyze_bytes("photo.png", "image/png", vec![0x89], &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(service.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_required_field_is_malformed() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("topicStats");
        let (config, _) = config_with(json.to_string());
        let err = analyze_bytes("a.md", "", b"x".to_vec(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocNotesError::MalformedResponse { .. }));
    }

    #[test]
    fn sync_wrapper_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.markdown");
        std::fs::write(&path, "# Heat").unwrap();

        let (config, _) = config_with(sample_json().to_string());
        let result = analyze_sync(&path, &config).unwrap();
        assert_eq!(result.key_concepts[0].term, "Entropy");
    }
}
