//! The extraction client: one request, one typed result or one failure.
//!
//! The request carries exactly two parts, the encoded document and the
//! instruction text, plus the schema for structured-output mode. Transport
//! details live behind [`ExtractionService`]; this module owns the
//! contract on what comes back:
//!
//! * no content, or only whitespace → [`DocNotesError::EmptyResponse`]
//! * anything that is not a single JSON object satisfying the schema →
//!   [`DocNotesError::MalformedResponse`]
//!
//! There is no partial recovery, no field defaulting and no searching for a
//! JSON object inside prose. There is also no retry: see
//! [`crate::service::RetryingService`] for an opt-in outer layer.

use crate::error::DocNotesError;
use crate::output::AnalysisResult;
use crate::pipeline::encode::EncodedDocument;
use crate::pipeline::schema;
use crate::service::{ExtractionRequest, ExtractionService};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Issue a single extraction call and parse its answer.
pub async fn extract(
    service: &dyn ExtractionService,
    document: &EncodedDocument,
    schema: &Value,
    instruction: &str,
) -> Result<AnalysisResult, DocNotesError> {
    let request = ExtractionRequest {
        document,
        schema,
        instruction,
    };

    let start = Instant::now();
    info!(
        "Requesting analysis from {} ({} document)",
        service.name(),
        document.media_type
    );
    let raw = service.generate(&request).await?;
    debug!(
        "{} answered in {:?} ({} chars)",
        service.name(),
        start.elapsed(),
        raw.as_deref().map_or(0, str::len)
    );

    parse_response(raw.as_deref(), schema)
}

/// Turn the raw response text into an [`AnalysisResult`].
///
/// The text must be the JSON object itself. It is first checked
/// structurally against `schema` (for a path-qualified error) and then
/// deserialized strictly.
pub fn parse_response(raw: Option<&str>, schema: &Value) -> Result<AnalysisResult, DocNotesError> {
    let text = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(DocNotesError::EmptyResponse),
    };

    let value: Value = serde_json::from_str(text)
        .map_err(|e| DocNotesError::malformed(format!("response is not valid JSON ({e})")))?;

    schema::check(&value, schema).map_err(|v| DocNotesError::malformed(v.to_string()))?;

    serde_json::from_value(value).map_err(|e| DocNotesError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::output::fixtures::{sample_json, sample_result};
    use crate::pipeline::encode::MediaType;
    use crate::pipeline::schema::analysis_schema;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        reply: Option<String>,
        seen: Mutex<Vec<(MediaType, String)>>,
    }

    #[async_trait]
    impl ExtractionService for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(
            &self,
            request: &ExtractionRequest<'_>,
        ) -> Result<Option<String>, DocNotesError> {
            self.seen.lock().unwrap().push((
                request.document.media_type,
                request.instruction.to_string(),
            ));
            Ok(self.reply.clone())
        }
    }

    fn canned(reply: Option<&str>) -> Canned {
        Canned {
            reply: reply.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn doc() -> EncodedDocument {
        EncodedDocument::from_bytes(MediaType::Pdf, b"%PDF-1.4")
    }

    #[tokio::test]
    async fn well_formed_response_becomes_typed_result() {
        let service = canned(Some(&sample_json().to_string()));
        let result = extract(&service, &doc(), analysis_schema(), "analyze")
            .await
            .unwrap();
        assert_eq!(result, sample_result());

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "exactly one request");
        assert_eq!(seen[0], (MediaType::Pdf, "analyze".to_string()));
    }

    #[tokio::test]
    async fn empty_and_blank_responses() {
        for reply in [None, Some(""), Some("  \n ")] {
            let err = extract(&canned(reply), &doc(), analysis_schema(), "x")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::EmptyResponse, "{reply:?}");
        }
    }

    #[test]
    fn prose_wrapped_json_is_malformed() {
        let text = format!("Here are your notes:\n```json\n{}\n```", sample_json());
        let err = parse_response(Some(&text), analysis_schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn missing_required_field_is_malformed() {
        for name in ["metadata", "topicStats", "fullMarkdownReport"] {
            let mut json = sample_json();
            json.as_object_mut().unwrap().remove(name);
            let err = parse_response(Some(&json.to_string()), analysis_schema()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedResponse);
            assert!(err.to_string().contains(name), "got: {err}");
        }
    }

    #[test]
    fn truncated_json_is_malformed() {
        let text = sample_json().to_string();
        let err = parse_response(Some(&text[..text.len() / 2]), analysis_schema()).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "got: {err}");
    }

    #[test]
    fn json_array_is_malformed() {
        let err = parse_response(Some("[1, 2]"), analysis_schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn out_of_range_scores_pass_through() {
        let mut json = sample_json();
        json["keyConcepts"][0]["importance"] = serde_json::json!(140);
        let result = parse_response(Some(&json.to_string()), analysis_schema()).unwrap();
        assert_eq!(result.key_concepts[0].importance, 140);
    }
}
