//! Native Gemini client using structured-output mode.
//!
//! One `generateContent` call per document. The document travels as
//! `inlineData` (base64 + media tag) next to the instruction text, and
//! `generationConfig` pins the answer to `application/json` constrained by
//! the extraction schema. The reply text is returned untouched; an answer
//! without candidates or text parts is reported as no content.

use crate::config::AnalysisConfig;
use crate::error::DocNotesError;
use crate::service::{ExtractionRequest, ExtractionService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini `generateContent` backend.
pub struct GeminiService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>, config: &AnalysisConfig) -> Result<Self, DocNotesError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DocNotesError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model_or_default().to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Request body: document part first, instruction second.
    pub fn request_body(&self, request: &ExtractionRequest<'_>) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.document.media_type.as_str(),
                            "data": request.document.data,
                        }
                    },
                    { "text": request.instruction }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.schema,
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        })
    }
}

#[async_trait]
impl ExtractionService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<String>, DocNotesError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| DocNotesError::ServiceError {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| DocNotesError::ServiceError {
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            warn!("Gemini returned HTTP {}", status);
            return Err(DocNotesError::ServiceError {
                status: Some(status.as_u16()),
                message: api_error_message(&body),
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            DocNotesError::malformed(format!("unreadable generateContent envelope ({e})"))
        })?;

        if let Some(ref usage) = envelope.usage_metadata {
            debug!(
                "Gemini usage: {} prompt tokens, {} candidate tokens",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0)
            );
        }

        Ok(envelope.into_text())
    }
}

/// The subset of the `generateContent` response envelope we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, or `None` when there is none.
    pub fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                warn!("Gemini finished with reason {}", reason);
            }
        }
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::{EncodedDocument, MediaType};
    use crate::pipeline::schema::analysis_schema;

    fn service() -> GeminiService {
        let config = AnalysisConfig::builder()
            .api_base_url("https://example.test/")
            .model("gemini-test")
            .build()
            .unwrap();
        GeminiService::new("key", &config).unwrap()
    }

    #[test]
    fn endpoint_uses_model_and_trims_slash() {
        assert_eq!(
            service().endpoint(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn body_has_two_parts_and_structured_output_config() {
        let doc = EncodedDocument::from_bytes(MediaType::PlainText, b"# Notes");
        let request = ExtractionRequest {
            document: &doc,
            schema: analysis_schema(),
            instruction: "Analyze.",
        };
        let body = service().request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "text/plain");
        assert_eq!(parts[0]["inlineData"]["data"], doc.data.as_str());
        assert_eq!(parts[1]["text"], "Analyze.");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], *analysis_schema());
    }

    #[test]
    fn envelope_text_is_concatenated() {
        let envelope: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(envelope.into_text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn envelope_without_candidates_has_no_text() {
        let envelope: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert_eq!(envelope.into_text(), None);
    }

    #[test]
    fn api_error_message_prefers_structured_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        assert_eq!(api_error_message(body), "API key not valid");
        assert_eq!(api_error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
