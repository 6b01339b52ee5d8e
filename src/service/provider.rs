//! Adapter for any `edgequake-llm` chat provider.
//!
//! Providers without a native structured-output mode get the schema in a
//! system message and are told to answer with the bare object. PDFs are
//! attached as inline base64 data; plain text is decoded and sent inline
//! after the instruction, since not every provider accepts text attachments.
//!
//! The reply goes through the same strict parser as the Gemini backend, so
//! a model that wraps its JSON in prose or fences fails with a malformed
//! response instead of being silently repaired.
//!
//! `request_timeout_secs` bounds each chat call; a provider that has not
//! answered by then fails with a status-less service error.

use crate::config::AnalysisConfig;
use crate::error::DocNotesError;
use crate::pipeline::encode::{decode, MediaType};
use crate::prompts::json_only_system_prompt;
use crate::service::{ExtractionRequest, ExtractionService};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// [`ExtractionService`] backed by an `edgequake-llm` provider.
pub struct ProviderService {
    label: String,
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl ProviderService {
    pub fn new(
        label: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            label: label.into(),
            provider,
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            timeout: config.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Build the chat messages for one request.
    ///
    /// Layout: system (schema contract), then one user turn carrying the
    /// instruction and the document.
    fn build_messages(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<ChatMessage>, DocNotesError> {
        let system = json_only_system_prompt(request.schema);
        let mut messages = vec![ChatMessage::system(system.as_str())];

        match request.document.media_type {
            MediaType::Pdf => {
                let attachment = ImageData::new(
                    request.document.data.clone(),
                    request.document.media_type.as_str(),
                );
                messages.push(ChatMessage::user_with_images(
                    request.instruction,
                    vec![attachment],
                ));
            }
            MediaType::PlainText => {
                let bytes = decode(request.document)?;
                let text = String::from_utf8_lossy(&bytes);
                let body = format!(
                    "{}\n\n--- DOCUMENT START ---\n{}\n--- DOCUMENT END ---",
                    request.instruction, text
                );
                messages.push(ChatMessage::user(body.as_str()));
            }
        }
        Ok(messages)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ExtractionService for ProviderService {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<String>, DocNotesError> {
        let messages = self.build_messages(request)?;
        let options = self.options();

        let call = self.provider.chat(&messages, Some(&options));
        let answered = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!("{}: no response within {:?}", self.label, limit);
                DocNotesError::ServiceError {
                    status: None,
                    message: format!("no response within {}s", limit.as_secs()),
                }
            })?,
            None => call.await,
        };
        let response = answered.map_err(|e| DocNotesError::ServiceError {
            status: None,
            message: e.to_string(),
        })?;

        debug!(
            "{}: {} prompt tokens, {} completion tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        let content = response.content;
        Ok((!content.trim().is_empty()).then_some(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::encode::EncodedDocument;
    use edgequake_llm::LLMResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every chat with `reply`, after sleeping for `delay`.
    struct Slow {
        delay: Duration,
        reply: String,
        received: Mutex<Vec<String>>,
    }

    impl Slow {
        fn new(delay: Duration, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                delay,
                reply: reply.to_string(),
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-1"
        }

        fn max_context_length(&self) -> usize {
            8192
        }

        async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            self.complete_with_options(prompt, &CompletionOptions::default())
                .await
        }

        async fn complete_with_options(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            tokio::time::sleep(self.delay).await;
            Ok(LLMResponse::new(self.reply.clone(), "slow-1"))
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.received
                .lock()
                .unwrap()
                .extend(messages.iter().map(|m| m.content.clone()));
            tokio::time::sleep(self.delay).await;
            Ok(LLMResponse::new(self.reply.clone(), "slow-1"))
        }
    }

    fn service(provider: Arc<Slow>, timeout_secs: Option<u64>) -> ProviderService {
        let mut builder = AnalysisConfig::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.request_timeout_secs(secs);
        }
        ProviderService::new("slow", provider, &builder.build().unwrap())
    }

    async fn generate(service: &ProviderService) -> Result<Option<String>, DocNotesError> {
        let doc = EncodedDocument::from_bytes(MediaType::PlainText, b"# Heat");
        let schema = json!({});
        let request = ExtractionRequest {
            document: &doc,
            schema: &schema,
            instruction: "Summarise.",
        };
        service.generate(&request).await
    }

    #[tokio::test]
    async fn provider_slower_than_timeout_is_a_transient_service_error() {
        let provider = Slow::new(Duration::from_secs(30), "{}");
        let err = generate(&service(provider, Some(1))).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(matches!(err, DocNotesError::ServiceError { status: None, .. }));
        assert!(err.is_transient());
        assert!(err.to_string().contains("no response within 1s"), "got: {err}");
    }

    #[tokio::test]
    async fn answer_within_timeout_is_returned() {
        let provider = Slow::new(Duration::from_millis(10), "{\"ok\":true}");
        let reply = generate(&service(provider.clone(), Some(5))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("{\"ok\":true}"));

        // Plain text travels inline, after the instruction.
        let received = provider.received.lock().unwrap();
        assert!(received[1].starts_with("Summarise."));
        assert!(received[1].contains("# Heat"));
    }

    #[tokio::test]
    async fn blank_answer_is_no_content() {
        let provider = Slow::new(Duration::ZERO, "  \n");
        assert_eq!(generate(&service(provider, None)).await.unwrap(), None);
    }
}
