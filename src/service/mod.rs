//! Extraction service backends.
//!
//! The extraction model is a black box reached through one
//! request/response call. [`ExtractionService`] is that seam: it takes the
//! encoded document, the schema and the instruction and hands back the raw
//! response text. Parsing and validation happen in
//! [`crate::pipeline::extract`], so every backend gets the same strict
//! contract.
//!
//! | Backend | Structured output | Selected when |
//! |---------|-------------------|---------------|
//! | [`GeminiService`] | native `responseSchema` | a Gemini API key is available |
//! | [`ProviderService`] | schema in the system prompt | an `edgequake-llm` provider is configured or detected |
//!
//! [`RetryingService`] wraps either one when `max_retries > 0`.

pub mod gemini;
pub mod provider;
pub mod retry;

pub use gemini::GeminiService;
pub use provider::ProviderService;
pub use retry::RetryingService;

use crate::config::{AnalysisConfig, DEFAULT_PROVIDER_MODEL};
use crate::error::DocNotesError;
use crate::pipeline::encode::EncodedDocument;
use async_trait::async_trait;
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Everything one extraction call needs.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub document: &'a EncodedDocument,
    pub schema: &'a Value,
    pub instruction: &'a str,
}

/// A request/response extraction backend.
///
/// Implementations return `Ok(None)` (or an empty string) when the service
/// answered without content, and an error only when the call itself failed.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Send one request and return the raw response text.
    async fn generate(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<String>, DocNotesError>;
}

/// Resolve the extraction backend, from most-specific to least-specific.
///
/// 1. **Pre-built service** (`config.service`), used as is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in [`ProviderService`].
/// 3. **Named provider** (`config.provider_name`), created through
///    [`ProviderFactory::create_llm_provider`] with `config.model`.
/// 4. **Gemini key** from `config.api_key`, `GEMINI_API_KEY` or
///    `GOOGLE_API_KEY`: native structured output via [`GeminiService`].
/// 5. **Auto-detection** through [`ProviderFactory::from_env`].
///
/// The result is wrapped in [`RetryingService`] when `max_retries > 0`.
pub fn resolve_service(
    config: &AnalysisConfig,
) -> Result<Arc<dyn ExtractionService>, DocNotesError> {
    let service = resolve_base(config)?;
    debug!("Resolved extraction service: {}", service.name());

    if config.max_retries > 0 {
        Ok(Arc::new(RetryingService::new(
            service,
            config.max_retries,
            config.retry_backoff_ms,
        )))
    } else {
        Ok(service)
    }
}

fn resolve_base(config: &AnalysisConfig) -> Result<Arc<dyn ExtractionService>, DocNotesError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderService::new(
            "edgequake-llm",
            Arc::clone(provider),
            config,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        let provider = create_provider(name, model)?;
        return Ok(Arc::new(ProviderService::new(name, provider, config)));
    }

    if let Some(key) = gemini_api_key(config) {
        return Ok(Arc::new(GeminiService::new(key, config)?));
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocNotesError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No extraction service could be auto-detected from the environment.\n\
                Set GEMINI_API_KEY (recommended), or OPENAI_API_KEY / ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(Arc::new(ProviderService::new("auto", provider, config)))
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DocNotesError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        DocNotesError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn gemini_api_key(config: &AnalysisConfig) -> Option<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| non_empty_env("GEMINI_API_KEY"))
        .or_else(|| non_empty_env("GOOGLE_API_KEY"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
