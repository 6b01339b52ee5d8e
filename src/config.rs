//! Configuration for document analysis.
//!
//! Every knob lives in [`AnalysisConfig`], built through
//! [`AnalysisConfigBuilder`]. The defaults reproduce the baseline contract:
//! one request per document, no retry, no pipeline-imposed timeout.

use crate::error::DocNotesError;
use crate::observer::WorkflowObserver;
use crate::service::ExtractionService;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used with a named `edgequake-llm` provider when none is given.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-mini";

/// Configuration for an analysis run.
///
/// # Example
/// ```rust
/// use docnotes::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-2.5-pro")
///     .temperature(0.3)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 0);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. `None` uses [`DEFAULT_MODEL`] for Gemini and
    /// [`DEFAULT_PROVIDER_MODEL`] for named providers.
    pub model: Option<String>,

    /// Gemini API key. Falls back to `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed `edgequake-llm` provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extraction service. Takes precedence over everything else.
    pub service: Option<Arc<dyn ExtractionService>>,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// The full Markdown report dominates the output; long books need the
    /// headroom or the JSON is cut off and rejected as malformed.
    pub max_output_tokens: usize,

    /// Custom instruction text. `None` uses [`crate::prompts::DEFAULT_INSTRUCTION`].
    pub instruction: Option<String>,

    /// Per-request timeout in seconds. Default: none.
    ///
    /// Without it a hung service keeps the workflow in `Processing`
    /// indefinitely.
    pub request_timeout_secs: Option<u64>,

    /// Extra attempts on transient service errors. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Receives workflow events. Default: none.
    pub observer: Option<Arc<dyn WorkflowObserver>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provider_name: None,
            provider: None,
            service: None,
            temperature: 0.2,
            max_output_tokens: 8192,
            instruction: None,
            request_timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            observer: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "service",
                &self.service.as_ref().map(|s| s.name().to_string()),
            )
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("instruction", &self.instruction.as_ref().map(|i| i.len()))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction actually sent with each request.
    pub fn instruction_text(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION)
    }

    /// The Gemini model actually used.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn service(mut self, service: Arc<dyn ExtractionService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, DocNotesError> {
        let c = &self.config;
        if c.max_output_tokens == 0 {
            return Err(DocNotesError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(DocNotesError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.instruction.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(DocNotesError::InvalidConfig(
                "instruction must not be empty".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(DocNotesError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}
