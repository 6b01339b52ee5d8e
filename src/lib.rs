//! # docnotes
//!
//! Turn a PDF or Markdown document into structured study notes using a
//! generative model constrained to a fixed JSON schema.
//!
//! ## Why this crate?
//!
//! Asking a model for "notes" in free text gives output that has to be
//! scraped. Instead this crate sends the document together with a closed
//! schema in structured-output mode and rejects anything that does not
//! match it, so callers get a typed [`AnalysisResult`] or a clear error,
//! never a half-parsed guess.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Validate  .md/.markdown, .pdf, or an allowed declared type
//!  ├─ 2. Encode    bytes → base64 + media tag (application/pdf | text/plain)
//!  ├─ 3. Extract   one structured-output request → AnalysisResult
//!  ├─ 4. Workflow  Idle → Processing → Ready, failures back to Idle
//!  └─ 5. Present   overview / concepts / analytics / report, export, print
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docnotes::{AnalysisConfig, SubmitOutcome, UploadCandidate, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Service auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = AnalysisConfig::default();
//!     let workflow = Workflow::new(&config)?;
//!
//!     match workflow.submit(UploadCandidate::from_path("book.pdf", None)).await {
//!         SubmitOutcome::Completed(result) => println!("{}", result.executive_summary),
//!         other => eprintln!("{other:?}"),
//!     }
//!
//!     let artifact = workflow.export()?;
//!     docnotes::export_to_dir(&artifact, ".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docnotes` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docnotes = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod prompts;
pub mod service;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_candidate, analyze_sync};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{DocNotesError, ErrorKind};
pub use observer::{NoopObserver, ObserverHandle, WorkflowObserver};
pub use output::{AnalysisResult, Chapter, DocumentMetadata, KeyConcept, TopicStat};
pub use pipeline::encode::{EncodedDocument, MediaType};
pub use pipeline::input::UploadCandidate;
pub use pipeline::validate::DocumentKind;
pub use present::{export_to_dir, ExportArtifact, ImpactLevel};
pub use service::{ExtractionRequest, ExtractionService, GeminiService, ProviderService};
pub use workflow::{SubmitOutcome, Workflow, WorkflowState};
