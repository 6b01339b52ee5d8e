//! CLI binary for docnotes.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, drives one `Workflow` submission and prints the
//! requested views of the result.

use anyhow::{Context, Result};
use clap::Parser;
use docnotes::pipeline::schema::analysis_schema;
use docnotes::pipeline::validate::validate;
use docnotes::{
    export_to_dir, present, AnalysisConfig, AnalysisResult, DocumentKind, MediaType,
    SubmitOutcome, UploadCandidate, Workflow, WorkflowObserver, WorkflowState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while the workflow is `Processing`, one
/// status line when it settles.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for SpinnerObserver {
    fn on_submit(&self, name: &str) {
        self.bar.set_message(format!("Reading {name}…"));
    }

    fn on_accepted(&self, name: &str, kind: DocumentKind) {
        self.bar
            .println(format!("  {} {}  {}", green("✓"), name, dim(&format!("{kind:?}"))));
    }

    fn on_encoded(&self, media_type: MediaType, encoded_len: usize) {
        self.bar.set_message(format!(
            "Analysing {}  {}",
            media_type,
            dim(&format!("{encoded_len} base64 chars"))
        ));
    }

    fn on_transition(&self, state: &WorkflowState) {
        match state {
            WorkflowState::Processing => {
                self.bar.set_prefix("Processing");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            WorkflowState::Ready(_) | WorkflowState::Idle { .. } => {
                self.bar.finish_and_clear();
                if let Some(line) = settled_line(state) {
                    eprintln!("{line}");
                }
            }
        }
    }
}

/// The status line for a settled workflow. A failure has none: it comes
/// back from `main` as the error and is reported there, once.
fn settled_line(state: &WorkflowState) -> Option<String> {
    match state {
        WorkflowState::Ready(result) => {
            Some(format!("{} {}", green("✔"), bold(&result.metadata.title)))
        }
        WorkflowState::Idle { .. } | WorkflowState::Processing => None,
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Overview of a book
  docnotes book.pdf

  # Every view, then write <Title>_Notes.md into ./notes
  docnotes --view all --export notes book.pdf

  # Markdown notes file, declared type overrides the extension
  docnotes --media-type text/markdown lecture.txt

  # Machine-readable result
  docnotes --json paper.pdf > paper.json

  # Printable rendering of every view
  docnotes --print book.pdf | lpr

  # Use an edgequake-llm provider instead of Gemini
  docnotes --provider openai --model gpt-4.1 book.pdf

  # Show the extraction schema
  docnotes --schema

ACCEPTED FILES:
  .md / .markdown          always accepted (sent as text/plain)
  .pdf or application/pdf  accepted (sent as application/pdf)
  text/plain, text/markdown accepted by declared type

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (native structured output)
  GOOGLE_API_KEY          Fallback for GEMINI_API_KEY
  OPENAI_API_KEY          Used when no Gemini key is set (auto-detected)
  ANTHROPIC_API_KEY       Used when no Gemini key is set (auto-detected)
  RUST_LOG                Override the log filter
"#;

/// Turn a PDF or Markdown document into structured study notes.
#[derive(Parser, Debug)]
#[command(
    name = "docnotes",
    version,
    about = "Turn a PDF or Markdown document into structured study notes",
    long_about = "Analyse a PDF or Markdown document with a generative model constrained to a \
fixed JSON schema, then show the result as an overview, concept cards, topic analytics or the \
full Markdown report. Uses Google Gemini natively, or any edgequake-llm provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to analyse (.pdf, .md, .markdown, or a plain-text file with --media-type).
    #[arg(required_unless_present = "schema")]
    file: Option<PathBuf>,

    /// Declared media type (e.g. application/pdf, text/plain). Default: inferred from the extension.
    #[arg(long, env = "DOCNOTES_MEDIA_TYPE")]
    media_type: Option<String>,

    /// Which view(s) to print.
    #[arg(long, env = "DOCNOTES_VIEW", value_enum)]
    view: Option<ViewArg>,

    /// Write <Title>_Notes.md into DIR (default: current directory).
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = ".")]
    export: Option<PathBuf>,

    /// Print a printable rendering of every view.
    #[arg(long)]
    print: bool,

    /// Output the AnalysisResult as JSON.
    #[arg(long, env = "DOCNOTES_JSON")]
    json: bool,

    /// Print the extraction schema and exit.
    #[arg(long)]
    schema: bool,

    /// Model ID (e.g. gemini-2.5-flash, gemini-2.5-pro, gpt-4.1).
    #[arg(long, env = "DOCNOTES_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "DOCNOTES_PROVIDER",
        long_help = "Route the request through an edgequake-llm provider instead of the native \
          Gemini client. The schema is then sent in the system prompt."
    )]
    provider: Option<String>,

    /// Gemini API key (falls back to GEMINI_API_KEY, then GOOGLE_API_KEY).
    #[arg(long, env = "DOCNOTES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOCNOTES_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens for the analysis.
    #[arg(long, env = "DOCNOTES_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Retries on transient service errors (429, 5xx, network).
    #[arg(long, env = "DOCNOTES_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Request timeout in seconds. Default: none.
    #[arg(long, env = "DOCNOTES_TIMEOUT")]
    timeout: Option<u64>,

    /// Path to a text file replacing the default instruction.
    #[arg(long, env = "DOCNOTES_INSTRUCTION_FILE")]
    instruction_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCNOTES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "DOCNOTES_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ViewArg {
    Overview,
    Concepts,
    Analytics,
    Report,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress; library INFO logs would tear it.
    let show_progress = !cli.quiet && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Schema-only mode ─────────────────────────────────────────────────
    if cli.schema {
        println!(
            "{}",
            serde_json::to_string_pretty(analysis_schema()).context("Failed to serialise schema")?
        );
        return Ok(());
    }

    let Some(ref file) = cli.file else {
        anyhow::bail!("No input file given");
    };
    let candidate = UploadCandidate::from_path(file, cli.media_type.as_deref());

    // Reject before resolving a service: a wrong file needs no API key.
    validate(&candidate)?;

    // ── Build config & workflow ──────────────────────────────────────────
    let observer = show_progress.then(SpinnerObserver::new);
    let config = build_config(&cli, observer).await?;
    let workflow = Workflow::new(&config).context("Failed to set up the extraction service")?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = match workflow.submit(candidate).await {
        SubmitOutcome::Completed(result) => result,
        SubmitOutcome::Rejected { message, .. } | SubmitOutcome::Failed { message, .. } => {
            anyhow::bail!(message)
        }
        SubmitOutcome::Ignored => anyhow::bail!("Workflow was busy; nothing submitted"),
    };

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(result.as_ref())
            .context("Failed to serialise result")?;
        println!("{json}");
    }

    let explicit_output = cli.json || cli.print || cli.export.is_some();
    if let Some(view) = cli.view.or((!explicit_output).then_some(ViewArg::Overview)) {
        print!("{}", render_view(&result, view));
    }

    if cli.print {
        print!("{}", workflow.print()?);
    }

    if let Some(ref dir) = cli.export {
        let artifact = workflow.export()?;
        let path = export_to_dir(&artifact, dir)
            .await
            .context("Export failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                dim(&format!("{} bytes", artifact.content.len())),
                bold(&path.display().to_string()),
            );
        }
    }

    Ok(())
}

fn render_view(result: &AnalysisResult, view: ViewArg) -> String {
    match view {
        ViewArg::Overview => present::render_overview(result),
        ViewArg::Concepts => present::render_concepts(result),
        ViewArg::Analytics => present::render_analytics(result),
        ViewArg::Report => {
            let mut report = present::report(result).to_string();
            if !report.ends_with('\n') {
                report.push('\n');
            }
            report
        }
        ViewArg::All => present::render_print(result),
    }
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, observer: Option<Arc<SpinnerObserver>>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .max_retries(cli.max_retries);

    if let Some(ref path) = cli.instruction_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_left_to_the_returned_error() {
        let failed = WorkflowState::Idle {
            last_error: Some("Analysis service error (HTTP 503): overloaded".into()),
        };
        assert_eq!(settled_line(&failed), None);
        assert_eq!(settled_line(&WorkflowState::idle()), None);
    }

    #[test]
    fn ready_reports_the_title() {
        let result: AnalysisResult = serde_json::from_value(serde_json::json!({
            "metadata": {
                "title": "Heat",
                "author": "A. Writer",
                "genre": "Physics",
                "estimatedReadingTime": "1 hour"
            },
            "executiveSummary": "s",
            "keyConcepts": [],
            "chapterBreakdown": [],
            "topicStats": [],
            "fullMarkdownReport": "# Heat"
        }))
        .unwrap();
        let line = settled_line(&WorkflowState::Ready(Arc::new(result))).unwrap();
        assert!(line.contains("Heat"));
    }
}
