//! Read-only projections of an [`AnalysisResult`] into views and artifacts.
//!
//! Nothing here mutates the result. Views borrow from it; the export
//! artifact and the text renderings own their strings.
//!
//! ## Display rules
//!
//! - Chapters are numbered from 1 in document order.
//! - A concept is **High Impact** when `importance > 80`, else **Standard**.
//! - Scores are carried verbatim. Only the *display* values are clamped to
//!   `0..=100`, so a model that answers `140` still shows up as 140 in the
//!   data but draws a full bar.
//! - Bar width is `value / max(series) × 100`, clamped to `0..=100`, and 0
//!   for every bar when the series maximum is ≤ 0.

use crate::error::DocNotesError;
use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Importance strictly above this is High Impact.
pub const HIGH_IMPACT_THRESHOLD: i64 = 80;

/// Suffix appended to the title-derived export file name.
pub const EXPORT_SUFFIX: &str = "_Notes.md";

/// Character width of a full (100 %) bar in text renderings.
const BAR_COLUMNS: usize = 40;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// ── Views ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub genre: &'a str,
    pub estimated_reading_time: &'a str,
    pub executive_summary: &'a str,
    pub chapters: Vec<ChapterEntry<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterEntry<'a> {
    /// 1-based position in the document.
    pub number: usize,
    pub title: &'a str,
    pub summary: &'a str,
    pub insight: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImpactLevel {
    High,
    Standard,
}

impl ImpactLevel {
    pub fn classify(importance: i64) -> Self {
        if importance > HIGH_IMPACT_THRESHOLD {
            ImpactLevel::High
        } else {
            ImpactLevel::Standard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImpactLevel::High => "High Impact",
            ImpactLevel::Standard => "Standard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptCard<'a> {
    pub term: &'a str,
    pub definition: &'a str,
    /// As returned by the service.
    pub importance: i64,
    /// `importance` clamped to `0..=100`.
    pub display_importance: u8,
    pub impact: ImpactLevel,
}

/// One bar of a proportional chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar<'a> {
    pub label: &'a str,
    pub value: i64,
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView<'a> {
    pub topic_relevance: Vec<Bar<'a>>,
    pub concept_importance: Vec<Bar<'a>>,
}

/// A Markdown file ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub file_name: String,
    pub content: String,
}

pub fn overview(result: &AnalysisResult) -> OverviewView<'_> {
    let meta = &result.metadata;
    OverviewView {
        title: &meta.title,
        author: &meta.author,
        genre: &meta.genre,
        estimated_reading_time: &meta.estimated_reading_time,
        executive_summary: &result.executive_summary,
        chapters: result
            .chapter_breakdown
            .iter()
            .enumerate()
            .map(|(i, c)| ChapterEntry {
                number: i + 1,
                title: &c.title,
                summary: &c.summary,
                insight: &c.insight,
            })
            .collect(),
    }
}

pub fn concepts(result: &AnalysisResult) -> Vec<ConceptCard<'_>> {
    result
        .key_concepts
        .iter()
        .map(|c| ConceptCard {
            term: &c.term,
            definition: &c.definition,
            importance: c.importance,
            display_importance: clamp_score(c.importance),
            impact: ImpactLevel::classify(c.importance),
        })
        .collect()
}

pub fn analytics(result: &AnalysisResult) -> AnalyticsView<'_> {
    AnalyticsView {
        topic_relevance: bars(
            result
                .topic_stats
                .iter()
                .map(|t| (t.topic.as_str(), t.relevance)),
        ),
        concept_importance: bars(
            result
                .key_concepts
                .iter()
                .map(|c| (c.term.as_str(), c.importance)),
        ),
    }
}

/// The full Markdown report, verbatim.
pub fn report(result: &AnalysisResult) -> &str {
    &result.full_markdown_report
}

/// `<title with whitespace runs replaced by "_">_Notes.md` holding the report verbatim.
pub fn export_artifact(result: &AnalysisResult) -> ExportArtifact {
    ExportArtifact {
        file_name: format!(
            "{}{}",
            WHITESPACE_RUN.replace_all(&result.metadata.title, "_"),
            EXPORT_SUFFIX
        ),
        content: result.full_markdown_report.clone(),
    }
}

fn clamp_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn bars<'a>(series: impl Iterator<Item = (&'a str, i64)> + Clone) -> Vec<Bar<'a>> {
    let max = series.clone().map(|(_, v)| v).max().unwrap_or(0);
    series
        .map(|(label, value)| Bar {
            label,
            value,
            width_pct: if max <= 0 {
                0.0
            } else {
                (value as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
            },
        })
        .collect()
}

// ── Text renderings ──────────────────────────────────────────────────────

pub fn render_overview(result: &AnalysisResult) -> String {
    let view = overview(result);
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "=".repeat(view.title.chars().count().max(8)));
    let _ = writeln!(out, "Author:        {}", view.author);
    let _ = writeln!(out, "Genre:         {}", view.genre);
    let _ = writeln!(out, "Reading time:  {}", view.estimated_reading_time);
    let _ = writeln!(out);
    let _ = writeln!(out, "Executive summary");
    let _ = writeln!(out, "-----------------");
    let _ = writeln!(out, "{}", view.executive_summary);
    if !view.chapters.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Chapters");
        let _ = writeln!(out, "--------");
        for ch in &view.chapters {
            let _ = writeln!(out, "{}. {}", ch.number, ch.title);
            let _ = writeln!(out, "   {}", ch.summary);
            let _ = writeln!(out, "   Insight: {}", ch.insight);
        }
    }
    out
}

pub fn render_concepts(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Key concepts");
    let _ = writeln!(out, "------------");
    for card in concepts(result) {
        let _ = writeln!(
            out,
            "* {} [{}] ({})",
            card.term,
            card.display_importance,
            card.impact.label()
        );
        let _ = writeln!(out, "  {}", card.definition);
    }
    out
}

pub fn render_analytics(result: &AnalysisResult) -> String {
    let view = analytics(result);
    let mut out = String::new();
    write_chart(&mut out, "Topic relevance", &view.topic_relevance);
    let _ = writeln!(out);
    write_chart(&mut out, "Concept importance", &view.concept_importance);
    out
}

fn write_chart(out: &mut String, heading: &str, bars: &[Bar<'_>]) {
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out, "{}", "-".repeat(heading.len()));
    let label_width = bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);
    for bar in bars {
        let columns = (bar.width_pct / 100.0 * BAR_COLUMNS as f64).round() as usize;
        let _ = writeln!(
            out,
            "{:<width$}  {:<cols$}  {}",
            bar.label,
            "█".repeat(columns),
            bar.value,
            width = label_width,
            cols = BAR_COLUMNS
        );
    }
}

/// A printable text document of every view, report last.
pub fn render_print(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&render_overview(result));
    out.push('\n');
    out.push_str(&render_concepts(result));
    out.push('\n');
    out.push_str(&render_analytics(result));
    out.push('\n');
    out.push_str("Full report\n-----------\n");
    out.push_str(report(result));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ── Export ───────────────────────────────────────────────────────────────

/// Write `artifact` into `dir` and return the written path.
///
/// Uses atomic write (temp file + rename) to prevent partial files. Path
/// separators in the artifact name are replaced with `_` on disk so a title
/// like "Input/Output" cannot escape `dir`.
pub async fn export_to_dir(
    artifact: &ExportArtifact,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, DocNotesError> {
    let dir = dir.as_ref();
    let on_disk = artifact.file_name.replace(['/', '\\'], "_");
    let path = dir.join(on_disk);
    let write_err = |source| DocNotesError::ExportWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &artifact.content)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    info!(
        "Exported {} bytes to {}",
        artifact.content.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::sample_result;
    use crate::output::{KeyConcept, TopicStat};

    #[test]
    fn overview_numbers_chapters_from_one_in_order() {
        let result = sample_result();
        let view = overview(&result);
        assert_eq!(view.title, "My Book: Part One");
        let numbered: Vec<_> = view.chapters.iter().map(|c| (c.number, c.title)).collect();
        assert_eq!(numbered, vec![(1, "Beginnings"), (2, "Disorder")]);
    }

    #[test]
    fn entropy_at_92_is_high_impact() {
        let result = sample_result();
        let cards = concepts(&result);
        assert_eq!(cards[0].term, "Entropy");
        assert_eq!(cards[0].importance, 92);
        assert_eq!(cards[0].impact, ImpactLevel::High);
        assert_eq!(cards[1].impact, ImpactLevel::Standard);
    }

    #[test]
    fn impact_threshold_is_strict() {
        assert_eq!(ImpactLevel::classify(80), ImpactLevel::Standard);
        assert_eq!(ImpactLevel::classify(81), ImpactLevel::High);
    }

    #[test]
    fn out_of_range_scores_are_clamped_for_display_only() {
        let mut result = sample_result();
        result.key_concepts = vec![
            KeyConcept {
                term: "Over".into(),
                definition: "d".into(),
                importance: 140,
            },
            KeyConcept {
                term: "Under".into(),
                definition: "d".into(),
                importance: -5,
            },
        ];
        let cards = concepts(&result);
        assert_eq!((cards[0].importance, cards[0].display_importance), (140, 100));
        assert_eq!((cards[1].importance, cards[1].display_importance), (-5, 0));
    }

    #[test]
    fn bar_widths_are_proportional_to_series_max() {
        let result = sample_result();
        let view = analytics(&result);
        let widths: Vec<_> = view.topic_relevance.iter().map(|b| b.width_pct).collect();
        assert_eq!(widths, vec![100.0, 50.0]);
        assert_eq!(view.concept_importance[1].value, 46);
        assert_eq!(view.concept_importance[1].width_pct, 50.0);
    }

    #[test]
    fn non_positive_series_max_gives_zero_widths() {
        let mut result = sample_result();
        result.topic_stats = vec![
            TopicStat {
                topic: "A".into(),
                relevance: 0,
            },
            TopicStat {
                topic: "B".into(),
                relevance: -3,
            },
        ];
        let view = analytics(&result);
        assert!(view.topic_relevance.iter().all(|b| b.width_pct == 0.0));
    }

    #[test]
    fn negative_values_do_not_draw_negative_bars() {
        let mut result = sample_result();
        result.topic_stats.push(TopicStat {
            topic: "Loss".into(),
            relevance: -10,
        });
        let view = analytics(&result);
        assert_eq!(view.topic_relevance[2].width_pct, 0.0);
    }

    #[test]
    fn export_name_replaces_whitespace_runs() {
        let mut result = sample_result();
        let artifact = export_artifact(&result);
        assert_eq!(artifact.file_name, "My_Book:_Part_One_Notes.md");
        assert_eq!(artifact.content, result.full_markdown_report);

        result.metadata.title = "Tabs\tand   spaces\n".into();
        assert_eq!(
            export_artifact(&result).file_name,
            "Tabs_and_spaces__Notes.md"
        );
    }

    #[test]
    fn report_is_verbatim() {
        let result = sample_result();
        assert_eq!(report(&result), result.full_markdown_report);
    }

    #[test]
    fn print_rendering_contains_every_view() {
        let result = sample_result();
        let text = render_print(&result);
        assert!(text.contains("My Book: Part One"));
        assert!(text.contains("1. Beginnings"));
        assert!(text.contains("Entropy [92] (High Impact)"));
        assert!(text.contains("Topic relevance"));
        assert!(text.contains(&result.full_markdown_report));
    }

    #[test]
    fn presenting_does_not_mutate() {
        let result = sample_result();
        let before = result.clone();
        let _ = render_print(&result);
        let _ = export_artifact(&result);
        assert_eq!(result, before);
    }

    #[tokio::test]
    async fn export_to_dir_writes_report_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = export_artifact(&sample_result());
        let path = export_to_dir(&artifact, dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("My_Book:_Part_One_Notes.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), artifact.content);
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn export_to_dir_keeps_separators_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ExportArtifact {
            file_name: "Input/Output_Notes.md".into(),
            content: "# IO\n".into(),
        };
        let path = export_to_dir(&artifact, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("Input_Output_Notes.md"));
    }
}
