//! The typed analysis result returned by the extraction service.
//!
//! Field names follow the wire format (camelCase) so the same types
//! deserialize the service's JSON and serialize the CLI's `--json` output.
//! Every struct rejects unknown fields: the schema in
//! [`crate::pipeline::schema`] is a closed contract and anything outside it
//! is a malformed response, not extra data to carry along.
//!
//! Numeric scores (`importance`, `relevance`) are plain integers. The
//! service is asked for values in 1–100 but nothing here enforces that;
//! the presenter clamps for display.

use serde::{Deserialize, Serialize};

/// Structured study notes for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisResult {
    pub metadata: DocumentMetadata,
    pub executive_summary: String,
    pub key_concepts: Vec<KeyConcept>,
    /// Chapters in document order. Order is significant for presentation.
    pub chapter_breakdown: Vec<Chapter>,
    pub topic_stats: Vec<TopicStat>,
    /// Complete notes as a Markdown document; exported verbatim.
    pub full_markdown_report: String,
}

/// Bibliographic details inferred from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Free text, e.g. "4 hours".
    pub estimated_reading_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConcept {
    pub term: String,
    pub definition: String,
    /// Nominally 1–100.
    pub importance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chapter {
    pub title: String,
    pub summary: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicStat {
    pub topic: String,
    /// Nominally 1–100.
    pub relevance: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A well-formed result used across module tests.
    pub(crate) fn sample_result() -> AnalysisResult {
        AnalysisResult {
            metadata: DocumentMetadata {
                title: "My Book: Part One".into(),
                author: "A. Writer".into(),
                genre: "Physics".into(),
                estimated_reading_time: "3 hours".into(),
            },
            executive_summary: "A tour of thermodynamics.".into(),
            key_concepts: vec![
                KeyConcept {
                    term: "Entropy".into(),
                    definition: "A measure of disorder.".into(),
                    importance: 92,
                },
                KeyConcept {
                    term: "Enthalpy".into(),
                    definition: "Heat content at constant pressure.".into(),
                    importance: 46,
                },
            ],
            chapter_breakdown: vec![
                Chapter {
                    title: "Beginnings".into(),
                    summary: "Sets up the laws.".into(),
                    insight: "Energy is conserved.".into(),
                },
                Chapter {
                    title: "Disorder".into(),
                    summary: "Introduces entropy.".into(),
                    insight: "Entropy never decreases in isolation.".into(),
                },
            ],
            topic_stats: vec![
                TopicStat {
                    topic: "Heat".into(),
                    relevance: 80,
                },
                TopicStat {
                    topic: "Work".into(),
                    relevance: 40,
                },
            ],
            full_markdown_report: "# My Book: Part One\n\n## Summary\n\nA tour.\n".into(),
        }
    }

    pub(crate) fn sample_json() -> serde_json::Value {
        serde_json::to_value(sample_result()).expect("sample serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let json = sample_json();
        assert!(json.get("executiveSummary").is_some());
        assert!(json.get("fullMarkdownReport").is_some());
        assert!(json["metadata"].get("estimatedReadingTime").is_some());
        assert_eq!(json["keyConcepts"][0]["importance"], 92);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut json = sample_json();
        json["metadata"]["isbn"] = serde_json::json!("123");
        assert!(serde_json::from_value::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn null_required_field_is_rejected() {
        let mut json = sample_json();
        json["executiveSummary"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<AnalysisResult>(json).is_err());
    }
}
