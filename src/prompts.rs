//! Instruction text sent alongside every document.
//!
//! Keeping the prompts here means the default analysis behaviour changes in
//! exactly one place, and tests can inspect the text without a live model.
//! Callers can override the instruction via
//! [`crate::config::AnalysisConfig::instruction`].

use serde_json::Value;

/// Default extraction instruction.
///
/// Sent as the text part of the request, next to the encoded document. The
/// output shape itself is enforced by the schema, so the instruction only
/// describes *what* to extract and how thorough to be.
pub const DEFAULT_INSTRUCTION: &str = r#"You are an expert study-notes author. Analyze the attached document thoroughly and analytically.

Extract:
- metadata: the title, the author (or "Unknown"), the genre or field, and an estimated reading time for the full document
- executiveSummary: a dense, insightful summary of the whole document in a few paragraphs
- keyConcepts: the most important terms and ideas, each with a precise definition and an importance score from 1 to 100
- chapterBreakdown: every chapter or major section in document order, with a summary and the key insight it offers
- topicStats: the main topics covered, each with a relevance score from 1 to 100
- fullMarkdownReport: a comprehensive, well-formatted study report in Markdown, using headings, bullet lists, bold key terms and blockquotes for notable passages

Be specific to this document. Do not invent content that is not supported by the text."#;

/// Extra system instruction for providers without a native structured-output mode.
///
/// The schema is embedded verbatim and the model is told to answer with the
/// bare object. The response is still parsed strictly: prose around the JSON
/// is a malformed response.
pub fn json_only_system_prompt(schema: &Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Respond with a single JSON object and nothing else: no prose, no code fences.\n\
         The object must conform exactly to this schema (all properties required, \
         no additional properties, INTEGER means a whole number):\n\n{schema_text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::analysis_schema;

    #[test]
    fn default_instruction_names_every_section() {
        for field in [
            "metadata",
            "executiveSummary",
            "keyConcepts",
            "chapterBreakdown",
            "topicStats",
            "fullMarkdownReport",
        ] {
            assert!(DEFAULT_INSTRUCTION.contains(field), "missing {field}");
        }
    }

    #[test]
    fn json_only_prompt_embeds_schema() {
        let prompt = json_only_system_prompt(analysis_schema());
        assert!(prompt.contains("\"fullMarkdownReport\""));
        assert!(prompt.contains("no code fences"));
    }
}
