//! The extraction schema and the structural check that enforces it.
//!
//! [`analysis_schema`] is sent with every request (structured-output mode)
//! and is also the reference for validating what comes back. It uses the
//! OpenAPI subset understood by structured-output APIs: upper-case type
//! names, `properties`, `required` and `items`.
//!
//! [`check`] walks a response value against the schema and reports the
//! first violation with a JSON-path-like location, e.g.
//! `$.keyConcepts[2].importance: expected INTEGER, found string`. Every
//! declared property is treated as required and undeclared properties are
//! violations: the contract is closed.

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::fmt;

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "metadata": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "author": { "type": "STRING" },
                    "genre": { "type": "STRING" },
                    "estimatedReadingTime": { "type": "STRING" }
                },
                "required": ["title", "author", "genre", "estimatedReadingTime"]
            },
            "executiveSummary": { "type": "STRING" },
            "keyConcepts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": { "type": "STRING" },
                        "definition": { "type": "STRING" },
                        "importance": {
                            "type": "INTEGER",
                            "description": "Importance score from 1 to 100"
                        }
                    },
                    "required": ["term", "definition", "importance"]
                }
            },
            "chapterBreakdown": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "summary": { "type": "STRING" },
                        "insight": { "type": "STRING" }
                    },
                    "required": ["title", "summary", "insight"]
                }
            },
            "topicStats": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": { "type": "STRING" },
                        "relevance": {
                            "type": "INTEGER",
                            "description": "Relevance score from 1 to 100"
                        }
                    },
                    "required": ["topic", "relevance"]
                }
            },
            "fullMarkdownReport": {
                "type": "STRING",
                "description": "A comprehensive study report in Markdown with headings, lists and bold text"
            }
        },
        "required": [
            "metadata",
            "executiveSummary",
            "keyConcepts",
            "chapterBreakdown",
            "topicStats",
            "fullMarkdownReport"
        ]
    })
});

/// The schema every extraction response must satisfy.
pub fn analysis_schema() -> &'static Value {
    &SCHEMA
}

/// A single structural mismatch between a value and the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

/// Check `value` against `schema`, stopping at the first violation.
pub fn check(value: &Value, schema: &Value) -> Result<(), SchemaViolation> {
    check_at("$", value, schema)
}

fn check_at(path: &str, value: &Value, schema: &Value) -> Result<(), SchemaViolation> {
    let violation = |reason: String| SchemaViolation {
        path: path.to_string(),
        reason,
    };
    let expected = schema.get("type").and_then(Value::as_str).unwrap_or("");

    match expected {
        "OBJECT" => {
            let obj = value
                .as_object()
                .ok_or_else(|| violation(format!("expected OBJECT, found {}", describe(value))))?;
            let props = schema
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            if let Some(extra) = obj.keys().find(|k| !props.contains_key(*k)) {
                return Err(violation(format!("unexpected property '{extra}'")));
            }
            for (name, sub) in &props {
                let child = format!("{path}.{name}");
                match obj.get(name) {
                    None => {
                        return Err(SchemaViolation {
                            path: child,
                            reason: "missing required property".into(),
                        })
                    }
                    Some(v) => check_at(&child, v, sub)?,
                }
            }
            Ok(())
        }
        "ARRAY" => {
            let items = value
                .as_array()
                .ok_or_else(|| violation(format!("expected ARRAY, found {}", describe(value))))?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check_at(&format!("{path}[{i}]"), item, item_schema)?;
                }
            }
            Ok(())
        }
        "STRING" if value.is_string() => Ok(()),
        "INTEGER" if value.is_i64() || value.is_u64() => Ok(()),
        "NUMBER" if value.is_number() => Ok(()),
        "BOOLEAN" if value.is_boolean() => Ok(()),
        "STRING" | "INTEGER" | "NUMBER" | "BOOLEAN" => Err(violation(format!(
            "expected {expected}, found {}",
            describe(value)
        ))),
        other => Err(violation(format!("schema declares unsupported type '{other}'"))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "fractional number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
