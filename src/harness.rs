//! Rule test harness
//!
//! Lets a rule author iterate on a condition before saving it: validate
//! the syntax, run it over a real file, and look at which events
//! matched and which did not. Also derives field suggestions for
//! autocomplete from sampled records.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::event::Record;
use crate::parser::{parse_condition, validate_condition};
use crate::scan::MAX_EVIDENCE;
use crate::source::{self, LogFormat};

/// How many non-matching events are kept as a sample
const NON_MATCHED_SAMPLE: usize = 5;

/// Outcome of testing a condition against a log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRuleResult {
    /// Events that satisfied the condition
    pub matched_count: usize,
    /// Total events in the file
    pub total_count: usize,
    /// Matching events, capped like alert evidence
    pub matched_events: Vec<Record>,
    /// A small sample of events that did not match
    pub sample_non_matched: Vec<Record>,
    /// Whether the condition parsed
    pub syntax_valid: bool,
    /// Parse failure message when invalid
    pub syntax_error: Option<String>,
    /// Wall-clock time in milliseconds
    pub execution_time_ms: u64,
}

/// Field suggestion for condition autocomplete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSuggestion {
    /// Dotted field path
    pub field_path: String,
    /// JSON type of the field ("string", "number", "boolean")
    pub field_type: String,
    /// A sample value, truncated for display
    pub sample_value: String,
    /// How many sampled records carry the field
    pub frequency: usize,
}

/// Test a condition against every record in a file
pub fn test_condition(path: &Path, format: LogFormat, condition: &str) -> Result<TestRuleResult> {
    let start = Instant::now();

    let validation = validate_condition(condition);
    if !validation.valid {
        return Ok(TestRuleResult {
            matched_count: 0,
            total_count: 0,
            matched_events: vec![],
            sample_non_matched: vec![],
            syntax_valid: false,
            syntax_error: validation.error_message,
            execution_time_ms: start.elapsed().as_millis() as u64,
        });
    }

    // validate_condition just parsed it, so this cannot fail
    let expr = parse_condition(condition)?;
    let records = source::load_records(path, format)?;

    let mut matched_count = 0;
    let mut matched_events = Vec::new();
    let mut sample_non_matched = Vec::new();

    for record in &records {
        if expr.matches(record) {
            matched_count += 1;
            if matched_events.len() < MAX_EVIDENCE {
                matched_events.push(record.clone());
            }
        } else if sample_non_matched.len() < NON_MATCHED_SAMPLE {
            sample_non_matched.push(record.clone());
        }
    }

    Ok(TestRuleResult {
        matched_count,
        total_count: records.len(),
        matched_events,
        sample_non_matched,
        syntax_valid: true,
        syntax_error: None,
        execution_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Collect field suggestions from up to 100 sampled records, filtered
/// by prefix and ordered by how often the field appears.
pub fn field_suggestions(
    path: &Path,
    format: LogFormat,
    prefix: &str,
) -> Result<Vec<FieldSuggestion>> {
    let records = source::load_records(path, format)?;

    let mut fields: HashMap<String, (String, String, usize)> = HashMap::new();
    for record in records.iter().take(100) {
        collect_fields(record.as_value(), "", &mut fields);
    }

    let prefix_lower = prefix.to_lowercase();
    let mut suggestions: Vec<FieldSuggestion> = fields
        .into_iter()
        .filter(|(path, _)| path.to_lowercase().starts_with(&prefix_lower))
        .map(|(field_path, (field_type, sample_value, frequency))| FieldSuggestion {
            field_path,
            field_type,
            sample_value,
            frequency,
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.field_path.cmp(&b.field_path))
    });
    suggestions.truncate(20);
    Ok(suggestions)
}

fn collect_fields(value: &Value, prefix: &str, fields: &mut HashMap<String, (String, String, usize)>) {
    let Value::Object(map) = value else {
        return;
    };

    for (key, val) in map {
        let field_path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match val {
            Value::String(s) => bump(fields, field_path, "string", s.chars().take(50).collect()),
            Value::Number(n) => bump(fields, field_path, "number", n.to_string()),
            Value::Bool(b) => bump(fields, field_path, "boolean", b.to_string()),
            Value::Object(_) => collect_fields(val, &field_path, fields),
            Value::Array(arr) => {
                if let Some(first) = arr.first() {
                    collect_fields(first, &field_path, fields);
                }
            }
            Value::Null => {}
        }
    }
}

fn bump(
    fields: &mut HashMap<String, (String, String, usize)>,
    path: String,
    field_type: &str,
    sample: String,
) {
    let entry = fields
        .entry(path)
        .or_insert_with(|| (field_type.to_string(), sample, 0));
    entry.2 += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ndjson_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_condition_matches_and_samples() {
        let file = ndjson_file(&[
            r#"{"eventName": "ConsoleLogin"}"#,
            r#"{"eventName": "AssumeRole"}"#,
            r#"{"eventName": "ConsoleLogin"}"#,
        ]);

        let result =
            test_condition(file.path(), LogFormat::FlatJson, "eventName = 'ConsoleLogin'").unwrap();
        assert!(result.syntax_valid);
        assert_eq!(result.matched_count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.matched_events.len(), 2);
        assert_eq!(result.sample_non_matched.len(), 1);
    }

    #[test]
    fn test_invalid_condition_short_circuits() {
        let file = ndjson_file(&[r#"{"eventName": "ConsoleLogin"}"#]);

        let result = test_condition(file.path(), LogFormat::FlatJson, "eventName = ").unwrap();
        assert!(!result.syntax_valid);
        assert!(result.syntax_error.is_some());
        assert_eq!(result.total_count, 0);
    }

    #[test]
    fn test_non_matched_sample_capped() {
        let lines: Vec<String> = (0..20).map(|i| format!(r#"{{"n": {}}}"#, i)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = ndjson_file(&refs);

        let result = test_condition(file.path(), LogFormat::FlatJson, "n = 999").unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.sample_non_matched.len(), 5);
    }

    #[test]
    fn test_field_suggestions() {
        let file = ndjson_file(&[
            r#"{"eventName": "A", "userIdentity": {"type": "IAMUser"}, "count": 1}"#,
            r#"{"eventName": "B", "userIdentity": {"type": "Root"}, "flag": true}"#,
        ]);

        let all = field_suggestions(file.path(), LogFormat::FlatJson, "").unwrap();
        let paths: Vec<&str> = all.iter().map(|s| s.field_path.as_str()).collect();
        assert!(paths.contains(&"eventName"));
        assert!(paths.contains(&"userIdentity.type"));
        assert!(paths.contains(&"count"));

        let event_name = all.iter().find(|s| s.field_path == "eventName").unwrap();
        assert_eq!(event_name.frequency, 2);
        assert_eq!(event_name.field_type, "string");

        let filtered = field_suggestions(file.path(), LogFormat::FlatJson, "user").unwrap();
        assert!(filtered.iter().all(|s| s.field_path.starts_with("user")));
    }
}
