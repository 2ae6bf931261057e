//! Standalone condition validation
//!
//! Wraps the parser to produce UI-friendly diagnostics: a message, the
//! character offset where things went wrong, and suggestions. A few
//! SQL-shaped mistakes get targeted messages because rule authors
//! regularly paste WHERE clauses in here.

use serde::{Deserialize, Serialize};

use super::parse_condition;

/// Outcome of validating a condition string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the condition parsed
    pub valid: bool,
    /// Failure description when invalid
    pub error_message: Option<String>,
    /// Byte offset of the failure, when known
    pub error_position: Option<usize>,
    /// Hints for fixing the condition
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            error_message: None,
            error_position: None,
            suggestions: vec![],
        }
    }

    fn fail(message: impl Into<String>, position: Option<usize>, suggestions: Vec<String>) -> Self {
        Self {
            valid: false,
            error_message: Some(message.into()),
            error_position: position,
            suggestions,
        }
    }
}

/// Validate a condition string without evaluating it
pub fn validate_condition(condition: &str) -> ValidationResult {
    let trimmed = condition.trim();

    if trimmed.is_empty() {
        return ValidationResult::fail(
            "Condition cannot be empty",
            Some(0),
            vec!["Example: eventName = 'AssumeRole'".to_string()],
        );
    }

    // Conditions are bare boolean expressions, not SQL statements
    if let Some(word) = first_word(trimmed) {
        if word.eq_ignore_ascii_case("where") {
            return ValidationResult::fail(
                "Conditions must not start with WHERE; write the expression directly",
                Some(0),
                vec!["Example: errorCode = 'AccessDenied'".to_string()],
            );
        }
        if word.eq_ignore_ascii_case("select") {
            return ValidationResult::fail(
                "Conditions are not SQL queries; use the ad-hoc query page for SELECT",
                Some(0),
                vec!["Example: eventName = 'ConsoleLogin'".to_string()],
            );
        }
    }

    if contains_bare_keyword(trimmed, "case") {
        return ValidationResult::fail(
            "CASE expressions are not supported in conditions",
            None,
            vec!["Split the logic into OR branches instead".to_string()],
        );
    }

    match parse_condition(trimmed) {
        Ok(_) => ValidationResult::ok(),
        Err(e) => {
            let suggestions = suggestions_for(&e.message);
            ValidationResult::fail(e.message, e.pos, suggestions)
        }
    }
}

fn first_word(input: &str) -> Option<&str> {
    input.split_whitespace().next()
}

/// Keyword occurrence check that ignores quoted string contents
fn contains_bare_keyword(input: &str, keyword: &str) -> bool {
    bare_words(input)
        .iter()
        .any(|word| word.eq_ignore_ascii_case(keyword))
}

fn bare_words(input: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut in_string = false;
    let mut start = None;

    for (i, c) in input.char_indices() {
        if c == '\'' {
            in_string = !in_string;
            if let Some(s) = start.take() {
                words.push(&input[s..i]);
            }
            continue;
        }
        if in_string {
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            words.push(&input[s..i]);
        }
    }
    if let Some(s) = start {
        words.push(&input[s..]);
    }
    words
}

fn suggestions_for(message: &str) -> Vec<String> {
    if message.contains("unterminated") {
        vec!["Close the string with a single quote; use '' for a literal quote".to_string()]
    } else if message.contains("parentheses") {
        vec!["Balance every '(' with a ')'".to_string()]
    } else if message.contains("IN list") {
        vec!["Example: eventName IN ('StopLogging', 'DeleteTrail')".to_string()]
    } else if message.contains("operator") {
        vec![
            "Example: field = 'value'".to_string(),
            "Example: field CONTAINS 'text'".to_string(),
            "Example: field IN ('a', 'b')".to_string(),
        ]
    } else {
        vec![]
    }
}
