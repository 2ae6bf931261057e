//! Record abstraction and field-path resolution
//!
//! A [`Record`] wraps one parsed log event as an arbitrary JSON value.
//! Field access uses dotted paths (`userIdentity.type`) with optional
//! bracketed array indices (`resources[0].ARN`). A path that fails to
//! resolve is *absent*, which the evaluator treats differently from a
//! present JSON `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    /// Wrap a JSON value as a record
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the record, returning the underlying JSON value
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Resolve a parsed field path against this record.
    /// Returns `None` when any segment is missing or mismatched.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.0;
        for segment in &path.segments {
            current = match segment {
                Segment::Key(name) => current.get(name.as_str())?,
                Segment::Index(idx) => current.get(*idx)?,
            };
        }
        Some(current)
    }

    /// Parse and resolve a dotted path string in one step
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parsed = FieldPath::parse(path)?;
        self.resolve(&parsed)
    }

    /// Extract the record's `eventTime` as a UTC timestamp, if present
    /// and parseable as ISO-8601.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.get("eventTime")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One step of a field path: an object key or an array index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member lookup by name
    Key(String),
    /// Array element lookup by position
    Index(usize),
}

/// A parsed dotted field path such as `requestParameters.items[0].name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
    raw: String,
}

impl FieldPath {
    /// Parse a dotted path. Returns `None` for malformed input: empty
    /// paths, empty segments (`a..b`, leading or trailing dots) and
    /// unterminated or non-numeric index brackets.
    pub fn parse(input: &str) -> Option<Self> {
        if input.is_empty() || input.starts_with('.') || input.ends_with('.') {
            return None;
        }

        let mut segments = Vec::new();
        for part in input.split('.') {
            if part.is_empty() {
                return None;
            }
            Self::parse_segment(part, &mut segments)?;
        }

        Some(Self {
            segments,
            raw: input.to_string(),
        })
    }

    /// Split `name[0][1]` into a key lookup plus index steps
    fn parse_segment(part: &str, segments: &mut Vec<Segment>) -> Option<()> {
        let name_end = part.find('[').unwrap_or(part.len());
        let name = &part[..name_end];
        if name.is_empty() {
            return None;
        }
        segments.push(Segment::Key(name.to_string()));

        let mut rest = &part[name_end..];
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return None;
            }
            let close = rest.find(']')?;
            let idx: usize = rest[1..close].parse().ok()?;
            segments.push(Segment::Index(idx));
            rest = &rest[close + 1..];
        }
        Some(())
    }

    /// The original path string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_field_access() {
        let record = Record::new(json!({
            "eventName": "ConsoleLogin",
            "nested": { "field": "value" }
        }));

        assert_eq!(record.get("eventName"), Some(&json!("ConsoleLogin")));
        assert_eq!(record.get("nested.field"), Some(&json!("value")));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.get("nested.missing"), None);
    }

    #[test]
    fn test_absent_vs_null() {
        let record = Record::new(json!({ "errorCode": null }));

        // Present null is distinct from a missing key
        assert_eq!(record.get("errorCode"), Some(&Value::Null));
        assert_eq!(record.get("errorMessage"), None);
    }

    #[test]
    fn test_indexed_path() {
        let record = Record::new(json!({
            "resources": [
                { "ARN": "arn:aws:s3:::bucket-a" },
                { "ARN": "arn:aws:s3:::bucket-b" }
            ]
        }));

        assert_eq!(
            record.get("resources[1].ARN"),
            Some(&json!("arn:aws:s3:::bucket-b"))
        );
        assert_eq!(record.get("resources[2].ARN"), None);
    }

    #[test]
    fn test_index_on_non_array_is_absent() {
        let record = Record::new(json!({ "name": "x" }));
        assert_eq!(record.get("name[0]"), None);
    }

    #[test]
    fn test_malformed_paths() {
        assert!(FieldPath::parse("").is_none());
        assert!(FieldPath::parse(".field").is_none());
        assert!(FieldPath::parse("field.").is_none());
        assert!(FieldPath::parse("a..b").is_none());
        assert!(FieldPath::parse("a[").is_none());
        assert!(FieldPath::parse("a[x]").is_none());
        assert!(FieldPath::parse("[0]").is_none());
    }

    #[test]
    fn test_repeated_indices() {
        let record = Record::new(json!({ "grid": [[1, 2], [3, 4]] }));
        assert_eq!(record.get("grid[1][0]"), Some(&json!(3)));
    }

    #[test]
    fn test_event_time() {
        let record = Record::new(json!({ "eventTime": "2026-01-05T10:30:00Z" }));
        let ts = record.event_time().unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-05T10:30:00+00:00");

        let record = Record::new(json!({ "eventTime": "not a date" }));
        assert!(record.event_time().is_none());

        let record = Record::new(json!({}));
        assert!(record.event_time().is_none());
    }
}
