//! Detection rule model and YAML parsing
//!
//! Rules are stored one-per-file as YAML. Parsing is strict about the
//! parts that feed the engine: status, severity, the condition string
//! and the optional aggregation qualifier must all validate before a
//! rule is accepted.
//!
//! # Example
//!
//! ```
//! use trailscan::rule::rule_from_yaml;
//!
//! let yaml = r#"
//! id: "9c5a1d2e-3f61-4b59-9f6e-1f2a3b4c5d6e"
//! title: "AWS API Brute Force Attempt"
//! description: "Repeated access denials within a short window"
//! author: "SOC Team"
//! status: active
//! date: "2026-01-05"
//! tags: [aws, brute-force]
//! detection:
//!   severity: high
//!   condition: "errorCode = 'AccessDenied' OR errorCode = 'UnauthorizedOperation'"
//!   aggregation: { enabled: true, window: "5m", threshold: "> 10" }
//! output:
//!   alert_title: "Brute force from {{sourceIPAddress}}"
//! "#;
//!
//! let rule = rule_from_yaml(yaml.as_bytes()).unwrap();
//! assert_eq!(rule.title, "AWS API Brute Force Attempt");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::event::Record;
use crate::parser::parse_condition;

/// Window and threshold parsing
pub mod aggregation;

pub use aggregation::{parse_window, Threshold, ThresholdOp};

/// Rule lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// Evaluated during scans
    Active,
    /// Kept but never evaluated
    Disabled,
    /// Under development; not evaluated
    Experimental,
    /// Superseded; not evaluated
    Deprecated,
}

/// Alert severity carried from the rule onto its alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Highest priority
    Critical,
    /// High priority
    High,
    /// Medium priority
    Medium,
    /// Low priority
    Low,
    /// Informational
    Info,
}

impl Severity {
    /// Numeric rank for sorting, critical first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Medium => 3,
            Severity::Low => 2,
            Severity::Info => 1,
        }
    }
}

/// A detection rule as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier; generated on save when empty
    #[serde(default)]
    pub id: String,
    /// Human-readable rule title
    pub title: String,
    /// What the rule detects
    pub description: String,
    /// Rule author
    pub author: String,
    /// Lifecycle status
    pub status: RuleStatus,
    /// Creation or last-modified date (YYYY-MM-DD)
    #[serde(default)]
    pub date: String,
    /// Tags for filtering and categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Detection logic
    pub detection: Detection,
    /// Optional alert formatting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Detection logic: severity, condition and optional aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Severity stamped onto alerts
    pub severity: Severity,
    /// Boolean condition evaluated per record
    pub condition: String,
    /// Optional threshold-over-window qualifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

/// Threshold-over-window qualifier. Window and threshold stay strings
/// here so rule files round-trip byte-identically; they are parsed on
/// use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Whether the qualifier applies
    pub enabled: bool,
    /// Window duration, e.g. `"5m"`
    pub window: String,
    /// Threshold expression, e.g. `"> 10"`
    pub threshold: String,
}

/// Alert output configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Title template with `{{dotted.path}}` placeholders
    #[serde(default)]
    pub alert_title: String,
}

impl OutputConfig {
    /// Render the alert title against a record. Placeholders that do
    /// not resolve are left in place so the gap is visible.
    pub fn render_title(&self, record: &Record) -> String {
        render_template(&self.alert_title, record)
    }
}

fn render_template(template: &str, record: &Record) -> String {
    // Non-greedy placeholder scan; regex is overkill for two braces
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                match record.get(path) {
                    Some(serde_json::Value::String(s)) => out.push_str(s),
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        out.push_str("{{");
                        out.push_str(&after[..end]);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

impl Rule {
    /// Whether this rule participates in scans
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    /// Parsed aggregation qualifier, if enabled
    pub fn aggregation(&self) -> Result<Option<(std::time::Duration, Threshold)>> {
        match &self.detection.aggregation {
            Some(agg) if agg.enabled => {
                let window = parse_window(&agg.window)?;
                let threshold = Threshold::parse(&agg.threshold)?;
                Ok(Some((window, threshold)))
            }
            _ => Ok(None),
        }
    }
}

/// Parse a rule from YAML bytes with validation
pub fn rule_from_yaml(data: &[u8]) -> Result<Rule> {
    let rule: Rule = serde_yaml::from_slice(data)
        .map_err(|e| EngineError::Schema(format!("invalid rule YAML: {}", e)))?;
    validate_rule(&rule)?;
    Ok(rule)
}

/// Validate that a rule meets the schema requirements
pub fn validate_rule(rule: &Rule) -> Result<()> {
    if rule.title.trim().is_empty() {
        return Err(EngineError::Schema("rule title cannot be empty".to_string()));
    }
    if rule.description.trim().is_empty() {
        return Err(EngineError::Schema(
            "rule description cannot be empty".to_string(),
        ));
    }
    if rule.author.trim().is_empty() {
        return Err(EngineError::Schema("rule author cannot be empty".to_string()));
    }

    if !rule.date.is_empty()
        && chrono::NaiveDate::parse_from_str(&rule.date, "%Y-%m-%d").is_err()
    {
        return Err(EngineError::Schema(format!(
            "rule date '{}' is not a valid YYYY-MM-DD date",
            rule.date
        )));
    }

    parse_condition(&rule.detection.condition).map_err(|e| {
        EngineError::Schema(format!(
            "condition does not parse: {} (in rule '{}')",
            e, rule.title
        ))
    })?;

    if let Some(agg) = &rule.detection.aggregation {
        if agg.enabled {
            parse_window(&agg.window)?;
            Threshold::parse(&agg.threshold)?;
        }
    }

    Ok(())
}
