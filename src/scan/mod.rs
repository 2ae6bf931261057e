//! Scan orchestration
//!
//! Drives the cross product of records × active rules for one file,
//! aggregates threshold rules over their windows, and assembles alerts.
//! Bulk scans walk the whole library; a failing file is recorded and
//! the batch continues.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::Record;
use crate::library::LogLibrary;
use crate::parser::parse_condition;
use crate::rule::{Rule, Severity};
use crate::source::{self, LogFormat};

/// Sliding-window threshold evaluation
pub mod window;

/// Evidence records attached to one alert are capped at this many
pub const MAX_EVIDENCE: usize = 100;

/// One finding produced by a rule over a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Id of the rule that fired
    pub rule_id: String,
    /// Title of the rule that fired
    pub rule_title: String,
    /// Rendered alert title, when the rule configures a template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_title: Option<String>,
    /// Severity from the rule
    pub severity: Severity,
    /// When the scan ran (RFC 3339)
    pub timestamp: String,
    /// Matching events, after aggregation
    pub match_count: usize,
    /// Contributing records, in source order, capped at [`MAX_EVIDENCE`]
    pub evidence: Vec<Record>,
    /// Whether evidence was truncated to the cap
    #[serde(default)]
    pub evidence_truncated: bool,
    /// Set when the aggregation window fell back to record positions
    /// because `eventTime` was missing
    #[serde(default)]
    pub positional_window: bool,
    /// Source file for bulk scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

/// Response for a single-file scan
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    /// Alerts, in rule-iteration order
    pub alerts: Vec<Alert>,
    /// Number of rules evaluated
    pub rules_evaluated: usize,
    /// Wall-clock scan time in milliseconds
    pub scan_time_ms: u64,
    /// Rules skipped because their condition failed to parse
    #[serde(default)]
    pub rule_errors: Vec<String>,
}

/// Per-file outcome inside a bulk scan
#[derive(Debug, Serialize, Deserialize)]
pub struct FileScanResult {
    /// Filename without path
    pub file_name: String,
    /// Full path of the scanned file
    pub file_path: String,
    /// Alerts for this file
    pub alerts: Vec<Alert>,
    /// Wall-clock time for this file in milliseconds
    pub scan_time_ms: u64,
}

/// A file the bulk scan could not process
#[derive(Debug, Serialize, Deserialize)]
pub struct FailedFileScan {
    /// Filename without path
    pub file_name: String,
    /// Full path of the failing file
    pub file_path: String,
    /// Why the file failed
    pub error: String,
}

/// Response for a bulk scan over the whole library
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkScanResponse {
    /// Alerts across all files
    pub total_alerts: usize,
    /// Files scanned successfully
    pub total_files_scanned: usize,
    /// Wall-clock time for the whole batch in milliseconds
    pub total_scan_time_ms: u64,
    /// Number of rules evaluated per file
    pub rules_evaluated: usize,
    /// Per-file results
    pub file_results: Vec<FileScanResult>,
    /// Files that could not be scanned
    pub failed_files: Vec<FailedFileScan>,
}

/// Scan one file with the given rules
pub fn scan_file(path: &Path, format: LogFormat, rules: &[Rule]) -> Result<ScanResponse> {
    let start = Instant::now();
    let records = source::load_records(path, format)?;
    debug!(path = %path.display(), records = records.len(), rules = rules.len(), "scanning file");

    let (alerts, rule_errors) = scan_records(&records, rules, None);

    Ok(ScanResponse {
        alerts,
        rules_evaluated: rules.len(),
        scan_time_ms: start.elapsed().as_millis() as u64,
        rule_errors,
    })
}

/// Apply every rule to an in-memory record buffer. Alerts come back in
/// rule-iteration order, plus messages for rules whose condition failed
/// to parse.
pub fn scan_records(
    records: &[Record],
    rules: &[Rule],
    source_file: Option<&str>,
) -> (Vec<Alert>, Vec<String>) {
    let mut alerts = Vec::new();
    let mut rule_errors = Vec::new();
    let scan_time = chrono::Utc::now().to_rfc3339();

    for rule in rules {
        // Parse once, reuse across the whole record walk
        let expr = match parse_condition(&rule.detection.condition) {
            Ok(expr) => expr,
            Err(e) => {
                warn!(rule = %rule.title, error = %e, "skipping rule with invalid condition");
                rule_errors.push(format!("{}: {}", rule.title, e));
                continue;
            }
        };

        let aggregation = match rule.aggregation() {
            Ok(agg) => agg,
            Err(e) => {
                warn!(rule = %rule.title, error = %e, "skipping rule with invalid aggregation");
                rule_errors.push(format!("{}: {}", rule.title, e));
                continue;
            }
        };

        let matches: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| expr.matches(record))
            .map(|(i, _)| i)
            .collect();

        if matches.is_empty() {
            continue;
        }

        let (member_indices, positional) = match aggregation {
            Some((window, threshold)) => {
                let timestamps: Vec<_> =
                    matches.iter().map(|&i| records[i].event_time()).collect();
                match window::evaluate(&timestamps, &matches, window, threshold) {
                    Some(hit) => {
                        if hit.positional {
                            warn!(
                                rule = %rule.title,
                                "eventTime missing on matches; window fell back to record positions"
                            );
                        }
                        let members: Vec<usize> =
                            hit.members.iter().map(|&m| matches[m]).collect();
                        (members, hit.positional)
                    }
                    None => continue,
                }
            }
            None => (matches, false),
        };

        alerts.push(build_alert(
            rule,
            records,
            &member_indices,
            positional,
            &scan_time,
            source_file,
        ));
    }

    (alerts, rule_errors)
}

fn build_alert(
    rule: &Rule,
    records: &[Record],
    member_indices: &[usize],
    positional_window: bool,
    scan_time: &str,
    source_file: Option<&str>,
) -> Alert {
    let truncated = member_indices.len() > MAX_EVIDENCE;
    if truncated {
        debug!(rule = %rule.title, total = member_indices.len(), cap = MAX_EVIDENCE, "capping alert evidence");
    }
    let evidence: Vec<Record> = member_indices
        .iter()
        .take(MAX_EVIDENCE)
        .map(|&i| records[i].clone())
        .collect();

    let alert_title = rule
        .output
        .as_ref()
        .filter(|o| !o.alert_title.is_empty())
        .zip(evidence.first())
        .map(|(output, first)| output.render_title(first));

    Alert {
        rule_id: rule.id.clone(),
        rule_title: rule.title.clone(),
        alert_title,
        severity: rule.detection.severity,
        timestamp: scan_time.to_string(),
        match_count: member_indices.len(),
        evidence,
        evidence_truncated: truncated,
        positional_window,
        source_file: source_file.map(str::to_string),
    }
}

/// Scan every file in the library. Files without a sidecar format entry
/// are auto-detected; per-file failures are recorded and the batch
/// continues.
pub fn scan_library(library: &LogLibrary, rules: &[Rule]) -> Result<BulkScanResponse> {
    let start = Instant::now();
    let files = library.list()?;

    let mut file_results = Vec::new();
    let mut failed_files = Vec::new();
    let mut total_alerts = 0;

    for file in files {
        let file_start = Instant::now();
        let path = Path::new(&file.path);

        let format = match file.log_type {
            Some(format) => format,
            None => match source::detect_format(path) {
                Ok(format) => format,
                Err(e) => {
                    warn!(file = %file.filename, error = %e, "cannot detect log format");
                    failed_files.push(FailedFileScan {
                        file_name: file.filename,
                        file_path: file.path,
                        error: format!("cannot detect log format: {}", e),
                    });
                    continue;
                }
            },
        };

        match source::load_records(path, format) {
            Ok(records) => {
                let (alerts, _) = scan_records(&records, rules, Some(&file.filename));
                total_alerts += alerts.len();
                file_results.push(FileScanResult {
                    file_name: file.filename,
                    file_path: file.path,
                    alerts,
                    scan_time_ms: file_start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                warn!(file = %file.filename, error = %e, "file scan failed");
                failed_files.push(FailedFileScan {
                    file_name: file.filename,
                    file_path: file.path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(BulkScanResponse {
        total_alerts,
        total_files_scanned: file_results.len(),
        total_scan_time_ms: start.elapsed().as_millis() as u64,
        rules_evaluated: rules.len(),
        file_results,
        failed_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Aggregation, Detection, OutputConfig, RuleStatus};
    use serde_json::json;

    fn rule(condition: &str) -> Rule {
        Rule {
            id: "test-rule".to_string(),
            title: "Test Rule".to_string(),
            description: "test".to_string(),
            author: "tests".to_string(),
            status: RuleStatus::Active,
            date: "2026-01-05".to_string(),
            tags: vec![],
            detection: Detection {
                severity: Severity::High,
                condition: condition.to_string(),
                aggregation: None,
            },
            output: None,
        }
    }

    fn records(values: Vec<serde_json::Value>) -> Vec<Record> {
        values.into_iter().map(Record::new).collect()
    }

    #[test]
    fn test_simple_match_produces_alert() {
        let events = records(vec![
            json!({"eventName": "ConsoleLogin"}),
            json!({"eventName": "AssumeRole"}),
        ]);
        let rules = vec![rule("eventName = 'ConsoleLogin'")];

        let (alerts, errors) = scan_records(&events, &rules, None);
        assert!(errors.is_empty());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].match_count, 1);
        assert_eq!(alerts[0].evidence.len(), 1);
        assert!(!alerts[0].evidence_truncated);
    }

    #[test]
    fn test_no_match_no_alert() {
        let events = records(vec![json!({"eventName": "AssumeRole"})]);
        let rules = vec![rule("eventName = 'ConsoleLogin'")];

        let (alerts, _) = scan_records(&events, &rules, None);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_invalid_condition_reported_not_fatal() {
        let events = records(vec![json!({"eventName": "ConsoleLogin"})]);
        let rules = vec![rule("eventName = "), rule("eventName = 'ConsoleLogin'")];

        let (alerts, errors) = scan_records(&events, &rules, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_alerts_follow_rule_iteration_order() {
        let events = records(vec![json!({"a": "1", "b": "2"})]);
        let mut low = rule("a = '1'");
        low.id = "low".to_string();
        low.detection.severity = Severity::Low;
        let mut critical = rule("b = '2'");
        critical.id = "crit".to_string();
        critical.detection.severity = Severity::Critical;

        let (alerts, _) = scan_records(&events, &[low, critical], None);
        assert_eq!(alerts[0].rule_id, "low");
        assert_eq!(alerts[1].rule_id, "crit");
    }

    #[test]
    fn test_evidence_capped() {
        let events: Vec<Record> = (0..250)
            .map(|i| Record::new(json!({"eventName": "X", "n": i})))
            .collect();
        let rules = vec![rule("eventName = 'X'")];

        let (alerts, _) = scan_records(&events, &rules, None);
        assert_eq!(alerts[0].match_count, 250);
        assert_eq!(alerts[0].evidence.len(), MAX_EVIDENCE);
        assert!(alerts[0].evidence_truncated);
    }

    #[test]
    fn test_evidence_preserves_record_order() {
        let events = records(vec![
            json!({"eventName": "X", "seq": 1}),
            json!({"eventName": "Y"}),
            json!({"eventName": "X", "seq": 2}),
        ]);
        let rules = vec![rule("eventName = 'X'")];

        let (alerts, _) = scan_records(&events, &rules, None);
        let seqs: Vec<_> = alerts[0]
            .evidence
            .iter()
            .map(|r| r.get("seq").cloned().unwrap())
            .collect();
        assert_eq!(seqs, vec![json!(1), json!(2)]);
    }

    fn brute_force_rule(window: &str, threshold: &str) -> Rule {
        let mut r = rule("errorCode = 'AccessDenied'");
        r.detection.aggregation = Some(Aggregation {
            enabled: true,
            window: window.to_string(),
            threshold: threshold.to_string(),
        });
        r
    }

    #[test]
    fn test_aggregation_threshold_met() {
        // 11 denials in a 3-minute span; "> 10 within 5m" fires once
        let events: Vec<Record> = (0..11)
            .map(|i| {
                Record::new(json!({
                    "errorCode": "AccessDenied",
                    "eventTime": format!("2026-01-05T10:{:02}:{:02}Z", i / 4, (i % 4) * 15)
                }))
            })
            .collect();
        let rules = vec![brute_force_rule("5m", "> 10")];

        let (alerts, _) = scan_records(&events, &rules, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].match_count, 11);
        assert!(!alerts[0].positional_window);
    }

    #[test]
    fn test_aggregation_threshold_not_met() {
        // 11 denials spread an hour apart never satisfy "> 10 within 5m"
        let events: Vec<Record> = (0..11)
            .map(|i| {
                Record::new(json!({
                    "errorCode": "AccessDenied",
                    "eventTime": format!("2026-01-05T{:02}:00:00Z", i)
                }))
            })
            .collect();
        let rules = vec![brute_force_rule("5m", "> 10")];

        let (alerts, _) = scan_records(&events, &rules, None);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_aggregation_positional_fallback() {
        let events: Vec<Record> = (0..5)
            .map(|_| Record::new(json!({"errorCode": "AccessDenied"})))
            .collect();
        let rules = vec![brute_force_rule("5m", ">= 5")];

        let (alerts, _) = scan_records(&events, &rules, None);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].positional_window);
    }

    #[test]
    fn test_alert_title_rendered_from_first_evidence() {
        let events = records(vec![json!({
            "errorCode": "AccessDenied",
            "sourceIPAddress": "203.0.113.7"
        })]);
        let mut r = rule("errorCode = 'AccessDenied'");
        r.output = Some(OutputConfig {
            alert_title: "Brute force from {{sourceIPAddress}}".to_string(),
        });

        let (alerts, _) = scan_records(&events, &[r], None);
        assert_eq!(
            alerts[0].alert_title.as_deref(),
            Some("Brute force from 203.0.113.7")
        );
    }
}
