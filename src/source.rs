//! Log file parsing
//!
//! Turns an on-disk log file into a sequence of [`Record`]s. Two formats
//! are supported: the CloudTrail envelope (a JSON object with a
//! top-level `Records` array) and flat JSON (a single object, or
//! newline-delimited objects). The caller declares the format; there is
//! no sniffing on the single-file path.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::event::Record;

/// Log file format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON object with a top-level `Records` array
    CloudTrail,
    /// Single JSON object, or newline-delimited JSON
    FlatJson,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::CloudTrail => f.write_str("cloudtrail"),
            LogFormat::FlatJson => f.write_str("flatjson"),
        }
    }
}

/// Lazy record sequence over a parsed log file.
///
/// The sequence is finite and non-restartable; callers that need more
/// than one pass must collect into a `Vec` first.
pub struct RecordStream {
    inner: StreamInner,
}

enum StreamInner {
    Buffered(std::vec::IntoIter<Record>),
    Lines {
        lines: std::vec::IntoIter<(usize, String)>,
    },
}

impl Iterator for RecordStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            StreamInner::Buffered(iter) => iter.next().map(Ok),
            StreamInner::Lines { lines } => {
                let (line_no, line) = lines.next()?;
                match serde_json::from_str::<Value>(&line) {
                    Ok(value) => Some(Ok(Record::new(value))),
                    Err(e) => Some(Err(EngineError::Format(format!(
                        "invalid JSON on line {}: {}",
                        line_no, e
                    )))),
                }
            }
        }
    }
}

/// Open a log file as a record stream in the declared format
pub fn open(path: &Path, format: LogFormat) -> Result<RecordStream> {
    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), %format, bytes = content.len(), "opening log file");

    match format {
        LogFormat::CloudTrail => {
            let json: Value = serde_json::from_str(&content)
                .map_err(|e| EngineError::Format(format!("not valid JSON: {}", e)))?;
            let records = json
                .get("Records")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    EngineError::Format("CloudTrail file must have a 'Records' array".to_string())
                })?;
            let buffered: Vec<Record> = records.iter().cloned().map(Record::new).collect();
            Ok(RecordStream {
                inner: StreamInner::Buffered(buffered.into_iter()),
            })
        }
        LogFormat::FlatJson => {
            // A file whose first byte opens an object may still be NDJSON;
            // only a whole-file parse settles it.
            if content.trim_start().starts_with('{') {
                if let Ok(single) = serde_json::from_str::<Value>(&content) {
                    if single.is_object() {
                        return Ok(RecordStream {
                            inner: StreamInner::Buffered(vec![Record::new(single)].into_iter()),
                        });
                    }
                }
            }

            let lines: Vec<(usize, String)> = content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| (i + 1, line.to_string()))
                .collect();

            if lines.is_empty() {
                return Err(EngineError::Format(
                    "no JSON events found in file".to_string(),
                ));
            }

            Ok(RecordStream {
                inner: StreamInner::Lines {
                    lines: lines.into_iter(),
                },
            })
        }
    }
}

/// Load all records from a log file eagerly
pub fn load_records(path: &Path, format: LogFormat) -> Result<Vec<Record>> {
    open(path, format)?.collect()
}

/// Detect the format of a log file from its content: a root object with
/// a `Records` array is CloudTrail, anything else that parses is flat
/// JSON. Used by bulk scans for files without a sidecar entry.
pub fn detect_format(path: &Path) -> Result<LogFormat> {
    let content = fs::read_to_string(path)?;

    if let Ok(json) = serde_json::from_str::<Value>(&content) {
        if json.get("Records").and_then(Value::as_array).is_some() {
            return Ok(LogFormat::CloudTrail);
        }
        if json.is_object() {
            return Ok(LogFormat::FlatJson);
        }
    }

    // NDJSON: the first non-empty line must parse on its own
    match content.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => serde_json::from_str::<Value>(line)
            .map(|_| LogFormat::FlatJson)
            .map_err(|e| EngineError::Format(format!("unrecognized log format: {}", e))),
        None => Err(EngineError::Format("file is empty".to_string())),
    }
}

/// Check that a file parses in at least one supported format
pub fn validate_file(path: &Path) -> Result<bool> {
    let format = detect_format(path)?;
    load_records(path, format)?;
    Ok(true)
}
