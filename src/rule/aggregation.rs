//! Aggregation qualifier parsing
//!
//! Rules may gate alerting behind a threshold over a time window:
//! `{ enabled: true, window: "5m", threshold: "> 10" }`. The window is
//! `<int><s|m|h|d>`; the threshold is a comparison operator and a
//! count.

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Comparison operators allowed in a threshold expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    /// Strictly greater than
    GreaterThan,
    /// Greater than or equal
    GreaterOrEqual,
    /// Strictly less than
    LessThan,
    /// Less than or equal
    LessOrEqual,
    /// Exactly equal
    Equal,
}

impl ThresholdOp {
    /// Evaluate the comparison for a window count
    pub fn evaluate(&self, count: usize, threshold: u64) -> bool {
        let count = count as u64;
        match self {
            ThresholdOp::GreaterThan => count > threshold,
            ThresholdOp::GreaterOrEqual => count >= threshold,
            ThresholdOp::LessThan => count < threshold,
            ThresholdOp::LessOrEqual => count <= threshold,
            ThresholdOp::Equal => count == threshold,
        }
    }
}

/// Parsed `threshold` expression such as `"> 10"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    /// The comparison operator
    pub op: ThresholdOp,
    /// The count compared against
    pub count: u64,
}

impl Threshold {
    /// Parse a threshold expression
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (op, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (ThresholdOp::GreaterOrEqual, rest)
        } else if let Some(rest) = trimmed.strip_prefix("<=") {
            (ThresholdOp::LessOrEqual, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (ThresholdOp::GreaterThan, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (ThresholdOp::LessThan, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (ThresholdOp::Equal, rest)
        } else {
            return Err(EngineError::Schema(format!(
                "invalid threshold '{}': must start with >, >=, <, <= or =",
                input
            )));
        };

        let count = rest.trim().parse().map_err(|_| {
            EngineError::Schema(format!("invalid threshold '{}': bad count", input))
        })?;

        Ok(Self { op, count })
    }

    /// Check a window count against the threshold
    pub fn satisfied_by(&self, count: usize) -> bool {
        self.op.evaluate(count, self.count)
    }
}

/// Parse a window duration such as `"5m"` or `"24h"`
pub fn parse_window(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| EngineError::Schema(format!("invalid window '{}': missing unit", input)))?;

    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits.parse().map_err(|_| {
        EngineError::Schema(format!("invalid window '{}': bad number", input))
    })?;
    if value == 0 {
        return Err(EngineError::Schema(format!(
            "invalid window '{}': must be positive",
            input
        )));
    }

    let seconds = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        other => {
            return Err(EngineError::Schema(format!(
                "invalid window '{}': unknown unit '{}'",
                input, other
            )))
        }
    };
    Ok(Duration::from_secs(seconds))
}
