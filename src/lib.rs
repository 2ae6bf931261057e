//! Offline detection engine for CloudTrail and flat JSON event logs
//!
//! This library ingests structured JSON logs, applies YAML-defined
//! detection rules and emits alerts. Conditions mix SQL-like
//! comparisons with string operators (`CONTAINS`, `STARTSWITH`,
//! `MATCH`, ...) and group with parentheses; a field that is absent
//! from a record never satisfies an operator other than `IS NULL`,
//! negated operators included.
//!
//! # Example
//!
//! ```no_run
//! use trailscan::{LogFormat, Workspace};
//!
//! # fn example() -> trailscan::Result<()> {
//! let workspace = Workspace::new("/var/lib/trailscan");
//!
//! // Import a rule and scan a CloudTrail file with the active set
//! workspace.import_rule("/tmp/brute-force.yaml", false)?;
//! let response = workspace.scan_logs("/tmp/trail.json", LogFormat::CloudTrail)?;
//!
//! for alert in &response.alerts {
//!     tracing::info!(rule = %alert.rule_title, matches = alert.match_count, "alert");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

// Re-export commonly used items
pub use ast::Expr;
pub use error::{EngineError, Result};
pub use event::{FieldPath, Record};
pub use harness::{FieldSuggestion, TestRuleResult};
pub use library::LogFileInfo;
pub use parser::{parse_condition, validate_condition, ValidationResult};
pub use query::QueryResult;
pub use rule::{rule_from_yaml, Rule, RuleStatus, Severity};
pub use scan::{Alert, BulkScanResponse, ScanResponse};
pub use source::LogFormat;
pub use store::ImportSummary;
pub use workspace::Workspace;

/// Condition expression tree and evaluation
pub mod ast;

/// Persistent configuration
pub mod config;

/// Error types
pub mod error;

/// Record abstraction and field paths
pub mod event;

/// Rule test harness and field suggestions
pub mod harness;

/// Lexical analysis for condition strings
pub mod lexer;

/// Imported log file library
pub mod library;

/// Condition parsing and validation
pub mod parser;

/// MATCH and LIKE pattern matching
pub mod pattern;

/// Ad-hoc analytical queries
pub mod query;

/// Rule model and YAML parsing
pub mod rule;

/// Scan orchestration
pub mod scan;

/// Log file parsing
pub mod source;

/// Rule persistence
pub mod store;

/// Command surface over a data directory
pub mod workspace;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber with default settings
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
