/// Error types for the detection engine
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// IO operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Log file could not be parsed in the declared format
    #[error("format error: {0}")]
    Format(String),

    /// Rule definition is structurally invalid
    #[error("schema error: {0}")]
    Schema(String),

    /// Condition string failed to parse
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Import collided with an existing rule id or filename
    #[error("'{0}' already exists")]
    DuplicateId(String),

    /// Rule with the specified id does not exist in the store
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// Log file is not present in the library
    #[error("log file not found: {0}")]
    LogFileNotFound(String),

    /// Ad-hoc query failed; carries the engine diagnostic verbatim
    #[error("query error: {0}")]
    Query(String),

    /// Configuration file is invalid or unwritable
    #[error("config error: {0}")]
    Config(String),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive operation failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

// Errors cross the command boundary as plain strings
impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
