//! Command surface
//!
//! [`Workspace`] binds the engine to one data directory and exposes the
//! command set the shell calls. Argument and field names are part of
//! the wire contract (snake_case) and must not drift. The configuration
//! is re-read on every operation so directory changes take effect
//! without restarting.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{self, AppConfig};
use crate::error::Result;
use crate::event::Record;
use crate::harness::{self, FieldSuggestion, TestRuleResult};
use crate::library::{LogFileInfo, LogLibrary};
use crate::parser::{validate_condition, ValidationResult};
use crate::query::{self, QueryResult};
use crate::rule::Rule;
use crate::scan::{self, BulkScanResponse, ScanResponse};
use crate::source::{self, LogFormat};
use crate::store::{ImportSummary, RuleStore};

/// Engine facade over one data directory
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory this workspace operates on
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn rules_dir(&self) -> Result<PathBuf> {
        let config = config::load(&self.data_dir)?;
        Ok(match config.rules_directory {
            Some(custom) => PathBuf::from(custom),
            None => self.data_dir.join("rules"),
        })
    }

    fn store(&self) -> Result<RuleStore> {
        RuleStore::open(self.rules_dir()?)
    }

    fn library(&self) -> Result<LogLibrary> {
        LogLibrary::open(self.data_dir.join("logs"))
    }

    // ------------------------------------------------------------------
    // Rule management
    // ------------------------------------------------------------------

    /// List all rules in the store
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        self.store()?.list()
    }

    /// Fetch one rule by id
    pub fn get_rule(&self, rule_id: &str) -> Result<Rule> {
        self.store()?.get(rule_id)
    }

    /// Create or overwrite a rule
    pub fn save_rule(&self, rule: Rule) -> Result<Rule> {
        self.store()?.save(rule)
    }

    /// Delete a rule by id
    pub fn delete_rule(&self, rule_id: &str) -> Result<()> {
        self.store()?.delete(rule_id)
    }

    /// Export one rule as YAML
    pub fn export_rule(&self, rule_id: &str, dest_path: &str) -> Result<()> {
        self.store()?.export(rule_id, Path::new(dest_path))
    }

    /// Export every rule into a ZIP archive; returns the count
    pub fn export_all_rules(&self, dest_path: &str) -> Result<usize> {
        self.store()?.export_all(Path::new(dest_path))
    }

    /// Import a single rule file
    pub fn import_rule(&self, source_path: &str, overwrite: bool) -> Result<Rule> {
        self.store()?.import(Path::new(source_path), overwrite)
    }

    /// Import a batch of rule files
    pub fn import_multiple_rules(
        &self,
        file_paths: Vec<String>,
        overwrite: bool,
    ) -> Result<ImportSummary> {
        self.store()?.import_many(&file_paths, overwrite)
    }

    /// Import every YAML entry from a ZIP archive
    pub fn import_rules_zip(&self, zip_path: &str, overwrite: bool) -> Result<ImportSummary> {
        self.store()?.import_zip(Path::new(zip_path), overwrite)
    }

    // ------------------------------------------------------------------
    // Log file management
    // ------------------------------------------------------------------

    /// List the imported log files
    pub fn list_log_files(&self) -> Result<Vec<LogFileInfo>> {
        self.library()?.list()
    }

    /// Copy an external log file into the library
    pub fn import_log_file(&self, source_path: &str, log_type: LogFormat) -> Result<LogFileInfo> {
        self.library()?.import(source_path, log_type)
    }

    /// Copy a batch of log files into the library
    pub fn import_multiple_log_files(
        &self,
        source_paths: Vec<String>,
        log_type: LogFormat,
    ) -> Result<ImportSummary> {
        self.library()?.import_many(&source_paths, log_type)
    }

    /// Update the declared format of a library file
    pub fn update_log_type(&self, filename: &str, log_type: LogFormat) -> Result<()> {
        self.library()?.set_log_type(filename, log_type)
    }

    /// Remove a log file from the library
    pub fn delete_log_file(&self, filename: &str) -> Result<()> {
        self.library()?.delete(filename)
    }

    // ------------------------------------------------------------------
    // Scanning and evaluation
    // ------------------------------------------------------------------

    /// Load every record from a log file
    pub fn load_log_events(&self, log_path: &str, log_type: LogFormat) -> Result<Vec<Record>> {
        source::load_records(Path::new(log_path), log_type)
    }

    /// Scan one file with all active rules
    pub fn scan_logs(&self, log_path: &str, log_type: LogFormat) -> Result<ScanResponse> {
        let rules = self.store()?.list_active()?;
        info!(path = log_path, rules = rules.len(), "scanning log file");
        scan::scan_file(Path::new(log_path), log_type, &rules)
    }

    /// Scan every file in the library with all active rules
    pub fn scan_all_logs(&self) -> Result<BulkScanResponse> {
        let rules = self.store()?.list_active()?;
        let library = self.library()?;
        info!(rules = rules.len(), "scanning log library");
        scan::scan_library(&library, &rules)
    }

    /// Check that a file parses in some supported format
    pub fn validate_log_file(&self, log_path: &str) -> Result<bool> {
        source::validate_file(Path::new(log_path))
    }

    /// Validate a condition string without running it
    pub fn validate_condition(&self, condition: &str) -> ValidationResult {
        validate_condition(condition)
    }

    /// Evaluate a condition against a file and report matches
    pub fn test_rule(
        &self,
        condition: &str,
        log_path: &str,
        log_type: LogFormat,
    ) -> Result<TestRuleResult> {
        harness::test_condition(Path::new(log_path), log_type, condition)
    }

    /// Field suggestions for condition autocomplete
    pub fn get_field_suggestions(
        &self,
        log_path: &str,
        log_type: LogFormat,
        prefix: &str,
    ) -> Result<Vec<FieldSuggestion>> {
        harness::field_suggestions(Path::new(log_path), log_type, prefix)
    }

    /// Run an ad-hoc SQL query
    pub fn run_query(&self, query: &str) -> Result<QueryResult> {
        query::run_query(query)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Load the persisted configuration
    pub fn get_config(&self) -> Result<AppConfig> {
        config::load(&self.data_dir)
    }

    /// Persist the configuration
    pub fn save_config(&self, config_data: &AppConfig) -> Result<()> {
        config::save(&self.data_dir, config_data)
    }

    /// Set or clear the custom rules directory
    pub fn set_rules_directory(&self, directory: Option<String>) -> Result<AppConfig> {
        let mut config = config::load(&self.data_dir)?;
        config.rules_directory = directory;
        config::save(&self.data_dir, &config)?;
        Ok(config)
    }

    /// Set or clear the default logs directory
    pub fn set_logs_directory(&self, directory: Option<String>) -> Result<AppConfig> {
        let mut config = config::load(&self.data_dir)?;
        config.default_logs_directory = directory;
        config::save(&self.data_dir, &config)?;
        Ok(config)
    }

    /// Record a log file in the recent-files list
    pub fn add_recent_log_file(&self, file_path: String) -> Result<AppConfig> {
        let mut config = config::load(&self.data_dir)?;
        config.push_recent(file_path);
        config::save(&self.data_dir, &config)?;
        Ok(config)
    }

    /// Clear the recent-files list
    pub fn clear_recent_files(&self) -> Result<AppConfig> {
        let mut config = config::load(&self.data_dir)?;
        config.recent_log_files.clear();
        config::save(&self.data_dir, &config)?;
        Ok(config)
    }

    /// The effective rules directory as a display string
    pub fn get_rules_directory(&self) -> Result<String> {
        Ok(self.rules_dir()?.to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rules_dir_follows_config() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());

        let default_dir = workspace.get_rules_directory().unwrap();
        assert!(default_dir.ends_with("rules"));

        let custom = TempDir::new().unwrap();
        workspace
            .set_rules_directory(Some(custom.path().to_string_lossy().to_string()))
            .unwrap();
        assert_eq!(
            workspace.get_rules_directory().unwrap(),
            custom.path().to_string_lossy().to_string()
        );

        workspace.set_rules_directory(None).unwrap();
        assert!(workspace.get_rules_directory().unwrap().ends_with("rules"));
    }

    #[test]
    fn test_recent_files_commands() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());

        workspace.add_recent_log_file("/logs/a.json".to_string()).unwrap();
        let config = workspace.add_recent_log_file("/logs/b.json".to_string()).unwrap();
        assert_eq!(config.recent_log_files, vec!["/logs/b.json", "/logs/a.json"]);

        let config = workspace.clear_recent_files().unwrap();
        assert!(config.recent_log_files.is_empty());
    }

    #[test]
    fn test_validate_condition_passthrough() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());

        assert!(workspace.validate_condition("a = '1'").valid);
        assert!(!workspace.validate_condition("WHERE a = '1'").valid);
    }
}
