//! Persistent configuration
//!
//! `config.json` in the data directory holds the user-tunable pieces:
//! optional overrides for the rules and logs directories, the
//! recent-files list and UI preferences. Nothing here is cached at
//! module scope; operations re-read the file so concurrent commands
//! observe updates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Application configuration stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Custom rules directory; `None` means `<data_dir>/rules`
    pub rules_directory: Option<String>,
    /// Initial directory for log file pickers
    pub default_logs_directory: Option<String>,
    /// Recently opened log files, most recent first
    #[serde(default)]
    pub recent_log_files: Vec<String>,
    /// Cap on the recent-files list
    #[serde(default = "default_max_recent")]
    pub max_recent_files: usize,
    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

/// Preferences owned by the UI shell but persisted with the engine data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Dark mode enabled
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    /// Auto-refresh interval in seconds; 0 disables
    #[serde(default)]
    pub auto_refresh_interval: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_directory: None,
            default_logs_directory: None,
            recent_log_files: Vec::new(),
            max_recent_files: default_max_recent(),
            ui_preferences: UiPreferences::default(),
        }
    }
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            auto_refresh_interval: 0,
        }
    }
}

fn default_max_recent() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

/// Load the configuration, falling back to defaults when absent
pub fn load(data_dir: &Path) -> Result<AppConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| crate::error::EngineError::Config(format!("cannot parse config: {}", e)))
}

/// Persist the configuration
pub fn save(data_dir: &Path, config: &AppConfig) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path(data_dir), content)?;
    Ok(())
}

impl AppConfig {
    /// Push a path onto the recent-files list, deduplicating and
    /// trimming to the configured cap.
    pub fn push_recent(&mut self, file_path: String) {
        self.recent_log_files.retain(|f| f != &file_path);
        self.recent_log_files.insert(0, file_path);
        self.recent_log_files.truncate(self.max_recent_files);
    }
}
