//! Imported log file library
//!
//! Log files live in a single directory with a `metadata.json` sidecar
//! mapping each filename to its declared format. The sidecar is
//! rewritten atomically; a missing entry means the format is unknown
//! and must be given explicitly (or auto-detected on bulk scans).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::source::LogFormat;
use crate::store::ImportSummary;

const METADATA_FILE: &str = "metadata.json";

static METADATA_LOCK: Mutex<()> = Mutex::new(());

/// Information about one log file in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileInfo {
    /// Filename without path
    pub filename: String,
    /// Full path to the file
    pub path: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modified timestamp (RFC 3339)
    pub modified: String,
    /// Declared format, when the sidecar has one
    pub log_type: Option<LogFormat>,
}

/// Directory of imported log files plus their format sidecar
#[derive(Debug)]
pub struct LogLibrary {
    dir: PathBuf,
}

impl LogLibrary {
    /// Open a library over the given directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory backing this library
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn load_metadata(&self) -> HashMap<String, LogFormat> {
        let path = self.metadata_path();
        if !path.exists() {
            return HashMap::new();
        }
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "cannot read log metadata; treating as empty");
                HashMap::new()
            }
        }
    }

    fn save_metadata(&self, metadata: &HashMap<String, LogFormat>) -> Result<()> {
        let content = serde_json::to_string_pretty(metadata)?;
        let path = self.metadata_path();
        let tmp = self.dir.join(".metadata.json.tmp");

        let _guard = METADATA_LOCK.lock();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Declared format for a file, if the sidecar has one
    pub fn log_type_for(&self, filename: &str) -> Option<LogFormat> {
        self.load_metadata().get(filename).copied()
    }

    /// Set or update the declared format for a file
    pub fn set_log_type(&self, filename: &str, format: LogFormat) -> Result<()> {
        if !self.dir.join(filename).exists() {
            return Err(EngineError::LogFileNotFound(filename.to_string()));
        }
        let mut metadata = self.load_metadata();
        metadata.insert(filename.to_string(), format);
        self.save_metadata(&metadata)
    }

    /// List all JSON log files, sorted by filename
    pub fn list(&self) -> Result<Vec<LogFileInfo>> {
        let metadata = self.load_metadata();
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if filename == METADATA_FILE {
                continue;
            }
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match file_info(&path, &filename, &metadata) {
                Ok(info) => files.push(info),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable log file"),
            }
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Import an external log file by copying it into the library.
    /// The filename is preserved; importing over an existing name fails.
    pub fn import(&self, source: &str, format: LogFormat) -> Result<LogFileInfo> {
        let source_path = Path::new(source);
        if !source_path.exists() {
            return Err(EngineError::LogFileNotFound(source.to_string()));
        }
        if source_path.extension().is_none_or(|ext| ext != "json") {
            return Err(EngineError::Format(
                "only .json files can be imported".to_string(),
            ));
        }

        let filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EngineError::Format(format!("invalid filename: {}", source)))?
            .to_string();

        let dest = self.dir.join(&filename);
        if dest.exists() {
            return Err(EngineError::DuplicateId(filename));
        }

        fs::copy(source_path, &dest)?;
        self.set_log_type(&filename, format)?;

        let metadata = self.load_metadata();
        file_info(&dest, &filename, &metadata)
    }

    /// Import a batch of log files with the same format
    pub fn import_many(&self, sources: &[String], format: LogFormat) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for source in sources {
            let name = Path::new(source)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(source)
                .to_string();

            match self.import(source, format) {
                Ok(_) => summary.success_count += 1,
                Err(EngineError::DuplicateId(filename)) => summary.skipped.push(filename),
                Err(e) => summary.errors.push(format!("{}: {}", name, e)),
            }
        }

        Ok(summary)
    }

    /// Delete a log file and its sidecar entry
    pub fn delete(&self, filename: &str) -> Result<()> {
        let path = self.dir.join(filename);

        // Reject traversal out of the library directory
        if !path.starts_with(&self.dir) || filename.contains("..") {
            return Err(EngineError::Format(format!(
                "invalid filename: {}",
                filename
            )));
        }
        if !path.exists() {
            return Err(EngineError::LogFileNotFound(filename.to_string()));
        }

        fs::remove_file(&path)?;

        let mut metadata = self.load_metadata();
        if metadata.remove(filename).is_some() {
            self.save_metadata(&metadata)?;
        }
        Ok(())
    }
}

fn file_info(
    path: &Path,
    filename: &str,
    metadata: &HashMap<String, LogFormat>,
) -> Result<LogFileInfo> {
    let meta = fs::metadata(path)?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let modified = chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339();

    Ok(LogFileInfo {
        filename: filename.to_string(),
        path: path.to_string_lossy().to_string(),
        size_bytes: meta.len(),
        modified,
        log_type: metadata.get(filename).copied(),
    })
}
