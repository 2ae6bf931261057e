//! Rule persistence
//!
//! One YAML file per rule, named `<id>.yaml`, in a configured
//! directory. Writes go through a temp file and an atomic rename, and
//! are serialized by a process-wide lock so concurrent commands cannot
//! interleave. Reads tolerate a rename racing past them by retrying
//! once.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::rule::{rule_from_yaml, validate_rule, Rule};

// Single-writer discipline across every store instance in the process
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Outcome of a batch import. The counts always add up:
/// `success_count + skipped.len() + errors.len()` equals the number of
/// items submitted.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ImportSummary {
    /// Items imported successfully
    pub success_count: usize,
    /// Items skipped because the id already exists and overwrite was off
    pub skipped: Vec<String>,
    /// Per-item failure messages
    pub errors: Vec<String>,
}

/// File-system backed rule store
#[derive(Debug)]
pub struct RuleStore {
    dir: PathBuf,
}

impl RuleStore {
    /// Open a store over the given directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory this store reads and writes
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rule_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", id))
    }

    /// List all well-formed rules, sorted by title. Malformed files are
    /// collected into the second element instead of aborting the
    /// listing.
    pub fn list_with_errors(&self) -> Result<(Vec<Rule>, Vec<String>)> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !is_yaml {
                continue;
            }

            match read_rule_file(&path) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed rule file");
                    errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        rules.sort_by(|a, b| a.title.cmp(&b.title));
        Ok((rules, errors))
    }

    /// List all well-formed rules, logging malformed files
    pub fn list(&self) -> Result<Vec<Rule>> {
        let (rules, _) = self.list_with_errors()?;
        Ok(rules)
    }

    /// List rules with status `active`
    pub fn list_active(&self) -> Result<Vec<Rule>> {
        Ok(self.list()?.into_iter().filter(Rule::is_active).collect())
    }

    /// Fetch a single rule by id
    pub fn get(&self, id: &str) -> Result<Rule> {
        let path = self.rule_path(id);
        if !path.exists() {
            return Err(EngineError::RuleNotFound(id.to_string()));
        }
        read_rule_file(&path)
    }

    /// Save a rule, creating or overwriting its file. An empty id gets
    /// a fresh UUID; an empty date is stamped with today.
    pub fn save(&self, mut rule: Rule) -> Result<Rule> {
        if rule.id.is_empty() {
            rule.id = uuid::Uuid::new_v4().to_string();
        }
        if rule.date.is_empty() {
            rule.date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        }
        validate_rule(&rule)?;

        let yaml = serde_yaml::to_string(&rule)?;
        let path = self.rule_path(&rule.id);
        let tmp = self.dir.join(format!(".{}.yaml.tmp", rule.id));

        let _guard = WRITE_LOCK.lock();
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, &path)?;
        debug!(id = %rule.id, path = %path.display(), "saved rule");

        Ok(rule)
    }

    /// Delete a rule by id
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.rule_path(id);
        if !path.exists() {
            return Err(EngineError::RuleNotFound(id.to_string()));
        }
        let _guard = WRITE_LOCK.lock();
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Export a single rule to a YAML file
    pub fn export(&self, id: &str, dest: &Path) -> Result<()> {
        let rule = self.get(id)?;
        let yaml = serde_yaml::to_string(&rule)?;
        fs::write(dest, yaml)?;
        Ok(())
    }

    /// Export all rules into a ZIP archive. Returns the rule count.
    pub fn export_all(&self, dest: &Path) -> Result<usize> {
        use zip::write::FileOptions;

        let rules = self.list()?;
        let file = fs::File::create(dest)?;
        let mut archive = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for rule in &rules {
            let yaml = serde_yaml::to_string(rule)?;
            archive.start_file(format!("{}.yaml", rule.id), options)?;
            archive.write_all(yaml.as_bytes())?;
        }
        archive.finish()?;
        Ok(rules.len())
    }

    /// Import a single rule file. Fails with [`EngineError::DuplicateId`]
    /// when the id exists and `overwrite` is off.
    pub fn import(&self, source: &Path, overwrite: bool) -> Result<Rule> {
        let content = fs::read_to_string(source)?;
        let rule = rule_from_yaml(content.as_bytes())?;

        if !rule.id.is_empty() && !overwrite && self.rule_path(&rule.id).exists() {
            return Err(EngineError::DuplicateId(rule.id));
        }
        self.save(rule)
    }

    /// Import a batch of rule files, one summary entry per path
    pub fn import_many(&self, paths: &[String], overwrite: bool) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for raw in paths {
            let path = Path::new(raw);
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(raw)
                .to_string();

            if !raw.ends_with(".yaml") && !raw.ends_with(".yml") {
                summary.errors.push(format!("{}: not a YAML file", name));
                continue;
            }

            match fs::read_to_string(path) {
                Ok(content) => self.import_entry(&name, &content, overwrite, &mut summary),
                Err(e) => summary.errors.push(format!("{}: {}", name, e)),
            }
        }

        Ok(summary)
    }

    /// Import every YAML entry from a ZIP archive
    pub fn import_zip(&self, zip_path: &Path, overwrite: bool) -> Result<ImportSummary> {
        let file = fs::File::open(zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut summary = ImportSummary::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if !name.ends_with(".yaml") && !name.ends_with(".yml") {
                continue;
            }

            let mut content = String::new();
            if let Err(e) = entry.read_to_string(&mut content) {
                summary.errors.push(format!("{}: {}", name, e));
                continue;
            }
            self.import_entry(&name, &content, overwrite, &mut summary);
        }

        Ok(summary)
    }

    fn import_entry(
        &self,
        name: &str,
        content: &str,
        overwrite: bool,
        summary: &mut ImportSummary,
    ) {
        let rule = match rule_from_yaml(content.as_bytes()) {
            Ok(rule) => rule,
            Err(e) => {
                summary.errors.push(format!("{}: {}", name, e));
                return;
            }
        };

        if !rule.id.is_empty() && !overwrite && self.rule_path(&rule.id).exists() {
            summary.skipped.push(rule.id);
            return;
        }

        match self.save(rule) {
            Ok(_) => summary.success_count += 1,
            Err(e) => summary.errors.push(format!("{}: {}", name, e)),
        }
    }
}

/// Read and parse one rule file, retrying once if a concurrent rename
/// made the file momentarily invisible.
fn read_rule_file(path: &Path) -> Result<Rule> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fs::read_to_string(path)?,
        Err(e) => return Err(e.into()),
    };
    rule_from_yaml(content.as_bytes())
}
