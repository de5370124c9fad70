//! On-disk layout of a report directory.
//!
//! ```text
//! <root>/<report>/
//!     captured/captured.<file>.<app>.dat
//!     captured/exported.dat
//!     imported/<file>.imported.<app>.dat
//!     imported/sym/<file>.symtab.<app>.dat
//!     log/session-<timestamp>.log
//!     report-<report>-<timestamp>.txt|.html
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use glob::Pattern;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::CompassError;
use crate::util::{cmp_ci, fix_name_chars};

const CAPTURED_DIR: &str = "captured";
const IMPORTED_DIR: &str = "imported";
const SYMTAB_DIR: &str = "sym";
const LOG_DIR: &str = "log";
const EXPORT_FILE: &str = "exported.dat";
const DIR_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Paths of one named report under a root directory.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    root: PathBuf,
    report_name: String,
}

impl ReportLayout {
    pub fn new(root: impl Into<PathBuf>, report_name: &str) -> Self {
        Self {
            root: root.into(),
            report_name: report_name.to_string(),
        }
    }

    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join(fix_name_chars(&self.report_name))
    }

    pub fn captured_dir(&self) -> PathBuf {
        self.report_dir().join(CAPTURED_DIR)
    }

    pub fn imported_dir(&self) -> PathBuf {
        self.report_dir().join(IMPORTED_DIR)
    }

    pub fn symtab_dir(&self) -> PathBuf {
        self.imported_dir().join(SYMTAB_DIR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.report_dir().join(LOG_DIR)
    }

    pub fn exists(&self) -> bool {
        self.report_dir().is_dir()
    }

    // ========================================================================
    // File paths
    // ========================================================================

    pub fn capture_file(&self, src_file: &str, app: &str) -> PathBuf {
        self.captured_dir().join(format!(
            "captured.{}.{}.dat",
            file_key(src_file),
            fix_name_chars(app)
        ))
    }

    pub fn import_file(&self, src_file: &str, app: &str) -> PathBuf {
        self.imported_dir().join(format!(
            "{}.imported.{}.dat",
            file_key(src_file),
            fix_name_chars(app)
        ))
    }

    pub fn symtab_file(&self, src_file: &str, app: &str) -> PathBuf {
        self.symtab_dir().join(format!(
            "{}.symtab.{}.dat",
            file_key(src_file),
            fix_name_chars(app)
        ))
    }

    pub fn export_file(&self) -> PathBuf {
        self.captured_dir().join(EXPORT_FILE)
    }

    pub fn report_file(&self, timestamp: &str, extension: &str) -> PathBuf {
        self.report_dir().join(format!(
            "report-{}-{}.{}",
            fix_name_chars(&self.report_name),
            timestamp,
            extension
        ))
    }

    pub fn session_log_file(&self, timestamp: &str) -> PathBuf {
        self.log_dir().join(format!("session-{}.log", timestamp))
    }

    // ========================================================================
    // Listing
    // ========================================================================

    pub fn capture_files(&self) -> Result<Vec<PathBuf>> {
        list_matching(&self.captured_dir(), "captured.*.dat")
    }

    pub fn import_files(&self) -> Result<Vec<PathBuf>> {
        list_matching(&self.imported_dir(), "*.imported.*.dat")
    }

    pub fn symtab_files(&self) -> Result<Vec<PathBuf>> {
        list_matching(&self.symtab_dir(), "*.symtab.*.dat")
    }

    // ========================================================================
    // Directory management
    // ========================================================================

    /// Create the report directory tree.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.report_dir(),
            self.captured_dir(),
            self.imported_dir(),
            self.symtab_dir(),
            self.log_dir(),
        ] {
            create_dir_with_retry(&dir)?;
        }
        Ok(())
    }

    /// Remove captured and symbol table files so all imported inputs can be analyzed again.
    pub fn wipe_for_reanalysis(&self) -> Result<()> {
        for dir in [self.captured_dir(), self.symtab_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| CompassError::DirectoryRemoveError {
                    path: dir.clone(),
                    source,
                })?;
            }
            create_dir_with_retry(&dir)?;
        }
        debug!(report = %self.report_name, "wiped captured files and symbol tables");
        Ok(())
    }

    /// Delete the whole report directory tree.
    pub fn delete_report(&self) -> Result<()> {
        let dir = self.report_dir();
        if !dir.is_dir() {
            return Err(CompassError::ReportNotFound {
                report: self.report_name.clone(),
                root: self.root.clone(),
            }
            .into());
        }
        fs::remove_dir_all(&dir).map_err(|source| CompassError::DirectoryRemoveError {
            path: dir.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Names of all report directories under `root`.
pub fn list_reports(root: &Path) -> Vec<String> {
    let mut reports: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && entry.path().join(IMPORTED_DIR).is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    reports.sort_by(|a, b| cmp_ci(a, b));
    reports
}

/// File-name key for an input path: its final component, made file-name safe.
fn file_key(src_file: &str) -> String {
    let name = Path::new(src_file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(src_file);
    fix_name_chars(name)
}

fn list_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let full = format!(
        "{}/{}",
        Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full).map_err(|e| CompassError::InvalidConfig {
        message: format!("invalid file pattern '{}': {}", full, e),
    })?;
    let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

fn create_dir_with_retry(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Err(first) = fs::create_dir_all(dir) {
        warn!(path = %dir.display(), error = %first, "directory creation failed, retrying");
        thread::sleep(DIR_RETRY_DELAY);
        fs::create_dir_all(dir).map_err(|source| CompassError::DirectoryCreateError {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
