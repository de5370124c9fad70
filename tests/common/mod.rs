//! Common test utilities for tsql-compat tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tsql_compat::analyze::AnalysisSummary;
use tsql_compat::capture::{CaptureLine, CaptureReader, CaptureRecord, ReportLayout};
use tsql_compat::{AnalyzeOptions, ReportOptions};

/// Report name used by most tests
pub const REPORT: &str = "assessment";

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    /// Copied fixture inputs
    pub input_dir: PathBuf,
    /// Root directory for reports
    pub root: PathBuf,
}

impl TestContext {
    /// Create a new test context by copying all fixtures to a temp directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        let input_dir = temp_dir.path().join("inputs");
        copy_dir_recursive(&fixture_path, &input_dir).expect("Failed to copy fixtures");
        let root = temp_dir.path().join("reports");

        Self {
            _temp_dir: temp_dir,
            input_dir,
            root,
        }
    }

    /// Path of a copied fixture input, e.g. `sales/orders.sql`
    pub fn input(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    /// Write an extra input file into the input directory
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.input_dir.join(name);
        fs::write(&path, content).expect("Failed to write input");
        path
    }

    pub fn layout(&self) -> ReportLayout {
        ReportLayout::new(&self.root, REPORT)
    }

    pub fn analyze_options(&self, app: &str, inputs: &[&str]) -> AnalyzeOptions {
        AnalyzeOptions {
            root: self.root.clone(),
            report: REPORT.to_string(),
            app: app.to_string(),
            inputs: inputs.iter().map(|name| self.input(name)).collect(),
            add: false,
            replace: false,
            config_path: None,
            target_version: None,
            verbose: false,
        }
    }

    /// Analyze fixture inputs, adding to the report if it already exists
    pub fn analyze(&self, app: &str, inputs: &[&str]) -> anyhow::Result<AnalysisSummary> {
        let mut options = self.analyze_options(app, inputs);
        options.add = self.layout().exists();
        tsql_compat::analyze(options)
    }

    /// Analyze and panic on failure
    pub fn analyze_successfully(&self, app: &str, inputs: &[&str]) -> AnalysisSummary {
        match self.analyze(app, inputs) {
            Ok(summary) => summary,
            Err(e) => panic!("Analysis of {:?} failed: {:#}", inputs, e),
        }
    }

    pub fn report_options(&self, options: &[&str]) -> ReportOptions {
        ReportOptions {
            root: self.root.clone(),
            report: REPORT.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            config_path: None,
            target_version: None,
            verbose: false,
        }
    }

    /// Generate the report and return the text and HTML contents
    pub fn report(&self, options: &[&str]) -> ReportOutput {
        let (text_path, html_path) = tsql_compat::generate_report(self.report_options(options))
            .unwrap_or_else(|e| panic!("Report generation failed: {:#}", e));
        ReportOutput {
            text: fs::read_to_string(&text_path).expect("Failed to read text report"),
            html: fs::read_to_string(&html_path).expect("Failed to read HTML report"),
            text_path,
            html_path,
        }
    }

    /// All records of the capture file for one input
    pub fn capture_records(&self, src_file: &str, app: &str) -> Vec<CaptureRecord> {
        read_records(&self.layout().capture_file(src_file, app))
    }
}

/// Generated report files and their contents
pub struct ReportOutput {
    pub text_path: PathBuf,
    pub html_path: PathBuf,
    pub text: String,
    pub html: String,
}

pub fn read_records(path: &Path) -> Vec<CaptureRecord> {
    CaptureReader::open(path)
        .expect("Failed to open capture file")
        .filter_map(|line| match line.expect("Invalid capture line") {
            CaptureLine::Record(record) => Some(record),
            _ => None,
        })
        .collect()
}

/// Find the first record with the given item
pub fn find_item<'a>(records: &'a [CaptureRecord], item: &str) -> Option<&'a CaptureRecord> {
    records.iter().find(|r| r.item == item)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
