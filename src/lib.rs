//! tsql-compat: static compatibility assessment of SQL Server T-SQL code
//!
//! Input files are analyzed into per-file capture records, which are later
//! aggregated into a text and HTML report with a compatibility estimate for
//! a target SQL engine version.

pub mod aggregate;
pub mod analyze;
pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod names;
pub mod report;
pub mod symtab;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;

use aggregate::{aggregate_captures, AggregateOptions};
use analyze::{read_import_header, AnalysisSession, AnalysisSummary, ImportHeader, InputFile};
use capture::ReportLayout;
use config::{load_config, CompassConfig};
use report::{apply_report_options, write_report_files, ReportSettings};
use util::cmp_ci;

pub use error::CompassError;

/// Timestamp format of report file names.
const REPORT_TIMESTAMP: &str = "%Y-%b-%d-%H.%M.%S";

/// Options for analyzing input files into a report
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Directory holding all reports
    pub root: PathBuf,
    pub report: String,
    /// Application the input files belong to
    pub app: String,
    pub inputs: Vec<PathBuf>,
    /// Add inputs to an existing report
    pub add: bool,
    /// Re-import inputs already imported for the same application
    pub replace: bool,
    /// Optional XML configuration file
    pub config_path: Option<PathBuf>,
    /// Overrides the configured target version
    pub target_version: Option<String>,
    /// Enable verbose output
    pub verbose: bool,
}

/// Options for generating a report from capture files
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub root: PathBuf,
    pub report: String,
    /// Report options such as `xref=feature` or `filter=<regex>`
    pub options: Vec<String>,
    pub config_path: Option<PathBuf>,
    /// Target version the capture files must have been analyzed for
    pub target_version: Option<String>,
    pub verbose: bool,
}

/// Options for re-analyzing every imported input of a report
#[derive(Debug, Clone)]
pub struct ReanalyzeOptions {
    pub root: PathBuf,
    pub report: String,
    pub config_path: Option<PathBuf>,
    pub target_version: Option<String>,
    pub verbose: bool,
}

/// Load the configuration file if given, applying a target version override.
pub fn load_settings(config_path: Option<&Path>, target_version: Option<&str>) -> Result<CompassConfig> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => CompassConfig::default(),
    };
    if let Some(version) = target_version {
        config.target_version = version.to_string();
    }
    Ok(config)
}

/// Import and analyze input files into a report
pub fn analyze(options: AnalyzeOptions) -> Result<AnalysisSummary> {
    let config = load_settings(options.config_path.as_deref(), options.target_version.as_deref())?;
    let layout = ReportLayout::new(&options.root, &options.report);

    // The log directory may exist already, so look for imported inputs
    if !options.add && !options.replace && !layout.import_files()?.is_empty() {
        return Err(CompassError::ReportExists {
            report: options.report.clone(),
        }
        .into());
    }

    if options.verbose {
        println!(
            "Analyzing {} input files for application '{}' into report '{}'",
            options.inputs.len(),
            options.app,
            options.report
        );
    }

    let inputs: Vec<InputFile> = options
        .inputs
        .iter()
        .map(|path| InputFile::new(path, &options.app))
        .collect();
    let mut session = AnalysisSession::open(layout, config)?;
    let summary = session.analyze_files(&inputs, options.replace)?;

    if options.verbose {
        println!(
            "Analyzed {} batches ({} with errors) in {} lines",
            summary.batches, summary.error_batches, summary.lines
        );
    }
    Ok(summary)
}

/// Re-run analysis of all imported inputs of a report
pub fn reanalyze(options: ReanalyzeOptions) -> Result<AnalysisSummary> {
    let config = load_settings(options.config_path.as_deref(), options.target_version.as_deref())?;
    let layout = existing_layout(&options.root, &options.report)?;
    if layout.import_files()?.is_empty() {
        return Err(CompassError::NoCaptureFiles {
            message: format!(
                "No input files have been imported for report '{}'; run 'analyze' first",
                options.report
            ),
        }
        .into());
    }

    if options.verbose {
        println!("Re-analyzing report '{}'", options.report);
    }
    let mut session = AnalysisSession::open(layout, config)?;
    session.reanalyze()
}

/// Generate the text and HTML report, returning both paths
pub fn generate_report(options: ReportOptions) -> Result<(PathBuf, PathBuf)> {
    let config = load_settings(options.config_path.as_deref(), None)?;
    let layout = existing_layout(&options.root, &options.report)?;
    let capture_files = require_capture_files(&layout)?;

    let mut aggregate_options = AggregateOptions::from_config(&options.report, &config);
    aggregate_options.expected_version = options.target_version.clone();

    let now = chrono::Local::now();
    let mut settings = ReportSettings {
        xref: aggregate_options.xref.clone(),
        show_app_counts: false,
        generated_at: now.format("%d-%b-%Y %H:%M:%S").to_string(),
    };
    apply_report_options(&options.options, &mut settings)?;
    aggregate_options.xref = settings.xref.clone();

    if options.verbose {
        println!(
            "Reading {} capture files of report '{}'",
            capture_files.len(),
            options.report
        );
    }
    let mut aggregate = aggregate_captures(&capture_files, aggregate_options)?;
    let paths = write_report_files(
        &layout,
        &mut aggregate,
        &settings,
        &now.format(REPORT_TIMESTAMP).to_string(),
    )?;

    if options.verbose {
        println!("Created report: {}", paths.0.display());
    }
    Ok(paths)
}

/// Export all capture records of a report, returning the export file and record count
pub fn export_captures(root: &Path, report: &str) -> Result<(PathBuf, u64)> {
    let layout = existing_layout(root, report)?;
    let capture_files = require_capture_files(&layout)?;
    let target = layout.export_file();
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let count = export::export_records(report, &capture_files, &target, &timestamp)?;
    Ok((target, count))
}

/// Imported inputs of a report, sorted by application and file name
pub fn list_report(root: &Path, report: &str) -> Result<Vec<ImportHeader>> {
    let layout = existing_layout(root, report)?;
    let mut headers = layout
        .import_files()?
        .iter()
        .map(|path| read_import_header(path))
        .collect::<Result<Vec<_>>>()?;
    headers.sort_by(|a, b| cmp_ci(&a.app, &b.app).then_with(|| cmp_ci(&a.src_file(), &b.src_file())));
    Ok(headers)
}

/// Remove a report and everything in it
pub fn delete_report(root: &Path, report: &str) -> Result<()> {
    ReportLayout::new(root, report).delete_report()
}

fn existing_layout(root: &Path, report: &str) -> Result<ReportLayout> {
    let layout = ReportLayout::new(root, report);
    if !layout.exists() {
        return Err(CompassError::ReportNotFound {
            report: report.to_string(),
            root: root.to_path_buf(),
        }
        .into());
    }
    Ok(layout)
}

fn require_capture_files(layout: &ReportLayout) -> Result<Vec<PathBuf>> {
    let capture_files = layout.capture_files()?;
    if !capture_files.is_empty() {
        return Ok(capture_files);
    }
    let imported = layout.import_files()?.len();
    let message = if imported == 0 {
        format!(
            "No input files have been imported for report '{}'; run 'analyze' first",
            layout.report_name()
        )
    } else {
        format!(
            "Report '{}' has {} imported input files but no capture files; run 'reanalyze' to analyze them",
            layout.report_name(),
            imported
        )
    };
    Err(CompassError::NoCaptureFiles { message }.into())
}
