//! Error types for tsql-compat

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while analyzing inputs or generating a report
#[derive(Error, Debug)]
pub enum CompassError {
    #[error("Failed to read configuration file: {path}")]
    ConfigReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {path}")]
    ConfigParseError {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read input file: {path}")]
    InputReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt imported file {path}: {message}")]
    CorruptImportFile { path: PathBuf, message: String },

    #[error("Input file {path} was already imported for application '{app}'; use --replace to re-import it")]
    AlreadyImported { path: PathBuf, app: String },

    #[error("Report '{report}' already exists; use --add to add input files to it")]
    ReportExists { report: String },

    #[error("Report '{report}' not found under {root}")]
    ReportNotFound { report: String, root: PathBuf },

    #[error("Failed to create directory: {path}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory: {path}")]
    DirectoryRemoveError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write capture file: {path}")]
    CaptureWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read capture file: {path}")]
    CaptureReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid capture files for report '{report}':\n{details}\nRe-run analysis with 'reanalyze' to rebuild them")]
    InvalidCaptureFiles { report: String, details: String },

    #[error("{message}")]
    NoCaptureFiles { message: String },

    #[error("Corrupt capture record in {path} at line {line}: {message}")]
    CorruptCaptureRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unknown status value: '{value}'")]
    InvalidStatus { value: String },

    #[error("Failed to write symbol table file: {path}")]
    SymbolTableWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read symbol table file: {path}")]
    SymbolTableReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt symbol table file {path}: {message}")]
    CorruptSymbolTable { path: PathBuf, message: String },

    #[error("Failed to sort report keys: {message}")]
    SortError { message: String },

    #[error("Failed to write report to {path}")]
    ReportWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTML generation error: {message}")]
    HtmlGenerationError { message: String },
}
