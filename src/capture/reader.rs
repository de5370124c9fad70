//! Capture file reader and cross-file header validation.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use super::record::{CaptureLine, CaptureRecord, MetricsLine, METRICS_PREFIX};
use crate::error::CompassError;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^# Captured items for report \[(.*)\] with targeted version \[(.*)\] generated at (.+)$",
    )
    .unwrap()
});

/// First line of every capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHeader {
    pub report: String,
    pub target_version: String,
    pub generated_at: String,
}

impl CaptureHeader {
    pub fn to_line(&self) -> String {
        format!(
            "# Captured items for report [{}] with targeted version [{}] generated at {}",
            self.report, self.target_version, self.generated_at
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let caps = HEADER_RE.captures(line.trim_end())?;
        Some(CaptureHeader {
            report: caps[1].to_string(),
            target_version: caps[2].to_string(),
            generated_at: caps[3].to_string(),
        })
    }
}

/// Streaming reader over one capture file.
///
/// The header is validated on open; iteration yields the remaining lines
/// lazily, one parsed [`CaptureLine`] at a time.
pub struct CaptureReader {
    path: PathBuf,
    header: CaptureHeader,
    lines: Lines<BufReader<File>>,
    line_nr: usize,
}

impl CaptureReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| CompassError::CaptureReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = BufReader::new(file).lines();
        let first = lines
            .next()
            .transpose()
            .map_err(|source| CompassError::CaptureReadError {
                path: path.to_path_buf(),
                source,
            })?
            .unwrap_or_default();
        let header = CaptureHeader::parse(&first).ok_or_else(|| {
            CompassError::CorruptCaptureRecord {
                path: path.to_path_buf(),
                line: 1,
                message: "missing or malformed capture file header".to_string(),
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            lines,
            line_nr: 1,
        })
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, line: String) -> Result<CaptureLine> {
        let corrupt = |message: String| CompassError::CorruptCaptureRecord {
            path: self.path.clone(),
            line: self.line_nr,
            message,
        };
        if let Some(comment) = line.strip_prefix('#') {
            return Ok(CaptureLine::Comment(comment.trim().to_string()));
        }
        if line.starts_with(METRICS_PREFIX) {
            return Ok(CaptureLine::Metrics(
                MetricsLine::parse_line(&line).map_err(corrupt)?,
            ));
        }
        Ok(CaptureLine::Record(
            CaptureRecord::parse_line(&line).map_err(corrupt)?,
        ))
    }
}

impl Iterator for CaptureReader {
    type Item = Result<CaptureLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(CompassError::CaptureReadError {
                        path: self.path.clone(),
                        source,
                    }
                    .into()))
                }
            };
            self.line_nr += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse(line));
        }
    }
}

/// Read just the header of a capture file; `None` if it is missing or malformed.
pub fn read_header(path: &Path) -> Result<Option<CaptureHeader>> {
    let file = File::open(path).map_err(|source| CompassError::CaptureReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|source| CompassError::CaptureReadError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(CaptureHeader::parse(&first))
}

/// Check that all capture files of a report have a valid header and share one target version.
///
/// When `expected_version` is given, the shared version must equal it.
/// Returns the common target version.
pub fn validate_capture_files(
    report: &str,
    files: &[PathBuf],
    expected_version: Option<&str>,
) -> Result<String> {
    let mut versions = BTreeSet::new();
    let mut problems = Vec::new();
    let mut details = Vec::with_capacity(files.len());

    for file in files {
        match read_header(file)? {
            Some(header) => {
                details.push(format!(
                    "  {}: targeted version [{}]",
                    file.display(),
                    header.target_version
                ));
                versions.insert(header.target_version);
            }
            None => {
                details.push(format!("  {}: invalid header", file.display()));
                problems.push(file.clone());
            }
        }
    }

    let version_conflict = versions.len() > 1;
    let expected_mismatch = match (expected_version, versions.iter().next()) {
        (Some(expected), Some(found)) => versions.len() == 1 && found != expected,
        _ => false,
    };

    if !problems.is_empty() || version_conflict || expected_mismatch {
        let mut text = details.join("\n");
        if expected_mismatch {
            if let Some(expected) = expected_version {
                text.push_str(&format!(
                    "\n  requested targeted version [{}] differs from captured version",
                    expected
                ));
            }
        }
        return Err(CompassError::InvalidCaptureFiles {
            report: report.to_string(),
            details: text,
        }
        .into());
    }

    Ok(versions.into_iter().next().unwrap_or_default())
}
