//! Capture file writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::reader::CaptureHeader;
use super::record::{CaptureRecord, MetricsLine};
use crate::error::CompassError;
use crate::names::decode_identifier;

/// Appends records to one capture file, flushing after every line.
pub struct CaptureWriter {
    path: PathBuf,
    out: BufWriter<File>,
    records: usize,
}

impl CaptureWriter {
    /// Create (or truncate) a capture file and write its header.
    pub fn create(path: &Path, report: &str, target_version: &str) -> Result<Self> {
        let file = File::create(path).map_err(|source| CompassError::CaptureWriteError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            records: 0,
        };
        let header = CaptureHeader {
            report: report.to_string(),
            target_version: target_version.to_string(),
            generated_at: chrono::Local::now().format("%d-%b-%Y %H:%M:%S").to_string(),
        };
        writer.write_line(&header.to_line())?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Append one record. Encoded identifier characters are restored first.
    pub fn append(&mut self, record: &CaptureRecord) -> Result<()> {
        let record = CaptureRecord {
            item: decode_identifier(&record.item),
            item_detail: decode_identifier(&record.item_detail),
            context: decode_identifier(&record.context),
            sub_context: decode_identifier(&record.sub_context),
            ..record.clone()
        };
        self.write_line(&record.to_line())?;
        self.records += 1;
        Ok(())
    }

    pub fn write_metrics(&mut self, metrics: &MetricsLine) -> Result<()> {
        self.write_line(&metrics.to_line())
    }

    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        let text = text.replace(['\r', '\n'], " ");
        self.write_line(&format!("# {}", text))
    }

    /// Flush and close the file, returning the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.out
            .flush()
            .map_err(|source| CompassError::CaptureWriteError {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), records = self.records, "closed capture file");
        Ok(self.records)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|source| CompassError::CaptureWriteError {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}
