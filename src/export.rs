//! Export of capture records for external processing.
//!
//! Each exported line is a capture record without its last two columns,
//! prefixed with the target version and the export timestamp.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::capture::codec::join_fields;
use crate::capture::{validate_capture_files, CaptureLine, CaptureReader, CaptureRecord, Status};
use crate::error::CompassError;

/// Export line for one record; `None` for records that are never exported.
pub fn export_line(record: &CaptureRecord, target_version: &str, timestamp: &str) -> Option<String> {
    if record.status == Status::ObjectCountOnly {
        return None;
    }
    let line_nr = record.line_nr.to_string();
    let batch_nr = record.batch_nr.to_string();
    let line_nr_in_file = record.line_nr_in_file.to_string();
    Some(join_fields(&[
        target_version,
        timestamp,
        record.item.as_str(),
        record.item_detail.as_str(),
        record.feature_group.as_str(),
        record.status.as_str(),
        line_nr.as_str(),
        record.app_name.as_str(),
        record.src_file.as_str(),
        batch_nr.as_str(),
        line_nr_in_file.as_str(),
        record.context.as_str(),
    ]))
}

/// Export all records of the given capture files into `target`.
///
/// Returns the number of exported records.
pub fn export_records(
    report: &str,
    capture_files: &[PathBuf],
    target: &Path,
    timestamp: &str,
) -> Result<u64> {
    let target_version = validate_capture_files(report, capture_files, None)?;

    let write_error = |source: std::io::Error| CompassError::ReportWriteError {
        path: target.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(target).map_err(write_error)?);

    let mut exported = 0u64;
    for file in capture_files {
        for line in CaptureReader::open(file)? {
            if let CaptureLine::Record(record) = line? {
                if let Some(text) = export_line(&record, &target_version, timestamp) {
                    writeln!(out, "{}", text).map_err(write_error)?;
                    exported += 1;
                }
            }
        }
    }
    out.flush().map_err(write_error)?;

    info!(records = exported, path = %target.display(), "exported capture records");
    Ok(exported)
}
