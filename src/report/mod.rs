//! Text and HTML report output.

pub mod format;
pub mod generator;
pub mod options;
pub mod writer;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::aggregate::ReportAggregate;
use crate::capture::ReportLayout;
use crate::error::CompassError;

pub use generator::{write_report, ReportSettings};
pub use options::apply_report_options;
pub use writer::ReportWriter;

/// Write `report-<name>-<ts>.txt` and `.html` into the report directory.
pub fn write_report_files(
    layout: &ReportLayout,
    aggregate: &mut ReportAggregate,
    settings: &ReportSettings,
    timestamp: &str,
) -> Result<(PathBuf, PathBuf)> {
    let text_path = layout.report_file(timestamp, "txt");
    let html_path = layout.report_file(timestamp, "html");

    let create = |path: &PathBuf| {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|e| CompassError::ReportWriteError {
                path: path.clone(),
                source: e,
            })
    };
    let text = create(&text_path)?;
    let html = create(&html_path)?;

    let title = format!("Compatibility assessment report: {}", aggregate.report_name);
    let mut out = ReportWriter::new(text, html, &title)?;
    out.line(&title)?;
    write_report(aggregate, settings, &mut out)?;
    out.finish()?;

    info!(report = %text_path.display(), "report written");
    Ok((text_path, html_path))
}
