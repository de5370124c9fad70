//! Capture record model: statuses, records and the other line kinds of a capture file.

use std::fmt;
use std::str::FromStr;

use super::codec::{join_fields, split_fields};
use crate::error::CompassError;

/// Prefix of the per-input metrics line.
pub const METRICS_PREFIX: &str = "*metrics=";

/// Compatibility classification of one construct occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Supported,
    NotSupported,
    ReviewSemantics,
    ReviewPerformance,
    ReviewManually,
    Ignored,
    ObjectCountOnly,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Supported,
        Status::NotSupported,
        Status::ReviewSemantics,
        Status::ReviewPerformance,
        Status::ReviewManually,
        Status::Ignored,
        Status::ObjectCountOnly,
    ];

    /// Order in which statuses are listed in reports.
    pub const REPORT_ORDER: [Status; 6] = [
        Status::NotSupported,
        Status::ReviewManually,
        Status::ReviewSemantics,
        Status::ReviewPerformance,
        Status::Ignored,
        Status::Supported,
    ];

    /// Statuses that require user attention.
    pub const NEEDS_ATTENTION: [Status; 4] = [
        Status::NotSupported,
        Status::ReviewManually,
        Status::ReviewSemantics,
        Status::ReviewPerformance,
    ];

    /// Value stored in capture files.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Supported => "SUPPORTED",
            Status::NotSupported => "NOTSUPPORTED",
            Status::ReviewSemantics => "REVIEWSEMANTICS",
            Status::ReviewPerformance => "REVIEWPERFORMANCE",
            Status::ReviewManually => "REVIEWMANUALLY",
            Status::Ignored => "IGNORED",
            Status::ObjectCountOnly => "OBJECTCOUNTONLY",
        }
    }

    /// Name shown in reports.
    pub fn display_name(self) -> &'static str {
        match self {
            Status::Supported => "Supported",
            Status::NotSupported => "Not Supported",
            Status::ReviewSemantics => "Review Semantics",
            Status::ReviewPerformance => "Review Performance",
            Status::ReviewManually => "Review Manually",
            Status::Ignored => "Ignored",
            Status::ObjectCountOnly => "Object Count Only",
        }
    }

    /// Default score weight of one occurrence.
    pub fn default_weight(self) -> u32 {
        match self {
            Status::Supported => 100,
            Status::NotSupported => 200,
            Status::ReviewSemantics | Status::ReviewPerformance | Status::ReviewManually => 150,
            Status::Ignored | Status::ObjectCountOnly => 0,
        }
    }

    pub fn needs_attention(self) -> bool {
        Self::NEEDS_ATTENTION.contains(&self)
    }

    /// Position in [`Status::REPORT_ORDER`]; `ObjectCountOnly` sorts last.
    pub fn report_rank(self) -> usize {
        Self::REPORT_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::REPORT_ORDER.len())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Status {
    type Err = CompassError;

    /// Accepts stored values and display names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(&compact))
            .ok_or_else(|| CompassError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// One classified construct occurrence.
///
/// Field order is the fixed column order of capture files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub item: String,
    pub item_detail: String,
    pub feature_group: String,
    pub status: Status,
    /// Line number within the batch (1-based)
    pub line_nr: u32,
    pub app_name: String,
    pub src_file: String,
    pub batch_nr: u32,
    /// Line number of the batch start within the input file (1-based)
    pub line_nr_in_file: u32,
    pub context: String,
    pub sub_context: String,
    pub misc: String,
}

impl CaptureRecord {
    pub const FIELD_COUNT: usize = 12;

    /// Line number of the occurrence within its input file.
    pub fn absolute_line_nr(&self) -> u32 {
        self.line_nr
            .saturating_add(self.line_nr_in_file)
            .saturating_sub(1)
    }

    pub fn to_line(&self) -> String {
        let line_nr = self.line_nr.to_string();
        let batch_nr = self.batch_nr.to_string();
        let line_nr_in_file = self.line_nr_in_file.to_string();
        join_fields(&[
            self.item.as_str(),
            self.item_detail.as_str(),
            self.feature_group.as_str(),
            self.status.as_str(),
            line_nr.as_str(),
            self.app_name.as_str(),
            self.src_file.as_str(),
            batch_nr.as_str(),
            line_nr_in_file.as_str(),
            self.context.as_str(),
            self.sub_context.as_str(),
            self.misc.as_str(),
        ])
    }

    /// Parse a record line. Errors carry a message only; callers add the location.
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let fields = split_fields(line);
        if fields.len() != Self::FIELD_COUNT {
            return Err(format!(
                "expected {} fields, found {}",
                Self::FIELD_COUNT,
                fields.len()
            ));
        }
        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();

        let item = next();
        let item_detail = next();
        let feature_group = next();
        let status_text = next();
        let status = status_text
            .parse::<Status>()
            .map_err(|e| e.to_string())?;
        let line_nr = parse_number(&next(), "line number")?;
        let app_name = next();
        let src_file = next();
        let batch_nr = parse_number(&next(), "batch number")?;
        let line_nr_in_file = parse_number(&next(), "batch start line")?;

        Ok(CaptureRecord {
            item,
            item_detail,
            feature_group,
            status,
            line_nr,
            app_name,
            src_file,
            batch_nr,
            line_nr_in_file,
            context: next(),
            sub_context: next(),
            misc: next(),
        })
    }
}

fn parse_number(text: &str, what: &str) -> Result<u32, String> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid {}: '{}'", what, text))
}

/// Per-input totals written after the records of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsLine {
    pub src_file: String,
    pub app_name: String,
    pub nr_batches: u32,
    pub nr_error_batches: u32,
    pub nr_lines: u32,
}

impl MetricsLine {
    pub fn to_line(&self) -> String {
        let nr_batches = self.nr_batches.to_string();
        let nr_error_batches = self.nr_error_batches.to_string();
        let nr_lines = self.nr_lines.to_string();
        format!(
            "{}{}",
            METRICS_PREFIX,
            join_fields(&[
                self.src_file.as_str(),
                self.app_name.as_str(),
                nr_batches.as_str(),
                nr_error_batches.as_str(),
                nr_lines.as_str(),
            ])
        )
    }

    pub fn parse_line(line: &str) -> Result<Self, String> {
        let body = line
            .strip_prefix(METRICS_PREFIX)
            .ok_or_else(|| "missing metrics prefix".to_string())?;
        let fields = split_fields(body);
        if fields.len() != 5 {
            return Err(format!("expected 5 metrics fields, found {}", fields.len()));
        }
        Ok(MetricsLine {
            src_file: fields[0].clone(),
            app_name: fields[1].clone(),
            nr_batches: parse_number(&fields[2], "batch count")?,
            nr_error_batches: parse_number(&fields[3], "error batch count")?,
            nr_lines: parse_number(&fields[4], "line count")?,
        })
    }
}

/// A parsed line of a capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureLine {
    Comment(String),
    Metrics(MetricsLine),
    Record(CaptureRecord),
}
