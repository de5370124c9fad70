//! Cross-reference projections: by feature and by object.
//!
//! Both projections are driven from sorted key streams. Each scan merges
//! consecutive keys that share their group-defining fields into one line
//! listing all line numbers, and hands each finished line to a callback.

use anyhow::Result;
use regex::Regex;

use super::sort_key::{
    context_from_sort_field, context_sort_field, group_from_sort_field, make_key, split_key,
    status_field, status_from_field, GroupOrder, SourceFileMap,
};
use crate::capture::{CaptureRecord, Status};
use crate::error::CompassError;
use crate::names::BATCH_CONTEXT;

/// Which cross-references to build and how to render them.
#[derive(Debug, Clone)]
pub struct XrefOptions {
    pub by_feature: bool,
    pub by_object: bool,
    /// Statuses included in cross-references
    pub statuses: Vec<Status>,
    /// Show batch numbers and in-batch line numbers
    pub show_batch_nr: bool,
    /// Append item detail to the item
    pub show_detail: bool,
    pub max_line_nrs: usize,
    /// Only items matching this pattern are cross-referenced
    pub filter: Option<Regex>,
}

impl Default for XrefOptions {
    fn default() -> Self {
        Self {
            by_feature: false,
            by_object: false,
            statuses: Status::NEEDS_ATTENTION.to_vec(),
            show_batch_nr: false,
            show_detail: false,
            max_line_nrs: crate::config::DEFAULT_MAX_LINE_NRS,
            filter: None,
        }
    }
}

impl XrefOptions {
    pub fn enabled(&self) -> bool {
        self.by_feature || self.by_object
    }

    /// Compile a case-insensitive item filter.
    pub fn set_filter(&mut self, pattern: &str) -> Result<()> {
        let regex = Regex::new(&format!("(?i){}", pattern)).map_err(|e| {
            CompassError::InvalidConfig {
                message: format!("invalid filter '{}': {}", pattern, e),
            }
        })?;
        self.filter = Some(regex);
        Ok(())
    }

    pub fn includes_status(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }

    /// Whether an item passes the filter.
    pub fn matches(&self, item: &str) -> bool {
        self.filter.as_ref().map_or(true, |re| re.is_match(item))
    }

    /// Item text as shown in cross-references.
    pub fn display_item(&self, record: &CaptureRecord) -> String {
        if self.show_detail && !record.item_detail.is_empty() {
            format!("{}: {}", record.item, record.item_detail)
        } else {
            record.item.clone()
        }
    }
}

/// Render line numbers, listing at most `max` and summarizing the rest.
///
/// `[1, 2, ..., 15]` with `max = 10` gives `1, 2, 3, 4, 5, 6, 7, 8, 9, 10 (+5 more)`.
pub fn collapse_line_numbers(line_nrs: &[u32], max: usize) -> String {
    let max = max.max(1);
    let shown: Vec<String> = line_nrs.iter().take(max).map(u32::to_string).collect();
    let mut text = shown.join(", ");
    if line_nrs.len() > max {
        text.push_str(&format!(" (+{} more)", line_nrs.len() - max));
    }
    text
}

// ============================================================================
// Key construction
// ============================================================================

fn line_fields(record: &CaptureRecord) -> [String; 4] {
    [
        format!("{:08}", record.absolute_line_nr()),
        format!("{:06}", record.line_nr),
        format!("{:06}", record.batch_nr),
        format!("{:08}", record.line_nr_in_file),
    ]
}

/// Key for the by-feature projection.
pub fn feature_key(
    record: &CaptureRecord,
    item: &str,
    groups: &GroupOrder,
    files: &mut SourceFileMap,
) -> String {
    let status = status_field(record.status);
    let group = groups.sort_field(&record.feature_group);
    let file = files.key_for(&record.src_file);
    let [abs, line, batch, start] = line_fields(record);
    make_key(&[
        &status,
        &group,
        item,
        &record.app_name,
        &file,
        &abs,
        &line,
        &batch,
        &start,
        &record.context,
        &record.sub_context,
    ])
}

/// Key for the by-object projection.
pub fn object_key(
    record: &CaptureRecord,
    item: &str,
    groups: &GroupOrder,
    files: &mut SourceFileMap,
) -> String {
    let status = status_field(record.status);
    let context = context_sort_field(&record.context, BATCH_CONTEXT);
    let file = files.key_for(&record.src_file);
    // Batch-level records are kept apart per batch
    let batch_part = if record.context == BATCH_CONTEXT {
        format!("{:06}", record.batch_nr)
    } else {
        String::new()
    };
    let group = groups.sort_field(&record.feature_group);
    let [abs, line, batch, start] = line_fields(record);
    make_key(&[
        &status,
        &context,
        &record.app_name,
        &file,
        &batch_part,
        &group,
        item,
        &abs,
        &line,
        &batch,
        &start,
    ])
}

// ============================================================================
// Scans
// ============================================================================

/// One line of the by-feature cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureXrefLine {
    pub status: Status,
    pub group: String,
    pub item: String,
    pub app: String,
    pub src_file: String,
    pub context: String,
    /// Table inside the object, empty when there is none
    pub sub_context: String,
    /// Present when batch numbers are shown
    pub batch_nr: Option<u32>,
    pub line_nrs: Vec<u32>,
}

/// One line of the by-object cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectXrefLine {
    pub status: Status,
    pub context: String,
    pub app: String,
    pub src_file: String,
    /// Batch number for batch-level records
    pub batch_nr: Option<u32>,
    pub group: String,
    pub item: String,
    pub line_nrs: Vec<u32>,
}

/// Decoded line-number fields of a key.
struct LinePos {
    absolute: u32,
    in_batch: u32,
    batch_nr: u32,
}

impl LinePos {
    fn parse(fields: &[&str]) -> Option<Self> {
        Some(Self {
            absolute: fields.first()?.parse().ok()?,
            in_batch: fields.get(1)?.parse().ok()?,
            batch_nr: fields.get(2)?.parse().ok()?,
        })
    }

    fn display(&self, show_batch_nr: bool) -> u32 {
        if show_batch_nr {
            self.in_batch
        } else {
            self.absolute
        }
    }
}

fn malformed(key: &str) -> anyhow::Error {
    CompassError::SortError {
        message: format!("malformed cross-reference key '{}'", key.replace('\u{1f}', "|")),
    }
    .into()
}

fn push_line_nr(line_nrs: &mut Vec<u32>, nr: u32) {
    if line_nrs.last() != Some(&nr) {
        line_nrs.push(nr);
    }
}

/// Scan sorted by-feature keys, emitting merged lines.
pub fn scan_by_feature<I, F>(
    keys: I,
    files: &SourceFileMap,
    options: &XrefOptions,
    mut emit: F,
) -> Result<()>
where
    I: IntoIterator<Item = Result<String>>,
    F: FnMut(FeatureXrefLine) -> Result<()>,
{
    let mut current: Option<FeatureXrefLine> = None;

    for key in keys {
        let key = key?;
        let fields = split_key(&key);
        if fields.len() != 11 {
            return Err(malformed(&key));
        }
        let status = status_from_field(fields[0]).ok_or_else(|| malformed(&key))?;
        let pos = LinePos::parse(&fields[5..8]).ok_or_else(|| malformed(&key))?;
        let batch_nr = options.show_batch_nr.then_some(pos.batch_nr);
        let group = group_from_sort_field(fields[1]);
        let src_file = files.name_for(fields[4]);

        let same = current.as_ref().is_some_and(|line| {
            line.status == status
                && line.group == group
                && line.item == fields[2]
                && line.app == fields[3]
                && line.src_file == src_file
                && line.context == fields[9]
                && line.sub_context == fields[10]
                && line.batch_nr == batch_nr
        });

        if same {
            if let Some(line) = current.as_mut() {
                push_line_nr(&mut line.line_nrs, pos.display(options.show_batch_nr));
            }
            continue;
        }

        if let Some(done) = current.take() {
            emit(done)?;
        }
        current = Some(FeatureXrefLine {
            status,
            group: group.to_string(),
            item: fields[2].to_string(),
            app: fields[3].to_string(),
            src_file: src_file.to_string(),
            context: fields[9].to_string(),
            sub_context: fields[10].to_string(),
            batch_nr,
            line_nrs: vec![pos.display(options.show_batch_nr)],
        });
    }

    if let Some(done) = current {
        emit(done)?;
    }
    Ok(())
}

/// Scan sorted by-object keys, emitting merged lines.
pub fn scan_by_object<I, F>(
    keys: I,
    files: &SourceFileMap,
    options: &XrefOptions,
    mut emit: F,
) -> Result<()>
where
    I: IntoIterator<Item = Result<String>>,
    F: FnMut(ObjectXrefLine) -> Result<()>,
{
    let mut current: Option<ObjectXrefLine> = None;

    for key in keys {
        let key = key?;
        let fields = split_key(&key);
        if fields.len() != 11 {
            return Err(malformed(&key));
        }
        let status = status_from_field(fields[0]).ok_or_else(|| malformed(&key))?;
        let context = context_from_sort_field(fields[1], BATCH_CONTEXT);
        let src_file = files.name_for(fields[3]);
        let batch_nr = if fields[4].is_empty() {
            None
        } else {
            Some(fields[4].parse::<u32>().map_err(|_| malformed(&key))?)
        };
        let group = group_from_sort_field(fields[5]);
        let pos = LinePos::parse(&fields[7..10]).ok_or_else(|| malformed(&key))?;

        let same = current.as_ref().is_some_and(|line| {
            line.status == status
                && line.context == context
                && line.app == fields[2]
                && line.src_file == src_file
                && line.batch_nr == batch_nr
                && line.group == group
                && line.item == fields[6]
        });

        if same {
            if let Some(line) = current.as_mut() {
                push_line_nr(&mut line.line_nrs, pos.display(options.show_batch_nr));
            }
            continue;
        }

        if let Some(done) = current.take() {
            emit(done)?;
        }
        current = Some(ObjectXrefLine {
            status,
            context: context.to_string(),
            app: fields[2].to_string(),
            src_file: src_file.to_string(),
            batch_nr,
            group: group.to_string(),
            item: fields[6].to_string(),
            line_nrs: vec![pos.display(options.show_batch_nr)],
        });
    }

    if let Some(done) = current {
        emit(done)?;
    }
    Ok(())
}
