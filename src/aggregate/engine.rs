//! Single-pass aggregation of all capture files of a report.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use super::external_sort::{ExternalSorter, SortedKeys};
use super::objects::{ObjectCount, ObjectRollup};
use super::score::{CompatibilityScore, ScoreAccumulator, WeightTable};
use super::sort_key::{GroupOrder, SourceFileMap};
use super::summary::{StatusSection, SummaryBuilder};
use super::xref::{feature_key, object_key, XrefOptions};
use crate::capture::{
    validate_capture_files, CaptureLine, CaptureReader, CaptureRecord, MetricsLine, Status,
};
use crate::config::CompassConfig;
use crate::util::cmp_ci;

/// Settings of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub report_name: String,
    /// Target version the capture files must carry, if any
    pub expected_version: Option<String>,
    pub xref: XrefOptions,
    pub group_order: GroupOrder,
    pub weights: WeightTable,
    pub sort_buffer_bytes: usize,
}

impl AggregateOptions {
    pub fn from_config(report_name: &str, config: &CompassConfig) -> Self {
        Self {
            report_name: report_name.to_string(),
            expected_version: None,
            xref: XrefOptions {
                max_line_nrs: config.max_line_nrs_in_list,
                ..XrefOptions::default()
            },
            group_order: GroupOrder::with_overrides(&config.group_ranks),
            weights: WeightTable::with_overrides(&config.group_weights),
            sort_buffer_bytes: config.sort_buffer_bytes,
        }
    }
}

/// Input totals of one application (or of the whole report).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTotals {
    pub files: u64,
    pub batches: u64,
    pub error_batches: u64,
    pub lines: u64,
}

impl InputTotals {
    fn add(&mut self, metrics: &MetricsLine) {
        self.files += 1;
        self.batches += u64::from(metrics.nr_batches);
        self.error_batches += u64::from(metrics.nr_error_batches);
        self.lines += u64::from(metrics.nr_lines);
    }
}

/// Everything a report needs, rebuilt on every report run.
pub struct ReportAggregate {
    pub report_name: String,
    pub target_version: String,
    pub capture_files: usize,
    /// Per-application totals in case-insensitive application order
    pub apps: Vec<(String, InputTotals)>,
    pub totals: InputTotals,
    pub records: u64,
    pub status_counts: BTreeMap<Status, u64>,
    pub summary: Vec<StatusSection>,
    pub constructs: u64,
    pub score: CompatibilityScore,
    pub objects: Vec<ObjectCount>,
    pub files: SourceFileMap,
    pub feature_xref: Option<SortedKeys>,
    pub object_xref: Option<SortedKeys>,
    /// Records left out of cross-references by the item filter
    pub xref_filtered: u64,
}

/// Streaming accumulator for capture lines.
pub struct Aggregator {
    options: AggregateOptions,
    apps: HashMap<String, InputTotals>,
    records: u64,
    status_counts: BTreeMap<Status, u64>,
    summary: SummaryBuilder,
    score: ScoreAccumulator,
    objects: ObjectRollup,
    files: SourceFileMap,
    feature_sorter: Option<ExternalSorter>,
    object_sorter: Option<ExternalSorter>,
    xref_filtered: u64,
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        let budget = (options.sort_buffer_bytes / 2).max(1);
        let feature_sorter = options.xref.by_feature.then(|| ExternalSorter::new(budget));
        let object_sorter = options.xref.by_object.then(|| ExternalSorter::new(budget));
        Self {
            options,
            apps: HashMap::new(),
            records: 0,
            status_counts: BTreeMap::new(),
            summary: SummaryBuilder::new(),
            score: ScoreAccumulator::new(),
            objects: ObjectRollup::new(),
            files: SourceFileMap::new(),
            feature_sorter,
            object_sorter,
            xref_filtered: 0,
        }
    }

    pub fn add_metrics(&mut self, metrics: &MetricsLine) {
        self.apps
            .entry(metrics.app_name.clone())
            .or_default()
            .add(metrics);
    }

    pub fn add_record(&mut self, record: &CaptureRecord) -> Result<()> {
        self.records += 1;
        self.objects.add(record);

        if record.status == Status::ObjectCountOnly {
            return Ok(());
        }

        *self.status_counts.entry(record.status).or_insert(0) += 1;
        self.summary.add(
            record.status,
            &record.feature_group,
            &record.item,
            &record.app_name,
            &self.options.group_order,
        );
        self.score
            .add(&self.options.weights, record.status, &record.feature_group);

        let xref = &self.options.xref;
        if xref.enabled() && xref.includes_status(record.status) {
            let item = xref.display_item(record);
            if !xref.matches(&item) {
                self.xref_filtered += 1;
                return Ok(());
            }
            if let Some(sorter) = self.feature_sorter.as_mut() {
                sorter.push(feature_key(
                    record,
                    &item,
                    &self.options.group_order,
                    &mut self.files,
                ))?;
            }
            if let Some(sorter) = self.object_sorter.as_mut() {
                sorter.push(object_key(
                    record,
                    &item,
                    &self.options.group_order,
                    &mut self.files,
                ))?;
            }
        }
        Ok(())
    }

    pub fn finish(self, target_version: String, capture_files: usize) -> Result<ReportAggregate> {
        let mut apps: Vec<(String, InputTotals)> = self.apps.into_iter().collect();
        apps.sort_by(|a, b| cmp_ci(&a.0, &b.0));
        let mut totals = InputTotals::default();
        for (_, app) in &apps {
            totals.files += app.files;
            totals.batches += app.batches;
            totals.error_batches += app.error_batches;
            totals.lines += app.lines;
        }

        debug!(
            distinct_items = self.summary.distinct_keys(),
            records = self.records,
            "building summary"
        );

        let feature_xref = self.feature_sorter.map(ExternalSorter::finish).transpose()?;
        let object_xref = self.object_sorter.map(ExternalSorter::finish).transpose()?;

        Ok(ReportAggregate {
            report_name: self.options.report_name,
            target_version,
            capture_files,
            apps,
            totals,
            records: self.records,
            status_counts: self.status_counts,
            summary: self.summary.finish(),
            constructs: self.score.constructs(),
            score: self.score.score(),
            objects: self.objects.finish(),
            files: self.files,
            feature_xref,
            object_xref,
            xref_filtered: self.xref_filtered,
        })
    }
}

/// Validate and read all capture files, producing the report aggregate.
pub fn aggregate_captures(files: &[PathBuf], options: AggregateOptions) -> Result<ReportAggregate> {
    let target_version = validate_capture_files(
        &options.report_name,
        files,
        options.expected_version.as_deref(),
    )?;

    let mut aggregator = Aggregator::new(options);
    for file in files {
        let reader = CaptureReader::open(file)?;
        let mut records = 0u64;
        for line in reader {
            match line? {
                CaptureLine::Record(record) => {
                    aggregator.add_record(&record)?;
                    records += 1;
                }
                CaptureLine::Metrics(metrics) => aggregator.add_metrics(&metrics),
                CaptureLine::Comment(_) => {}
            }
        }
        debug!(file = %file.display(), records, "read capture file");
    }

    let aggregate = aggregator.finish(target_version, files.len())?;
    info!(
        files = aggregate.capture_files,
        records = aggregate.records,
        score = %aggregate.score,
        "aggregated capture files"
    );
    Ok(aggregate)
}
