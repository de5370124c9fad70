//! Unit tests for aggregation over capture files

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tsql_compat::aggregate::{
    aggregate_captures, scan_by_feature, AggregateOptions, CompatibilityScore,
};
use tsql_compat::capture::{CaptureRecord, CaptureWriter, MetricsLine, Status};
use tsql_compat::config::CompassConfig;

fn record(item: &str, group: &str, status: Status, app: &str, src_file: &str, line_nr: u32) -> CaptureRecord {
    CaptureRecord {
        item: item.to_string(),
        item_detail: String::new(),
        feature_group: group.to_string(),
        status,
        line_nr,
        app_name: app.to_string(),
        src_file: src_file.to_string(),
        batch_nr: 1,
        line_nr_in_file: 1,
        context: "PROCEDURE DB.DBO.LOAD".to_string(),
        sub_context: String::new(),
        misc: String::new(),
    }
}

fn write_capture(dir: &Path, src_file: &str, app: &str, version: &str, records: &[CaptureRecord]) -> PathBuf {
    let path = dir.join(format!("captured.{}.{}.dat", src_file, app));
    let mut writer = CaptureWriter::create(&path, "r1", version).unwrap();
    for record in records {
        writer.append(record).unwrap();
    }
    writer
        .write_metrics(&MetricsLine {
            src_file: src_file.to_string(),
            app_name: app.to_string(),
            nr_batches: 2,
            nr_error_batches: 0,
            nr_lines: 40,
        })
        .unwrap();
    writer.finish().unwrap();
    path
}

/// billing: 2 MERGE, 7 INT, 1 NOLOCK; crm: 1 MERGE, 4 INT
fn two_app_captures(dir: &Path, version_b: &str) -> Vec<PathBuf> {
    let mut a = Vec::new();
    for line in 1..=2 {
        a.push(record("MERGE", "DML", Status::NotSupported, "billing", "a.sql", line));
    }
    for line in 1..=7 {
        a.push(record("INT", "Datatypes", Status::Supported, "billing", "a.sql", line));
    }
    a.push(record("NOLOCK hint", "Query hints", Status::Ignored, "billing", "a.sql", 3));

    let mut b = vec![record("MERGE", "DML", Status::NotSupported, "crm", "b.sql", 9)];
    for line in 1..=4 {
        b.push(record("INT", "Datatypes", Status::Supported, "crm", "b.sql", line));
    }

    vec![
        write_capture(dir, "a.sql", "billing", "1.0", &a),
        write_capture(dir, "b.sql", "crm", version_b, &b),
    ]
}

#[test]
fn test_summary_counts_and_score() {
    let dir = TempDir::new().unwrap();
    let files = two_app_captures(dir.path(), "1.0");
    let options = AggregateOptions::from_config("r1", &CompassConfig::default());

    let aggregate = aggregate_captures(&files, options).unwrap();
    assert_eq!(aggregate.target_version, "1.0");
    assert_eq!(aggregate.records, 15);
    assert_eq!(aggregate.constructs, 15);
    // (1500 - 3 * 200) * 100 / 1500
    assert_eq!(aggregate.score, CompatibilityScore::Percent { value: 60, raw: 60 });

    let apps: Vec<&str> = aggregate.apps.iter().map(|(app, _)| app.as_str()).collect();
    assert_eq!(apps, vec!["billing", "crm"]);
    assert_eq!(aggregate.totals.files, 2);
    assert_eq!(aggregate.totals.lines, 80);

    let statuses: Vec<Status> = aggregate.summary.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![Status::NotSupported, Status::Ignored, Status::Supported]
    );
    let merge = &aggregate.summary[0].groups[0].items[0];
    assert_eq!(merge.item, "MERGE");
    assert_eq!(merge.count, 3);
    assert_eq!(
        merge.app_counts,
        vec![("billing".to_string(), 2), ("crm".to_string(), 1)]
    );

    let total: u64 = aggregate.summary.iter().map(|s| s.total).sum();
    assert_eq!(total, aggregate.records);
    assert!(aggregate.feature_xref.is_none());
}

#[test]
fn test_version_conflict_rejected() {
    let dir = TempDir::new().unwrap();
    let files = two_app_captures(dir.path(), "2.0");
    let options = AggregateOptions::from_config("r1", &CompassConfig::default());
    let err = aggregate_captures(&files, options).err().expect("versions differ");
    assert!(err.to_string().contains("Invalid capture files"));
}

#[test]
fn test_expected_version_checked() {
    let dir = TempDir::new().unwrap();
    let files = two_app_captures(dir.path(), "1.0");
    let mut options = AggregateOptions::from_config("r1", &CompassConfig::default());
    options.expected_version = Some("1.1".to_string());
    assert!(aggregate_captures(&files, options).is_err());
}

#[test]
fn test_feature_xref_with_spilled_sort() {
    let dir = TempDir::new().unwrap();
    let files = two_app_captures(dir.path(), "1.0");
    let mut options = AggregateOptions::from_config("r1", &CompassConfig::default());
    options.xref.by_feature = true;
    // Force the sorter to spill runs to disk
    options.sort_buffer_bytes = 64;

    let mut aggregate = aggregate_captures(&files, options.clone()).unwrap();
    let keys = aggregate.feature_xref.take().expect("feature xref requested");

    let mut lines = Vec::new();
    scan_by_feature(keys, &aggregate.files, &options.xref, |line| {
        lines.push((line.item, line.app, line.line_nrs));
        Ok(())
    })
    .unwrap();

    assert_eq!(
        lines,
        vec![
            ("MERGE".to_string(), "billing".to_string(), vec![1, 2]),
            ("MERGE".to_string(), "crm".to_string(), vec![9]),
        ]
    );
}
