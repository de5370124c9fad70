//! Integration tests for export, listing, re-analysis and deletion of reports

use std::fs;

use pretty_assertions::assert_eq;

use crate::common::{read_records, TestContext, REPORT};

#[test]
fn test_export_prefixes_version_and_drops_trailing_columns() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/orders.sql", "sales/types.sql"]);

    let (path, count) = tsql_compat::export_captures(&ctx.root, REPORT).unwrap();
    assert_eq!(path, ctx.layout().export_file());

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len() as u64, count);
    assert!(count > 0);
    for line in &lines {
        assert!(line.starts_with("1.0;"), "{}", line);
        // version, timestamp and ten record columns
        assert_eq!(line.split(';').count(), 12, "{}", line);
    }
    assert!(lines.iter().any(|l| l.contains(";MERGE;")));

    // The export file is not mistaken for a capture file
    assert_eq!(ctx.layout().capture_files().unwrap().len(), 2);
}

#[test]
fn test_list_sorted_by_application() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/types.sql"]);
    ctx.analyze_successfully("HR", &["hr/payroll.sql"]);

    let inputs = tsql_compat::list_report(&ctx.root, REPORT).unwrap();
    let apps: Vec<&str> = inputs.iter().map(|h| h.app.as_str()).collect();
    assert_eq!(apps, vec!["HR", "sales"]);
    assert_eq!(inputs[0].src_file(), "payroll.sql");
    assert_eq!(inputs[0].encoding, "UTF-8");
    assert_eq!(inputs[0].lines, 12);
}

#[test]
fn test_reanalyze_rebuilds_captures() {
    let ctx = TestContext::new();
    ctx.analyze_successfully(
        "sales",
        &["sales/orders.sql", "sales/functions.sql", "sales/types.sql"],
    );
    let before = ctx.capture_records("orders.sql", "sales");

    // Imported copies are the source of truth from here on
    fs::remove_dir_all(&ctx.input_dir).unwrap();
    let summary = tsql_compat::reanalyze(tsql_compat::ReanalyzeOptions {
        root: ctx.root.clone(),
        report: REPORT.to_string(),
        config_path: None,
        target_version: None,
        verbose: false,
    })
    .unwrap();

    assert_eq!(summary.files, 3);
    let after = read_records(&ctx.layout().capture_file("orders.sql", "sales"));
    assert_eq!(before, after);
    assert_eq!(ctx.layout().symtab_files().unwrap().len(), 3);
}

#[test]
fn test_replace_reimports_input() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/types.sql"]);

    fs::write(ctx.input("sales/types.sql"), "MERGE INTO t USING s ON 1 = 1 WHEN MATCHED THEN DELETE;\n").unwrap();
    let mut options = ctx.analyze_options("sales", &["sales/types.sql"]);
    options.add = true;
    assert!(tsql_compat::analyze(options.clone()).is_err());

    options.replace = true;
    tsql_compat::analyze(options).unwrap();
    let records = ctx.capture_records("types.sql", "sales");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].item, "MERGE");
}

#[test]
fn test_delete_report() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/types.sql"]);
    assert!(ctx.layout().exists());

    tsql_compat::delete_report(&ctx.root, REPORT).unwrap();
    assert!(!ctx.layout().exists());
    assert!(tsql_compat::delete_report(&ctx.root, REPORT).is_err());
    assert!(tsql_compat::list_report(&ctx.root, REPORT).is_err());
}
