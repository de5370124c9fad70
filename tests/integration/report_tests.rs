//! Integration tests for report generation

use std::fs;

use crate::common::{TestContext, REPORT};

fn analyzed_context() -> TestContext {
    let ctx = TestContext::new();
    ctx.analyze_successfully(
        "sales",
        &["sales/orders.sql", "sales/functions.sql", "sales/types.sql"],
    );
    ctx.analyze_successfully("hr", &["hr/payroll.sql"]);
    ctx
}

// ============================================================================
// Report sections
// ============================================================================

#[test]
fn test_report_sections_in_order() {
    let ctx = analyzed_context();
    let report = ctx.report(&[]);

    let sections = [
        "Compatibility assessment report: assessment",
        "--- Report setup",
        "--- Applications analyzed",
        "--- Assessment summary",
        "--- Compatibility estimate",
        "--- Object count",
        "=== SQL Features Report ===",
        "--- Cross-reference by feature",
        "--- Cross-reference by object",
    ];
    let mut last = 0;
    for section in sections {
        let pos = report.text[last..]
            .find(section)
            .unwrap_or_else(|| panic!("section '{}' missing or out of order", section));
        last += pos;
    }

    assert!(report.text.contains("Estimated compatibility with target version 1.0 : "));
    assert!(report.text.contains("Applications: 2"));
    assert!(report.text.contains("Cross-reference by feature not generated."));
}

#[test]
fn test_report_file_names() {
    let ctx = analyzed_context();
    let report = ctx.report(&[]);
    let name = report.text_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("report-assessment-"), "{}", name);
    assert!(name.ends_with(".txt"));
    assert_eq!(report.html_path.with_extension("txt"), report.text_path);
    assert!(report.html.starts_with("<!DOCTYPE html>"));
    assert!(report.html.contains("<h2 id=\"cross-reference-by-feature\">"));
}

#[test]
fn test_feature_xref_lists_locations() {
    let ctx = analyzed_context();
    let report = ctx.report(&["xref=feature"]);

    assert!(report.text.contains("MERGE (DML)"));
    assert!(report
        .text
        .contains("    PROCEDURE SALESDB.DBO.LOADORDERS [app: sales, file: orders.sql] : 13"));
    assert!(report.text.contains("Cross-reference by object not generated."));
}

#[test]
fn test_object_xref_with_filter() {
    let ctx = analyzed_context();
    let report = ctx.report(&["xref=object", "filter=^merge$"]);

    assert!(report.text.contains("Filter '^merge$' applied"));
    assert!(report.text.contains("    MERGE (DML) : 13"));
    assert!(!report.text.contains("    WAITFOR (Control flow)"));
}

// ============================================================================
// Failure cases
// ============================================================================

#[test]
fn test_version_mismatch_is_fatal() {
    let ctx = TestContext::new();
    let mut options = ctx.analyze_options("sales", &["sales/types.sql"]);
    options.target_version = Some("2.0".to_string());
    tsql_compat::analyze(options).unwrap();

    let mut options = ctx.analyze_options("hr", &["hr/payroll.sql"]);
    options.add = true;
    options.target_version = Some("3.0".to_string());
    tsql_compat::analyze(options).unwrap();

    let err = tsql_compat::generate_report(ctx.report_options(&[])).expect_err("versions differ");
    assert!(err.to_string().contains("Invalid capture files"), "{}", err);
}

#[test]
fn test_requested_version_must_match() {
    let ctx = analyzed_context();
    let mut options = ctx.report_options(&[]);
    options.target_version = Some("9.9".to_string());
    assert!(tsql_compat::generate_report(options).is_err());
}

#[test]
fn test_missing_report_is_fatal() {
    let ctx = TestContext::new();
    let err = tsql_compat::generate_report(ctx.report_options(&[])).unwrap_err();
    assert!(err.to_string().contains("not found"), "{}", err);
}

#[test]
fn test_imported_but_not_analyzed() {
    let ctx = analyzed_context();
    fs::remove_dir_all(ctx.layout().captured_dir()).unwrap();

    let err = tsql_compat::generate_report(ctx.report_options(&[])).unwrap_err();
    assert!(err.to_string().contains("reanalyze"), "{}", err);

    tsql_compat::reanalyze(tsql_compat::ReanalyzeOptions {
        root: ctx.root.clone(),
        report: REPORT.to_string(),
        config_path: None,
        target_version: None,
        verbose: false,
    })
    .unwrap();
    let report = ctx.report(&["xref"]);
    assert!(report.text.contains("MERGE (DML)"));
}

#[test]
fn test_unknown_report_option_rejected() {
    let ctx = analyzed_context();
    assert!(tsql_compat::generate_report(ctx.report_options(&["sparkle"])).is_err());
}
