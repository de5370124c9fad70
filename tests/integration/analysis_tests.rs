//! Integration tests for importing and analyzing input files

use pretty_assertions::assert_eq;

use tsql_compat::capture::Status;

use crate::common::{find_item, TestContext, REPORT};

const SALES: [&str; 3] = ["sales/orders.sql", "sales/functions.sql", "sales/types.sql"];

// ============================================================================
// Name resolution across batches and files
// ============================================================================

#[test]
fn test_forward_reference_resolved_in_same_run() {
    let ctx = TestContext::new();
    let summary = ctx.analyze_successfully("sales", &SALES);
    assert_eq!(summary.files, 3);
    assert_eq!(summary.error_batches, 0);

    let records = ctx.capture_records("orders.sql", "sales");
    let call = find_item(&records, "Scalar UDF call").expect("function call should be classified");
    assert_eq!(call.item_detail, "SALESDB.DBO.ORDERTOTAL");
    assert_eq!(call.context, "PROCEDURE SALESDB.DBO.LOADORDERS");

    let udd = find_item(&records, "User-defined datatype").expect("UDD column should be classified");
    assert_eq!(udd.item_detail, "SALESDB.DBO.CUSTOMERNAME (NVARCHAR(40))");
    assert_eq!(udd.context, "TABLE SALESDB.DBO.ORDERS");
}

#[test]
fn test_added_inputs_see_earlier_symbols() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/types.sql", "sales/functions.sql"]);

    let mut options = ctx.analyze_options("sales", &["sales/orders.sql"]);
    options.add = true;
    tsql_compat::analyze(options).expect("adding inputs should succeed");

    let records = ctx.capture_records("orders.sql", "sales");
    assert!(find_item(&records, "Scalar UDF call").is_some());
    assert!(find_item(&records, "User-defined datatype").is_some());
}

#[test]
fn test_existing_report_requires_add() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &["sales/types.sql"]);

    let err = tsql_compat::analyze(ctx.analyze_options("sales", &["sales/orders.sql"]))
        .expect_err("second analysis without --add should fail");
    assert!(err.to_string().contains("already exists"), "{}", err);
}

// ============================================================================
// Capture contents
// ============================================================================

#[test]
fn test_capture_records_and_statuses() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &SALES);
    let records = ctx.capture_records("orders.sql", "sales");

    let merge = find_item(&records, "MERGE").expect("MERGE should be captured");
    assert_eq!(merge.status, Status::NotSupported);
    assert_eq!(merge.batch_nr, 3);
    assert_eq!(merge.absolute_line_nr(), 13);

    let geography = find_item(&records, "GEOGRAPHY").expect("GEOGRAPHY column should be captured");
    assert_eq!(geography.status, Status::NotSupported);

    let dynamic = find_item(&records, "Dynamic SQL").expect("sp_executesql should be captured");
    assert_eq!(dynamic.status, Status::ReviewManually);
    assert_eq!(dynamic.item_detail, "sp_executesql");

    let procedure = find_item(&records, "CREATE PROCEDURE").unwrap();
    assert_eq!(procedure.misc, "10");
}

#[test]
fn test_syntax_errors_counted_per_batch() {
    let ctx = TestContext::new();
    let summary = ctx.analyze_successfully("hr", &["hr/payroll.sql"]);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.error_batches, 1);

    let records = ctx.capture_records("payroll.sql", "hr");
    let execute = find_item(&records, "EXECUTE procedure, not declared").unwrap();
    assert_eq!(execute.item_detail, ".DBO.CLOSEMONTH");
    assert_eq!(find_item(&records, "WAITFOR").unwrap().status, Status::ReviewSemantics);
    assert_eq!(find_item(&records, "GOTO").unwrap().status, Status::ReviewManually);
}

#[test]
fn test_windows_1252_input() {
    let ctx = TestContext::new();
    let path = ctx.input_dir.join("latin.sql");
    std::fs::write(&path, b"SELECT 'caf\xe9'\nGO\nMERGE INTO t USING s ON 1 = 1 WHEN MATCHED THEN DELETE;\n")
        .unwrap();

    ctx.analyze_successfully("legacy", &["latin.sql"]);
    let header = tsql_compat::list_report(&ctx.root, REPORT).unwrap().remove(0);
    assert_eq!(header.encoding, "windows-1252");
    assert_eq!(header.batches, 2);
    assert!(find_item(&ctx.capture_records("latin.sql", "legacy"), "MERGE").is_some());
}

#[test]
fn test_missing_input_is_fatal() {
    let ctx = TestContext::new();
    let err = ctx
        .analyze("sales", &["sales/missing.sql"])
        .expect_err("missing input should fail");
    assert!(err.to_string().contains("Failed to read input file"), "{}", err);
}

#[test]
fn test_symbol_tables_hold_own_declarations() {
    let ctx = TestContext::new();
    ctx.analyze_successfully("sales", &SALES);
    let layout = ctx.layout();

    let mut table = tsql_compat::symtab::SymbolTable::new();
    let count = tsql_compat::symtab::load_symbol_table(
        &mut table,
        &layout.symtab_file("types.sql", "sales"),
    )
    .unwrap();
    assert_eq!(count, 1);
    assert_eq!(layout.symtab_files().unwrap().len(), 3);
}
