//! Unit tests for the reference classifier, driven through its public boundary

use pretty_assertions::assert_eq;

use tsql_compat::analyze::{
    split_batches, AnalysisScope, BatchOutcome, Classifier, EmittedConstruct, RuleClassifier,
};
use tsql_compat::capture::Status;
use tsql_compat::config::{CompassConfig, KeywordRule};
use tsql_compat::names::NameResolver;
use tsql_compat::symtab::SymbolTable;

/// Run both passes over `sql` and return what pass 2 emitted.
fn classify(sql: &str, config: &CompassConfig) -> Vec<EmittedConstruct> {
    let mut classifier = RuleClassifier::new();
    let mut resolver = NameResolver::new();
    let mut symbols = SymbolTable::new();
    let mut declared = SymbolTable::new();

    for batch in split_batches(sql) {
        resolver.clear_context();
        let mut scope = AnalysisScope::new(&mut resolver, &mut symbols, &mut declared, config);
        assert_eq!(classifier.declare(&batch, &mut scope), BatchOutcome::Ok);
    }

    resolver.set_current_database("");
    let mut emitted = Vec::new();
    for batch in split_batches(sql) {
        resolver.clear_context();
        let mut scope = AnalysisScope::new(&mut resolver, &mut symbols, &mut declared, config);
        assert_eq!(classifier.classify(&batch, &mut scope), BatchOutcome::Ok);
        emitted.extend(scope.into_emitted());
    }
    emitted
}

fn items(emitted: &[EmittedConstruct]) -> Vec<&str> {
    emitted.iter().map(|e| e.construct.item.as_str()).collect()
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_table_valued_function_call() {
    let sql = "\
CREATE FUNCTION dbo.recent_orders (@days INT)
RETURNS TABLE
AS RETURN (SELECT 1 AS x)
GO
SELECT * FROM dbo.recent_orders(7)
GO
";
    let emitted = classify(sql, &CompassConfig::default());
    assert_eq!(
        items(&emitted),
        vec!["INT", "CREATE FUNCTION, table-valued", "Table-valued UDF call"]
    );
    let call = &emitted[2];
    assert_eq!(call.construct.item_detail, ".DBO.RECENT_ORDERS");
    assert_eq!(call.construct.status, Status::Supported);
    assert_eq!(call.construct.line_nr, 1);
}

#[test]
fn test_multi_statement_function_return_table() {
    let sql = "\
CREATE FUNCTION dbo.split (@list VARCHAR(100))
RETURNS @result TABLE (item SQL_VARIANT)
AS
BEGIN
    RETURN
END
";
    let emitted = classify(sql, &CompassConfig::default());
    let variant = emitted
        .iter()
        .find(|e| e.construct.item == "SQL_VARIANT")
        .expect("return table column should be classified");
    assert_eq!(variant.construct.status, Status::ReviewSemantics);
    assert_eq!(variant.context, "FUNCTION .DBO.SPLIT");
    assert_eq!(variant.sub_context, "TABLE .DBO.@RESULT");
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_execute_with_return_code() {
    let sql = "\
CREATE PROCEDURE dbo.archive AS SELECT 1
GO
DECLARE @rc INT
EXEC @rc = dbo.archive
EXEC (@sql)
";
    let emitted = classify(sql, &CompassConfig::default());
    let execs: Vec<(&str, &str)> = emitted
        .iter()
        .filter(|e| e.construct.item != "CREATE PROCEDURE")
        .map(|e| (e.construct.item.as_str(), e.construct.item_detail.as_str()))
        .collect();
    assert_eq!(
        execs,
        vec![
            ("EXECUTE procedure", ".DBO.ARCHIVE"),
            ("Dynamic SQL", "EXECUTE(string)"),
        ]
    );
}

#[test]
fn test_clustered_index() {
    let sql = "CREATE UNIQUE CLUSTERED INDEX ix_orders ON dbo.orders (id)\n";
    let emitted = classify(sql, &CompassConfig::default());
    assert_eq!(items(&emitted), vec!["CREATE INDEX, CLUSTERED"]);
    assert_eq!(emitted[0].construct.item_detail, "ix_orders");
}

#[test]
fn test_configured_keyword_rule() {
    let mut config = CompassConfig::default();
    config.set_keyword_rule(KeywordRule {
        word: "BULK".to_string(),
        item: "BULK INSERT".to_string(),
        group: "Bulk load".to_string(),
        status: Status::NotSupported,
    });

    let emitted = classify("SELECT 1\nBULK INSERT t FROM 'x.csv'\n", &config);
    assert_eq!(items(&emitted), vec!["BULK INSERT"]);
    assert_eq!(emitted[0].construct.feature_group, "Bulk load");
    assert_eq!(emitted[0].construct.line_nr, 2);
    assert_eq!(emitted[0].context, "T-SQL batch");
}

#[test]
fn test_delimited_keyword_is_not_a_rule() {
    let emitted = classify("SELECT [merge] FROM t\n", &CompassConfig::default());
    assert!(emitted.is_empty());
}
