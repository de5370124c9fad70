//! Unit tests for symbol declarations and their persistence per input

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tsql_compat::analyze::AnalysisScope;
use tsql_compat::config::CompassConfig;
use tsql_compat::names::NameResolver;
use tsql_compat::symtab::{load_symbol_table, save_symbol_table, SymbolFileHeader, SymbolTable};

#[test]
fn test_scope_records_only_persistent_declarations() {
    let config = CompassConfig::default();
    let mut resolver = NameResolver::new();
    resolver.set_current_database("sales");
    let mut symbols = SymbolTable::new();
    let mut declared = SymbolTable::new();

    {
        let mut scope = AnalysisScope::new(&mut resolver, &mut symbols, &mut declared, &config);
        scope.declare_object("dbo.orders", "TABLE");
        scope.declare_column("dbo.orders", "id", "INT", false);
        scope.declare_object("#staging", "TABLE");
        scope.declare_scalar_function("dbo.total", "MONEY");
        // Temp names are case-insensitive like any other name
        assert_eq!(scope.object_type("#STAGING").as_deref(), Some("TABLE"));
    }

    assert_eq!(symbols.len(), 4);
    assert_eq!(declared.len(), 3);
    assert_eq!(
        declared.object_type(&mut resolver, "sales.dbo.orders"),
        Some("TABLE")
    );
    let column = declared.column(&mut resolver, "orders", "ID").unwrap();
    assert_eq!(column.data_type, "INT");
    assert!(!column.nullable);
}

#[test]
fn test_persisted_tables_merge_across_inputs() {
    let dir = TempDir::new().unwrap();
    let mut resolver = NameResolver::new();
    resolver.set_current_database("sales");

    let mut first = SymbolTable::new();
    first.add_user_datatype(&mut resolver, "dbo.phone", "varchar(20)");
    let mut second = SymbolTable::new();
    second.add_table_function(&mut resolver, "dbo.recent");

    let paths = [dir.path().join("a.symtab.app.dat"), dir.path().join("b.symtab.app.dat")];
    for (table, path) in [(&first, &paths[0]), (&second, &paths[1])] {
        let header = SymbolFileHeader {
            report: "r1",
            app: "app",
            input: "in.sql",
        };
        save_symbol_table(table, path, &header).unwrap();
    }

    let mut merged = SymbolTable::new();
    for path in &paths {
        load_symbol_table(&mut merged, path).unwrap();
    }
    assert_eq!(merged.len(), 2);

    // Lookups resolve against whatever database is current at use time
    let mut other = NameResolver::new();
    other.set_current_database("sales");
    assert_eq!(merged.is_udd(&mut other, "phone"), Some("VARCHAR(20)"));
    assert!(merged.is_table_function(&mut other, "[dbo].[recent]"));
    other.set_current_database("hr");
    assert_eq!(merged.is_udd(&mut other, "phone"), None);
}
