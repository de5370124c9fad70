//! In-memory symbol table of declared objects.

use std::collections::BTreeMap;

use crate::names::NameResolver;

/// Marker stored as the "type" of table-valued functions.
pub const TABLE_FUNCTION_MARKER: &str = "TABLE";

/// Declared type and nullability of a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub data_type: String,
    pub nullable: bool,
}

/// One symbol table entry, as persisted.
///
/// Names are stored in their resolved, canonical form. Column keys are
/// `<resolved table>.<COLUMN>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolEntry {
    ObjectType { name: String, object_type: String },
    ScalarFunction { name: String, return_type: String },
    TableFunction { name: String },
    UserDatatype { name: String, base_type: String },
    Column { key: String, info: ColumnInfo },
}

impl SymbolEntry {
    /// Record tag used in symbol table files.
    pub fn tag(&self) -> &'static str {
        match self {
            SymbolEntry::ObjectType { .. } => "objtype",
            SymbolEntry::ScalarFunction { .. } => "sudf",
            SymbolEntry::TableFunction { .. } => "tudf",
            SymbolEntry::UserDatatype { .. } => "udd",
            SymbolEntry::Column { .. } => "col",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            SymbolEntry::ObjectType { name, .. }
            | SymbolEntry::ScalarFunction { name, .. }
            | SymbolEntry::TableFunction { name }
            | SymbolEntry::UserDatatype { name, .. } => name,
            SymbolEntry::Column { key, .. } => key,
        }
    }
}

/// Five keyed maps of declared objects, merged across analysis runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    object_types: BTreeMap<String, String>,
    scalar_functions: BTreeMap<String, String>,
    table_functions: BTreeMap<String, String>,
    user_datatypes: BTreeMap<String, String>,
    columns: BTreeMap<String, ColumnInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.object_types.len()
            + self.scalar_functions.len()
            + self.table_functions.len()
            + self.user_datatypes.len()
            + self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Live declarations (inputs are resolved/normalized)
    // ========================================================================

    pub fn add_object(
        &mut self,
        resolver: &mut NameResolver,
        name: &str,
        object_type: &str,
    ) -> SymbolEntry {
        self.insert_stored(SymbolEntry::ObjectType {
            name: resolver.resolve_name(name),
            object_type: object_type.to_uppercase(),
        })
    }

    pub fn add_scalar_function(
        &mut self,
        resolver: &mut NameResolver,
        name: &str,
        return_type: &str,
    ) -> SymbolEntry {
        self.insert_stored(SymbolEntry::ScalarFunction {
            name: resolver.resolve_name(name),
            return_type: resolver.normalize_datatype(return_type),
        })
    }

    pub fn add_table_function(&mut self, resolver: &mut NameResolver, name: &str) -> SymbolEntry {
        self.insert_stored(SymbolEntry::TableFunction {
            name: resolver.resolve_name(name),
        })
    }

    pub fn add_user_datatype(
        &mut self,
        resolver: &mut NameResolver,
        name: &str,
        base_type: &str,
    ) -> SymbolEntry {
        self.insert_stored(SymbolEntry::UserDatatype {
            name: resolver.resolve_name(name),
            base_type: resolver.normalize_datatype(base_type),
        })
    }

    pub fn add_column(
        &mut self,
        resolver: &mut NameResolver,
        table: &str,
        column: &str,
        data_type: &str,
        nullable: bool,
    ) -> SymbolEntry {
        let key = column_key(resolver, table, column);
        self.insert_stored(SymbolEntry::Column {
            key,
            info: ColumnInfo {
                data_type: resolver.normalize_datatype(data_type),
                nullable,
            },
        })
    }

    /// Store an entry verbatim, replacing any previous entry with the same key.
    ///
    /// Returns the stored entry.
    pub fn insert_stored(&mut self, entry: SymbolEntry) -> SymbolEntry {
        match &entry {
            SymbolEntry::ObjectType { name, object_type } => {
                self.object_types.insert(name.clone(), object_type.clone());
            }
            SymbolEntry::ScalarFunction { name, return_type } => {
                self.scalar_functions
                    .insert(name.clone(), return_type.clone());
            }
            SymbolEntry::TableFunction { name } => {
                self.table_functions
                    .insert(name.clone(), TABLE_FUNCTION_MARKER.to_string());
            }
            SymbolEntry::UserDatatype { name, base_type } => {
                self.user_datatypes.insert(name.clone(), base_type.clone());
            }
            SymbolEntry::Column { key, info } => {
                self.columns.insert(key.clone(), info.clone());
            }
        }
        entry
    }

    /// Merge all entries of `other` into this table.
    pub fn merge(&mut self, other: &SymbolTable) {
        for entry in other.entries() {
            self.insert_stored(entry);
        }
    }

    // ========================================================================
    // Lookups (names are resolved before lookup)
    // ========================================================================

    pub fn object_type(&self, resolver: &mut NameResolver, name: &str) -> Option<&str> {
        let key = resolver.resolve_name(name);
        self.object_types.get(&key).map(String::as_str)
    }

    pub fn scalar_function_type(&self, resolver: &mut NameResolver, name: &str) -> Option<&str> {
        let key = resolver.resolve_name(name);
        self.scalar_functions.get(&key).map(String::as_str)
    }

    pub fn is_table_function(&self, resolver: &mut NameResolver, name: &str) -> bool {
        let key = resolver.resolve_name(name);
        self.table_functions.contains_key(&key)
    }

    /// Base type of a user-defined datatype, or `None` if `name` is not one.
    pub fn is_udd(&self, resolver: &mut NameResolver, name: &str) -> Option<&str> {
        let key = resolver.resolve_name(name);
        self.user_datatypes.get(&key).map(String::as_str)
    }

    pub fn column(
        &self,
        resolver: &mut NameResolver,
        table: &str,
        column: &str,
    ) -> Option<&ColumnInfo> {
        let key = column_key(resolver, table, column);
        self.columns.get(&key)
    }

    /// All entries, grouped by kind and ordered by key within each kind.
    pub fn entries(&self) -> impl Iterator<Item = SymbolEntry> + '_ {
        let objects = self
            .object_types
            .iter()
            .map(|(name, object_type)| SymbolEntry::ObjectType {
                name: name.clone(),
                object_type: object_type.clone(),
            });
        let scalars = self
            .scalar_functions
            .iter()
            .map(|(name, return_type)| SymbolEntry::ScalarFunction {
                name: name.clone(),
                return_type: return_type.clone(),
            });
        let tables = self
            .table_functions
            .keys()
            .map(|name| SymbolEntry::TableFunction { name: name.clone() });
        let udds = self
            .user_datatypes
            .iter()
            .map(|(name, base_type)| SymbolEntry::UserDatatype {
                name: name.clone(),
                base_type: base_type.clone(),
            });
        let columns = self.columns.iter().map(|(key, info)| SymbolEntry::Column {
            key: key.clone(),
            info: info.clone(),
        });
        objects.chain(scalars).chain(tables).chain(udds).chain(columns)
    }
}

fn column_key(resolver: &mut NameResolver, table: &str, column: &str) -> String {
    let table = resolver.resolve_name(table);
    let column = resolver
        .normalizer()
        .normalize(column, Default::default())
        .to_uppercase();
    format!("{}.{}", table, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        let mut resolver = NameResolver::new();
        resolver.set_current_database("db1");
        resolver
    }

    #[test]
    fn test_lookup_resolves_names() {
        let mut resolver = resolver();
        let mut table = SymbolTable::new();
        table.add_object(&mut resolver, "[dbo].[Orders]", "table");
        assert_eq!(table.object_type(&mut resolver, "orders"), Some("TABLE"));
        assert_eq!(table.object_type(&mut resolver, "db1.dbo.ORDERS"), Some("TABLE"));
        assert_eq!(table.object_type(&mut resolver, "sales.orders"), None);
    }

    #[test]
    fn test_udd_lookup() {
        let mut resolver = resolver();
        let mut table = SymbolTable::new();
        table.add_user_datatype(&mut resolver, "Phone", "sys.varchar(020)");
        assert_eq!(table.is_udd(&mut resolver, "dbo.phone"), Some("VARCHAR(20)"));
        assert_eq!(table.is_udd(&mut resolver, "varchar"), None);
    }

    #[test]
    fn test_columns_and_functions() {
        let mut resolver = resolver();
        let mut table = SymbolTable::new();
        table.add_column(&mut resolver, "t1", "[Id]", "int", false);
        table.add_scalar_function(&mut resolver, "f_total", "money");
        table.add_table_function(&mut resolver, "tf_items");

        let col = table.column(&mut resolver, "dbo.t1", "id").cloned();
        assert_eq!(
            col,
            Some(ColumnInfo {
                data_type: "INT".to_string(),
                nullable: false
            })
        );
        assert_eq!(table.scalar_function_type(&mut resolver, "F_TOTAL"), Some("MONEY"));
        assert!(table.is_table_function(&mut resolver, "tf_items"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_merge_and_entries() {
        let mut resolver = resolver();
        let mut a = SymbolTable::new();
        a.add_object(&mut resolver, "p1", "procedure");
        let mut b = SymbolTable::new();
        b.add_object(&mut resolver, "v1", "view");
        b.merge(&a);
        let keys: Vec<String> = b.entries().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["DB1.DBO.P1", "DB1.DBO.V1"]);
    }
}
