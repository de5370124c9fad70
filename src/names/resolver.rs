//! Multi-part name resolution against the ambient analysis context.

use super::normalizer::{NormalizeOptions, Normalizer};

/// Context label used outside any object definition.
pub const BATCH_CONTEXT: &str = "T-SQL batch";

/// Default schema for names without one.
pub const DEFAULT_SCHEMA: &str = "DBO";

/// The object whose body is currently being analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContext {
    /// Object kind, e.g. `PROCEDURE`
    pub object_type: String,
    /// Resolved object name
    pub name: String,
}

impl ObjectContext {
    /// Label written to the `context` column of capture records.
    pub fn label(&self) -> String {
        format!("{} {}", self.object_type, self.name)
    }
}

/// Resolves partially-qualified names to canonical `[server.]db.schema.object` keys.
#[derive(Debug, Default)]
pub struct NameResolver {
    normalizer: Normalizer,
    current_database: String,
    context: Option<ObjectContext>,
    sub_context: Option<ObjectContext>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalizer(&mut self) -> &mut Normalizer {
        &mut self.normalizer
    }

    // ========================================================================
    // Ambient context
    // ========================================================================

    /// Apply a `USE <db>` statement.
    pub fn set_current_database(&mut self, database: &str) {
        self.current_database = self
            .normalizer
            .normalize(database, NormalizeOptions::default())
            .to_uppercase();
    }

    pub fn current_database(&self) -> &str {
        &self.current_database
    }

    /// Enter the body of an object definition.
    ///
    /// A TABLE opened while another object is active (e.g. a table variable
    /// or table-valued return inside a function) becomes the sub-context
    /// instead of replacing the enclosing object.
    pub fn set_context(&mut self, object_type: &str, name: &str) {
        let object_type = object_type.to_uppercase();
        if object_type == "TABLE" && self.context.is_some() {
            let name = self.resolve_name(name);
            self.sub_context = Some(ObjectContext { object_type, name });
            return;
        }
        // Resolve against the enclosing batch, not a previous object
        self.context = None;
        self.sub_context = None;
        let name = self.resolve_name(name);
        self.context = Some(ObjectContext { object_type, name });
    }

    /// Leave any object definition; subsequent records belong to the batch.
    pub fn clear_context(&mut self) {
        self.context = None;
        self.sub_context = None;
    }

    pub fn reset_sub_context(&mut self) {
        self.sub_context = None;
    }

    pub fn context(&self) -> Option<&ObjectContext> {
        self.context.as_ref()
    }

    /// Label of the current context, or [`BATCH_CONTEXT`].
    pub fn context_label(&self) -> String {
        self.context
            .as_ref()
            .map(ObjectContext::label)
            .unwrap_or_else(|| BATCH_CONTEXT.to_string())
    }

    /// Label of the current sub-context, empty when there is none.
    pub fn sub_context_label(&self) -> String {
        self.sub_context
            .as_ref()
            .map(ObjectContext::label)
            .unwrap_or_default()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a name to its fully-qualified uppercase form.
    ///
    /// Temp names (leading `#`) are only normalized and uppercased. For other names a
    /// missing schema is taken from the enclosing object, else `DBO`, and a
    /// missing database is the current database, which may be empty.
    /// Resolving an already-resolved name returns it unchanged.
    pub fn resolve_name(&mut self, name: &str) -> String {
        let upper = self
            .normalizer
            .normalize(name, NormalizeOptions::default())
            .to_uppercase();
        if upper.starts_with('#') || upper.is_empty() {
            return upper;
        }

        let mut parts: Vec<&str> = upper.split('.').collect();
        if parts.len() > 4 {
            return upper;
        }
        while parts.len() < 3 {
            parts.insert(0, "");
        }

        let n = parts.len();
        let schema = if parts[n - 2].is_empty() {
            self.context_schema()
        } else {
            parts[n - 2].to_string()
        };
        let database = if parts[n - 3].is_empty() {
            self.current_database.clone()
        } else {
            parts[n - 3].to_string()
        };

        let mut resolved = String::with_capacity(upper.len() + database.len() + schema.len() + 2);
        if n == 4 {
            resolved.push_str(parts[0]);
            resolved.push('.');
        }
        resolved.push_str(&database);
        resolved.push('.');
        resolved.push_str(&schema);
        resolved.push('.');
        resolved.push_str(parts[n - 1]);
        resolved
    }

    /// Normalize and uppercase a datatype name.
    pub fn normalize_datatype(&mut self, name: &str) -> String {
        self.normalizer
            .normalize(name, NormalizeOptions::DATATYPE)
            .to_uppercase()
    }

    fn context_schema(&self) -> String {
        self.context
            .as_ref()
            .map(|ctx| schema_part(&ctx.name))
            .filter(|schema| !schema.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string())
    }
}

// ============================================================================
// Part extraction
// ============================================================================

fn part_from_right(name: &str, index: usize) -> &str {
    name.rsplit('.').nth(index).unwrap_or("")
}

/// Object part of a dotted name.
pub fn object_part(name: &str) -> &str {
    part_from_right(name, 0)
}

/// Schema part of a dotted name, empty if absent.
pub fn schema_part(name: &str) -> &str {
    part_from_right(name, 1)
}

/// Database part of a dotted name, empty if absent.
pub fn database_part(name: &str) -> &str {
    part_from_right(name, 2)
}

/// Server part of a dotted name, empty if absent.
pub fn server_part(name: &str) -> &str {
    part_from_right(name, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_current_database() {
        let mut resolver = NameResolver::new();
        resolver.set_current_database("DB1");
        assert_eq!(resolver.resolve_name("tbl"), "DB1.DBO.TBL");
        assert_eq!(resolver.resolve_name("sales.tbl"), "DB1.SALES.TBL");
        assert_eq!(resolver.resolve_name("db2..tbl"), "DB2.DBO.TBL");
        assert_eq!(resolver.resolve_name("srv.db2.s.tbl"), "SRV.DB2.S.TBL");
    }

    #[test]
    fn test_resolve_without_current_database() {
        let mut resolver = NameResolver::new();
        assert_eq!(resolver.resolve_name("t"), ".DBO.T");
    }

    #[test]
    fn test_temp_names_not_qualified() {
        let mut resolver = NameResolver::new();
        resolver.set_current_database("db1");
        resolver.set_context("PROCEDURE", "sales.p1");
        assert_eq!(resolver.resolve_name("#t"), "#T");
        assert_eq!(resolver.resolve_name("dbo.#t"), "#T");
        assert_eq!(resolver.resolve_name("#Work"), resolver.resolve_name("#WORK"));
    }

    #[test]
    fn test_schema_from_object_context() {
        let mut resolver = NameResolver::new();
        resolver.set_current_database("db1");
        resolver.set_context("PROCEDURE", "sales.p1");
        assert_eq!(resolver.context_label(), "PROCEDURE DB1.SALES.P1");
        assert_eq!(resolver.resolve_name("t"), "DB1.SALES.T");
        resolver.clear_context();
        assert_eq!(resolver.context_label(), BATCH_CONTEXT);
        assert_eq!(resolver.resolve_name("t"), "DB1.DBO.T");
    }

    #[test]
    fn test_table_inside_object_is_sub_context() {
        let mut resolver = NameResolver::new();
        resolver.set_context("FUNCTION", "f1");
        resolver.set_context("TABLE", "@result");
        assert_eq!(resolver.context_label(), "FUNCTION .DBO.F1");
        assert_eq!(resolver.sub_context_label(), "TABLE .DBO.@RESULT");
        resolver.reset_sub_context();
        assert_eq!(resolver.sub_context_label(), "");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut resolver = NameResolver::new();
        resolver.set_current_database("db1");
        for name in ["t", "[s].[t]", "db2..t", "#t", "[a.b].t"] {
            let once = resolver.resolve_name(name);
            assert_eq!(resolver.resolve_name(&once), once, "name {:?}", name);
        }
    }

    #[test]
    fn test_part_extraction() {
        assert_eq!(object_part("SRV.DB.S.T"), "T");
        assert_eq!(schema_part("SRV.DB.S.T"), "S");
        assert_eq!(database_part("SRV.DB.S.T"), "DB");
        assert_eq!(server_part("SRV.DB.S.T"), "SRV");
        assert_eq!(schema_part("T"), "");
    }
}
