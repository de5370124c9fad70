//! The classifier boundary and the token-based reference classifier.
//!
//! A [`Classifier`] sees every batch twice. `declare` (pass 1) records the
//! objects a batch creates in the symbol table; `classify` (pass 2) emits a
//! [`Construct`] for every recognized language construct, using the symbol
//! table completed by pass 1 over the whole input. This is what resolves a
//! call to a function that is only created in a later batch.

use sqlparser::tokenizer::Token;

use super::batch::Batch;
use super::token_cursor::{format_word, TokenCursor};
use crate::capture::Status;
use crate::config::CompassConfig;
use crate::names::{object_part, NameResolver};
use crate::symtab::{ColumnInfo, SymbolEntry, SymbolTable};

pub const GROUP_TABLES: &str = "Tables";
pub const GROUP_VIEWS: &str = "Views";
pub const GROUP_PROCEDURES: &str = "Procedures";
pub const GROUP_FUNCTIONS: &str = "Functions";
pub const GROUP_TRIGGERS: &str = "Triggers";
pub const GROUP_INDEXES: &str = "Indexes";
pub const GROUP_DATATYPES: &str = "Datatypes";
pub const GROUP_UDD: &str = "User-Defined Datatypes";
pub const GROUP_DYNAMIC_SQL: &str = "Dynamic SQL";

/// One classified construct occurrence, before it is placed in a file and batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construct {
    pub item: String,
    pub item_detail: String,
    pub feature_group: String,
    pub status: Status,
    /// 1-based line within the batch
    pub line_nr: u32,
    pub misc: String,
}

impl Construct {
    pub fn new(item: impl Into<String>, group: &str, status: Status, line_nr: u32) -> Self {
        Self {
            item: item.into(),
            item_detail: String::new(),
            feature_group: group.to_string(),
            status,
            line_nr,
            misc: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.item_detail = detail.into();
        self
    }

    pub fn with_misc(mut self, misc: impl Into<String>) -> Self {
        self.misc = misc.into();
        self
    }
}

/// A construct together with the object context it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedConstruct {
    pub construct: Construct,
    pub context: String,
    pub sub_context: String,
}

/// Result of looking at one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Ok,
    SyntaxError(String),
}

/// What a classifier can see and change while it handles a batch.
pub struct AnalysisScope<'a> {
    resolver: &'a mut NameResolver,
    symbols: &'a mut SymbolTable,
    /// Declarations made by the current input, persisted with it
    declared: &'a mut SymbolTable,
    config: &'a CompassConfig,
    emitted: Vec<EmittedConstruct>,
}

impl<'a> AnalysisScope<'a> {
    pub fn new(
        resolver: &'a mut NameResolver,
        symbols: &'a mut SymbolTable,
        declared: &'a mut SymbolTable,
        config: &'a CompassConfig,
    ) -> Self {
        Self {
            resolver,
            symbols,
            declared,
            config,
            emitted: Vec::new(),
        }
    }

    pub fn resolver(&mut self) -> &mut NameResolver {
        &mut *self.resolver
    }

    pub fn symbols(&self) -> &SymbolTable {
        &*self.symbols
    }

    pub fn config(&self) -> &CompassConfig {
        self.config
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn declare_object(&mut self, name: &str, object_type: &str) {
        let entry = self.symbols.add_object(self.resolver, name, object_type);
        self.remember(entry);
    }

    pub fn declare_scalar_function(&mut self, name: &str, return_type: &str) {
        let entry = self
            .symbols
            .add_scalar_function(self.resolver, name, return_type);
        self.remember(entry);
    }

    pub fn declare_table_function(&mut self, name: &str) {
        let entry = self.symbols.add_table_function(self.resolver, name);
        self.remember(entry);
    }

    pub fn declare_user_datatype(&mut self, name: &str, base_type: &str) {
        let entry = self
            .symbols
            .add_user_datatype(self.resolver, name, base_type);
        self.remember(entry);
    }

    pub fn declare_column(&mut self, table: &str, column: &str, data_type: &str, nullable: bool) {
        let entry = self
            .symbols
            .add_column(self.resolver, table, column, data_type, nullable);
        self.remember(entry);
    }

    /// Session-temporary names stay out of the persisted declarations.
    fn remember(&mut self, entry: SymbolEntry) {
        if !entry.key().starts_with('#') {
            self.declared.insert_stored(entry);
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn object_type(&mut self, name: &str) -> Option<String> {
        self.symbols
            .object_type(self.resolver, name)
            .map(str::to_string)
    }

    pub fn scalar_function_type(&mut self, name: &str) -> Option<String> {
        self.symbols
            .scalar_function_type(self.resolver, name)
            .map(str::to_string)
    }

    pub fn is_table_function(&mut self, name: &str) -> bool {
        self.symbols.is_table_function(self.resolver, name)
    }

    /// Base type of a user-defined datatype.
    pub fn user_datatype(&mut self, name: &str) -> Option<String> {
        self.symbols.is_udd(self.resolver, name).map(str::to_string)
    }

    /// Declared type of `table.column`.
    pub fn column(&mut self, table: &str, column: &str) -> Option<ColumnInfo> {
        self.symbols.column(self.resolver, table, column).cloned()
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Record a construct in the current object context.
    pub fn emit(&mut self, construct: Construct) {
        self.emitted.push(EmittedConstruct {
            construct,
            context: self.resolver.context_label(),
            sub_context: self.resolver.sub_context_label(),
        });
    }

    pub fn emitted(&self) -> &[EmittedConstruct] {
        &self.emitted
    }

    pub fn into_emitted(self) -> Vec<EmittedConstruct> {
        self.emitted
    }
}

/// Two-pass classification of batches.
pub trait Classifier {
    /// Pass 1: declare the objects a batch creates.
    fn declare(&mut self, batch: &Batch<'_>, scope: &mut AnalysisScope<'_>) -> BatchOutcome;

    /// Pass 2: emit the constructs of a batch.
    fn classify(&mut self, batch: &Batch<'_>, scope: &mut AnalysisScope<'_>) -> BatchOutcome;
}

// ============================================================================
// Reference classifier
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Declare,
    Classify,
}

/// Token-based classifier covering object definitions, datatypes, calls to
/// declared routines, dynamic SQL and the configurable keyword rules.
#[derive(Debug, Default, Clone)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn walk(&self, batch: &Batch<'_>, scope: &mut AnalysisScope<'_>, pass: Pass) -> BatchOutcome {
        let mut cursor = match TokenCursor::new(batch.content) {
            Ok(cursor) => cursor,
            Err(message) => return BatchOutcome::SyntaxError(message),
        };
        if !cursor.parentheses_balanced() {
            return BatchOutcome::SyntaxError("unbalanced parentheses".to_string());
        }

        cursor.skip_whitespace();
        while !cursor.is_at_end() {
            let start = cursor.pos();
            self.statement_step(&mut cursor, batch, scope, pass);
            if cursor.pos() == start {
                cursor.next_significant();
            }
        }
        BatchOutcome::Ok
    }

    fn statement_step(
        &self,
        cursor: &mut TokenCursor,
        batch: &Batch<'_>,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let Some(word) = cursor.current_word().cloned() else {
            cursor.next_significant();
            return;
        };
        let plain = word.quote_style.is_none();
        let upper = word.value.to_uppercase();

        match upper.as_str() {
            "USE" if plain => {
                cursor.next_significant();
                if let Some(database) = cursor.parse_multipart_name() {
                    scope.resolver().set_current_database(&database);
                }
            }
            "CREATE" if plain => self.create_statement(cursor, batch, scope, pass),
            "EXEC" | "EXECUTE" if plain => {
                if pass == Pass::Classify {
                    self.execute_statement(cursor, scope);
                } else {
                    cursor.next_significant();
                }
            }
            "DECLARE" if plain => self.declare_statement(cursor, scope, pass),
            _ => {
                let line = cursor.line();
                if pass == Pass::Classify && plain {
                    if let Some(rule) = scope.config().keyword_rule(&word.value).cloned() {
                        scope.emit(Construct::new(rule.item, &rule.group, rule.status, line));
                        cursor.next_significant();
                        return;
                    }
                }
                let Some(name) = cursor.parse_multipart_name() else {
                    cursor.next_significant();
                    return;
                };
                if pass == Pass::Classify {
                    if cursor.check_token(&Token::LParen) {
                        self.routine_call(&name, line, scope);
                    } else {
                        self.column_reference(&name, line, scope);
                    }
                }
            }
        }
    }

    /// Emit a call to a declared scalar or table-valued function.
    fn routine_call(&self, name: &str, line: u32, scope: &mut AnalysisScope<'_>) {
        if scope.scalar_function_type(name).is_some() {
            let resolved = scope.resolver().resolve_name(name);
            scope.emit(
                Construct::new("Scalar UDF call", GROUP_FUNCTIONS, Status::Supported, line)
                    .with_detail(resolved),
            );
        } else if scope.is_table_function(name) {
            let resolved = scope.resolver().resolve_name(name);
            scope.emit(
                Construct::new("Table-valued UDF call", GROUP_FUNCTIONS, Status::Supported, line)
                    .with_detail(resolved),
            );
        }
    }

    /// Emit a qualified reference to a declared column whose datatype needs attention.
    fn column_reference(&self, name: &str, line: u32, scope: &mut AnalysisScope<'_>) {
        let Some((table, column)) = split_last_part(name) else {
            return;
        };
        let Some(info) = scope.column(table, column) else {
            return;
        };
        let data_type = match scope.user_datatype(&info.data_type) {
            Some(base) => base,
            None => scope.resolver().normalize_datatype(&info.data_type),
        };
        let base = base_type_name(&data_type).to_string();
        let status = scope.config().datatype_status(&base);
        if status == Status::Supported {
            return;
        }
        let table = scope.resolver().resolve_name(table);
        scope.emit(
            Construct::new(format!("{} column reference", base), GROUP_DATATYPES, status, line)
                .with_detail(format!("{}.{}", table, column.to_uppercase())),
        );
    }

    // ========================================================================
    // CREATE statements
    // ========================================================================

    fn create_statement(
        &self,
        cursor: &mut TokenCursor,
        batch: &Batch<'_>,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let line = cursor.line();
        cursor.next_significant();
        if cursor.expect_word_ci("OR") {
            cursor.expect_word_ci("ALTER");
        }

        let mut clustered = false;
        loop {
            if cursor.expect_word_ci("UNIQUE") || cursor.expect_word_ci("NONCLUSTERED") {
                continue;
            }
            if cursor.expect_word_ci("CLUSTERED") {
                clustered = true;
                continue;
            }
            break;
        }

        let Some(kind) = cursor.current_word().map(|w| w.value.to_uppercase()) else {
            return;
        };
        // Lines from the CREATE to the end of the batch
        let body_lines = batch.line_count().saturating_sub(line) + 1;

        match kind.as_str() {
            "TABLE" => {
                cursor.next_significant();
                self.create_table(cursor, line, scope, pass);
            }
            "VIEW" => {
                cursor.next_significant();
                self.create_module(cursor, "VIEW", GROUP_VIEWS, line, body_lines, scope, pass);
            }
            "PROCEDURE" | "PROC" => {
                cursor.next_significant();
                self.create_module(
                    cursor,
                    "PROCEDURE",
                    GROUP_PROCEDURES,
                    line,
                    body_lines,
                    scope,
                    pass,
                );
                self.parameters(cursor, scope, pass);
            }
            "TRIGGER" => {
                cursor.next_significant();
                self.create_module(
                    cursor,
                    "TRIGGER",
                    GROUP_TRIGGERS,
                    line,
                    body_lines,
                    scope,
                    pass,
                );
            }
            "FUNCTION" => {
                cursor.next_significant();
                self.create_function(cursor, line, body_lines, scope, pass);
            }
            "TYPE" => {
                cursor.next_significant();
                self.create_type(cursor, line, scope, pass);
            }
            "INDEX" => {
                cursor.next_significant();
                if pass == Pass::Classify {
                    let item = if clustered {
                        "CREATE INDEX, CLUSTERED"
                    } else {
                        "CREATE INDEX"
                    };
                    let name = cursor.parse_multipart_name().unwrap_or_default();
                    scope.emit(
                        Construct::new(item, GROUP_INDEXES, Status::Supported, line)
                            .with_detail(name),
                    );
                }
            }
            _ => {}
        }
    }

    /// Views, procedures and triggers: the object becomes the context for
    /// the rest of the batch.
    #[allow(clippy::too_many_arguments)]
    fn create_module(
        &self,
        cursor: &mut TokenCursor,
        kind: &str,
        group: &str,
        line: u32,
        body_lines: u32,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let Some(name) = cursor.parse_multipart_name() else {
            return;
        };
        match pass {
            Pass::Declare => {
                if !name.starts_with('#') {
                    scope.declare_object(&name, kind);
                }
            }
            Pass::Classify => {
                scope.resolver().set_context(kind, &name);
                scope.emit(
                    Construct::new(format!("CREATE {}", kind), group, Status::Supported, line)
                        .with_misc(body_lines.to_string()),
                );
            }
        }
    }

    fn create_function(
        &self,
        cursor: &mut TokenCursor,
        line: u32,
        body_lines: u32,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let Some(name) = cursor.parse_multipart_name() else {
            return;
        };
        if pass == Pass::Classify {
            scope.resolver().set_context("FUNCTION", &name);
        }
        self.parameters(cursor, scope, pass);
        if !cursor.expect_word_ci("RETURNS") {
            return;
        }

        let return_line = cursor.line();
        let table_valued = if cursor.expect_word_ci("TABLE") {
            true
        } else if cursor
            .current_word()
            .is_some_and(|w| w.value.starts_with('@'))
            && matches!(cursor.peek_significant(1), Some(Token::Word(w)) if w.value.eq_ignore_ascii_case("TABLE"))
        {
            let variable = cursor.current_word().map(format_word).unwrap_or_default();
            cursor.next_significant();
            cursor.next_significant();
            self.table_variable(cursor, &variable, scope, pass);
            true
        } else {
            false
        };

        if table_valued {
            match pass {
                Pass::Declare => {
                    scope.declare_table_function(&name);
                    scope.declare_object(&name, "FUNCTION");
                }
                Pass::Classify => scope.emit(
                    Construct::new(
                        "CREATE FUNCTION, table-valued",
                        GROUP_FUNCTIONS,
                        Status::Supported,
                        line,
                    )
                    .with_misc(body_lines.to_string()),
                ),
            }
            return;
        }

        let Some(return_type) = cursor.parse_datatype() else {
            return;
        };
        match pass {
            Pass::Declare => {
                scope.declare_scalar_function(&name, &return_type);
                scope.declare_object(&name, "FUNCTION");
            }
            Pass::Classify => {
                scope.emit(
                    Construct::new("CREATE FUNCTION, scalar", GROUP_FUNCTIONS, Status::Supported, line)
                        .with_misc(body_lines.to_string()),
                );
                let construct = datatype_construct(scope, &return_type, return_line);
                scope.emit(construct);
            }
        }
    }

    fn create_table(
        &self,
        cursor: &mut TokenCursor,
        line: u32,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let Some(name) = cursor.parse_multipart_name() else {
            return;
        };
        let temporary = name.starts_with('#');
        let nested = scope.resolver().context().is_some();

        match pass {
            Pass::Declare => {
                if !temporary {
                    scope.declare_object(&name, "TABLE");
                }
            }
            Pass::Classify => {
                scope.resolver().set_context("TABLE", &name);
                scope.emit(Construct::new("CREATE TABLE", GROUP_TABLES, Status::Supported, line));
            }
        }

        if cursor.check_token(&Token::LParen) {
            self.column_list(cursor, &name, !temporary, scope, pass);
        }

        if pass == Pass::Classify {
            if nested {
                scope.resolver().reset_sub_context();
            } else {
                scope.resolver().clear_context();
            }
        }
    }

    fn create_type(
        &self,
        cursor: &mut TokenCursor,
        line: u32,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        let Some(name) = cursor.parse_multipart_name() else {
            return;
        };
        if !cursor.expect_word_ci("FROM") {
            if pass == Pass::Classify {
                scope.emit(
                    Construct::new("CREATE TYPE, table", GROUP_UDD, Status::Supported, line)
                        .with_detail(name),
                );
            }
            return;
        }
        let Some(base_type) = cursor.parse_datatype() else {
            return;
        };
        match pass {
            Pass::Declare => scope.declare_user_datatype(&name, &base_type),
            Pass::Classify => {
                let base = scope.resolver().normalize_datatype(&base_type);
                let status = scope.config().datatype_status(base_type_name(&base));
                scope.emit(Construct::new("CREATE TYPE", GROUP_UDD, status, line).with_detail(base));
            }
        }
    }

    // ========================================================================
    // Column and parameter lists
    // ========================================================================

    /// Column definitions of a table or table variable; the cursor is at `(`.
    fn column_list(
        &self,
        cursor: &mut TokenCursor,
        table: &str,
        declare_columns: bool,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        cursor.next_significant();
        while !cursor.is_at_end() && !cursor.check_token(&Token::RParen) {
            let Some(word) = cursor.current_word().cloned() else {
                skip_definition(cursor);
                continue;
            };
            let upper = word.value.to_uppercase();
            let is_table_element = word.quote_style.is_none()
                && matches!(
                    upper.as_str(),
                    "CONSTRAINT" | "PRIMARY" | "UNIQUE" | "FOREIGN" | "CHECK" | "INDEX" | "PERIOD"
                );
            if is_table_element {
                skip_definition(cursor);
                continue;
            }

            let column = format_word(&word);
            cursor.next_significant();
            // Computed column
            if cursor.check_word_ci("AS") {
                skip_definition(cursor);
                continue;
            }
            let line = cursor.line();
            let Some(data_type) = cursor.parse_datatype() else {
                skip_definition(cursor);
                continue;
            };
            let not_null = skip_definition(cursor);

            match pass {
                Pass::Declare => {
                    if declare_columns {
                        scope.declare_column(table, &column, &data_type, !not_null);
                    }
                }
                Pass::Classify => {
                    let construct = datatype_construct(scope, &data_type, line);
                    scope.emit(construct);
                }
            }
        }
        cursor.next_significant();
    }

    /// Parameters of a procedure or function, up to `AS` / `RETURNS`.
    fn parameters(&self, cursor: &mut TokenCursor, scope: &mut AnalysisScope<'_>, pass: Pass) {
        let mut depth = 0usize;
        while !cursor.is_at_end() {
            if depth == 0 && (cursor.check_word_ci("AS") || cursor.check_word_ci("RETURNS")) {
                break;
            }
            if cursor.check_token(&Token::LParen) {
                depth += 1;
                cursor.next_significant();
                continue;
            }
            if cursor.check_token(&Token::RParen) {
                depth = depth.saturating_sub(1);
                cursor.next_significant();
                continue;
            }
            let is_parameter = cursor
                .current_word()
                .is_some_and(|w| w.quote_style.is_none() && w.value.starts_with('@'));
            if !is_parameter {
                cursor.next_significant();
                continue;
            }
            cursor.next_significant();
            cursor.expect_word_ci("AS");
            let line = cursor.line();
            if let Some(data_type) = cursor.parse_datatype() {
                if pass == Pass::Classify {
                    let construct = datatype_construct(scope, &data_type, line);
                    scope.emit(construct);
                }
            }
        }
    }

    // ========================================================================
    // DECLARE / EXECUTE
    // ========================================================================

    fn declare_statement(&self, cursor: &mut TokenCursor, scope: &mut AnalysisScope<'_>, pass: Pass) {
        cursor.next_significant();
        let is_table_variable = cursor
            .current_word()
            .is_some_and(|w| w.value.starts_with('@'))
            && matches!(cursor.peek_significant(1), Some(Token::Word(w)) if w.value.eq_ignore_ascii_case("TABLE"));
        if !is_table_variable {
            return;
        }
        let variable = cursor.current_word().map(format_word).unwrap_or_default();
        cursor.next_significant();
        cursor.next_significant();
        self.table_variable(cursor, &variable, scope, pass);
    }

    /// Column list of a table variable, classified in a TABLE sub-context.
    fn table_variable(
        &self,
        cursor: &mut TokenCursor,
        variable: &str,
        scope: &mut AnalysisScope<'_>,
        pass: Pass,
    ) {
        if !cursor.check_token(&Token::LParen) {
            return;
        }
        let nested = scope.resolver().context().is_some();
        if pass == Pass::Classify {
            scope.resolver().set_context("TABLE", variable);
        }
        self.column_list(cursor, variable, false, scope, pass);
        if pass == Pass::Classify {
            if nested {
                scope.resolver().reset_sub_context();
            } else {
                scope.resolver().clear_context();
            }
        }
    }

    fn execute_statement(&self, cursor: &mut TokenCursor, scope: &mut AnalysisScope<'_>) {
        let line = cursor.line();
        cursor.next_significant();

        let dynamic = |scope: &mut AnalysisScope<'_>, detail: &str| {
            scope.emit(
                Construct::new("Dynamic SQL", GROUP_DYNAMIC_SQL, Status::ReviewManually, line)
                    .with_detail(detail),
            );
        };

        if cursor.check_token(&Token::LParen) {
            dynamic(scope, "EXECUTE(string)");
            cursor.skip_parenthesized();
            return;
        }
        if cursor.check_token(&Token::SingleQuotedString(String::new()))
            || cursor.check_token(&Token::NationalStringLiteral(String::new()))
        {
            dynamic(scope, "EXECUTE string");
            cursor.next_significant();
            return;
        }

        let is_variable = cursor
            .current_word()
            .is_some_and(|w| w.quote_style.is_none() && w.value.starts_with('@'));
        if is_variable {
            // EXEC @rc = proc ...
            if cursor.peek_significant(1) == Some(&Token::Eq) {
                cursor.next_significant();
                cursor.next_significant();
            } else {
                dynamic(scope, "EXECUTE @variable");
                cursor.next_significant();
                return;
            }
        }

        let Some(name) = cursor.parse_multipart_name() else {
            return;
        };
        if object_part(&name).eq_ignore_ascii_case("sp_executesql") {
            dynamic(scope, "sp_executesql");
            return;
        }

        let resolved = scope.resolver().resolve_name(&name);
        let construct = match scope.object_type(&name).as_deref() {
            Some("PROCEDURE") => {
                Construct::new("EXECUTE procedure", GROUP_PROCEDURES, Status::Supported, line)
            }
            _ => Construct::new(
                "EXECUTE procedure, not declared",
                GROUP_PROCEDURES,
                Status::ReviewManually,
                line,
            ),
        };
        scope.emit(construct.with_detail(resolved));
    }
}

impl Classifier for RuleClassifier {
    fn declare(&mut self, batch: &Batch<'_>, scope: &mut AnalysisScope<'_>) -> BatchOutcome {
        self.walk(batch, scope, Pass::Declare)
    }

    fn classify(&mut self, batch: &Batch<'_>, scope: &mut AnalysisScope<'_>) -> BatchOutcome {
        self.walk(batch, scope, Pass::Classify)
    }
}

/// Split `a.b.c` into `("a.b", "c")`, ignoring periods inside delimiters.
fn split_last_part(name: &str) -> Option<(&str, &str)> {
    let mut delimiter: Option<char> = None;
    let mut last = None;
    for (i, c) in name.char_indices() {
        match (delimiter, c) {
            (None, '[') => delimiter = Some(']'),
            (None, '"') => delimiter = Some('"'),
            (Some(close), c) if c == close => delimiter = None,
            (None, '.') => last = Some(i),
            _ => {}
        }
    }
    let i = last?;
    let (table, column) = (&name[..i], &name[i + 1..]);
    (!table.is_empty() && !column.is_empty()).then_some((table, column))
}

/// Datatype name without length or precision.
pub fn base_type_name(datatype: &str) -> &str {
    datatype.split('(').next().unwrap_or(datatype).trim()
}

/// Construct for a datatype use; user-defined datatypes are reported with their base type.
fn datatype_construct(scope: &mut AnalysisScope<'_>, data_type: &str, line: u32) -> Construct {
    if let Some(base) = scope.user_datatype(data_type) {
        let name = scope.resolver().resolve_name(data_type);
        let status = scope.config().datatype_status(base_type_name(&base));
        return Construct::new("User-defined datatype", GROUP_UDD, status, line)
            .with_detail(format!("{} ({})", name, base));
    }
    let normalized = scope.resolver().normalize_datatype(data_type);
    let base = base_type_name(&normalized).to_string();
    let status = scope.config().datatype_status(&base);
    Construct::new(base, GROUP_DATATYPES, status, line).with_detail(normalized)
}

/// Skip to the end of one column or table-element definition, consuming a
/// trailing comma but not a closing parenthesis. Returns true if the
/// definition contained `NOT NULL` or `PRIMARY KEY`.
fn skip_definition(cursor: &mut TokenCursor) -> bool {
    let mut depth = 0usize;
    let mut not_null = false;
    let mut previous_not = false;
    while let Some(token) = cursor.current_token() {
        match &token.token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => return not_null,
            Token::RParen => depth -= 1,
            Token::Comma if depth == 0 => {
                cursor.next_significant();
                return not_null;
            }
            Token::Word(w) if w.quote_style.is_none() => {
                let upper = w.value.to_uppercase();
                if upper == "NULL" && previous_not {
                    not_null = true;
                }
                if upper == "PRIMARY" {
                    not_null = true;
                }
                previous_not = upper == "NOT";
            }
            Token::Whitespace(_) => {}
            _ => previous_not = false,
        }
        cursor.advance();
    }
    not_null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::batch::split_batches;

    struct Fixture {
        resolver: NameResolver,
        symbols: SymbolTable,
        declared: SymbolTable,
        config: CompassConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                resolver: NameResolver::new(),
                symbols: SymbolTable::new(),
                declared: SymbolTable::new(),
                config: CompassConfig::default(),
            }
        }

        fn run(&mut self, sql: &str, pass: Pass) -> Vec<EmittedConstruct> {
            let mut classifier = RuleClassifier::new();
            let mut emitted = Vec::new();
            for batch in split_batches(sql) {
                self.resolver.clear_context();
                let mut scope = AnalysisScope::new(
                    &mut self.resolver,
                    &mut self.symbols,
                    &mut self.declared,
                    &self.config,
                );
                let outcome = match pass {
                    Pass::Declare => classifier.declare(&batch, &mut scope),
                    Pass::Classify => classifier.classify(&batch, &mut scope),
                };
                assert_eq!(outcome, BatchOutcome::Ok);
                emitted.extend(scope.into_emitted());
            }
            emitted
        }

        fn analyze(&mut self, sql: &str) -> Vec<EmittedConstruct> {
            self.run(sql, Pass::Declare);
            self.resolver.set_current_database("");
            self.run(sql, Pass::Classify)
        }
    }

    fn items(emitted: &[EmittedConstruct]) -> Vec<&str> {
        emitted.iter().map(|e| e.construct.item.as_str()).collect()
    }

    #[test]
    fn test_forward_reference_resolved_in_second_pass() {
        let sql = "SELECT dbo.f_total(1)\nGO\nCREATE FUNCTION dbo.f_total(@x INT) RETURNS INT AS BEGIN RETURN @x END\nGO\n";
        let mut fixture = Fixture::new();
        let emitted = fixture.analyze(sql);
        let call = emitted
            .iter()
            .find(|e| e.construct.item == "Scalar UDF call")
            .expect("call should be classified");
        assert_eq!(call.construct.item_detail, ".DBO.F_TOTAL");
        assert_eq!(call.context, "T-SQL batch");
    }

    #[test]
    fn test_column_forward_reference_resolved_in_second_pass() {
        let sql = "\
SELECT orders.shape, orders.id FROM orders
GO
CREATE TABLE dbo.orders (id INT NOT NULL, shape GEOGRAPHY NULL)
GO
";
        let mut fixture = Fixture::new();
        let emitted = fixture.analyze(sql);
        let refs: Vec<&EmittedConstruct> = emitted
            .iter()
            .filter(|e| e.construct.item.ends_with("column reference"))
            .collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].construct.item, "GEOGRAPHY column reference");
        assert_eq!(refs[0].construct.item_detail, ".DBO.ORDERS.SHAPE");
        assert_eq!(refs[0].construct.status, Status::NotSupported);
        assert_eq!(refs[0].construct.line_nr, 1);
    }

    #[test]
    fn test_split_last_part() {
        assert_eq!(split_last_part("dbo.t.c"), Some(("dbo.t", "c")));
        assert_eq!(split_last_part("[a.b].c"), Some(("[a.b]", "c")));
        assert_eq!(split_last_part("[a.b]"), None);
        assert_eq!(split_last_part("t"), None);
    }

    #[test]
    fn test_create_procedure_sets_context() {
        let sql = "USE sales\nGO\nCREATE PROCEDURE p1 @id INT AS\nMERGE INTO t USING s ON 1=1\n";
        let mut fixture = Fixture::new();
        fixture.run(sql, Pass::Declare);
        assert_eq!(
            fixture.symbols.object_type(&mut fixture.resolver, "sales.dbo.p1"),
            Some("PROCEDURE")
        );

        let emitted = fixture.run(sql, Pass::Classify);
        assert_eq!(items(&emitted), vec!["CREATE PROCEDURE", "INT", "MERGE"]);
        let merge = &emitted[2];
        assert_eq!(merge.context, "PROCEDURE SALES.DBO.P1");
        assert_eq!(merge.construct.status, Status::NotSupported);
        assert_eq!(merge.construct.line_nr, 2);
        assert_eq!(emitted[0].construct.misc, "2");
    }

    #[test]
    fn test_table_columns_declared() {
        let sql = "CREATE TABLE dbo.t (id INT NOT NULL PRIMARY KEY, shape GEOGRAPHY NULL, CONSTRAINT ck CHECK (id > 0))";
        let mut fixture = Fixture::new();
        fixture.run(sql, Pass::Declare);
        let id = fixture
            .symbols
            .column(&mut fixture.resolver, "dbo.t", "id")
            .cloned()
            .unwrap();
        assert_eq!(id.data_type, "INT");
        assert!(!id.nullable);
        let shape = fixture
            .symbols
            .column(&mut fixture.resolver, "dbo.t", "shape")
            .cloned()
            .unwrap();
        assert!(shape.nullable);
        assert_eq!(fixture.declared.len(), 3);

        let emitted = fixture.run(sql, Pass::Classify);
        assert_eq!(items(&emitted), vec!["CREATE TABLE", "INT", "GEOGRAPHY"]);
        assert_eq!(emitted[2].construct.status, Status::NotSupported);
        assert_eq!(emitted[2].context, "TABLE .DBO.T");
    }

    #[test]
    fn test_user_datatype_resolved_through_symbols() {
        let sql = "CREATE TYPE dbo.phone FROM varchar(20)\nGO\nCREATE TABLE c (p phone)\n";
        let mut fixture = Fixture::new();
        let emitted = fixture.analyze(sql);
        assert_eq!(
            items(&emitted),
            vec!["CREATE TYPE", "CREATE TABLE", "User-defined datatype"]
        );
        assert_eq!(emitted[2].construct.item_detail, ".DBO.PHONE (VARCHAR(20))");
    }

    #[test]
    fn test_temp_table_not_persisted() {
        let mut fixture = Fixture::new();
        fixture.run("CREATE TABLE #work (id INT)", Pass::Declare);
        assert!(fixture.declared.is_empty());
    }

    #[test]
    fn test_dynamic_sql_and_execute() {
        let sql = "CREATE PROCEDURE dbo.p AS SELECT 1\nGO\nEXEC dbo.p\nEXEC ('SELECT 1')\nEXECUTE sp_executesql @s\nEXEC @rc = dbo.p\nEXEC unknown_proc\n";
        let mut fixture = Fixture::new();
        let emitted = fixture.analyze(sql);
        assert_eq!(
            items(&emitted),
            vec![
                "CREATE PROCEDURE",
                "EXECUTE procedure",
                "Dynamic SQL",
                "Dynamic SQL",
                "EXECUTE procedure",
                "EXECUTE procedure, not declared",
            ]
        );
        assert_eq!(emitted[2].construct.status, Status::ReviewManually);
        assert_eq!(emitted[3].construct.item_detail, "sp_executesql");
    }

    #[test]
    fn test_table_variable_is_sub_context() {
        let sql = "CREATE PROCEDURE dbo.p AS\nDECLARE @t TABLE (x XML)\nSELECT 1\n";
        let mut fixture = Fixture::new();
        let emitted = fixture.analyze(sql);
        let xml = emitted
            .iter()
            .find(|e| e.construct.item == "XML")
            .unwrap();
        assert_eq!(xml.context, "PROCEDURE .DBO.P");
        assert_eq!(xml.sub_context, "TABLE .DBO.@T");
    }

    #[test]
    fn test_syntax_error_outcome() {
        let mut fixture = Fixture::new();
        let mut scope = AnalysisScope::new(
            &mut fixture.resolver,
            &mut fixture.symbols,
            &mut fixture.declared,
            &fixture.config,
        );
        let batches = split_batches("SELECT 'unterminated");
        let outcome = RuleClassifier::new().classify(&batches[0], &mut scope);
        assert!(matches!(outcome, BatchOutcome::SyntaxError(_)));
        assert!(scope.emitted().is_empty());
    }
}
