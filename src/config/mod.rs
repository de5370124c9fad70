//! Assessment configuration: target version, report limits, weights, group order and rules.

mod parser;

use std::collections::BTreeMap;

use crate::capture::Status;

pub use parser::load_config;

/// Target version recorded in capture files when none is configured.
pub const DEFAULT_TARGET_VERSION: &str = "1.0";

/// Default cap on line numbers listed per cross-reference line.
pub const DEFAULT_MAX_LINE_NRS: usize = 10;

/// Default in-memory run size of the external key sort.
pub const DEFAULT_SORT_BUFFER_BYTES: usize = 64 * 1024 * 1024;

/// Classification of a statement or clause keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    /// Keyword as it appears in the source (matched case-insensitively)
    pub word: String,
    pub item: String,
    pub group: String,
    pub status: Status,
}

/// Classification of a datatype by base name (e.g. `GEOGRAPHY`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypeRule {
    pub name: String,
    pub status: Status,
}

/// Complete configuration of an analysis or report run.
#[derive(Debug, Clone)]
pub struct CompassConfig {
    pub target_version: String,
    pub max_line_nrs_in_list: usize,
    pub sort_buffer_bytes: usize,
    /// Per-feature-group score weight overrides
    pub group_weights: BTreeMap<String, u32>,
    /// Per-feature-group display rank overrides
    pub group_ranks: BTreeMap<String, u32>,
    pub keyword_rules: Vec<KeywordRule>,
    pub datatype_rules: Vec<DatatypeRule>,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            max_line_nrs_in_list: DEFAULT_MAX_LINE_NRS,
            sort_buffer_bytes: DEFAULT_SORT_BUFFER_BYTES,
            group_weights: BTreeMap::new(),
            group_ranks: BTreeMap::new(),
            keyword_rules: default_keyword_rules(),
            datatype_rules: default_datatype_rules(),
        }
    }
}

impl CompassConfig {
    /// Rule for a keyword, if any.
    pub fn keyword_rule(&self, word: &str) -> Option<&KeywordRule> {
        self.keyword_rules
            .iter()
            .find(|rule| rule.word.eq_ignore_ascii_case(word))
    }

    /// Status of a datatype; types without a rule are supported.
    pub fn datatype_status(&self, base_type: &str) -> Status {
        self.datatype_rules
            .iter()
            .find(|rule| rule.name.eq_ignore_ascii_case(base_type))
            .map(|rule| rule.status)
            .unwrap_or(Status::Supported)
    }

    /// Add or replace a keyword rule (keyed by word).
    pub fn set_keyword_rule(&mut self, rule: KeywordRule) {
        match self
            .keyword_rules
            .iter_mut()
            .find(|r| r.word.eq_ignore_ascii_case(&rule.word))
        {
            Some(existing) => *existing = rule,
            None => self.keyword_rules.push(rule),
        }
    }

    /// Add or replace a datatype rule (keyed by name).
    pub fn set_datatype_rule(&mut self, rule: DatatypeRule) {
        match self
            .datatype_rules
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(&rule.name))
        {
            Some(existing) => *existing = rule,
            None => self.datatype_rules.push(rule),
        }
    }
}

fn keyword(word: &str, item: &str, group: &str, status: Status) -> KeywordRule {
    KeywordRule {
        word: word.to_string(),
        item: item.to_string(),
        group: group.to_string(),
        status,
    }
}

fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        keyword("MERGE", "MERGE", "DML", Status::NotSupported),
        keyword("OPENXML", "OPENXML()", "XML", Status::NotSupported),
        keyword("OPENQUERY", "OPENQUERY()", "Remote objects", Status::NotSupported),
        keyword("OPENROWSET", "OPENROWSET()", "Remote objects", Status::NotSupported),
        keyword("CURSOR", "DECLARE CURSOR", "Cursors", Status::ReviewPerformance),
        keyword("WAITFOR", "WAITFOR", "Control flow", Status::ReviewSemantics),
        keyword("GOTO", "GOTO", "Control flow", Status::ReviewManually),
        keyword("ROWCOUNT", "SET ROWCOUNT", "SET options", Status::ReviewSemantics),
        keyword("NOLOCK", "NOLOCK hint", "Query hints", Status::Ignored),
        keyword("PIVOT", "PIVOT", "DML", Status::Supported),
        keyword("THROW", "THROW", "Control flow", Status::Supported),
        keyword("RAISERROR", "RAISERROR", "Control flow", Status::Supported),
    ]
}

fn default_datatype_rules() -> Vec<DatatypeRule> {
    [
        ("HIERARCHYID", Status::NotSupported),
        ("GEOGRAPHY", Status::NotSupported),
        ("GEOMETRY", Status::NotSupported),
        ("SQL_VARIANT", Status::ReviewSemantics),
        ("ROWVERSION", Status::ReviewSemantics),
        ("TIMESTAMP", Status::ReviewSemantics),
        ("XML", Status::ReviewSemantics),
    ]
    .into_iter()
    .map(|(name, status)| DatatypeRule {
        name: name.to_string(),
        status,
    })
    .collect()
}
