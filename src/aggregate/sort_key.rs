//! Composite sort keys for the sort-merge group-by.
//!
//! A key is the fields of one projection joined by [`KEY_SEP`]. The separator
//! sorts below every printable character, so a key sorts directly after any
//! key that is a field-wise prefix of it. Numeric fields are zero-padded so
//! that string order equals numeric order.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::capture::Status;

/// Field separator inside sort keys.
pub const KEY_SEP: char = '\u{1f}';

/// Sentinel appended after the last real key so the final group is closed by the scan.
pub const LAST_ITEM: &str = "~ZZZZZZ~LastItem";

/// Context sort prefix that moves batch-level records after all objects.
const BATCH_CONTEXT_SORT_PREFIX: &str = "ZZZZ";

/// Replace characters that cannot appear inside a key field.
pub fn sanitize(field: &str) -> Cow<'_, str> {
    if field.contains([KEY_SEP, '\n', '\r']) {
        Cow::Owned(field.replace([KEY_SEP, '\n', '\r'], " "))
    } else {
        Cow::Borrowed(field)
    }
}

/// Join key fields, sanitizing each one.
pub fn make_key(fields: &[&str]) -> String {
    let capacity = fields.iter().map(|f| f.len() + 1).sum();
    let mut key = String::with_capacity(capacity);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEP);
        }
        key.push_str(&sanitize(field));
    }
    key
}

/// Split a key back into its fields.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(KEY_SEP).collect()
}

/// Single-digit status field: statuses sort in report order.
pub fn status_field(status: Status) -> String {
    status.report_rank().to_string()
}

/// Inverse of [`status_field`].
pub fn status_from_field(field: &str) -> Option<Status> {
    let rank: usize = field.parse().ok()?;
    Status::REPORT_ORDER.get(rank).copied()
}

/// Context field for sorting: the batch context sorts after all objects.
pub fn context_sort_field(context: &str, batch_context: &str) -> String {
    if context == batch_context {
        format!("{}{}", BATCH_CONTEXT_SORT_PREFIX, context)
    } else {
        context.to_string()
    }
}

/// Inverse of [`context_sort_field`].
pub fn context_from_sort_field<'a>(field: &'a str, batch_context: &str) -> &'a str {
    match field.strip_prefix(BATCH_CONTEXT_SORT_PREFIX) {
        Some(rest) if rest == batch_context => rest,
        _ => field,
    }
}

/// Curated display order of feature groups.
///
/// Groups are prefixed with a 3-digit rank; most groups have rank 0 and sort
/// alphabetically, while catch-all and datatype groups are moved to the end.
#[derive(Debug, Clone)]
pub struct GroupOrder {
    ranks: HashMap<String, u32>,
}

impl Default for GroupOrder {
    fn default() -> Self {
        let ranks = [
            ("Miscellaneous SQL Features", 900),
            ("Datatype conversion", 930),
            ("XML", 930),
            ("JSON", 930),
            ("HIERARCHYID", 930),
            ("User-Defined Datatypes", 940),
            ("Datatypes", 950),
        ]
        .into_iter()
        .map(|(group, rank)| (group.to_uppercase(), rank))
        .collect();
        Self { ranks }
    }
}

impl GroupOrder {
    /// Curated order with configured overrides applied.
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a u32)>) -> Self {
        let mut order = Self::default();
        for (group, rank) in overrides {
            order.ranks.insert(group.to_uppercase(), (*rank).min(999));
        }
        order
    }

    pub fn rank(&self, group: &str) -> u32 {
        self.ranks
            .get(&group.to_uppercase())
            .copied()
            .unwrap_or(0)
    }

    /// Group field for sorting: `%03d` rank followed by the group name.
    pub fn sort_field(&self, group: &str) -> String {
        format!("{:03}{}", self.rank(group), group)
    }
}

/// Strip the rank prefix added by [`GroupOrder::sort_field`].
pub fn group_from_sort_field(field: &str) -> &str {
    field.get(3..).unwrap_or(field)
}

/// Interns source file names so keys carry a short, order-preserving index.
#[derive(Debug, Default, Clone)]
pub struct SourceFileMap {
    index: HashMap<String, usize>,
    names: Vec<String>,
}

impl SourceFileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key field for a file, assigning the next index on first sight.
    pub fn key_for(&mut self, name: &str) -> String {
        let ix = match self.index.get(name) {
            Some(ix) => *ix,
            None => {
                let ix = self.names.len();
                self.index.insert(name.to_string(), ix);
                self.names.push(name.to_string());
                ix
            }
        };
        format!("f{:05}", ix)
    }

    /// File name for a key field produced by [`SourceFileMap::key_for`].
    pub fn name_for<'a>(&'a self, field: &'a str) -> &'a str {
        field
            .strip_prefix('f')
            .and_then(|ix| ix.parse::<usize>().ok())
            .and_then(|ix| self.names.get(ix))
            .map(String::as_str)
            .unwrap_or(field)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::cmp_ci;

    #[test]
    fn test_prefix_keys_sort_first() {
        let mut keys = vec![make_key(&["abc", "x"]), make_key(&["ab", "z"]), make_key(&["abc"])];
        keys.sort_by(|a, b| cmp_ci(a, b));
        assert_eq!(split_key(&keys[0]), vec!["ab", "z"]);
        assert_eq!(split_key(&keys[1]), vec!["abc"]);
        assert_eq!(split_key(&keys[2]), vec!["abc", "x"]);
    }

    #[test]
    fn test_sentinel_sorts_last() {
        let mut keys = vec![LAST_ITEM.to_string(), make_key(&["5", "zzz"]), make_key(&["0", "a"])];
        keys.sort_by(|a, b| cmp_ci(a, b));
        assert_eq!(keys.last().map(String::as_str), Some(LAST_ITEM));
    }

    #[test]
    fn test_sanitize_removes_separators() {
        let key = make_key(&["a\u{1f}b", "c\nd"]);
        assert_eq!(split_key(&key), vec!["a b", "c d"]);
    }

    #[test]
    fn test_status_field_round_trip() {
        for status in Status::REPORT_ORDER {
            assert_eq!(status_from_field(&status_field(status)), Some(status));
        }
    }

    #[test]
    fn test_group_order() {
        let order = GroupOrder::default();
        assert_eq!(order.sort_field("DML"), "000DML");
        assert_eq!(order.sort_field("Datatypes"), "950Datatypes");
        assert_eq!(group_from_sort_field("950Datatypes"), "Datatypes");
        let mut groups = vec![order.sort_field("Datatypes"), order.sort_field("Cursors")];
        groups.sort();
        assert_eq!(groups[0], "000Cursors");
    }

    #[test]
    fn test_context_sort_field() {
        let field = context_sort_field("T-SQL batch", "T-SQL batch");
        assert!(cmp_ci(&field, "VIEW X").is_gt());
        assert_eq!(context_from_sort_field(&field, "T-SQL batch"), "T-SQL batch");
        assert_eq!(context_from_sort_field("PROCEDURE P", "T-SQL batch"), "PROCEDURE P");
    }

    #[test]
    fn test_source_file_map() {
        let mut files = SourceFileMap::new();
        assert_eq!(files.key_for("b.sql"), "f00000");
        assert_eq!(files.key_for("a.sql"), "f00001");
        assert_eq!(files.key_for("b.sql"), "f00000");
        assert_eq!(files.name_for("f00001"), "a.sql");
        assert_eq!(files.len(), 2);
    }
}
