//! Shared utility helpers.

use std::cmp::Ordering;

/// Case-insensitive ordering of two strings.
///
/// Strings that differ only in case are ordered by their raw bytes so the
/// ordering stays total and sorting is deterministic.
pub fn cmp_ci(a: &str, b: &str) -> Ordering {
    let folded = a
        .bytes()
        .map(|c| c.to_ascii_uppercase())
        .cmp(b.bytes().map(|c| c.to_ascii_uppercase()));
    folded.then_with(|| a.cmp(b))
}

/// Replace characters that are unsafe in file names with `-`.
pub fn fix_name_chars(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '(' | ')') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmp_ci_orders_case_insensitively() {
        let mut items = vec!["beta", "Alpha", "alpha", "Gamma"];
        items.sort_by(|a, b| cmp_ci(a, b));
        assert_eq!(items, vec!["Alpha", "alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_fix_name_chars() {
        assert_eq!(fix_name_chars("my app/v2 [x]"), "my-app-v2--x-");
        assert_eq!(fix_name_chars("orders_db.sql"), "orders_db.sql");
    }
}
