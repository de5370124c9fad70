//! Text formatting helpers for report sections.

/// Width of separator bars.
pub const BAR_WIDTH: usize = 80;

/// A full-width bar of `ch`.
pub fn bar(ch: char) -> String {
    std::iter::repeat(ch).take(BAR_WIDTH).collect()
}

/// Align `label : value` rows on the colon.
pub fn align_columns(rows: &[(String, String)]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(label, value)| {
            let pad = width - label.chars().count();
            format!("{}{} : {}", label, " ".repeat(pad), value)
        })
        .collect()
}

/// `1 item` / `3 items`, `2 batches`.
pub fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else if word.ends_with("ch") || word.ends_with('s') {
        format!("{} {}es", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// Anchor id derived from a heading.
pub fn anchor(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
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
    fn test_align_columns() {
        let rows = vec![
            ("Not Supported".to_string(), "3".to_string()),
            ("Ignored".to_string(), "12".to_string()),
        ];
        assert_eq!(
            align_columns(&rows),
            vec!["Not Supported : 3".to_string(), "Ignored       : 12".to_string()]
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(bar('-').len(), BAR_WIDTH);
        assert_eq!(plural(1, "file"), "1 file");
        assert_eq!(plural(2, "file"), "2 files");
        assert_eq!(plural(0, "batch"), "0 batches");
        assert_eq!(anchor("Review Manually"), "review-manually");
    }
}
