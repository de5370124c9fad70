//! Field codec for `;`-separated capture and symbol table lines.
//!
//! Values may contain the field separator or line breaks. Before a value is
//! written those characters are replaced by private tokens that all start
//! with [`MASK_MARK`]; an occurrence of the mark itself in the value is
//! escaped first, so every string survives `unmask(mask(s)) == s`.
//!
//! The mark contains a single `~`, at its start, so two occurrences can never
//! overlap. That makes a left-to-right scan of the masked text unambiguous:
//! every `~CPX` it meets is the start of a token emitted by [`mask`].

use std::borrow::Cow;

/// Field separator for all line-oriented files.
pub const SEPARATOR: char = ';';

/// Prefix shared by all masking tokens.
pub const MASK_MARK: &str = "~CPX";

const ESCAPE_CODE: char = 'E';
const SEPARATOR_CODE: char = 'S';
const NEWLINE_CODE: char = 'N';
const RETURN_CODE: char = 'R';
const HASH_CODE: char = 'H';
const STAR_CODE: char = 'A';

/// Replace separators, line breaks and the mask mark with private tokens.
pub fn mask(value: &str) -> Cow<'_, str> {
    if !needs_mask(value) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 16);
    let mut rest = value;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with(MASK_MARK) {
            push_token(&mut out, ESCAPE_CODE);
            rest = &rest[MASK_MARK.len()..];
            continue;
        }
        match c {
            SEPARATOR => push_token(&mut out, SEPARATOR_CODE),
            '\n' => push_token(&mut out, NEWLINE_CODE),
            '\r' => push_token(&mut out, RETURN_CODE),
            other => out.push(other),
        }
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

/// Like [`mask`], but also masks a leading `#` or `*`.
///
/// Used for the first field of a line, where those characters would make the
/// line read back as a comment or a metrics line.
pub fn mask_line_start(value: &str) -> Cow<'_, str> {
    let masked = mask(value);
    let code = match masked.chars().next() {
        Some('#') => HASH_CODE,
        Some('*') => STAR_CODE,
        _ => return masked,
    };
    let mut out = String::with_capacity(masked.len() + MASK_MARK.len() + 1);
    push_token(&mut out, code);
    out.push_str(&masked[1..]);
    Cow::Owned(out)
}

/// Restore a value produced by [`mask`] or [`mask_line_start`].
///
/// Unknown codes after the mark are passed through literally.
pub fn unmask(value: &str) -> Cow<'_, str> {
    if !value.contains(MASK_MARK) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find(MASK_MARK) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + MASK_MARK.len()..];
        let decoded = match after.chars().next() {
            Some(ESCAPE_CODE) => Some(MASK_MARK),
            Some(SEPARATOR_CODE) => Some(";"),
            Some(NEWLINE_CODE) => Some("\n"),
            Some(RETURN_CODE) => Some("\r"),
            Some(HASH_CODE) => Some("#"),
            Some(STAR_CODE) => Some("*"),
            _ => None,
        };
        match decoded {
            Some(text) => {
                out.push_str(text);
                rest = &after[1..];
            }
            None => {
                out.push_str(MASK_MARK);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Mask each value and join them with the separator.
///
/// The line never starts with `#` or `*`.
pub fn join_fields<S: AsRef<str>>(values: &[S]) -> String {
    let mut line = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
            line.push_str(&mask(value.as_ref()));
        } else {
            line.push_str(&mask_line_start(value.as_ref()));
        }
    }
    line
}

/// Split a line on the separator and unmask each field.
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(SEPARATOR)
        .map(|field| unmask(field).into_owned())
        .collect()
}

#[inline]
fn needs_mask(value: &str) -> bool {
    value
        .bytes()
        .any(|b| b == SEPARATOR as u8 || b == b'\n' || b == b'\r')
        || value.contains(MASK_MARK)
}

#[inline]
fn push_token(out: &mut String, code: char) {
    out.push_str(MASK_MARK);
    out.push(code);
}
