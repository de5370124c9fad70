//! Identifier normalization.
//!
//! Turns raw lexical identifiers (`[dbo].[Orders]`, `"x"`, `..t`,
//! `sys.NUMERIC(007,2)`) into a canonical spelling. Normalization keeps the
//! letter case of its input; the name resolver uppercases afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Private stand-ins for characters that would otherwise break part
/// splitting when they occur inside a delimited identifier segment.
const ENC_OPEN_BRACKET: char = '\u{E000}';
const ENC_CLOSE_BRACKET: char = '\u{E001}';
const ENC_DOT: char = '\u{E002}';

static PLAIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w#][\w@#$]*$").unwrap());
static SYS_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^sys\.").unwrap());
static NATIONAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(national)(char)").unwrap());
static CHAR_VARYING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(n?char(?:acter)?)(varying)\b").unwrap());
static LEADING_ZEROS: Lazy<Regex> = Lazy::new(|| Regex::new(r"([(,])\s*0+(\d)").unwrap());

/// Options controlling normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NormalizeOptions {
    /// Apply datatype canonicalization (SYS. prefix, NATIONAL CHAR, CHAR VARYING, leading zeros)
    pub datatype: bool,
}

impl NormalizeOptions {
    pub const DATATYPE: NormalizeOptions = NormalizeOptions { datatype: true };
}

/// One dot-separated part of a raw name.
#[derive(Default)]
struct RawPart {
    text: String,
    /// Text following the closing delimiter, e.g. `(10)` in `[varchar](10)`
    suffix: String,
    delimited: bool,
}

/// Normalize a raw identifier or datatype name.
pub fn normalize_name(name: &str, options: NormalizeOptions) -> String {
    let trimmed = name.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = split_raw_parts(trimmed)
        .into_iter()
        .map(normalize_part)
        .collect();

    // Schema-qualified temp objects (`dbo.#t`) are known by their bare name
    let mut result = match parts.last() {
        Some(last) if parts.len() > 1 && last.starts_with('#') => last.clone(),
        _ => parts.join("."),
    };

    if options.datatype {
        result = normalize_datatype(&result);
    }
    result
}

/// Replace characters that are reserved inside identifier parts by their private stand-ins.
pub fn encode_identifier(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '[' => ENC_OPEN_BRACKET,
            ']' => ENC_CLOSE_BRACKET,
            '.' => ENC_DOT,
            other => other,
        })
        .collect()
}

/// Restore characters replaced by [`encode_identifier`].
pub fn decode_identifier(text: &str) -> String {
    if !has_encoded_chars(text) {
        return text.to_string();
    }
    text.chars()
        .map(|c| match c {
            ENC_OPEN_BRACKET => '[',
            ENC_CLOSE_BRACKET => ']',
            ENC_DOT => '.',
            other => other,
        })
        .collect()
}

/// Whether a string contains any encoded identifier characters.
#[inline]
pub fn has_encoded_chars(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, ENC_OPEN_BRACKET | ENC_CLOSE_BRACKET | ENC_DOT))
}

fn normalize_part(part: RawPart) -> String {
    if !part.delimited {
        return part.text.trim().to_string();
    }
    if PLAIN_IDENTIFIER.is_match(&part.text) {
        part.text + part.suffix.trim()
    } else {
        format!("[{}]{}", encode_identifier(&part.text), part.suffix.trim())
    }
}

fn normalize_datatype(name: &str) -> String {
    let name = SYS_PREFIX.replace(name, "");
    let name = NATIONAL_CHAR.replace(&name, "$1 $2");
    let name = CHAR_VARYING.replace_all(&name, "$1 $2");
    LEADING_ZEROS.replace_all(&name, "$1$2").into_owned()
}

/// Split a raw name into parts on `.`, honoring `[...]` and `"..."` delimiting.
fn split_raw_parts(name: &str) -> Vec<RawPart> {
    let mut parts = Vec::new();
    let mut chars = name.chars().peekable();
    let mut current = RawPart::default();
    let mut at_part_start = true;

    while let Some(c) = chars.next() {
        match c {
            '[' | '"' if at_part_start => {
                let close = if c == '[' { ']' } else { '"' };
                current.delimited = true;
                while let Some(inner) = chars.next() {
                    if inner == close {
                        // A doubled closing delimiter is an escaped literal
                        if chars.peek() == Some(&close) {
                            chars.next();
                            current.text.push(close);
                            continue;
                        }
                        break;
                    }
                    current.text.push(inner);
                }
                at_part_start = false;
            }
            '.' => {
                parts.push(std::mem::take(&mut current));
                at_part_start = true;
            }
            c if at_part_start && c.is_whitespace() => {}
            other if current.delimited => current.suffix.push(other),
            other => {
                current.text.push(other);
                at_part_start = false;
            }
        }
    }
    parts.push(current);
    parts
}

/// Caching front-end for [`normalize_name`].
///
/// The cache is transparent: results are identical with or without it.
#[derive(Debug, Default)]
pub struct Normalizer {
    cache: HashMap<(String, NormalizeOptions), String>,
    attempts: u64,
    hits: u64,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, name: &str, options: NormalizeOptions) -> String {
        self.attempts += 1;
        let key = (name.to_string(), options);
        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            return cached.clone();
        }
        let result = normalize_name(name, options);
        self.cache.insert(key, result.clone());
        result
    }

    /// Number of normalization requests served.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Number of requests answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
