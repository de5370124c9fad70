//! Input decoding and batch splitting.

use std::path::Path;

use anyhow::Result;
use encoding_rs::{Encoding, WINDOWS_1252};

use crate::error::CompassError;

/// One `GO`-separated batch of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    /// 1-based batch number within the file
    pub nr: u32,
    pub content: &'a str,
    /// 1-based line of the batch start within the file
    pub start_line: u32,
}

impl Batch<'_> {
    pub fn line_count(&self) -> u32 {
        self.content.lines().count() as u32
    }
}

/// Decoded text of an input file with the name of its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInput {
    pub text: String,
    pub encoding: String,
}

/// Decode raw input bytes.
///
/// A byte order mark selects UTF-8, UTF-16LE or UTF-16BE. Without one the
/// bytes are read as UTF-8, falling back to Windows-1252 (common for SQL
/// files created on Windows).
pub fn decode_input(bytes: &[u8]) -> Option<DecodedInput> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return None;
        }
        return Some(DecodedInput {
            text: text.into_owned(),
            encoding: encoding.name().to_string(),
        });
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Some(DecodedInput {
            text: text.to_string(),
            encoding: "UTF-8".to_string(),
        }),
        Err(_) => {
            let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
            if had_errors {
                None
            } else {
                Some(DecodedInput {
                    text: text.into_owned(),
                    encoding: WINDOWS_1252.name().to_string(),
                })
            }
        }
    }
}

/// Read and decode an input file.
pub fn read_input(path: &Path) -> Result<DecodedInput> {
    let bytes = std::fs::read(path).map_err(|source| CompassError::InputReadError {
        path: path.to_path_buf(),
        source,
    })?;
    decode_input(&bytes).ok_or_else(|| {
        CompassError::InputReadError {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "File contains invalid characters",
            ),
        }
        .into()
    })
}

/// Split SQL content into batches by GO lines, tracking line numbers.
///
/// `GO` (or `GO;`) must be on a line of its own, in any case. Empty
/// batches are dropped, but batch numbers count every separator so they
/// match what a user sees when counting `GO` lines.
pub fn split_batches(content: &str) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1u32;
    let mut batch_start_line = 1u32;
    let mut batch_nr = 1u32;

    for line in content.lines() {
        let line_end = current_pos + line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end
        };

        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;") {
            if !content[batch_start..current_pos].trim().is_empty() {
                batches.push(Batch {
                    nr: batch_nr,
                    content: &content[batch_start..current_pos],
                    start_line: batch_start_line,
                });
            }
            batch_nr += 1;
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }

        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() && !content[batch_start..].trim().is_empty() {
        batches.push(Batch {
            nr: batch_nr,
            content: &content[batch_start..],
            start_line: batch_start_line,
        });
    }

    batches
}
