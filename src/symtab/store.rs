//! Symbol table persistence.
//!
//! File format: `#` comment lines, one `;`-separated record per entry
//! (`<tag>;<key>;<value>[;<nullable>]`, fields masked by the capture codec),
//! and a `*records=<n>` trailer that is checked on load.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use super::table::{ColumnInfo, SymbolEntry, SymbolTable, TABLE_FUNCTION_MARKER};
use crate::capture::codec::{join_fields, split_fields};
use crate::error::CompassError;

const TRAILER_PREFIX: &str = "*records=";

/// Descriptive header written at the top of a symbol table file.
#[derive(Debug, Clone)]
pub struct SymbolFileHeader<'a> {
    pub report: &'a str,
    pub app: &'a str,
    pub input: &'a str,
}

/// Write all entries of `table` to `path`, replacing any existing file.
pub fn save_symbol_table(table: &SymbolTable, path: &Path, header: &SymbolFileHeader) -> Result<()> {
    let write_err = |source| CompassError::SymbolTableWriteError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);

    let timestamp = chrono::Local::now().format("%d-%b-%Y %H:%M:%S");
    writeln!(
        out,
        "# Symbol table for report [{}] application [{}] input [{}]",
        header.report, header.app, header.input
    )
    .map_err(write_err)?;
    writeln!(out, "# Saved at {}", timestamp).map_err(write_err)?;

    let mut count = 0usize;
    for entry in table.entries() {
        writeln!(out, "{}", entry_to_line(&entry)).map_err(write_err)?;
        count += 1;
    }
    writeln!(out, "{}{}", TRAILER_PREFIX, count).map_err(write_err)?;
    out.flush().map_err(write_err)?;

    debug!(path = %path.display(), records = count, "saved symbol table");
    Ok(())
}

/// Read a symbol table file and merge its entries into `table`.
///
/// Returns the number of entries read.
pub fn load_symbol_table(table: &mut SymbolTable, path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|source| CompassError::SymbolTableReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let corrupt = |message: String| CompassError::CorruptSymbolTable {
        path: path.to_path_buf(),
        message,
    };

    let mut count = 0usize;
    let mut trailer: Option<usize> = None;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| CompassError::SymbolTableReadError {
            path: path.to_path_buf(),
            source,
        })?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if trailer.is_some() {
            return Err(corrupt(format!("unexpected content after trailer at line {}", idx + 1)).into());
        }
        if let Some(n) = line.strip_prefix(TRAILER_PREFIX) {
            let n = n
                .trim()
                .parse::<usize>()
                .map_err(|_| corrupt(format!("invalid trailer '{}'", line)))?;
            trailer = Some(n);
            continue;
        }
        let entry = entry_from_line(&line)
            .ok_or_else(|| corrupt(format!("invalid record at line {}: '{}'", idx + 1, line)))?;
        table.insert_stored(entry);
        count += 1;
    }

    match trailer {
        Some(expected) if expected == count => {
            debug!(path = %path.display(), records = count, "loaded symbol table");
            Ok(count)
        }
        Some(expected) => Err(corrupt(format!(
            "trailer announces {} records but {} were read",
            expected, count
        ))
        .into()),
        None => Err(corrupt("missing record count trailer".to_string()).into()),
    }
}

fn entry_to_line(entry: &SymbolEntry) -> String {
    match entry {
        SymbolEntry::ObjectType { name, object_type } => {
            join_fields(&[entry.tag(), name.as_str(), object_type.as_str()])
        }
        SymbolEntry::ScalarFunction { name, return_type } => {
            join_fields(&[entry.tag(), name.as_str(), return_type.as_str()])
        }
        SymbolEntry::TableFunction { name } => {
            join_fields(&[entry.tag(), name.as_str(), TABLE_FUNCTION_MARKER])
        }
        SymbolEntry::UserDatatype { name, base_type } => {
            join_fields(&[entry.tag(), name.as_str(), base_type.as_str()])
        }
        SymbolEntry::Column { key, info } => join_fields(&[
            entry.tag(),
            key.as_str(),
            info.data_type.as_str(),
            if info.nullable { "1" } else { "0" },
        ]),
    }
}

fn entry_from_line(line: &str) -> Option<SymbolEntry> {
    let mut fields = split_fields(line).into_iter();
    let tag = fields.next()?;
    let key = fields.next()?;
    let value = fields.next()?;
    let extra = fields.next();
    if fields.next().is_some() {
        return None;
    }

    let entry = match (tag.as_str(), extra) {
        ("objtype", None) => SymbolEntry::ObjectType {
            name: key,
            object_type: value,
        },
        ("sudf", None) => SymbolEntry::ScalarFunction {
            name: key,
            return_type: value,
        },
        ("tudf", None) => SymbolEntry::TableFunction { name: key },
        ("udd", None) => SymbolEntry::UserDatatype {
            name: key,
            base_type: value,
        },
        ("col", Some(nullable)) => SymbolEntry::Column {
            key,
            info: ColumnInfo {
                data_type: value,
                nullable: match nullable.as_str() {
                    "1" => true,
                    "0" => false,
                    _ => return None,
                },
            },
        },
        _ => return None,
    };
    Some(entry)
}
