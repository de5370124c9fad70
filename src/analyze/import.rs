//! Imported input copies.
//!
//! Every analyzed input is stored in the report directory as UTF-8 text,
//! preceded by one header line describing where it came from. Re-analysis
//! and report listings work from these copies only.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CompassError;

static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^# Input file \[(.*?)\] for application \[(.*?)\] encoding \[(.*?)\] batches/lines \[(\d+)/(\d+)\] read at (.+)$",
    )
    .unwrap()
});

/// Header line of an imported copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportHeader {
    /// Path of the original input as given on the command line
    pub input_path: String,
    pub app: String,
    pub encoding: String,
    pub batches: u32,
    pub lines: u32,
    pub read_at: String,
}

impl ImportHeader {
    pub fn to_line(&self) -> String {
        format!(
            "# Input file [{}] for application [{}] encoding [{}] batches/lines [{}/{}] read at {}",
            self.input_path, self.app, self.encoding, self.batches, self.lines, self.read_at
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let caps = HEADER_PATTERN.captures(line.trim_end())?;
        Some(Self {
            input_path: caps[1].to_string(),
            app: caps[2].to_string(),
            encoding: caps[3].to_string(),
            batches: caps[4].parse().ok()?,
            lines: caps[5].parse().ok()?,
            read_at: caps[6].to_string(),
        })
    }

    /// File name of the original input.
    pub fn src_file(&self) -> String {
        Path::new(&self.input_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.input_path)
            .to_string()
    }
}

/// Write an imported copy, replacing any existing one.
pub fn write_import(path: &Path, header: &ImportHeader, text: &str) -> Result<()> {
    let write_err = |source| CompassError::CaptureWriteError {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(write_err)?;
    writeln!(file, "{}", header.to_line()).map_err(write_err)?;
    file.write_all(text.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    Ok(())
}

/// Read an imported copy, returning its header and the input text.
pub fn read_import(path: &Path) -> Result<(ImportHeader, String)> {
    let content = fs::read_to_string(path).map_err(|source| CompassError::InputReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let (first, body) = content.split_once('\n').unwrap_or((content.as_str(), ""));
    let header = parse_header(path, first)?;
    Ok((header, body.to_string()))
}

/// Read only the header line of an imported copy.
pub fn read_import_header(path: &Path) -> Result<ImportHeader> {
    let file = File::open(path).map_err(|source| CompassError::InputReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|source| CompassError::InputReadError {
            path: path.to_path_buf(),
            source,
        })?;
    parse_header(path, &first)
}

fn parse_header(path: &Path, line: &str) -> Result<ImportHeader> {
    ImportHeader::parse(line).ok_or_else(|| {
        CompassError::CorruptImportFile {
            path: path.to_path_buf(),
            message: format!("invalid header line '{}'", line.trim_end()),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> ImportHeader {
        ImportHeader {
            input_path: "/data/sql/orders [v2].sql".to_string(),
            app: "billing".to_string(),
            encoding: "UTF-8".to_string(),
            batches: 3,
            lines: 42,
            read_at: "02-Jan-2026 10:11:12".to_string(),
        }
    }

    #[test]
    fn test_header_line_parses_back() {
        let line = header().to_line();
        assert_eq!(ImportHeader::parse(&line), Some(header()));
        assert_eq!(header().src_file(), "orders [v2].sql");
    }

    #[test]
    fn test_read_import_keeps_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.sql.imported.billing.dat");
        let text = "SELECT 1\r\nGO\nSELECT 2";
        write_import(&path, &header(), text).unwrap();

        let (read_header, body) = read_import(&path).unwrap();
        assert_eq!(read_header, header());
        assert_eq!(body, text);
        assert_eq!(read_import_header(&path).unwrap().batches, 3);
    }

    #[test]
    fn test_bad_header_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.imported.a.dat");
        std::fs::write(&path, "SELECT 1\n").unwrap();
        assert!(read_import(&path).is_err());
    }
}
