// ============================================================
// CSV PARSER
// ============================================================
// Decode raw file bytes and split them into header + data rows

use encoding_rs::UTF_8;

use super::{HeaderResolver, LineParser};
use crate::domain::error::{AppError, Result};

/// Header list plus raw data rows, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Whole-file CSV parser
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser {
    lines: LineParser,
    headers: HeaderResolver,
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw file bytes
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedCsv> {
        self.parse_content(&decode_bytes(bytes))
    }

    /// Parse CSV content from string. Blank lines are skipped everywhere.
    pub fn parse_content(&self, content: &str) -> Result<ParsedCsv> {
        let mut lines = non_blank_lines(content);

        let header_line = lines.next().ok_or_else(|| {
            AppError::EmptyInput("The selected file has no rows to convert".to_string())
        })?;
        let headers = self.headers.resolve_line(header_line);

        let rows = lines.map(|line| self.lines.parse_line(line)).collect();

        Ok(ParsedCsv { headers, rows })
    }
}

/// Decode bytes as UTF-8, dropping a BOM and replacing malformed sequences,
/// with CRLF line endings normalized to LF.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if had_errors {
        tracing::warn!("Input contained invalid UTF-8; malformed bytes were replaced");
    }
    text.replace("\r\n", "\n")
}

/// Lines holding at least one non-whitespace character
pub fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter(|line| !line.trim().is_empty())
}
