// ============================================================
// HEADER RESOLVER
// ============================================================
// Derive the canonical lower-cased header list from CSV text

use super::csv_parser::{decode_bytes, non_blank_lines};
use super::LineParser;

/// Resolves headers from the first non-blank line of a file
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderResolver {
    parser: LineParser,
}

impl HeaderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers from raw bytes, reading at most `max_bytes` of them
    pub fn resolve_prefix(&self, bytes: &[u8], max_bytes: usize) -> Vec<String> {
        let prefix = &bytes[..bytes.len().min(max_bytes)];
        self.resolve(&decode_bytes(prefix))
    }

    /// Headers from decoded text. Empty when the text has no non-blank line.
    pub fn resolve(&self, text: &str) -> Vec<String> {
        match non_blank_lines(text).next() {
            Some(line) => self.resolve_line(line),
            None => Vec::new(),
        }
    }

    /// Normalize an already-selected header line
    pub fn resolve_line(&self, line: &str) -> Vec<String> {
        self.parser
            .parse_line(line)
            .into_iter()
            .enumerate()
            .map(|(idx, header)| {
                if header.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    header.to_lowercase()
                }
            })
            .collect()
    }
}
