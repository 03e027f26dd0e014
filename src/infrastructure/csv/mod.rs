// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Line tokenizing, header detection, and byte decoding

mod csv_parser;
mod header_resolver;
mod line_parser;

pub use csv_parser::{decode_bytes, non_blank_lines, CsvParser, ParsedCsv};
pub use header_resolver::HeaderResolver;
pub use line_parser::LineParser;
