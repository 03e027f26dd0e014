use crate::domain::csv::Record;
use crate::domain::error::Result;

use super::nothing_to_export;

/// Pretty-printed JSON array of records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, records: &[Record]) -> Result<String> {
        if records.is_empty() {
            return Err(nothing_to_export());
        }
        Ok(serde_json::to_string_pretty(records)?)
    }
}
