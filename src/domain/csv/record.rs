// ============================================================
// RECORD TYPES
// ============================================================
// The sectioned record produced for every CSV data row

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::FieldMap;

/// Headers promoted to the top level of a record instead of a section
pub const BASE_FIELDS: [&str; 2] = ["title", "content"];

/// Values of one section, keyed by lower-cased header
pub type SectionData = BTreeMap<String, String>;

pub fn is_base_field(header: &str) -> bool {
    BASE_FIELDS.contains(&header)
}

/// A single converted CSV row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Title generated from the session's title pattern, unique within a batch
    pub title: String,

    /// Raw `content` column, empty if the CSV has none
    pub content: String,

    /// Section name -> (header -> value)
    pub data: BTreeMap<String, SectionData>,
}

impl Record {
    /// Flat header -> value view of this record, including the base fields
    pub fn flatten(&self) -> FieldMap {
        let mut flat: FieldMap = self
            .data
            .values()
            .flat_map(|section| section.iter())
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect();
        flat.insert("title".to_string(), self.title.clone());
        flat.insert("content".to_string(), self.content.clone());
        flat
    }
}
