use std::collections::BTreeMap;

use crate::application::use_cases::title_resolver::TitlePatternResolver;
use crate::domain::csv::{
    is_base_field, FieldMap, Record, SectionData, SectionRegistry, TitleDeduplicator, TitlePattern,
};
use crate::domain::error::{AppError, Result};

/// Turns raw rows into sectioned records for one conversion pass.
///
/// Title uniqueness is tracked for the lifetime of the builder, so use one
/// builder per pass and feed it rows in source order.
pub struct RecordBuilder<'a> {
    headers: &'a [String],
    registry: &'a SectionRegistry,
    pattern: &'a TitlePattern,
    resolver: &'a TitlePatternResolver,
    titles: TitleDeduplicator,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        headers: &'a [String],
        registry: &'a SectionRegistry,
        pattern: &'a TitlePattern,
        resolver: &'a TitlePatternResolver,
    ) -> Result<Self> {
        if registry.is_empty() {
            return Err(AppError::Internal(
                "Row processing requires at least one section".to_string(),
            ));
        }

        Ok(Self {
            headers,
            registry,
            pattern,
            resolver,
            titles: TitleDeduplicator::new(),
        })
    }

    /// Header -> value map with the row forced to header width
    pub fn row_map(headers: &[String], mut values: Vec<String>) -> FieldMap {
        values.resize(headers.len(), String::new());
        headers.iter().cloned().zip(values).collect()
    }

    /// Build the record for the row at 1-based `index`
    pub fn build(&mut self, values: Vec<String>, index: usize) -> Record {
        let row = Self::row_map(self.headers, values);

        let mut data: BTreeMap<String, SectionData> = self
            .registry
            .sections()
            .iter()
            .map(|section| (section.name.clone(), SectionData::new()))
            .collect();

        for header in self.headers.iter().filter(|h| !is_base_field(h)) {
            let Some(section) = self.registry.section_for(header) else {
                continue;
            };
            let value = row.get(header).cloned().unwrap_or_default();
            data.entry(section.name.clone())
                .or_default()
                .insert(header.clone(), value);
        }

        let generated = self
            .resolver
            .resolve(self.pattern, &row, self.headers, index);

        Record {
            title: self.titles.claim(generated),
            content: row.get("content").cloned().unwrap_or_default(),
            data,
        }
    }

    /// Build records for all rows, numbering them from 1
    pub fn build_all(mut self, rows: Vec<Vec<String>>) -> Vec<Record> {
        rows.into_iter()
            .enumerate()
            .map(|(idx, values)| self.build(values, idx + 1))
            .collect()
    }
}
