// ============================================================
// SECTION REGISTRY
// ============================================================
// Ordered output buckets plus the header -> section assignment map

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::error::{AppError, Result};

/// A named bucket in a record's `data` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier, never changes after creation
    pub id: String,

    /// Display name, used as the output key
    pub name: String,

    /// The initial section is pinned
    pub removable: bool,
}

/// Sections in display order and the column assignments that point at them.
///
/// The first section is the fallback target for every header without an
/// explicit assignment. Assignments are keyed by section id, so renames never
/// move columns around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRegistry {
    sections: Vec<Section>,
    column_map: BTreeMap<String, String>,
    default_name: String,
    next_seq: u64,
}

impl SectionRegistry {
    /// Create a registry holding a single pinned section
    pub fn new(default_name: &str) -> Self {
        let mut registry = Self {
            sections: Vec::new(),
            column_map: BTreeMap::new(),
            default_name: default_name.trim().to_string(),
            next_seq: 1,
        };
        registry.ensure_fallback();
        registry
    }

    /// Rebuild a registry from a stored layout.
    ///
    /// The section list may be empty here; call [`ensure_fallback`] before
    /// using it for row processing. Blank or repeated ids are rejected and
    /// assignments to unknown ids are dropped.
    ///
    /// [`ensure_fallback`]: SectionRegistry::ensure_fallback
    pub fn from_parts(
        default_name: &str,
        sections: Vec<Section>,
        column_map: BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for section in &sections {
            if section.id.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Section id must not be empty".to_string(),
                ));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate section id '{}'",
                    section.id
                )));
            }
        }

        let column_map = column_map
            .into_iter()
            .filter(|(_, id)| seen.contains(id.as_str()))
            .map(|(header, id)| (header.to_lowercase(), id))
            .collect();

        Ok(Self {
            next_seq: sections.len() as u64 + 1,
            sections,
            column_map,
            default_name: default_name.trim().to_string(),
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn column_map(&self) -> &BTreeMap<String, String> {
        &self.column_map
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Id of the current fallback (first) section
    pub fn fallback_id(&self) -> Option<&str> {
        self.sections.first().map(|s| s.id.as_str())
    }

    /// Synthesize the default section if the list is empty
    pub fn ensure_fallback(&mut self) -> &Section {
        if self.sections.is_empty() {
            let name = if self.default_name.is_empty() {
                "main".to_string()
            } else {
                self.default_name.clone()
            };
            let id = self.unique_id(&section_key(&name), false);
            self.sections.push(Section {
                id,
                name,
                removable: false,
            });
        }
        &self.sections[0]
    }

    /// Append a removable section. Blank names are ignored.
    pub fn add(&mut self, name: &str) -> Option<&Section> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let id = self.unique_id(&section_key(name), true);
        self.sections.push(Section {
            id,
            name: name.to_string(),
            removable: true,
        });
        self.sections.last()
    }

    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::ValidationError(
                "Section name must not be empty".to_string(),
            ));
        }

        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("section '{}'", id)))?;
        section.name = new_name.to_string();
        Ok(())
    }

    /// Remove a section and move its columns to the new fallback section
    pub fn remove(&mut self, id: &str) -> Result<Section> {
        let position = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("section '{}'", id)))?;

        if !self.sections[position].removable || self.sections.len() <= 1 {
            return Err(AppError::ValidationError(format!(
                "Section '{}' cannot be removed",
                self.sections[position].name
            )));
        }

        let removed = self.sections.remove(position);
        let fallback = self.sections[0].id.clone();
        for target in self.column_map.values_mut() {
            if *target == removed.id {
                *target = fallback.clone();
            }
        }

        Ok(removed)
    }

    /// Route a header to a section
    pub fn assign(&mut self, header: &str, section_id: &str) -> Result<()> {
        if self.get(section_id).is_none() {
            return Err(AppError::NotFound(format!("section '{}'", section_id)));
        }
        self.column_map
            .insert(header.to_lowercase(), section_id.to_string());
        Ok(())
    }

    /// Section id a header writes into
    pub fn resolve(&self, header_lower: &str) -> Option<&str> {
        match self.column_map.get(header_lower) {
            Some(id) => Some(id.as_str()),
            None => self.fallback_id(),
        }
    }

    /// Section a header writes into
    pub fn section_for(&self, header_lower: &str) -> Option<&Section> {
        self.resolve(header_lower).and_then(|id| self.get(id))
    }

    fn unique_id(&mut self, key: &str, salted: bool) -> String {
        let mut candidate = if salted {
            format!("{}_{}", key, self.next_seq)
        } else {
            key.to_string()
        };
        while self.get(&candidate).is_some() {
            self.next_seq += 1;
            candidate = format!("{}_{}", key, self.next_seq);
        }
        self.next_seq += 1;
        candidate
    }
}

/// Lower-case, underscore-separated key for section ids
fn section_key(name: &str) -> String {
    let key = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if key.is_empty() {
        "section".to_string()
    } else {
        key
    }
}
