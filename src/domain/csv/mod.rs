// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types and value objects for CSV-to-sections conversion
// No I/O, no async

mod conversion_config;
mod record;
mod section;
mod status;
mod title_pattern;

pub use conversion_config::ConversionConfig;
pub use record::{is_base_field, Record, SectionData, BASE_FIELDS};
pub use section::{Section, SectionRegistry};
pub use status::{BlockingError, PreviewMode, StatusKind, StatusMessage};
pub use title_pattern::{PatternSegment, TitleDeduplicator, TitlePattern, TitleToken};

// Re-export commonly used types
pub use std::collections::HashMap;
pub type FieldMap = HashMap<String, String>;
