// ============================================================
// CONVERSION CONFIGURATION
// ============================================================
// Tunables for header preview, result previews, and session defaults

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for a conversion session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConversionConfig {
    /// Bytes read from the start of a file to detect headers (default: 16 KiB)
    #[validate(range(min = 64))]
    pub header_prefix_bytes: usize,

    /// Records shown in table preview mode (default: 10)
    #[validate(range(min = 1))]
    pub preview_table_rows: usize,

    /// Records shown in raw JSON preview mode (default: 50)
    #[validate(range(min = 1))]
    pub preview_json_rows: usize,

    /// Name of the section every session starts with (default: "main")
    #[validate(length(min = 1))]
    pub default_section_name: String,

    /// Title pattern every session starts with (default: "{title}")
    pub default_title_pattern: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            header_prefix_bytes: 16 * 1024,
            preview_table_rows: 10,
            preview_json_rows: 50,
            default_section_name: "main".to_string(),
            default_title_pattern: "{title}".to_string(),
        }
    }
}

impl ConversionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if self.default_section_name.trim().is_empty() {
            return Err("default_section_name must not be blank".to_string());
        }
        Ok(())
    }
}
