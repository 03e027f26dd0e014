// ============================================================
// EXPORTERS
// ============================================================
// Serialize a converted record set into downloadable artifacts

mod csv_exporter;
mod json_exporter;

pub use csv_exporter::{route_slug, CsvExporter, CSV_EXPORT_HEADERS};
pub use json_exporter::JsonExporter;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::error::AppError;
use crate::infrastructure::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// A finished download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub body: String,
}

impl ExportArtifact {
    pub fn new(format: ExportFormat, clock: &dyn Clock, body: String) -> Self {
        Self {
            file_name: artifact_file_name(format, clock),
            mime_type: format.mime_type().to_string(),
            body,
        }
    }
}

/// `exported-data-<UTC timestamp without separators>.<ext>`
pub fn artifact_file_name(format: ExportFormat, clock: &dyn Clock) -> String {
    let stamp = clock
        .now()
        .with_timezone(&Utc)
        .format("%Y%m%dT%H%M%S%3fZ");
    format!("exported-data-{}.{}", stamp, format.extension())
}

pub(crate) fn nothing_to_export() -> AppError {
    AppError::export_precondition(
        "Nothing to export",
        "There are no converted records yet. Convert a CSV file before exporting.",
    )
}
