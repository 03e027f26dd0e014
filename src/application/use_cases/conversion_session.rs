// ============================================================
// CONVERSION SESSION USE CASE
// ============================================================
// Owns the per-session state (file, sections, column map, title
// pattern, last record set) and runs Convert / Export against it.
// Callers serialize access; nothing in here locks.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::application::use_cases::export::{
    CsvExporter, ExportArtifact, ExportFormat, JsonExporter,
};
use crate::application::use_cases::record_builder::RecordBuilder;
use crate::application::use_cases::title_resolver::TitlePatternResolver;
use crate::domain::csv::{
    ConversionConfig, PreviewMode, Record, Section, SectionRegistry, StatusMessage, TitlePattern,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::csv::{CsvParser, HeaderResolver};
use crate::infrastructure::file_source::{validate_csv_source, FileSource};

/// Outcome of a successful Convert
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub record_count: usize,
    pub headers: Vec<String>,
    pub processing_time_ms: u64,
    pub status: StatusMessage,
}

/// Serializable view of the session for the UI shell
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub sections: Vec<Section>,
    pub column_map: BTreeMap<String, String>,
    pub title_pattern: String,
    pub record_count: usize,
}

pub struct ConversionSession {
    config: ConversionConfig,
    clock: Arc<dyn Clock>,
    resolver: TitlePatternResolver,
    source: Option<Arc<dyn FileSource>>,
    fingerprint: Option<String>,
    headers: Vec<String>,
    registry: SectionRegistry,
    pattern: TitlePattern,
    records: Vec<Record>,
}

impl ConversionSession {
    pub fn new(config: ConversionConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = SectionRegistry::new(&config.default_section_name);
        let pattern = TitlePattern::parse(&config.default_title_pattern);
        Self {
            resolver: TitlePatternResolver::new(clock.clone()),
            clock,
            source: None,
            fingerprint: None,
            headers: Vec::new(),
            registry,
            pattern,
            records: Vec::new(),
            config,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn title_pattern(&self) -> &TitlePattern {
        &self.pattern
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            file_name: self.source.as_ref().map(|s| s.file_name().to_string()),
            headers: self.headers.clone(),
            sections: self.registry.sections().to_vec(),
            column_map: self.registry.column_map().clone(),
            title_pattern: self.pattern.as_str().to_string(),
            record_count: self.records.len(),
        }
    }

    /// Select a file and detect its headers from a bounded prefix.
    ///
    /// A different file resets sections, column map, pattern and records;
    /// re-selecting the same file keeps them. An empty header list means no
    /// columns were detected.
    pub async fn load_file(&mut self, source: Arc<dyn FileSource>) -> Result<Vec<String>> {
        validate_csv_source(source.as_ref())?;

        let prefix = source.read_prefix(self.config.header_prefix_bytes).await?;
        let headers = HeaderResolver::new().resolve_prefix(&prefix, self.config.header_prefix_bytes);
        let fingerprint = file_fingerprint(source.file_name(), &prefix);

        if self.fingerprint.as_deref() != Some(fingerprint.as_str()) {
            debug!(file = source.file_name(), "New file selected, resetting session layout");
            self.reset_layout();
        }

        info!(
            file = source.file_name(),
            header_count = headers.len(),
            "CSV file loaded"
        );
        if headers.is_empty() {
            warn!(file = source.file_name(), "No columns detected");
        }

        self.source = Some(source);
        self.fingerprint = Some(fingerprint);
        self.headers = headers.clone();
        Ok(headers)
    }

    pub fn set_title_pattern(&mut self, pattern: &str) {
        self.pattern = TitlePattern::parse(pattern);
    }

    pub fn add_section(&mut self, name: &str) -> Option<Section> {
        let added = self.registry.add(name).cloned();
        if let Some(section) = &added {
            info!(section_id = %section.id, name = %section.name, "Section added");
        }
        added
    }

    pub fn rename_section(&mut self, id: &str, new_name: &str) -> Result<()> {
        self.registry.rename(id, new_name)?;
        info!(section_id = id, name = new_name.trim(), "Section renamed");
        Ok(())
    }

    pub fn remove_section(&mut self, id: &str) -> Result<Section> {
        let removed = self.registry.remove(id)?;
        info!(
            section_id = %removed.id,
            fallback = self.registry.fallback_id().unwrap_or_default(),
            "Section removed, columns reassigned"
        );
        Ok(removed)
    }

    pub fn assign_column(&mut self, header: &str, section_id: &str) -> Result<()> {
        self.registry.assign(header, section_id)
    }

    /// Replace the section layout with a stored one.
    ///
    /// An invalid layout leaves the current one in place.
    pub fn restore_sections(
        &mut self,
        sections: Vec<Section>,
        column_map: BTreeMap<String, String>,
    ) -> Result<()> {
        self.registry =
            SectionRegistry::from_parts(&self.config.default_section_name, sections, column_map)?;
        info!(section_count = self.registry.len(), "Section layout restored");
        Ok(())
    }

    /// Full-file parse into a fresh record set.
    ///
    /// On failure the previous record set is left untouched.
    pub async fn convert(&mut self) -> Result<ConversionSummary> {
        let source = self.source.clone().ok_or_else(|| {
            AppError::ValidationError("Please select a CSV file first".to_string())
        })?;
        let bytes = source.read_all().await?;
        self.convert_bytes(&bytes)
    }

    fn convert_bytes(&mut self, bytes: &[u8]) -> Result<ConversionSummary> {
        let start = Instant::now();

        let parsed = CsvParser::new().parse_bytes(bytes)?;
        self.registry.ensure_fallback();

        let records = RecordBuilder::new(&parsed.headers, &self.registry, &self.pattern, &self.resolver)
            .map(|builder| builder.build_all(parsed.rows))
            .map_err(|err| {
                error!(error = %err, "Conversion failed");
                AppError::UnexpectedParse(err.to_string())
            })?;

        let record_count = records.len();
        let processing_time_ms = start.elapsed().as_millis() as u64;
        self.headers = parsed.headers;
        self.records = records;

        info!(record_count, processing_time_ms, "Conversion finished");

        Ok(ConversionSummary {
            record_count,
            headers: self.headers.clone(),
            processing_time_ms,
            status: StatusMessage::success(format!(
                "Converted {} record{}",
                record_count,
                if record_count == 1 { "" } else { "s" }
            )),
        })
    }

    /// Records shown in the given preview mode
    pub fn preview(&self, mode: PreviewMode) -> &[Record] {
        let limit = match mode {
            PreviewMode::Table => self.config.preview_table_rows,
            PreviewMode::Json => self.config.preview_json_rows,
        };
        &self.records[..self.records.len().min(limit)]
    }

    pub fn export_json(&self) -> Result<ExportArtifact> {
        let body = JsonExporter::new().export(&self.records).map_err(|err| {
            warn!(error = %err, "JSON export blocked");
            err
        })?;
        info!(record_count = self.records.len(), "Exported JSON");
        Ok(ExportArtifact::new(ExportFormat::Json, self.clock.as_ref(), body))
    }

    pub fn export_csv(&self) -> Result<ExportArtifact> {
        let exporter = CsvExporter::new(self.resolver.clone(), self.clock.clone());
        let body = exporter
            .export(&self.records, &self.registry, &self.pattern)
            .map_err(|err| {
                warn!(error = %err, "CSV export blocked");
                err
            })?;
        info!(record_count = self.records.len(), "Exported CSV");
        Ok(ExportArtifact::new(ExportFormat::Csv, self.clock.as_ref(), body))
    }

    /// Forget the file and every edit made to this session
    pub fn reset(&mut self) {
        self.source = None;
        self.fingerprint = None;
        self.headers.clear();
        self.reset_layout();
    }

    fn reset_layout(&mut self) {
        self.registry = SectionRegistry::new(&self.config.default_section_name);
        self.pattern = TitlePattern::parse(&self.config.default_title_pattern);
        self.records.clear();
    }
}

fn file_fingerprint(file_name: &str, prefix: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(prefix);
    hex::encode(hasher.finalize())
}
