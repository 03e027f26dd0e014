use chrono::{SecondsFormat, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::application::use_cases::title_resolver::TitlePatternResolver;
use crate::domain::csv::{Record, SectionRegistry, TitlePattern};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::clock::Clock;

use super::nothing_to_export;

static SLUG_STRIP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());

static WHITESPACE_RUN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub const CSV_EXPORT_HEADERS: [&str; 10] = [
    "content",
    "title",
    "route_url",
    "published_at",
    "data",
    "status",
    "sites",
    "locale",
    "taxonomy_terms",
    "created_at",
];

const STATUS_PUBLISHED: &str = "1";
const LOCALE: &str = "en";

/// Flattened CSV envelope for content import
#[derive(Clone)]
pub struct CsvExporter {
    resolver: TitlePatternResolver,
    clock: Arc<dyn Clock>,
}

impl CsvExporter {
    pub fn new(resolver: TitlePatternResolver, clock: Arc<dyn Clock>) -> Self {
        Self { resolver, clock }
    }

    pub fn export(
        &self,
        records: &[Record],
        registry: &SectionRegistry,
        pattern: &TitlePattern,
    ) -> Result<String> {
        if records.is_empty() {
            return Err(nothing_to_export());
        }
        if registry.is_empty() {
            return Err(AppError::export_precondition(
                "No sections defined",
                "Add at least one section before exporting to CSV.",
            ));
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(CSV_EXPORT_HEADERS).map_err(write_error)?;

        for (idx, record) in records.iter().enumerate() {
            let route_url = self.route_url(record, pattern, idx + 1);
            let data = serde_json::to_string(&record.data)?;
            let published_at = self.timestamp();
            let created_at = self.timestamp();

            writer
                .write_record([
                    record.content.as_str(),
                    record.title.as_str(),
                    route_url.as_str(),
                    published_at.as_str(),
                    data.as_str(),
                    STATUS_PUBLISHED,
                    "",
                    LOCALE,
                    "",
                    created_at.as_str(),
                ])
                .map_err(write_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV export: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("CSV export is not valid UTF-8: {}", e)))
    }

    /// `/<content>/<slug>`, with the slug taken from the title pattern
    /// evaluated against the record's flattened data
    pub fn route_url(&self, record: &Record, pattern: &TitlePattern, index: usize) -> String {
        let flat = record.flatten();
        let mut headers: Vec<String> = flat.keys().cloned().collect();
        headers.sort();

        let resolved = self.resolver.resolve(pattern, &flat, &headers, index);
        let source = if resolved.trim().is_empty() {
            record.title.as_str()
        } else {
            resolved.as_str()
        };

        format!("/{}/{}", record.content, route_slug(source))
    }

    fn timestamp(&self) -> String {
        self.clock
            .now()
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Lower-case, strip anything but word characters, spaces and hyphens,
/// then join whitespace runs with single hyphens
pub fn route_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = SLUG_STRIP_PATTERN.replace_all(&lowered, "");
    WHITESPACE_RUN_PATTERN
        .replace_all(stripped.trim(), "-")
        .to_string()
}

fn write_error(err: csv::Error) -> AppError {
    AppError::Internal(format!("Failed to write CSV export: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::SectionData;
    use crate::infrastructure::clock::FixedClock;
    use chrono::{Local, TimeZone};
    use std::collections::BTreeMap;

    fn exporter() -> CsvExporter {
        let instant = Utc
            .with_ymd_and_hms(2026, 10, 19, 8, 30, 15)
            .single()
            .unwrap()
            .with_timezone(&Local);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant));
        CsvExporter::new(TitlePatternResolver::new(clock.clone()), clock)
    }

    fn record(title: &str, content: &str, name: &str) -> Record {
        Record {
            title: title.to_string(),
            content: content.to_string(),
            data: BTreeMap::from([(
                "main".to_string(),
                SectionData::from([("name".to_string(), name.to_string())]),
            )]),
        }
    }

    fn read_rows(output: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_route_slug() {
        assert_eq!(route_slug("Hello, World!"), "hello-world");
        assert_eq!(route_slug("  Many   spaces\there "), "many-spaces-here");
        assert_eq!(route_slug("keep-hyphens_and_underscores"), "keep-hyphens_and_underscores");
        assert_eq!(route_slug("Café & Co"), "caf-co");
    }

    #[test]
    fn test_blocked_without_records() {
        let registry = SectionRegistry::new("main");
        let err = exporter()
            .export(&[], &registry, &TitlePattern::default())
            .unwrap_err();
        assert!(matches!(err, AppError::ExportPrecondition { .. }));
    }

    #[test]
    fn test_blocked_without_sections() {
        let registry = SectionRegistry::from_parts("main", Vec::new(), BTreeMap::new()).unwrap();
        let records = vec![record("A", "blog", "Alice")];
        let err = exporter()
            .export(&records, &registry, &TitlePattern::default())
            .unwrap_err();
        match err {
            AppError::ExportPrecondition { title, .. } => assert_eq!(title, "No sections defined"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_fields() {
        let registry = SectionRegistry::new("main");
        let records = vec![record("Alice Smith", "people", "Alice \"Al\" Smith")];
        let pattern = TitlePattern::parse("{column:name}");

        let output = exporter().export(&records, &registry, &pattern).unwrap();
        let rows = read_rows(&output);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], CSV_EXPORT_HEADERS.to_vec());

        let row = &rows[1];
        assert_eq!(row[0], "people");
        assert_eq!(row[1], "Alice Smith");
        assert_eq!(row[2], "/people/alice-al-smith");
        assert_eq!(row[3], "2026-10-19T08:30:15.000Z");
        assert_eq!(row[4], r#"{"main":{"name":"Alice \"Al\" Smith"}}"#);
        assert_eq!(row[5], "1");
        assert_eq!(row[6], "");
        assert_eq!(row[7], "en");
        assert_eq!(row[8], "");
        assert_eq!(row[9], "2026-10-19T08:30:15.000Z");
    }

    #[test]
    fn test_every_field_is_quoted() {
        let registry = SectionRegistry::new("main");
        let records = vec![record("T", "c", "n")];
        let output = exporter()
            .export(&records, &registry, &TitlePattern::default())
            .unwrap();

        let data_line = output.lines().nth(1).unwrap();
        assert!(data_line.starts_with("\"c\",\"T\","));
        assert!(data_line.contains(",\"\",\"en\",\"\","));
        assert!(output.lines().next().unwrap().starts_with("\"content\",\"title\""));
    }

    #[test]
    fn test_route_falls_back_to_stored_title() {
        let registry = SectionRegistry::new("main");
        let records = vec![record("Stored Title", "docs", "x")];
        let pattern = TitlePattern::parse("{column:missing}");

        let output = exporter().export(&records, &registry, &pattern).unwrap();
        let rows = read_rows(&output);
        assert_eq!(rows[1][2], "/docs/stored-title");
    }

    #[test]
    fn test_route_uses_record_position_for_index() {
        let exporter = exporter();
        let pattern = TitlePattern::parse("item {index}");
        let record = record("x", "list", "y");
        assert_eq!(exporter.route_url(&record, &pattern, 3), "/list/item-3");
    }

    #[test]
    fn test_timestamps_are_sampled_per_record() {
        use crate::infrastructure::clock::SteppingClock;

        let start = Utc
            .with_ymd_and_hms(2026, 10, 19, 8, 30, 15)
            .single()
            .unwrap()
            .with_timezone(&Local);
        let clock: Arc<dyn Clock> =
            Arc::new(SteppingClock::new(start, chrono::Duration::seconds(1)));
        let exporter = CsvExporter::new(TitlePatternResolver::new(clock.clone()), clock);
        let registry = SectionRegistry::new("main");
        let records = vec![record("A", "blog", "Ada"), record("B", "blog", "Bea")];

        let output = exporter
            .export(&records, &registry, &TitlePattern::default())
            .unwrap();
        let rows = read_rows(&output);

        assert_eq!(rows[1][3], "2026-10-19T08:30:15.000Z");
        assert_eq!(rows[1][9], "2026-10-19T08:30:16.000Z");
        assert_ne!(rows[1][3], rows[2][3]);
        assert_eq!(rows[2][3], "2026-10-19T08:30:17.000Z");
    }
}
