// ============================================================
// TITLE PATTERN
// ============================================================
// `{token}` placeholder grammar for generated record titles

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

const COLUMN_COLON_PREFIX: &str = "column:";
const COLUMN_UNDERSCORE_PREFIX: &str = "column_";

/// A single `{...}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleToken {
    /// `{title}`
    Title,
    /// `{index}`, the 1-based row number
    Index,
    /// `{timestamp}`, local time as `YYYYMMDDHHmmss`
    Timestamp,
    /// `{column:Header}`
    Column(String),
    /// `{column_Header}`, underscores may stand in for spaces
    ColumnUnderscored(String),
    /// `{Header}`
    Header(String),
}

impl TitleToken {
    fn parse(inner: &str) -> Self {
        let inner = inner.trim();
        match inner.to_lowercase().as_str() {
            "title" => return TitleToken::Title,
            "index" => return TitleToken::Index,
            "timestamp" => return TitleToken::Timestamp,
            _ => {}
        }

        if let Some(rest) = strip_prefix_ignore_case(inner, COLUMN_COLON_PREFIX) {
            return TitleToken::Column(rest.trim().to_string());
        }
        if let Some(rest) = strip_prefix_ignore_case(inner, COLUMN_UNDERSCORE_PREFIX) {
            return TitleToken::ColumnUnderscored(rest.trim().to_string());
        }
        TitleToken::Header(inner.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    Literal(String),
    Token(TitleToken),
}

/// A parsed title pattern. Serializes as its raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TitlePattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl TitlePattern {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in TOKEN_PATTERN.captures_iter(raw) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(PatternSegment::Literal(raw[last..whole.start()].to_string()));
            }
            segments.push(PatternSegment::Token(TitleToken::parse(inner.as_str())));
            last = whole.end();
        }
        if last < raw.len() {
            segments.push(PatternSegment::Literal(raw[last..].to_string()));
        }

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Blank patterns fall back to the row's `title` field
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn has_tokens(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PatternSegment::Token(_)))
    }
}

impl From<String> for TitlePattern {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<TitlePattern> for String {
    fn from(pattern: TitlePattern) -> Self {
        pattern.raw
    }
}

impl Default for TitlePattern {
    fn default() -> Self {
        Self::parse("{title}")
    }
}

impl std::fmt::Display for TitlePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

/// Makes generated titles unique across one conversion pass.
///
/// The first occurrence of a title is kept as is; later ones get `-1`, `-2`,
/// ... in source order. A suffixed title that collides with one already
/// issued is bumped further.
#[derive(Debug, Default)]
pub struct TitleDeduplicator {
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl TitleDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, generated: String) -> String {
        let occurrence = {
            let count = self.counts.entry(generated.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let mut suffix = occurrence - 1;
        let mut candidate = if suffix == 0 {
            generated.clone()
        } else {
            format!("{}-{}", generated, suffix)
        };
        while self.issued.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}-{}", generated, suffix);
        }

        self.issued.insert(candidate.clone());
        candidate
    }
}
