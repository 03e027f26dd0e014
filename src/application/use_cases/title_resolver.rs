use std::sync::Arc;

use crate::domain::csv::{FieldMap, PatternSegment, TitlePattern, TitleToken};
use crate::infrastructure::clock::Clock;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Evaluates title patterns against one row of data
#[derive(Clone)]
pub struct TitlePatternResolver {
    clock: Arc<dyn Clock>,
}

impl TitlePatternResolver {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Produce a title for a row. `index` is 1-based, `headers` lower-cased.
    pub fn resolve(
        &self,
        pattern: &TitlePattern,
        row: &FieldMap,
        headers: &[String],
        index: usize,
    ) -> String {
        if pattern.is_blank() {
            return field(row, "title");
        }
        if !pattern.has_tokens() {
            return pattern.as_str().to_string();
        }

        let mut title = String::with_capacity(pattern.as_str().len());
        for segment in pattern.segments() {
            match segment {
                PatternSegment::Literal(text) => title.push_str(text),
                PatternSegment::Token(token) => {
                    title.push_str(self.resolve_token(token, row, headers, index).trim())
                }
            }
        }
        title
    }

    fn resolve_token(
        &self,
        token: &TitleToken,
        row: &FieldMap,
        headers: &[String],
        index: usize,
    ) -> String {
        match token {
            TitleToken::Title => field(row, "title"),
            TitleToken::Index => index.to_string(),
            TitleToken::Timestamp => self.clock.now().format(TIMESTAMP_FORMAT).to_string(),
            TitleToken::Column(name) | TitleToken::Header(name) => {
                lookup(row, headers, name, |header, wanted| header == wanted)
            }
            TitleToken::ColumnUnderscored(name) => {
                let value = lookup(row, headers, name, |header, wanted| {
                    underscored(header) == underscored(wanted)
                });
                if value.is_empty() {
                    // A positional header such as `column_3` is written the same way.
                    lookup(row, headers, &format!("column_{}", name), |header, wanted| {
                        header == wanted
                    })
                } else {
                    value
                }
            }
        }
    }
}

fn field(row: &FieldMap, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

/// Case-insensitive header lookup; empty when the name is blank or unknown
fn lookup<F>(row: &FieldMap, headers: &[String], name: &str, matches: F) -> String
where
    F: Fn(&str, &str) -> bool,
{
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return String::new();
    }

    headers
        .iter()
        .find(|header| matches(header.as_str(), wanted.as_str()))
        .map(|header| field(row, header))
        .unwrap_or_default()
}

fn underscored(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("_")
}
