// ============================================================
// LINE PARSER
// ============================================================
// Tokenize one physical CSV line into trimmed fields

/// Comma-separated line tokenizer with double-quote quoting.
///
/// Quoted fields may contain commas and `""` escapes. A line is one physical
/// text line: quoted fields spanning several lines are not joined.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes && chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    fields.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        fields.push(current.trim().to_string());

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let fields = LineParser::new().parse_line("name,age,city");
        assert_eq!(fields, vec!["name", "age", "city"]);
    }

    #[test]
    fn test_trims_fields() {
        let fields = LineParser::new().parse_line("  Alice ,  30,NYC  ");
        assert_eq!(fields, vec!["Alice", "30", "NYC"]);
    }

    #[test]
    fn test_quoted_comma() {
        let fields = LineParser::new().parse_line(r#""Smith, John",42"#);
        assert_eq!(fields, vec!["Smith, John", "42"]);
    }

    #[test]
    fn test_escaped_quotes() {
        let fields = LineParser::new().parse_line(r#""He said ""hi""",x"#);
        assert_eq!(fields, vec![r#"He said "hi""#, "x"]);
    }

    #[test]
    fn test_empty_fields() {
        let fields = LineParser::new().parse_line("a,,c,");
        assert_eq!(fields, vec!["a", "", "c", ""]);
    }

    #[test]
    fn test_empty_line_yields_one_empty_field() {
        assert_eq!(LineParser::new().parse_line(""), vec![""]);
    }

    #[test]
    fn test_unterminated_quote_swallows_rest_of_line() {
        let fields = LineParser::new().parse_line(r#"a,"b,c"#);
        assert_eq!(fields, vec!["a", "b,c"]);
    }

    #[test]
    fn test_quote_inside_unquoted_field_toggles_state() {
        let fields = LineParser::new().parse_line(r#"ab"c,d"e,f"#);
        assert_eq!(fields, vec!["abc,de", "f"]);
    }
}
