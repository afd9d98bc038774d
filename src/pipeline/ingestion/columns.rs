/// Columns every raw batch must provide after header mapping.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "sector",
    "last_name",
    "first_name",
    "salary",
    "benefits",
    "employer",
    "job_title",
];

/// Map a trimmed, lower-cased header to its standard column name.
pub fn canonical_column(header: &str) -> Option<&'static str> {
    let column = match header {
        "sector" => "sector",
        "last name" | "surname" | "last_name" => "last_name",
        "first name" | "first_name" => "first_name",
        "salary paid" | "salary" => "salary",
        "taxable benefits" | "benefits" => "benefits",
        "employer" => "employer",
        "job title" | "position" | "job_title" | "jobtitle" => "job_title",
        "year" | "calendar year" => "year",
        _ => return None,
    };
    Some(column)
}

/// Outcome of parsing one currency cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedAmount {
    Value(f64),
    /// Not a finite, non-negative amount. Reads as zero.
    Malformed,
}

impl ParsedAmount {
    pub fn value(self) -> f64 {
        match self {
            ParsedAmount::Value(value) => value,
            ParsedAmount::Malformed => 0.0,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ParsedAmount::Malformed)
    }
}

/// Parse a disclosed currency amount such as `"$123,456.78"`.
/// Blank cells and `"-"` are zero.
pub fn parse_currency(raw: &str) -> ParsedAmount {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return ParsedAmount::Value(0.0);
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => ParsedAmount::Value(value),
        _ => ParsedAmount::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_dictionary() {
        assert_eq!(canonical_column("surname"), Some("last_name"));
        assert_eq!(canonical_column("salary paid"), Some("salary"));
        assert_eq!(canonical_column("taxable benefits"), Some("benefits"));
        assert_eq!(canonical_column("position"), Some("job_title"));
        assert_eq!(canonical_column("calendar year"), Some("year"));
        assert_eq!(canonical_column("notes"), None);
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$123,456.78"), ParsedAmount::Value(123_456.78));
        assert_eq!(parse_currency("  $ 1,000 "), ParsedAmount::Value(1000.0));
        assert_eq!(parse_currency("105000"), ParsedAmount::Value(105_000.0));
        assert_eq!(parse_currency(""), ParsedAmount::Value(0.0));
        assert_eq!(parse_currency("-"), ParsedAmount::Value(0.0));
        assert_eq!(parse_currency(" $- "), ParsedAmount::Value(0.0));
    }

    #[test]
    fn test_parse_currency_rejects_malformed() {
        assert_eq!(parse_currency("n/a"), ParsedAmount::Malformed);
        assert_eq!(parse_currency("-500"), ParsedAmount::Malformed);
        assert_eq!(parse_currency("inf"), ParsedAmount::Malformed);
        assert_eq!(parse_currency("NaN"), ParsedAmount::Malformed);
        assert_eq!(parse_currency("n/a").value(), 0.0);
        assert!(parse_currency("-500").is_malformed());
    }
}
