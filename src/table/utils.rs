/// Spellings the exporter (and most dataframe libraries) use for a missing value.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// True if `cell` holds no value.
pub fn is_null(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell.trim())
}

/// Parse a cell as a float sort/shift key. `None` for nulls and non-numbers.
pub fn parse_number(cell: &str) -> Option<f64> {
    let s = cell.trim();
    if is_null(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Prefix of every header synthesized for a blank one.
pub const UNNAMED_PREFIX: &str = "Unnamed: ";

/// Header name given to a blank header at `position`.
pub fn unnamed_header(position: usize) -> String {
    format!("{}{}", UNNAMED_PREFIX, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_null_spellings() {
        for s in ["", " ", "NaN", "nan", "NA", "null", "<NA>"] {
            assert!(is_null(s), "{:?} should be null", s);
        }
        for s in ["0", "oDU", "none at all", "-"] {
            assert!(!is_null(s), "{:?} should not be null", s);
        }
    }

    #[test]
    fn parses_numbers_but_not_nulls() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("1.5e3"), Some(1500.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("oCU-UP"), None);
    }
}
