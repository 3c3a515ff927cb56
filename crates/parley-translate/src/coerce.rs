use std::sync::LazyLock;

use parley_query::{FilterValue, Scalar};
use regex::Regex;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

/// Coerce a literal into the narrowest scalar that represents it.
///
/// Integers first, then decimals with at most one point, then `true`/`false`
/// in any case; everything else stays text.
pub fn coerce(literal: &str) -> Scalar {
    let literal = literal.trim();

    if INTEGER.is_match(literal) {
        if let Ok(v) = literal.parse::<i64>() {
            return Scalar::Int(v);
        }
    }

    if is_decimal(literal) {
        if let Ok(v) = literal.parse::<f64>() {
            return Scalar::Float(v);
        }
    }

    match literal.to_ascii_lowercase().as_str() {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => Scalar::Text(literal.to_string()),
    }
}

/// Coerce for use in a filter: text becomes a case-insensitive substring match.
pub fn coerce_filter(literal: &str) -> FilterValue {
    FilterValue::from_scalar(coerce(literal))
}

/// Trim whitespace and surrounding quote characters.
pub fn unquote(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
}

fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let mut points = 0;
    let mut digits = 0;
    for ch in unsigned.chars() {
        match ch {
            '.' => points += 1,
            c if c.is_ascii_digit() => digits += 1,
            _ => return false,
        }
    }
    points <= 1 && digits > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(coerce("42"), Scalar::Int(42));
        assert_eq!(coerce("-7"), Scalar::Int(-7));
        assert_eq!(coerce(" 0 "), Scalar::Int(0));
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        assert_eq!(coerce("99999999999999999999"), Scalar::Float(1e20));
    }

    #[test]
    fn decimals() {
        assert_eq!(coerce("3.5"), Scalar::Float(3.5));
        assert_eq!(coerce("-0.25"), Scalar::Float(-0.25));
        assert_eq!(coerce(".5"), Scalar::Float(0.5));
    }

    #[test]
    fn two_points_stay_text() {
        assert_eq!(coerce("1.2.3"), Scalar::Text("1.2.3".into()));
        assert_eq!(coerce("."), Scalar::Text(".".into()));
    }

    #[test]
    fn booleans_any_case() {
        for (input, expected) in [("true", true), ("FALSE", false), ("True", true)] {
            assert_eq!(coerce(input), Scalar::Bool(expected), "{input}");
        }
    }

    #[test]
    fn everything_else_is_text() {
        assert_eq!(coerce("active"), Scalar::Text("active".into()));
        assert_eq!(coerce("1e5"), Scalar::Text("1e5".into()));
        assert_eq!(coerce("yes"), Scalar::Text("yes".into()));
    }

    #[test]
    fn rendering_numbers_reproduces_value() {
        for input in ["17", "-3", "2.75", "100.0"] {
            let rendered = coerce(input).to_string();
            assert_eq!(
                rendered.parse::<f64>().unwrap(),
                input.parse::<f64>().unwrap(),
                "{input}"
            );
        }
    }

    #[test]
    fn filter_wraps_text_only() {
        assert!(matches!(coerce_filter("fantasy"), FilterValue::Matches(_)));
        assert_eq!(coerce_filter("12"), FilterValue::Exact(Scalar::Int(12)));
    }

    #[test]
    fn unquote_strips_quotes_and_space() {
        assert_eq!(unquote("  'Clean Code' "), "Clean Code");
        assert_eq!(unquote("\"Dune\""), "Dune");
        assert_eq!(unquote("plain"), "plain");
    }
}
