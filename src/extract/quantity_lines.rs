//! Deterministic fallback extraction of `<product> - <N> units` lines.
//!
//! This backstop only fills quantities the delegated parser marked as
//! "unknown quantity"; it never overrides a confidently parsed value.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static QUANTITY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s*-\s*(\d+)\s*units$").unwrap());

/// Scans free-text body lines for explicit quantity statements. Returns a
/// map from trimmed product name to a normalized `"<n> units"` string.
/// Lines that do not match are ignored.
pub fn parse_quantity_lines(body: &str) -> HashMap<String, String> {
    let mut quantities = HashMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = QUANTITY_LINE.captures(line) {
            // Overlong digit runs fail to parse and the line is skipped.
            if let Ok(quantity) = caps[2].parse::<u32>() {
                quantities.insert(caps[1].trim().to_string(), format!("{} units", quantity));
            }
        }
    }
    quantities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quantity_and_ignores_non_matching_lines() {
        let body = "Widget A - 12 units\nnotes: please rush";
        let parsed = parse_quantity_lines(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["Widget A"], "12 units");
    }

    #[test]
    fn matches_case_insensitively_with_loose_spacing() {
        let body = "  Premium Gasket -  4 UNITS  \nBolt Set-2units";
        let parsed = parse_quantity_lines(body);
        assert_eq!(parsed["Premium Gasket"], "4 units");
        assert_eq!(parsed["Bolt Set"], "2 units");
    }

    #[test]
    fn product_name_may_itself_contain_a_dash() {
        let parsed = parse_quantity_lines("Heavy-Duty Clamp - 7 units");
        assert_eq!(parsed["Heavy-Duty Clamp"], "7 units");
    }

    #[test]
    fn normalizes_leading_zeros() {
        let parsed = parse_quantity_lines("Widget A - 007 units");
        assert_eq!(parsed["Widget A"], "7 units");
    }

    #[test]
    fn blank_body_and_unparseable_digits_yield_nothing() {
        assert!(parse_quantity_lines("").is_empty());
        assert!(parse_quantity_lines("\n  \n").is_empty());
        // u32 overflow
        assert!(parse_quantity_lines("Widget A - 99999999999999999999 units").is_empty());
    }
}
