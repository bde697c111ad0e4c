//! Shared helpers for the heuristic parsers: label patterns, date and
//! number coercion, column-alias resolution.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::models::{RowRecord, TableBlock};

/// Accepted date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];

/// Compile label patterns as case-insensitive, multiline regexes.
///
/// Patterns are static literals; an invalid one is a programming error.
pub(crate) fn label_patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|src| {
            RegexBuilder::new(src)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .unwrap_or_else(|e| panic!("invalid label pattern {:?}: {}", src, e))
        })
        .collect()
}

/// First capture group of the first matching pattern, trimmed.
///
/// A capture that trims to empty counts as not found.
pub(crate) fn find_first(patterns: &[Regex], text: &str) -> Option<String> {
    for re in patterns {
        if let Some(caps) = re.captures(text) {
            let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if value.is_empty() {
                return None;
            }
            return Some(value.to_string());
        }
    }
    None
}

/// Normalize a loosely formatted date to `YYYY-MM-DD`.
///
/// Everything except digits, `/`, `-`, and `.` is stripped before trying
/// each layout in [`DATE_FORMATS`]. Returns `None` when nothing parses.
pub fn parse_date(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '/' | '-' | '.'))
        .collect();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Coerce a cell to `f64`, stripping thousands separators.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.replace(',', "").parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Resolve a logical column against actual column names.
///
/// Exact (case-insensitive, trimmed) alias match first; then the first
/// alias that appears as a substring of a column name, with `_` treated as
/// a space on both sides.
pub fn pick_key<'a, I>(keys: I, aliases: &[&str]) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let lowered: Vec<(String, &String)> = keys
        .into_iter()
        .map(|k| (k.trim().to_lowercase(), k))
        .collect();

    for alias in aliases {
        let alias = alias.to_lowercase();
        if let Some((_, orig)) = lowered.iter().find(|(lk, _)| *lk == alias) {
            return Some((*orig).clone());
        }
    }
    for alias in aliases {
        let needle = alias.to_lowercase().replace('_', " ");
        if let Some((_, orig)) = lowered
            .iter()
            .find(|(lk, _)| lk.replace('_', " ").contains(&needle))
        {
            return Some((*orig).clone());
        }
    }
    None
}

/// All rows of all tables, in order.
pub(crate) fn table_rows(tables: &[TableBlock]) -> Vec<&RowRecord> {
    tables.iter().flat_map(|t| t.rows.iter()).collect()
}

/// Render a scalar cell as trimmed text; `null` becomes empty.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dates_normalize_across_layouts() {
        assert_eq!(parse_date("15/03/2024").as_deref(), Some("2024-03-15"));
        assert_eq!(parse_date("2024-03-15").as_deref(), Some("2024-03-15"));
        assert_eq!(parse_date("15-03-2024").as_deref(), Some("2024-03-15"));
        assert_eq!(parse_date("03/25/2024").as_deref(), Some("2024-03-25"));
        assert_eq!(parse_date("15.03.2024").as_deref(), Some("2024-03-15"));
        assert_eq!(parse_date(" 15/03/2024 (Fri)").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn unparsable_dates_are_none() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("31/31/2024"), None);
    }

    #[test]
    fn floats_strip_thousands_separators() {
        assert_eq!(to_float(&json!("1,250.50")), Some(1250.5));
        assert_eq!(to_float(&json!(2)), Some(2.0));
        assert_eq!(to_float(&json!(" 10.50 ")), Some(10.5));
        assert_eq!(to_float(&json!("ten")), None);
        assert_eq!(to_float(&json!("")), None);
        assert_eq!(to_float(&Value::Null), None);
        assert_eq!(to_float(&json!(true)), None);
    }

    #[test]
    fn pick_key_prefers_exact_then_loose() {
        let keys: Vec<String> = vec!["Line Total".into(), "Qty".into(), "unit_price".into()];
        assert_eq!(pick_key(&keys, &["qty", "quantity"]).as_deref(), Some("Qty"));
        assert_eq!(
            pick_key(&keys, &["rate", "price", "unit price"]).as_deref(),
            Some("unit_price")
        );
        assert_eq!(
            pick_key(&keys, &["amount", "total", "line_total"]).as_deref(),
            Some("Line Total")
        );
        assert_eq!(pick_key(&keys, &["sku"]), None);
    }

    #[test]
    fn find_first_treats_blank_capture_as_missing() {
        let pats = label_patterns(&[r"Supplier[ \t]*[:\-][ \t]*([^\n]*)"]);
        assert_eq!(find_first(&pats, "Supplier:   \nother"), None);
        assert_eq!(
            find_first(&pats, "supplier - ACME Ltd  ").as_deref(),
            Some("ACME Ltd")
        );
    }
}
