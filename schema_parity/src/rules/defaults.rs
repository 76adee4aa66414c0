//! Default value normalization

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::dialect::DefaultValueRules;
use crate::rules::types::TypeCategory;
use crate::utils::naming::collapse_whitespace;

static TRAILING_CAST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<value>.+?)::[a-zA-Z_][a-zA-Z0-9_ ]*(\([0-9, ]*\))?(\[\])?$")
        .expect("cast regex is valid")
});

static KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\(\))?$").expect("keyword regex is valid"));

/// Normalize a raw default value.
///
/// On numeric columns a literal compares by value whether quoted or not. On
/// any other column a quoted literal is kept as written. `NULL` is the same
/// as no default, and bare keywords and niladic functions are case-folded.
/// Other expressions are opaque strings with collapsed whitespace.
pub fn normalize_default(
    raw: Option<&str>,
    category: TypeCategory,
    rules: &DefaultValueRules,
) -> Option<String> {
    let mut value = collapse_whitespace(raw?);

    loop {
        let before = value.clone();
        if rules.strip_parentheses {
            value = strip_wrapping_parentheses(&value);
        }
        if rules.strip_casts {
            if let Some(caps) = TRAILING_CAST.captures(&value) {
                value = caps["value"].trim().to_string();
            }
        }
        if value == before {
            break;
        }
    }

    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }

    if matches!(category, TypeCategory::Integer | TypeCategory::Decimal) {
        let unquoted = strip_string_quotes(&value);
        if let Some(number) = unquoted.and_then(canonical_number).or_else(|| canonical_number(&value)) {
            return Some(number);
        }
    }

    if KEYWORD.is_match(&value) {
        return Some(value.to_lowercase());
    }

    Some(value)
}

fn strip_wrapping_parentheses(value: &str) -> String {
    let mut current = value.trim();
    while current.starts_with('(') && current.ends_with(')') && wraps_whole(current) {
        current = current[1..current.len() - 1].trim();
    }
    current.to_string()
}

/// Whether the opening parenthesis at index 0 closes at the last character
fn wraps_whole(value: &str) -> bool {
    let mut depth = 0i32;
    let last = value.len() - 1;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn strip_string_quotes(value: &str) -> Option<&str> {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

fn canonical_number(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(int) = value.parse::<i64>() {
        return Some(int.to_string());
    }

    let looks_decimal = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        && value.chars().any(|c| c.is_ascii_digit());
    if looks_decimal && value.parse::<f64>().is_ok() {
        let unsigned = value.trim_start_matches('+');
        if !unsigned.contains('.') {
            return Some(unsigned.to_string());
        }
        let trimmed = unsigned.trim_end_matches('0').trim_end_matches('.');
        let trimmed = if trimmed.is_empty() || trimmed == "-" { "0" } else { trimmed };
        return Some(trimmed.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalize(raw: &str) -> Option<String> {
        normalize_default(Some(raw), TypeCategory::Text, &DefaultValueRules::default())
    }

    fn normalize_number(raw: &str) -> Option<String> {
        normalize_default(Some(raw), TypeCategory::Decimal, &DefaultValueRules::default())
    }

    #[test]
    fn quoted_and_bare_numbers_match() {
        assert_eq!(normalize_number("0"), normalize_number("'0'"));
        assert_eq!(normalize_number("((0))"), Some("0".to_string()));
        assert_eq!(normalize_number("10.50"), normalize_number("'10.5'"));
        assert_eq!(normalize_number("'0'::integer"), Some("0".to_string()));
    }

    #[rstest]
    #[case::leading_zeros("'007'", "'7'")]
    #[case::trailing_zeros("'1.50'", "'1.5'")]
    #[case::quoted_and_bare("'0'", "0")]
    fn text_literals_that_look_numeric_stay_distinct(#[case] left: &str, #[case] right: &str) {
        assert_ne!(normalize(left), normalize(right));
    }

    #[rstest]
    #[case::integer(TypeCategory::Integer)]
    #[case::decimal(TypeCategory::Decimal)]
    fn numeric_columns_compare_literals_by_value(#[case] category: TypeCategory) {
        let rules = DefaultValueRules::default();
        assert_eq!(
            normalize_default(Some("'007'"), category, &rules),
            normalize_default(Some("7"), category, &rules)
        );
    }

    #[test]
    fn casts_and_null_are_normalized() {
        assert_eq!(
            normalize("'active'::character varying"),
            Some("'active'".to_string())
        );
        assert_eq!(normalize("NULL"), None);
        assert_eq!(normalize("NULL::character varying"), None);
        assert_eq!(
            normalize_default(None, TypeCategory::Text, &DefaultValueRules::default()),
            None
        );
    }

    #[test]
    fn keywords_fold_and_expressions_stay_opaque() {
        assert_eq!(normalize("CURRENT_TIMESTAMP"), normalize("current_timestamp"));
        assert_eq!(normalize("NOW()"), Some("now()".to_string()));
        assert_eq!(
            normalize("nextval('orders_id_seq'::regclass)"),
            Some("nextval('orders_id_seq'::regclass)".to_string())
        );
        assert_ne!(normalize("'Active'"), normalize("'active'"));
    }

    #[test]
    fn parentheses_only_strip_when_wrapping() {
        assert_eq!(strip_wrapping_parentheses("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parentheses("((a + b))"), "a + b");
    }
}
