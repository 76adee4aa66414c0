//! Naming utilities for schema_parity
//!
//! Identifier normalization helpers plus the naming conventions used when
//! model definitions are turned into a catalog.

use inflector::Inflector;

/// Strip one layer of identifier quoting.
///
/// Returns the bare identifier and whether it was quoted.
pub fn unquote_identifier(name: &str) -> (&str, bool) {
    let name = name.trim();
    let mut chars = name.chars();
    let (first, last) = match (chars.next(), name.chars().last()) {
        (Some(first), Some(last)) if name.len() >= 2 => (first, last),
        _ => return (name, false),
    };

    let quoted = matches!((first, last), ('"', '"') | ('`', '`') | ('[', ']'));
    if quoted {
        (&name[1..name.len() - 1], true)
    } else {
        (name, false)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply a naming convention to a string
pub fn apply_naming_convention(name: &str, convention: &str) -> String {
    match convention {
        "snake_case" => name.to_snake_case(),
        "camel_case" => name.to_camel_case(),
        "pascal_case" => name.to_pascal_case(),
        "kebab_case" => name.to_kebab_case(),
        "screaming_snake_case" => name.to_screaming_snake_case(),
        _ => name.to_string(),
    }
}

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get table name from a model name according to convention
pub fn get_table_name(model_name: &str, style: &str, pluralize: bool) -> String {
    let name = apply_naming_convention(model_name, style);

    if pluralize {
        match name.to_lowercase().as_str() {
            "person" => "people".to_string(),
            "child" => "children".to_string(),
            "man" => "men".to_string(),
            "woman" => "women".to_string(),
            _ => name.to_plural(),
        }
    } else {
        name
    }
}

/// Get column name from a field name according to convention
pub fn get_column_name(field_name: &str, style: &str) -> String {
    apply_naming_convention(field_name, style)
}

/// Name a constraint or index from a `{table}` / `{columns}` pattern
pub fn get_constraint_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let columns_str = columns.join("_");

    format_name(
        pattern,
        &[
            ("table", table_name),
            ("column", &columns_str),
            ("columns", &columns_str),
        ],
    )
}

/// Name a constraint the way ORMs do when no explicit name is given:
/// a prefix followed by a hash of the table and column names.
pub fn generated_constraint_name(prefix: &str, table_name: &str, columns: &[String]) -> String {
    let mut seed = format!("table`{}`", table_name);
    for column in columns {
        seed.push_str(&format!("column`{}`", column));
    }

    let hash = format!("{:x}", md5::compute(seed.as_bytes()));
    format!("{}{}", prefix, &hash[..25])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_handles_all_quote_styles() {
        assert_eq!(unquote_identifier("\"Orders\""), ("Orders", true));
        assert_eq!(unquote_identifier("`orders`"), ("orders", true));
        assert_eq!(unquote_identifier("[dbo]"), ("dbo", true));
        assert_eq!(unquote_identifier(" orders "), ("orders", false));
        assert_eq!(unquote_identifier("\""), ("\"", false));
    }

    #[test]
    fn generated_names_are_stable() {
        let columns = vec!["user_id".to_string()];
        let first = generated_constraint_name("FK", "orders", &columns);
        let second = generated_constraint_name("FK", "orders", &columns);
        assert_eq!(first, second);
        assert_eq!(first.len(), 27);
        assert!(first.starts_with("FK"));
    }

    #[test]
    fn patterns_are_filled() {
        assert_eq!(
            get_constraint_name("fk_{table}_{column}", "posts", &["author_id".to_string()]),
            "fk_posts_author_id"
        );
        assert_eq!(get_table_name("UserProfile", "snake_case", true), "user_profiles");
    }
}
