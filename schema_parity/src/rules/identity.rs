//! Identity keys
//!
//! An identity key decides whether objects from two catalogs denote the same
//! structural element.

use regex::Regex;

use crate::catalog::types::{Constraint, ConstraintKind, Index, TableRef};
use crate::error::{Error, Result};
use crate::rules::dialect::{CaseFolding, Dialect};
use crate::utils::naming::{collapse_whitespace, unquote_identifier};

/// Patterns recognising names that databases and ORMs generate on their own
pub const DEFAULT_AUTO_NAME_PATTERNS: &[&str] = &[
    // Hibernate: FK/UK + hash
    r"(?i)^(fk|uk|pk|idx)[0-9a-z]{20,}$",
    // H2
    r"(?i)^(constraint|primary_key|fk|uk)_[0-9a-f]{1,}$",
    r"(?i)^constraint_index_[0-9a-z]+$",
    // PostgreSQL
    r"(?i)^.+_(pkey|fkey|key|check|excl)$",
    // SQLite
    r"(?i)^sqlite_autoindex_.+$",
    // MySQL
    r"(?i)^primary$",
    r"(?i)^sys_(c|idx_|pk_|fk_)[0-9a-z_]+$",
];

/// Normalize an identifier for comparison under a dialect.
///
/// An unquoted name is stored in the dialect's folded case. A stored name
/// that equals its own fold can be written without quotes, so it gets the
/// shared lower-case key. Any other stored name is case-sensitive and keeps
/// its case inside double quotes, which keeps it apart from folded keys
/// (`"orders"` and `ORDERS` are different tables in H2).
///
/// Case-sensitive dialects treat all-lower-case names as the shared form.
pub fn identity_key(name: &str, dialect: &Dialect) -> String {
    let folding = dialect.case_folding;
    let (bare, quoted) = unquote_identifier(name);
    let stored = if quoted {
        bare.to_string()
    } else {
        folding.fold(bare)
    };

    let insensitive = match folding {
        CaseFolding::Preserve => stored == stored.to_lowercase(),
        _ => stored == folding.fold(&stored),
    };
    if insensitive {
        stored.to_lowercase()
    } else {
        format!("\"{}\"", stored)
    }
}

/// Schema identity: `None` is the dialect's default schema.
///
/// Default schemas of different dialects (`public`, `main`, `PUBLIC`) line up.
pub fn schema_key(name: &str, dialect: &Dialect) -> Option<String> {
    if dialect.is_default_schema(name) {
        None
    } else {
        Some(identity_key(name, dialect))
    }
}

/// Identity key of a foreign key target, with the default schema omitted
pub fn table_ref_key(table_ref: &TableRef, dialect: &Dialect) -> String {
    let table = identity_key(&table_ref.table, dialect);
    match table_ref.schema.as_deref().and_then(|s| schema_key(s, dialect)) {
        Some(schema) => format!("{}.{}", schema, table),
        None => table,
    }
}

fn column_list(columns: &[String], dialect: &Dialect) -> String {
    columns
        .iter()
        .map(|c| identity_key(c, dialect))
        .collect::<Vec<_>>()
        .join(",")
}

/// Structural identity of an index: uniqueness plus ordered columns
pub fn index_signature(index: &Index, dialect: &Dialect) -> String {
    let prefix = if index.unique { "unique index" } else { "index" };
    format!("{}({})", prefix, column_list(&index.columns, dialect))
}

/// Structural identity of a constraint.
///
/// A table has at most one primary key, so its columns are an attribute
/// rather than part of its identity.
pub fn constraint_signature(constraint: &Constraint, dialect: &Dialect) -> String {
    match &constraint.kind {
        ConstraintKind::PrimaryKey => "primary key".to_string(),
        ConstraintKind::Unique => {
            format!("unique({})", column_list(&constraint.columns, dialect))
        }
        ConstraintKind::ForeignKey {
            references,
            referenced_columns,
            ..
        } => format!(
            "foreign key({}) references {}({})",
            column_list(&constraint.columns, dialect),
            table_ref_key(references, dialect),
            column_list(referenced_columns, dialect)
        ),
        ConstraintKind::Check { expression } => {
            format!("check({})", collapse_whitespace(expression).to_lowercase())
        }
    }
}

/// Predicate deciding whether an index or constraint name was generated
/// rather than chosen
#[derive(Debug, Clone)]
pub struct AutoNamePredicate {
    patterns: Vec<Regex>,
}

impl AutoNamePredicate {
    /// Compile the given patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    Error::ConfigError(format!("Invalid auto-name pattern '{}': {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// A predicate that treats every present name as significant
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_generated(&self, name: &str) -> bool {
        let (bare, _) = unquote_identifier(name);
        self.patterns.iter().any(|p| p.is_match(bare))
    }

    /// The name's identity key if it is present and significant
    pub fn significant_name(&self, name: Option<&str>, dialect: &Dialect) -> Option<String> {
        name.filter(|n| !n.trim().is_empty() && !self.is_generated(n))
            .map(|n| identity_key(n, dialect))
    }
}

impl Default for AutoNamePredicate {
    fn default() -> Self {
        let patterns = DEFAULT_AUTO_NAME_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { patterns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn identity_key_folds_unquoted_names() {
        let h2 = Dialect::h2();
        assert_eq!(identity_key("ORDERS", &h2), "orders");
        assert_eq!(identity_key("orders", &h2), "orders");
        assert_eq!(identity_key("\"Orders\"", &h2), "\"Orders\"");

        let mut sensitive = Dialect::generic("sensitive");
        sensitive.case_folding = CaseFolding::Preserve;
        assert_eq!(identity_key("Orders", &sensitive), "\"Orders\"");
        assert_eq!(identity_key("orders", &sensitive), "orders");
    }

    #[rstest]
    #[case::h2_quoted_in_stored_case(Dialect::h2(), "\"ORDERS\"", "ORDERS")]
    #[case::h2_quoted_and_unquoted(Dialect::h2(), "\"ORDERS\"", "orders")]
    #[case::postgres_quoted_in_stored_case(Dialect::postgres(), "\"orders\"", "ORDERS")]
    fn names_in_the_stored_case_are_the_same_object(
        #[case] dialect: Dialect,
        #[case] left: &str,
        #[case] right: &str,
    ) {
        assert_eq!(identity_key(left, &dialect), identity_key(right, &dialect));
    }

    #[rstest]
    #[case::h2_lower_case_quoted(Dialect::h2(), "\"orders\"", "ORDERS")]
    #[case::h2_mixed_case_quoted(Dialect::h2(), "\"Orders\"", "\"ORDERS\"")]
    #[case::postgres_upper_case_quoted(Dialect::postgres(), "\"ORDERS\"", "orders")]
    fn quoted_names_outside_the_stored_case_stay_distinct(
        #[case] dialect: Dialect,
        #[case] left: &str,
        #[case] right: &str,
    ) {
        assert_ne!(identity_key(left, &dialect), identity_key(right, &dialect));
    }

    #[test]
    fn case_sensitive_names_align_across_dialects() {
        assert_eq!(
            identity_key("\"Orders\"", &Dialect::h2()),
            identity_key("\"Orders\"", &Dialect::postgres())
        );
        assert_eq!(
            identity_key("\"ORDERS\"", &Dialect::h2()),
            identity_key("orders", &Dialect::postgres())
        );
    }

    #[test]
    fn default_schemas_align_across_dialects() {
        assert_eq!(schema_key("public", &Dialect::postgres()), None);
        assert_eq!(schema_key("PUBLIC", &Dialect::h2()), None);
        assert_eq!(schema_key("main", &Dialect::sqlite()), None);
        assert_eq!(schema_key("Sales", &Dialect::postgres()), Some("sales".to_string()));
        assert_eq!(schema_key("\"public\"", &Dialect::h2()), Some("\"public\"".to_string()));
    }

    #[test]
    fn generated_names_are_recognised() {
        let predicate = AutoNamePredicate::default();
        assert!(predicate.is_generated("FKk4mt8l3i2ygkfyd1pvdkxn4yt"));
        assert!(predicate.is_generated("CONSTRAINT_8A"));
        assert!(predicate.is_generated("orders_pkey"));
        assert!(predicate.is_generated("sqlite_autoindex_users_1"));
        assert!(!predicate.is_generated("fk_orders_customer"));
        assert!(!predicate.is_generated("ix_users_email"));
    }

    #[test]
    fn foreign_key_signature_includes_target() {
        let fk = Constraint::foreign_key(
            Some("fk_orders_user"),
            &["USER_ID"],
            TableRef::new(Some("PUBLIC"), "USERS"),
            &["ID"],
        );
        assert_eq!(
            constraint_signature(&fk, &Dialect::h2()),
            "foreign key(user_id) references users(id)"
        );
    }
}
