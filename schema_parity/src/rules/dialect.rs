//! Dialect bundles
//!
//! A dialect is configuration data, not a type hierarchy: how identifiers are
//! folded, which schema is the default, which type spellings are aliases of
//! one another and how default values are written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::rules::identity::identity_key;

/// How unquoted identifiers are stored by a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Case-insensitive, stored lower case (PostgreSQL)
    Lower,
    /// Case-insensitive, stored upper case (H2, Oracle)
    Upper,
    /// Case-sensitive
    Preserve,
}

impl CaseFolding {
    pub fn is_case_insensitive(&self) -> bool {
        !matches!(self, CaseFolding::Preserve)
    }

    /// The form an unquoted identifier is stored in
    pub fn fold(&self, name: &str) -> String {
        match self {
            CaseFolding::Lower => name.to_lowercase(),
            CaseFolding::Upper => name.to_uppercase(),
            CaseFolding::Preserve => name.to_string(),
        }
    }
}

/// Normalization switches applied to column default values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValueRules {
    /// Drop trailing `::type` casts (`'a'::character varying`)
    #[serde(default = "enabled")]
    pub strip_casts: bool,
    /// Drop redundant wrapping parentheses (`((0))`)
    #[serde(default = "enabled")]
    pub strip_parentheses: bool,
}

fn enabled() -> bool {
    true
}

impl Default for DefaultValueRules {
    fn default() -> Self {
        Self {
            strip_casts: true,
            strip_parentheses: true,
        }
    }
}

/// Dialect-specific normalization data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub name: String,
    pub case_folding: CaseFolding,
    #[serde(default)]
    pub default_schema: Option<String>,
    /// Alias spelling -> canonical spelling, applied after the common aliases
    #[serde(default)]
    pub type_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: DefaultValueRules,
}

impl Dialect {
    /// Resolve a dialect tag such as `postgres` or `h2`.
    ///
    /// Unknown tags yield a generic case-insensitive dialect carrying the tag.
    pub fn builtin(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Self::postgres(),
            "mysql" | "mariadb" => Self::mysql(),
            "sqlite" | "sqlite3" => Self::sqlite(),
            "h2" => Self::h2(),
            other => Self::generic(other),
        }
    }

    pub fn generic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            case_folding: CaseFolding::Lower,
            default_schema: None,
            type_aliases: BTreeMap::new(),
            defaults: DefaultValueRules::default(),
        }
    }

    pub fn postgres() -> Self {
        Self {
            name: "postgres".to_string(),
            case_folding: CaseFolding::Lower,
            default_schema: Some("public".to_string()),
            type_aliases: aliases(&[
                ("float", "double"),
                ("serial4", "integer"),
                ("serial8", "bigint"),
                ("serial2", "smallint"),
            ]),
            defaults: DefaultValueRules {
                strip_casts: true,
                strip_parentheses: true,
            },
        }
    }

    pub fn mysql() -> Self {
        Self {
            name: "mysql".to_string(),
            case_folding: CaseFolding::Lower,
            default_schema: None,
            type_aliases: aliases(&[
                ("tinyint(1)", "boolean"),
                ("float", "real"),
                ("datetime", "timestamp"),
                ("longtext", "text"),
                ("mediumtext", "text"),
                ("tinytext", "text"),
                ("longblob", "blob"),
                ("mediumblob", "blob"),
                ("tinyblob", "blob"),
            ]),
            defaults: DefaultValueRules {
                strip_casts: false,
                strip_parentheses: true,
            },
        }
    }

    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            case_folding: CaseFolding::Lower,
            default_schema: Some("main".to_string()),
            type_aliases: aliases(&[("float", "double"), ("datetime", "timestamp")]),
            defaults: DefaultValueRules {
                strip_casts: false,
                strip_parentheses: true,
            },
        }
    }

    pub fn h2() -> Self {
        Self {
            name: "h2".to_string(),
            case_folding: CaseFolding::Upper,
            default_schema: Some("PUBLIC".to_string()),
            type_aliases: aliases(&[
                ("float", "double"),
                ("character large object", "text"),
                ("clob", "text"),
                ("binary large object", "blob"),
                ("tinyint", "smallint"),
            ]),
            defaults: DefaultValueRules {
                strip_casts: false,
                strip_parentheses: true,
            },
        }
    }

    /// Add or replace a type alias
    pub fn with_type_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.type_aliases
            .insert(alias.trim().to_lowercase(), canonical.trim().to_lowercase());
        self
    }

    /// Whether the given schema name denotes this dialect's default schema.
    ///
    /// A quoted name only matches when it is spelled in the stored case.
    pub fn is_default_schema(&self, name: &str) -> bool {
        match &self.default_schema {
            Some(default) => identity_key(name, self) == identity_key(default, self),
            None => false,
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::generic("generic")
    }
}

fn aliases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect()
}

/// The dialects used to normalize the reference and target sides of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectPair {
    pub reference: Dialect,
    pub target: Dialect,
}

impl DialectPair {
    pub fn new(reference: Dialect, target: Dialect) -> Self {
        Self { reference, target }
    }

    /// The same pair with the sides exchanged
    pub fn swapped(&self) -> Self {
        Self {
            reference: self.target.clone(),
            target: self.reference.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_known_tags() {
        assert_eq!(Dialect::builtin("PostgreSQL").name, "postgres");
        assert_eq!(Dialect::builtin("h2").case_folding, CaseFolding::Upper);
        assert_eq!(Dialect::builtin("oracle").name, "oracle");
    }

    #[test]
    fn default_schema_is_folded() {
        let h2 = Dialect::h2();
        assert!(h2.is_default_schema("public"));
        assert!(h2.is_default_schema("\"PUBLIC\""));
        assert!(!h2.is_default_schema("app"));
        assert!(!Dialect::mysql().is_default_schema("shop"));
    }

    #[test]
    fn quoted_default_schema_must_match_the_stored_case() {
        let h2 = Dialect::h2();
        assert!(!h2.is_default_schema("\"public\""));

        let postgres = Dialect::postgres();
        assert!(postgres.is_default_schema("\"public\""));
        assert!(postgres.is_default_schema("PUBLIC"));
        assert!(!postgres.is_default_schema("\"PUBLIC\""));
    }

    #[test]
    fn fold_follows_storage_case() {
        assert_eq!(CaseFolding::Upper.fold("Orders"), "ORDERS");
        assert_eq!(CaseFolding::Lower.fold("Orders"), "orders");
        assert_eq!(CaseFolding::Preserve.fold("Orders"), "Orders");
    }
}
