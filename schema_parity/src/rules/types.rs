//! Canonical column types
//!
//! Declared types are parsed into a base spelling plus parameters, resolved
//! through alias tables and classified into a [`TypeCategory`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::rules::dialect::Dialect;
use crate::utils::naming::collapse_whitespace;

/// Coarse family of a column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Integer,
    Decimal,
    Text,
    Binary,
    Temporal,
    Boolean,
    Other,
}

/// Aliases shared by every dialect
static COMMON_ALIASES: &[(&str, &str)] = &[
    ("int", "integer"),
    ("int4", "integer"),
    ("integer", "integer"),
    ("serial", "integer"),
    ("mediumint", "integer"),
    ("int2", "smallint"),
    ("smallserial", "smallint"),
    ("int8", "bigint"),
    ("bigserial", "bigint"),
    ("character varying", "varchar"),
    ("varchar2", "varchar"),
    ("nvarchar", "varchar"),
    ("national character varying", "varchar"),
    ("varchar_ignorecase", "varchar"),
    ("character", "char"),
    ("bpchar", "char"),
    ("nchar", "char"),
    ("numeric", "decimal"),
    ("dec", "decimal"),
    ("number", "decimal"),
    ("float4", "real"),
    ("float8", "double"),
    ("double precision", "double"),
    ("bool", "boolean"),
    ("bit", "boolean"),
    ("timestamp without time zone", "timestamp"),
    ("timestamptz", "timestamp with time zone"),
    ("time without time zone", "time"),
    ("timetz", "time with time zone"),
    ("bytea", "blob"),
    ("binary varying", "varbinary"),
];

static CATEGORIES: Lazy<BTreeMap<&'static str, TypeCategory>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    for name in ["tinyint", "smallint", "integer", "bigint"] {
        map.insert(name, TypeCategory::Integer);
    }
    for name in ["decimal", "real", "double"] {
        map.insert(name, TypeCategory::Decimal);
    }
    for name in ["varchar", "char", "text"] {
        map.insert(name, TypeCategory::Text);
    }
    for name in ["blob", "varbinary", "binary"] {
        map.insert(name, TypeCategory::Binary);
    }
    for name in [
        "date",
        "time",
        "time with time zone",
        "timestamp",
        "timestamp with time zone",
        "interval",
    ] {
        map.insert(name, TypeCategory::Temporal);
    }
    map.insert("boolean", TypeCategory::Boolean);
    map
});

static TYPE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<head>[^(]*?)\s*(?:\((?P<params>[^)]*)\))?\s*(?P<tail>[^()]*)$")
        .expect("type shape regex is valid")
});

/// A declared type after alias resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalType {
    pub category: TypeCategory,
    /// Canonical base spelling without parameters
    pub name: String,
    /// Length / precision / scale, as written
    pub params: Vec<String>,
    /// The declared spelling, whitespace-collapsed and lower-cased
    pub raw: String,
}

impl CanonicalType {
    /// Whether two types are equivalent.
    ///
    /// Parameters only count when both sides state them. Returns `None` when
    /// no rule applies: an unrecognised type compared with a different
    /// spelling.
    pub fn equivalent(&self, other: &CanonicalType) -> Option<bool> {
        let unknown =
            self.category == TypeCategory::Other || other.category == TypeCategory::Other;
        if unknown {
            return if self.name == other.name && params_compatible(&self.params, &other.params) {
                Some(true)
            } else {
                None
            };
        }

        Some(
            self.category == other.category
                && self.name == other.name
                && params_compatible(&self.params, &other.params),
        )
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}({})", self.name, self.params.join(","))
        }
    }
}

fn params_compatible(a: &[String], b: &[String]) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

fn split_type(raw: &str) -> (String, Vec<String>) {
    match TYPE_SHAPE.captures(raw) {
        Some(caps) => {
            let head = caps.name("head").map_or("", |m| m.as_str());
            let tail = caps.name("tail").map_or("", |m| m.as_str());
            let base = collapse_whitespace(&format!("{} {}", head, tail));
            let params = caps
                .name("params")
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            (base, params)
        }
        None => (raw.to_string(), Vec::new()),
    }
}

/// Resolves declared types for one side of a comparison
#[derive(Debug, Clone)]
pub struct TypeResolver {
    user_aliases: BTreeMap<String, String>,
    dialect_aliases: BTreeMap<String, String>,
}

impl TypeResolver {
    pub fn new(dialect: &Dialect, type_equivalence: &BTreeMap<String, String>) -> Self {
        Self {
            user_aliases: normalize_table(type_equivalence),
            dialect_aliases: normalize_table(&dialect.type_aliases),
        }
    }

    pub fn resolve(&self, declared: &str) -> CanonicalType {
        let raw = collapse_whitespace(declared).to_lowercase();

        // A full-spelling alias may carry parameters of its own
        let spelled = self
            .user_aliases
            .get(&raw)
            .or_else(|| self.dialect_aliases.get(&raw))
            .cloned()
            .unwrap_or_else(|| raw.clone());

        let (base, params) = split_type(&spelled);
        let (base, params) = match self
            .user_aliases
            .get(&base)
            .or_else(|| self.dialect_aliases.get(&base))
        {
            Some(mapped) => {
                let (mapped_base, mapped_params) = split_type(mapped);
                let params = if mapped_params.is_empty() { params } else { mapped_params };
                (mapped_base, params)
            }
            None => (base, params),
        };

        let name = COMMON_ALIASES
            .iter()
            .find(|(alias, _)| *alias == base)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(base);

        let category = CATEGORIES
            .get(name.as_str())
            .copied()
            .unwrap_or(TypeCategory::Other);

        CanonicalType {
            category,
            name,
            params,
            raw,
        }
    }
}

fn normalize_table(table: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(alias, canonical)| {
            (
                collapse_whitespace(alias).to_lowercase(),
                collapse_whitespace(canonical).to_lowercase(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(dialect: Dialect) -> TypeResolver {
        TypeResolver::new(&dialect, &BTreeMap::new())
    }

    #[test]
    fn aliases_share_a_canonical_name() {
        let pg = resolver(Dialect::postgres());
        let h2 = resolver(Dialect::h2());

        let int4 = pg.resolve("int4");
        let integer = h2.resolve("INTEGER");
        assert_eq!(int4.category, TypeCategory::Integer);
        assert_eq!(int4.equivalent(&integer), Some(true));

        let varchar = pg.resolve("varchar(255)");
        assert_eq!(varchar.name, "varchar");
        assert_eq!(varchar.params, vec!["255".to_string()]);
        assert_eq!(
            varchar.equivalent(&h2.resolve("CHARACTER VARYING(255)")),
            Some(true)
        );
        assert_eq!(
            varchar.equivalent(&h2.resolve("CHARACTER VARYING(100)")),
            Some(false)
        );
    }

    #[test]
    fn parameters_split_around_suffixes() {
        let pg = resolver(Dialect::postgres());
        let ts = pg.resolve("timestamp(6) with time zone");
        assert_eq!(ts.name, "timestamp with time zone");
        assert_eq!(ts.params, vec!["6".to_string()]);

        let numeric = pg.resolve("NUMERIC(10, 2)");
        assert_eq!(numeric.name, "decimal");
        assert_eq!(numeric.params, vec!["10".to_string(), "2".to_string()]);
    }

    #[test]
    fn user_table_maps_full_spellings() {
        let mut table = BTreeMap::new();
        table.insert("character varying".to_string(), "varchar(255)".to_string());
        let target = TypeResolver::new(&Dialect::postgres(), &table);

        let resolved = target.resolve("character varying");
        assert_eq!(resolved.name, "varchar");
        assert_eq!(resolved.params, vec!["255".to_string()]);
    }

    #[test]
    fn unknown_types_have_no_rule_unless_identical() {
        let pg = resolver(Dialect::postgres());
        let geometry = pg.resolve("geometry");
        assert_eq!(geometry.category, TypeCategory::Other);
        assert_eq!(geometry.equivalent(&pg.resolve("GEOMETRY")), Some(true));
        assert_eq!(geometry.equivalent(&pg.resolve("geography")), None);
        assert_eq!(geometry.equivalent(&pg.resolve("integer")), None);
    }

    #[test]
    fn mysql_tinyint_one_is_boolean() {
        let mysql = resolver(Dialect::mysql());
        assert_eq!(mysql.resolve("tinyint(1)").category, TypeCategory::Boolean);
        assert_eq!(mysql.resolve("tinyint(4)").category, TypeCategory::Integer);
    }
}
