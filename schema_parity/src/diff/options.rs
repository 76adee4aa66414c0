//! Diff options and object filters

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::rules::dialect::DialectPair;
use crate::rules::equivalence::RuleSet;
use crate::rules::identity::AutoNamePredicate;

/// What to do when no equivalence rule can decide an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGapPolicy {
    /// Abort the comparison with [`Error::EquivalenceRuleGap`]
    #[default]
    Fail,
    /// Report the object as changed with an `unknown` attribute
    Degrade,
}

/// Options for one comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Glob patterns; empty includes every schema
    pub include_schemas: Vec<String>,
    pub exclude_schemas: Vec<String>,
    /// Glob patterns for tables, views and sequences, e.g. tool bookkeeping tables
    pub exclude_tables: Vec<String>,
    /// Overrides the dialects named by the catalogs
    pub dialects: Option<DialectPair>,
    /// Extra type aliases applied to both sides: alias spelling -> canonical spelling
    pub type_equivalence: BTreeMap<String, String>,
    /// Regexes for generated index/constraint names; `None` uses the defaults
    pub auto_name_patterns: Option<Vec<String>>,
    pub compare_ordinal_position: bool,
    pub compare_comments: bool,
    pub rule_gap_policy: RuleGapPolicy,
    pub rules: RuleSet,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_schemas: Vec::new(),
            exclude_schemas: Vec::new(),
            exclude_tables: Vec::new(),
            dialects: None,
            type_equivalence: BTreeMap::new(),
            auto_name_patterns: None,
            compare_ordinal_position: true,
            compare_comments: false,
            rule_gap_policy: RuleGapPolicy::Fail,
            rules: RuleSet::default(),
        }
    }
}

impl DiffOptions {
    pub fn include_schema(mut self, pattern: &str) -> Self {
        self.include_schemas.push(pattern.to_string());
        self
    }

    pub fn exclude_schema(mut self, pattern: &str) -> Self {
        self.exclude_schemas.push(pattern.to_string());
        self
    }

    pub fn exclude_table(mut self, pattern: &str) -> Self {
        self.exclude_tables.push(pattern.to_string());
        self
    }

    pub fn type_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.type_equivalence
            .insert(alias.to_string(), canonical.to_string());
        self
    }

    pub fn dialects(mut self, dialects: DialectPair) -> Self {
        self.dialects = Some(dialects);
        self
    }

    pub fn rule_gap_policy(mut self, policy: RuleGapPolicy) -> Self {
        self.rule_gap_policy = policy;
        self
    }

    /// The same options with the reference and target roles exchanged
    pub fn swapped(&self) -> Self {
        let mut options = self.clone();
        options.dialects = self.dialects.as_ref().map(DialectPair::swapped);
        options
    }

    pub(crate) fn auto_name_predicate(&self) -> Result<AutoNamePredicate> {
        match &self.auto_name_patterns {
            Some(patterns) => AutoNamePredicate::new(patterns),
            None => Ok(AutoNamePredicate::default()),
        }
    }
}

/// Compiled include/exclude patterns
#[derive(Debug, Clone)]
pub struct ObjectFilter {
    include_schemas: Vec<Pattern>,
    exclude_schemas: Vec<Pattern>,
    exclude_tables: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| Error::ConfigError(format!("Invalid pattern '{}': {}", p, e)))
        })
        .collect()
}

impl ObjectFilter {
    pub fn new(options: &DiffOptions) -> Result<Self> {
        Ok(Self {
            include_schemas: compile(&options.include_schemas)?,
            exclude_schemas: compile(&options.exclude_schemas)?,
            exclude_tables: compile(&options.exclude_tables)?,
        })
    }

    fn matches(patterns: &[Pattern], name: &str) -> bool {
        let (bare, _) = crate::utils::naming::unquote_identifier(name);
        patterns.iter().any(|p| p.matches_with(bare, MATCH_OPTIONS))
    }

    pub fn includes_schema(&self, name: &str) -> bool {
        (self.include_schemas.is_empty() || Self::matches(&self.include_schemas, name))
            && !Self::matches(&self.exclude_schemas, name)
    }

    /// Applies to tables, views and sequences alike
    pub fn includes_relation(&self, name: &str) -> bool {
        !Self::matches(&self.exclude_tables, name)
    }
}
