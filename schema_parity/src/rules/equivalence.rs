//! Equivalence rules
//!
//! Attribute-level comparison of two objects that share an identity key.
//! Each comparison yields the differing attributes, plus any attribute that
//! no rule could decide.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::types::{
    Column, Constraint, ConstraintKind, Index, ObjectKind, Sequence, Table, View,
};
use crate::rules::defaults::normalize_default;
use crate::rules::dialect::{Dialect, DialectPair};
use crate::rules::identity::{identity_key, table_ref_key};
use crate::rules::types::TypeResolver;
use crate::utils::naming::collapse_whitespace;

/// A reportable attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::List(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Null, Into::into)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("null"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// One differing attribute: (name, reference value, target value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDiff {
    pub attribute: String,
    pub reference: AttributeValue,
    pub target: AttributeValue,
}

impl AttributeDiff {
    pub fn new(
        attribute: &str,
        reference: impl Into<AttributeValue>,
        target: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            attribute: attribute.to_string(),
            reference: reference.into(),
            target: target.into(),
        }
    }
}

/// An attribute that no registered rule could decide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGap {
    pub attribute: String,
    pub reference: AttributeValue,
    pub target: AttributeValue,
    pub reason: String,
}

/// Outcome of comparing two identity-matched objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Equivalence {
    pub diffs: Vec<AttributeDiff>,
    pub gaps: Vec<RuleGap>,
}

impl Equivalence {
    pub fn is_equivalent(&self) -> bool {
        self.diffs.is_empty() && self.gaps.is_empty()
    }

    fn push(&mut self, diff: AttributeDiff) {
        self.diffs.push(diff);
    }

    fn compare<T>(&mut self, attribute: &str, reference: T, target: T)
    where
        T: PartialEq + Into<AttributeValue>,
    {
        if reference != target {
            self.push(AttributeDiff::new(attribute, reference, target));
        }
    }

    /// Compare only when both sides state a value
    fn compare_stated<T>(&mut self, attribute: &str, reference: Option<T>, target: Option<T>)
    where
        T: PartialEq + Into<AttributeValue>,
    {
        if let (Some(reference), Some(target)) = (reference, target) {
            self.compare(attribute, reference, target);
        }
    }

    fn unsupported(kind: ObjectKind) -> Self {
        Self {
            diffs: Vec::new(),
            gaps: vec![RuleGap {
                attribute: kind.as_str().to_string(),
                reference: AttributeValue::Null,
                target: AttributeValue::Null,
                reason: format!("object kind '{}' has no registered equivalence rule", kind),
            }],
        }
    }
}

/// Object kinds that have a registered equivalence rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    kinds: BTreeSet<ObjectKind>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self {
            kinds: BTreeSet::new(),
        }
    }

    pub fn with(mut self, kind: ObjectKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn without(mut self, kind: ObjectKind) -> Self {
        self.kinds.remove(&kind);
        self
    }

    pub fn covers(&self, kind: ObjectKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            kinds: ObjectKind::ALL.into_iter().collect(),
        }
    }
}

/// Equivalence rules bound to the dialects of one comparison
#[derive(Debug, Clone)]
pub struct EquivalenceRules {
    dialects: DialectPair,
    reference_types: TypeResolver,
    target_types: TypeResolver,
    rule_set: RuleSet,
    pub compare_ordinal_position: bool,
    pub compare_comments: bool,
}

impl EquivalenceRules {
    pub fn new(
        dialects: DialectPair,
        type_equivalence: &BTreeMap<String, String>,
        rule_set: RuleSet,
    ) -> Self {
        Self {
            reference_types: TypeResolver::new(&dialects.reference, type_equivalence),
            target_types: TypeResolver::new(&dialects.target, type_equivalence),
            dialects,
            rule_set,
            compare_ordinal_position: true,
            compare_comments: false,
        }
    }

    pub fn dialects(&self) -> &DialectPair {
        &self.dialects
    }

    fn keys(&self, columns: &[String], dialect: &Dialect) -> Vec<String> {
        columns.iter().map(|c| identity_key(c, dialect)).collect()
    }

    /// Direct table attributes; columns, indexes and constraints are compared
    /// on their own
    pub fn tables(&self, reference: &Table, target: &Table) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::Table) {
            return Equivalence::unsupported(ObjectKind::Table);
        }

        let mut outcome = Equivalence::default();
        if self.compare_comments {
            outcome.compare("comment", reference.comment.clone(), target.comment.clone());
        }
        outcome
    }

    pub fn columns(&self, reference: &Column, target: &Column) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::Column) {
            return Equivalence::unsupported(ObjectKind::Column);
        }

        let mut outcome = Equivalence::default();

        let reference_type = self.reference_types.resolve(&reference.data_type);
        let target_type = self.target_types.resolve(&target.data_type);
        match reference_type.equivalent(&target_type) {
            Some(true) => {}
            Some(false) => outcome.push(AttributeDiff::new(
                "type",
                reference.data_type.as_str(),
                target.data_type.as_str(),
            )),
            None => outcome.gaps.push(RuleGap {
                attribute: "type".to_string(),
                reference: reference.data_type.as_str().into(),
                target: target.data_type.as_str().into(),
                reason: format!(
                    "no type equivalence between '{}' and '{}'",
                    reference_type.raw, target_type.raw
                ),
            }),
        }

        outcome.compare("nullable", reference.nullable, target.nullable);

        let reference_default = normalize_default(
            reference.default.as_deref(),
            reference_type.category,
            &self.dialects.reference.defaults,
        );
        let target_default = normalize_default(
            target.default.as_deref(),
            target_type.category,
            &self.dialects.target.defaults,
        );
        if reference_default != target_default {
            outcome.push(AttributeDiff::new(
                "default",
                reference.default.clone(),
                target.default.clone(),
            ));
        }

        if self.compare_ordinal_position {
            outcome.compare(
                "ordinal_position",
                reference.ordinal_position,
                target.ordinal_position,
            );
        }
        outcome.compare("auto_increment", reference.auto_increment, target.auto_increment);

        if self.compare_comments {
            outcome.compare("comment", reference.comment.clone(), target.comment.clone());
        }

        outcome
    }

    /// Indexes matched by name may still differ in columns or uniqueness;
    /// the name itself is never compared
    pub fn indexes(&self, reference: &Index, target: &Index) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::Index) {
            return Equivalence::unsupported(ObjectKind::Index);
        }

        let mut outcome = Equivalence::default();
        outcome.compare(
            "columns",
            self.keys(&reference.columns, &self.dialects.reference),
            self.keys(&target.columns, &self.dialects.target),
        );
        outcome.compare("unique", reference.unique, target.unique);
        outcome.compare_stated(
            "method",
            reference.method.as_ref().map(|m| m.to_lowercase()),
            target.method.as_ref().map(|m| m.to_lowercase()),
        );
        outcome
    }

    pub fn constraints(&self, reference: &Constraint, target: &Constraint) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::Constraint) {
            return Equivalence::unsupported(ObjectKind::Constraint);
        }

        let mut outcome = Equivalence::default();
        if reference.kind.label() != target.kind.label() {
            outcome.compare("kind", reference.kind.label(), target.kind.label());
            return outcome;
        }

        outcome.compare(
            "columns",
            self.keys(&reference.columns, &self.dialects.reference),
            self.keys(&target.columns, &self.dialects.target),
        );

        match (&reference.kind, &target.kind) {
            (
                ConstraintKind::ForeignKey {
                    references: ref_table,
                    referenced_columns: ref_columns,
                    on_delete: ref_delete,
                    on_update: ref_update,
                },
                ConstraintKind::ForeignKey {
                    references: target_table,
                    referenced_columns: target_columns,
                    on_delete: target_delete,
                    on_update: target_update,
                },
            ) => {
                outcome.compare(
                    "references",
                    table_ref_key(ref_table, &self.dialects.reference),
                    table_ref_key(target_table, &self.dialects.target),
                );
                outcome.compare(
                    "referenced_columns",
                    self.keys(ref_columns, &self.dialects.reference),
                    self.keys(target_columns, &self.dialects.target),
                );
                outcome.compare_stated(
                    "on_delete",
                    referential_action(ref_delete),
                    referential_action(target_delete),
                );
                outcome.compare_stated(
                    "on_update",
                    referential_action(ref_update),
                    referential_action(target_update),
                );
            }
            (
                ConstraintKind::Check { expression: a },
                ConstraintKind::Check { expression: b },
            ) => {
                outcome.compare("expression", normalize_sql(a), normalize_sql(b));
            }
            _ => {}
        }

        outcome
    }

    pub fn views(&self, reference: &View, target: &View) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::View) {
            return Equivalence::unsupported(ObjectKind::View);
        }

        let mut outcome = Equivalence::default();
        if normalize_sql(&reference.definition) != normalize_sql(&target.definition) {
            outcome.push(AttributeDiff::new(
                "definition",
                reference.definition.as_str(),
                target.definition.as_str(),
            ));
        }
        if !reference.columns.is_empty() && !target.columns.is_empty() {
            outcome.compare(
                "columns",
                self.keys(&reference.columns, &self.dialects.reference),
                self.keys(&target.columns, &self.dialects.target),
            );
        }
        outcome
    }

    pub fn sequences(&self, reference: &Sequence, target: &Sequence) -> Equivalence {
        if !self.rule_set.covers(ObjectKind::Sequence) {
            return Equivalence::unsupported(ObjectKind::Sequence);
        }

        let mut outcome = Equivalence::default();
        outcome.compare_stated("start_value", reference.start_value, target.start_value);
        outcome.compare_stated("increment", reference.increment, target.increment);
        outcome.compare_stated("min_value", reference.min_value, target.min_value);
        outcome.compare_stated("max_value", reference.max_value, target.max_value);
        outcome.compare("cycle", reference.cycle, target.cycle);
        outcome
    }
}

/// `NO ACTION` is what every database does when nothing is declared
fn referential_action(action: &Option<String>) -> Option<String> {
    let action = action.as_ref()?.trim().replace('_', " ").to_lowercase();
    let action = collapse_whitespace(&action);
    if action == "no action" || action.is_empty() {
        None
    } else {
        Some(action)
    }
}

fn normalize_sql(sql: &str) -> String {
    collapse_whitespace(sql)
        .trim_end_matches(';')
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::TableRef;

    fn rules() -> EquivalenceRules {
        EquivalenceRules::new(
            DialectPair::new(Dialect::postgres(), Dialect::h2()),
            &BTreeMap::new(),
            RuleSet::default(),
        )
    }

    #[test]
    fn column_aliases_and_defaults_are_tolerated() {
        let reference = Column::new("qty", "int4").not_null().default("0").position(2);
        let target = Column::new("QTY", "INTEGER").not_null().default("'0'").position(2);
        assert!(rules().columns(&reference, &target).is_equivalent());
    }

    #[test]
    fn text_defaults_compare_as_written() {
        let reference = Column::new("code", "varchar(10)").default("'007'::character varying");
        let target = Column::new("CODE", "VARCHAR(10)").default("'7'");
        assert_eq!(
            rules().columns(&reference, &target).diffs,
            vec![AttributeDiff::new(
                "default",
                Some("'007'::character varying".to_string()),
                Some("'7'".to_string())
            )]
        );
    }

    #[test]
    fn nullability_and_position_compare_exactly() {
        let reference = Column::new("email", "text").not_null().position(2);
        let target = Column::new("email", "text").position(3);
        let outcome = rules().columns(&reference, &target);
        assert_eq!(
            outcome.diffs,
            vec![
                AttributeDiff::new("nullable", false, true),
                AttributeDiff::new("ordinal_position", 2u32, 3u32),
            ]
        );
    }

    #[test]
    fn unknown_types_produce_gaps() {
        let reference = Column::new("shape", "geometry").position(1);
        let target = Column::new("shape", "geography").position(1);
        let outcome = rules().columns(&reference, &target);
        assert!(outcome.diffs.is_empty());
        assert_eq!(outcome.gaps.len(), 1);
        assert_eq!(outcome.gaps[0].attribute, "type");
    }

    #[test]
    fn unregistered_kinds_produce_gaps() {
        let rules = EquivalenceRules::new(
            DialectPair::new(Dialect::postgres(), Dialect::postgres()),
            &BTreeMap::new(),
            RuleSet::default().without(ObjectKind::View),
        );
        let view = View::new("v", "select 1");
        assert!(!rules.views(&view, &view).is_equivalent());
    }

    #[test]
    fn foreign_keys_ignore_no_action_and_names() {
        let mut reference = Constraint::foreign_key(
            Some("fk_orders_user"),
            &["user_id"],
            TableRef::new(Some("public"), "users"),
            &["id"],
        );
        if let ConstraintKind::ForeignKey { on_delete, .. } = &mut reference.kind {
            *on_delete = Some("NO_ACTION".to_string());
        }
        let target = Constraint::foreign_key(
            Some("FKk4mt8l3i2ygkfyd1pvdkxn4yt"),
            &["USER_ID"],
            TableRef::new(Some("PUBLIC"), "USERS"),
            &["ID"],
        );
        assert!(rules().constraints(&reference, &target).is_equivalent());
    }
}
