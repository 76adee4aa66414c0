//! Schema comparison engine
//!
//! Walks both catalogs level by level (schema → relation → column / index /
//! constraint), matching objects by identity key and checking equivalence of
//! the matched pairs. Mismatches are data; only malformed input and
//! undecidable attributes (under [`RuleGapPolicy::Fail`]) are errors.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::catalog::types::{Constraint, Index, ObjectKind, Schema, Table};
use crate::catalog::Catalog;
use crate::diff::options::{DiffOptions, ObjectFilter, RuleGapPolicy};
use crate::diff::result::{DiffEntry, DiffResult, EntryKind, IdentityPath};
use crate::error::{Error, Result};
use crate::rules::dialect::{Dialect, DialectPair};
use crate::rules::equivalence::{AttributeDiff, Equivalence, EquivalenceRules};
use crate::rules::identity::{
    constraint_signature, identity_key, index_signature, schema_key, AutoNamePredicate,
};

/// Compare a reference catalog against a target catalog.
///
/// The catalogs are only borrowed for the duration of the call; the result
/// owns everything it reports.
pub fn diff(reference: &Catalog, target: &Catalog, options: &DiffOptions) -> Result<DiffResult> {
    let dialects = options.dialects.clone().unwrap_or_else(|| {
        DialectPair::new(reference.dialect().clone(), target.dialect().clone())
    });

    let mut rules = EquivalenceRules::new(
        dialects.clone(),
        &options.type_equivalence,
        options.rules.clone(),
    );
    rules.compare_ordinal_position = options.compare_ordinal_position;
    rules.compare_comments = options.compare_comments;

    let engine = DiffEngine {
        dialects,
        rules,
        names: options.auto_name_predicate()?,
        filter: ObjectFilter::new(options)?,
        policy: options.rule_gap_policy,
        entries: Vec::new(),
    };

    tracing::debug!(
        reference = %reference.dialect_tag(),
        target = %target.dialect_tag(),
        "Comparing catalogs"
    );

    let result = engine.run(reference, target)?;

    let counts = result.counts();
    tracing::info!(
        missing = counts[&EntryKind::Missing],
        unexpected = counts[&EntryKind::Unexpected],
        changed = counts[&EntryKind::Changed],
        unchanged = counts[&EntryKind::Unchanged],
        "Schema comparison finished"
    );

    Ok(result)
}

/// A matched (or unmatched) pair of objects under one identity key
type Pairing<'o, K, T> = (K, Option<&'o T>, Option<&'o T>);

struct DiffEngine {
    dialects: DialectPair,
    rules: EquivalenceRules,
    names: AutoNamePredicate,
    filter: ObjectFilter,
    policy: RuleGapPolicy,
    entries: Vec<DiffEntry>,
}

impl DiffEngine {
    fn run(mut self, reference: &Catalog, target: &Catalog) -> Result<DiffResult> {
        let reference_schemas = keyed(
            reference
                .schemas()
                .iter()
                .filter(|s| self.filter.includes_schema(&s.name)),
            |s| schema_key(&s.name, &self.dialects.reference),
            |s| s.name.clone(),
        )?;
        let target_schemas = keyed(
            target
                .schemas()
                .iter()
                .filter(|s| self.filter.includes_schema(&s.name)),
            |s| schema_key(&s.name, &self.dialects.target),
            |s| s.name.clone(),
        )?;

        for (key, reference, target) in pair(&reference_schemas, &target_schemas) {
            let path = IdentityPath::new(key.into_iter().collect());
            match (reference, target) {
                (Some(reference), Some(target)) => {
                    self.push(EntryKind::Unchanged, ObjectKind::Schema, path.clone(), Vec::new());
                    self.diff_schema(&path, reference, target)?;
                }
                (reference, _) => self.push_unmatched(ObjectKind::Schema, path, reference.is_some()),
            }
        }

        Ok(DiffResult::new(self.entries))
    }

    fn diff_schema(&mut self, path: &IdentityPath, reference: &Schema, target: &Schema) -> Result<()> {
        tracing::debug!(schema = %path, "Comparing schema");

        let reference_tables = self.relations(&reference.tables, |t| &t.name, Side::Reference)?;
        let target_tables = self.relations(&target.tables, |t| &t.name, Side::Target)?;
        for (key, a, b) in pair(&reference_tables, &target_tables) {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.tables(a, b);
                    self.record(ObjectKind::Table, child.clone(), outcome)?;
                    self.diff_table(&child, a, b)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::Table, child, a.is_some()),
            }
        }

        let reference_views = self.relations(&reference.views, |v| &v.name, Side::Reference)?;
        let target_views = self.relations(&target.views, |v| &v.name, Side::Target)?;
        for (key, a, b) in pair(&reference_views, &target_views) {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.views(a, b);
                    self.record(ObjectKind::View, child, outcome)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::View, child, a.is_some()),
            }
        }

        let reference_sequences =
            self.relations(&reference.sequences, |q| &q.name, Side::Reference)?;
        let target_sequences = self.relations(&target.sequences, |q| &q.name, Side::Target)?;
        for (key, a, b) in pair(&reference_sequences, &target_sequences) {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.sequences(a, b);
                    self.record(ObjectKind::Sequence, child, outcome)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::Sequence, child, a.is_some()),
            }
        }

        Ok(())
    }

    fn diff_table(&mut self, path: &IdentityPath, reference: &Table, target: &Table) -> Result<()> {
        let reference_dialect = &self.dialects.reference;
        let target_dialect = &self.dialects.target;

        let reference_columns = keyed(
            reference.columns.iter(),
            |c| identity_key(&c.name, reference_dialect),
            |c| format!("{}.{}", path, c.name),
        )?;
        let target_columns = keyed(
            target.columns.iter(),
            |c| identity_key(&c.name, target_dialect),
            |c| format!("{}.{}", path, c.name),
        )?;

        for (key, a, b) in pair(&reference_columns, &target_columns) {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.columns(a, b);
                    self.record(ObjectKind::Column, child, outcome)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::Column, child, a.is_some()),
            }
        }

        let indexes = self.pair_named(
            &reference.indexes,
            &target.indexes,
            |i: &Index| i.name.as_deref(),
            index_signature,
        );
        for (key, a, b) in indexes {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.indexes(a, b);
                    self.record(ObjectKind::Index, child, outcome)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::Index, child, a.is_some()),
            }
        }

        let constraints = self.pair_named(
            &reference.constraints,
            &target.constraints,
            |c: &Constraint| c.name.as_deref(),
            constraint_signature,
        );
        for (key, a, b) in constraints {
            let child = path.child(&key);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let outcome = self.rules.constraints(a, b);
                    self.record(ObjectKind::Constraint, child, outcome)?;
                }
                (a, _) => self.push_unmatched(ObjectKind::Constraint, child, a.is_some()),
            }
        }

        Ok(())
    }

    /// Key relations of one side, dropping excluded names
    fn relations<'o, T>(
        &self,
        items: &'o [T],
        name: impl Fn(&T) -> &String,
        side: Side,
    ) -> Result<BTreeMap<String, &'o T>> {
        let dialect = self.dialect(side);
        keyed(
            items.iter().filter(|item| self.filter.includes_relation(name(*item))),
            |item| identity_key(name(item), dialect),
            |item| name(item).clone(),
        )
    }

    fn dialect(&self, side: Side) -> &Dialect {
        match side {
            Side::Reference => &self.dialects.reference,
            Side::Target => &self.dialects.target,
        }
    }

    /// Pair indexes or constraints.
    ///
    /// Objects whose names are significant on both sides match by name.
    /// The rest fall back to their structural signature, provided at least
    /// one side of the pair has no significant name. Both sides are visited
    /// in content order, so declaration order never changes the pairing.
    fn pair_named<'o, T: fmt::Debug>(
        &self,
        reference: &'o [T],
        target: &'o [T],
        name: impl Fn(&T) -> Option<&str>,
        signature: impl Fn(&T, &Dialect) -> String,
    ) -> Vec<Pairing<'o, String, T>> {
        let reference = NamedObjects::new(
            reference,
            &self.names,
            &self.dialects.reference,
            &name,
            &signature,
        );
        let target =
            NamedObjects::new(target, &self.names, &self.dialects.target, &name, &signature);

        let mut reference_used = vec![false; reference.len()];
        let mut target_used = vec![false; target.len()];
        let mut pairs = Vec::new();

        let target_by_name: HashMap<&str, usize> = target
            .names
            .iter()
            .enumerate()
            .filter_map(|(j, n)| n.as_deref().map(|n| (n, j)))
            .collect();
        for &i in &reference.order {
            let Some(reference_name) = &reference.names[i] else {
                continue;
            };
            if let Some(&j) = target_by_name.get(reference_name.as_str()) {
                if !target_used[j] {
                    reference_used[i] = true;
                    target_used[j] = true;
                    pairs.push((
                        reference_name.clone(),
                        Some(reference.item(i)),
                        Some(target.item(j)),
                    ));
                }
            }
        }

        // Unnamed objects sort first, so they claim structural matches before
        // objects that lost their name match
        for &i in &reference.order {
            if reference_used[i] {
                continue;
            }
            let candidate = target.order.iter().copied().find(|&j| {
                !target_used[j]
                    && target.signatures[j] == reference.signatures[i]
                    && (reference.names[i].is_none() || target.names[j].is_none())
            });
            if let Some(j) = candidate {
                reference_used[i] = true;
                target_used[j] = true;
                pairs.push((
                    reference.signatures[i].clone(),
                    Some(reference.item(i)),
                    Some(target.item(j)),
                ));
            }
        }

        for &i in reference.order.iter().filter(|&&i| !reference_used[i]) {
            pairs.push((reference.key(i), Some(reference.item(i)), None));
        }
        for &j in target.order.iter().filter(|&&j| !target_used[j]) {
            pairs.push((target.key(j), None, Some(target.item(j))));
        }

        // Identical structures without significant names need distinct keys
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (key, _, _) in &mut pairs {
            let count = seen.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                key.push_str(&format!(" #{}", count));
            }
        }

        pairs
    }

    fn record(&mut self, kind: ObjectKind, path: IdentityPath, outcome: Equivalence) -> Result<()> {
        let mut diffs = outcome.diffs;

        if !outcome.gaps.is_empty() {
            match self.policy {
                RuleGapPolicy::Fail => {
                    let gap = &outcome.gaps[0];
                    return Err(Error::EquivalenceRuleGap {
                        key: path.to_string(),
                        reason: gap.reason.clone(),
                    });
                }
                RuleGapPolicy::Degrade => {
                    for gap in outcome.gaps {
                        tracing::warn!(key = %path, reason = %gap.reason, "Equivalence rule gap");
                        diffs.push(AttributeDiff {
                            attribute: format!("unknown:{}", gap.attribute),
                            reference: gap.reference,
                            target: gap.target,
                        });
                    }
                }
            }
        }

        let entry_kind = if diffs.is_empty() {
            EntryKind::Unchanged
        } else {
            EntryKind::Changed
        };
        self.push(entry_kind, kind, path, diffs);
        Ok(())
    }

    fn push_unmatched(&mut self, kind: ObjectKind, path: IdentityPath, in_reference: bool) {
        let entry_kind = if in_reference {
            EntryKind::Missing
        } else {
            EntryKind::Unexpected
        };
        self.push(entry_kind, kind, path, Vec::new());
    }

    fn push(
        &mut self,
        entry_kind: EntryKind,
        object_kind: ObjectKind,
        identity_path: IdentityPath,
        attribute_diffs: Vec<AttributeDiff>,
    ) {
        self.entries.push(DiffEntry {
            entry_kind,
            object_kind,
            identity_path,
            attribute_diffs,
        });
    }
}

/// One side's indexes or constraints with their pairing keys
struct NamedObjects<'o, T> {
    items: &'o [T],
    /// Significant names' identity keys
    names: Vec<Option<String>>,
    signatures: Vec<String>,
    /// Positions sorted by (name, signature, rendering)
    order: Vec<usize>,
}

impl<'o, T: fmt::Debug> NamedObjects<'o, T> {
    fn new(
        items: &'o [T],
        predicate: &AutoNamePredicate,
        dialect: &Dialect,
        name: impl Fn(&T) -> Option<&str>,
        signature: impl Fn(&T, &Dialect) -> String,
    ) -> Self {
        let names: Vec<Option<String>> = items
            .iter()
            .map(|o| predicate.significant_name(name(o), dialect))
            .collect();
        let signatures: Vec<String> = items.iter().map(|o| signature(o, dialect)).collect();
        let renderings: Vec<String> = items.iter().map(|o| format!("{:?}", o)).collect();

        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| {
            (&names[a], &signatures[a], &renderings[a])
                .cmp(&(&names[b], &signatures[b], &renderings[b]))
        });

        Self {
            items,
            names,
            signatures,
            order,
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, i: usize) -> &'o T {
        &self.items[i]
    }

    /// Key of an unpaired object: its significant name, else its signature
    fn key(&self, i: usize) -> String {
        self.names[i]
            .clone()
            .unwrap_or_else(|| self.signatures[i].clone())
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Reference,
    Target,
}

/// Index objects by identity key; a duplicate key means the catalog is
/// malformed under the dialect used for this comparison
fn keyed<'o, K, T, I>(
    items: I,
    key: impl Fn(&T) -> K,
    label: impl Fn(&T) -> String,
) -> Result<BTreeMap<K, &'o T>>
where
    K: Ord,
    T: 'o,
    I: Iterator<Item = &'o T>,
{
    let mut map = BTreeMap::new();
    for item in items {
        if map.insert(key(item), item).is_some() {
            return Err(Error::malformed(
                label(item),
                "duplicate identity key under the comparison dialect",
            ));
        }
    }
    Ok(map)
}

/// Union of both key sets in sorted order
fn pair<'o, K, T>(
    reference: &BTreeMap<K, &'o T>,
    target: &BTreeMap<K, &'o T>,
) -> Vec<Pairing<'o, K, T>>
where
    K: Ord + Clone,
{
    let mut keys: Vec<&K> = reference.keys().chain(target.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .map(|key| {
            (
                key.clone(),
                reference.get(key).copied(),
                target.get(key).copied(),
            )
        })
        .collect()
}
