//! Diff result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::types::ObjectKind;
use crate::rules::equivalence::AttributeDiff;

/// How an object relates across the two catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Present in the reference, absent from the target
    Missing,
    /// Present in the target, absent from the reference
    Unexpected,
    /// Present in both, not equivalent
    Changed,
    /// Present in both and equivalent
    Unchanged,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Missing => "missing",
            EntryKind::Unexpected => "unexpected",
            EntryKind::Changed => "changed",
            EntryKind::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized identity path of an object, e.g. `orders.total`.
///
/// The default schema is not part of the path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityPath(Vec<String>);

impl IdentityPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A path extended by one segment
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(default)")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

/// One object's comparison outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub entry_kind: EntryKind,
    pub object_kind: ObjectKind,
    pub identity_path: IdentityPath,
    /// Only populated for [`EntryKind::Changed`]
    pub attribute_diffs: Vec<AttributeDiff>,
}

impl DiffEntry {
    fn sort_key(&self) -> (&IdentityPath, ObjectKind, EntryKind) {
        (&self.identity_path, self.object_kind, self.entry_kind)
    }
}

/// Result of comparing a reference catalog with a target catalog.
///
/// Entries are sorted by identity path, so equal inputs give equal results
/// regardless of source ordering. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    entries: Vec<DiffEntry>,
}

impl DiffResult {
    pub fn new(mut entries: Vec<DiffEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { entries }
    }

    /// True iff nothing is missing, unexpected or changed
    pub fn is_empty(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.entry_kind == EntryKind::Unchanged)
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn entries_of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(move |e| e.entry_kind == kind)
    }

    pub fn entries_for_object(&self, kind: ObjectKind) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(move |e| e.object_kind == kind)
    }

    pub fn missing(&self) -> Vec<&DiffEntry> {
        self.entries_of_kind(EntryKind::Missing).collect()
    }

    pub fn unexpected(&self) -> Vec<&DiffEntry> {
        self.entries_of_kind(EntryKind::Unexpected).collect()
    }

    pub fn changed(&self) -> Vec<&DiffEntry> {
        self.entries_of_kind(EntryKind::Changed).collect()
    }

    pub fn unchanged(&self) -> Vec<&DiffEntry> {
        self.entries_of_kind(EntryKind::Unchanged).collect()
    }

    /// Number of entries per kind; kinds without entries count zero
    pub fn counts(&self) -> BTreeMap<EntryKind, usize> {
        let mut counts: BTreeMap<EntryKind, usize> = [
            EntryKind::Missing,
            EntryKind::Unexpected,
            EntryKind::Changed,
            EntryKind::Unchanged,
        ]
        .into_iter()
        .map(|kind| (kind, 0))
        .collect();

        for entry in &self.entries {
            *counts.entry(entry.entry_kind).or_default() += 1;
        }
        counts
    }

    /// Find the entry for an object by its displayed path
    pub fn find(&self, object_kind: ObjectKind, path: &str) -> Option<&DiffEntry> {
        self.entries
            .iter()
            .find(|e| e.object_kind == object_kind && e.identity_path.to_string() == path)
    }
}
