//! CI gating over a diff result

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::diff::result::{DiffResult, EntryKind};

/// Which entry kinds fail a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    #[serde(default = "default_fail_on")]
    pub fail_on: BTreeSet<EntryKind>,
}

fn default_fail_on() -> BTreeSet<EntryKind> {
    [EntryKind::Missing, EntryKind::Changed].into_iter().collect()
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
        }
    }
}

impl GatePolicy {
    pub fn new(fail_on: impl IntoIterator<Item = EntryKind>) -> Self {
        Self {
            fail_on: fail_on.into_iter().collect(),
        }
    }

    /// Gate that fails on any difference at all
    pub fn strict() -> Self {
        Self::new([EntryKind::Missing, EntryKind::Unexpected, EntryKind::Changed])
    }

    pub fn evaluate(&self, result: &DiffResult) -> GateOutcome {
        let violations: Vec<String> = result
            .entries()
            .iter()
            .filter(|e| self.fail_on.contains(&e.entry_kind))
            .map(|e| format!("{} {} {}", e.entry_kind, e.object_kind, e.identity_path))
            .collect();

        GateOutcome {
            passed: violations.is_empty(),
            violations,
        }
    }
}

/// Result of gating a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
    pub passed: bool,
    /// `<entry kind> <object kind> <path>` for every failing entry
    pub violations: Vec<String>,
}

impl GateOutcome {
    /// 0 when passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}
