//! Human-readable summary of a diff result

use std::fmt::Write;

use crate::diff::result::{DiffResult, EntryKind};

/// Render a short text summary: one header line with the counts, then one
/// line per missing, unexpected or changed object. Unchanged objects are
/// only counted.
pub fn render_summary(result: &DiffResult) -> String {
    let counts = result.counts();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Schema comparison: {} missing, {} unexpected, {} changed, {} unchanged",
        counts[&EntryKind::Missing],
        counts[&EntryKind::Unexpected],
        counts[&EntryKind::Changed],
        counts[&EntryKind::Unchanged],
    );

    if result.is_empty() {
        out.push_str("Schemas are equivalent\n");
        return out;
    }

    for entry in result
        .entries()
        .iter()
        .filter(|e| e.entry_kind != EntryKind::Unchanged)
    {
        let _ = writeln!(
            out,
            "  {:<10} {:<10} {}",
            entry.entry_kind.as_str(),
            entry.object_kind.as_str(),
            entry.identity_path
        );
        for diff in &entry.attribute_diffs {
            let _ = writeln!(
                out,
                "      {}: {} -> {}",
                diff.attribute, diff.reference, diff.target
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::ObjectKind;
    use crate::diff::result::{DiffEntry, IdentityPath};
    use crate::rules::equivalence::AttributeDiff;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_differences_with_attribute_values() {
        let result = DiffResult::new(vec![
            DiffEntry {
                entry_kind: EntryKind::Changed,
                object_kind: ObjectKind::Column,
                identity_path: IdentityPath::new(vec!["users".into(), "email".into()]),
                attribute_diffs: vec![AttributeDiff::new("nullable", false, true)],
            },
            DiffEntry {
                entry_kind: EntryKind::Unchanged,
                object_kind: ObjectKind::Table,
                identity_path: IdentityPath::new(vec!["users".into()]),
                attribute_diffs: Vec::new(),
            },
        ]);

        assert_eq!(
            render_summary(&result),
            "Schema comparison: 0 missing, 0 unexpected, 1 changed, 1 unchanged\n\
             \x20 changed    column     users.email\n\
             \x20     nullable: false -> true\n"
        );
    }

    #[test]
    fn equivalent_schemas_say_so() {
        let summary = render_summary(&DiffResult::new(Vec::new()));
        assert!(summary.ends_with("Schemas are equivalent\n"));
    }
}
