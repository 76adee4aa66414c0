//! Machine-readable diff report

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::catalog::types::ObjectKind;
use crate::diff::result::{DiffEntry, DiffResult, EntryKind};
use crate::error::{Error, Result};
use crate::rules::equivalence::AttributeDiff;

/// Output format of a written report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            "text" | "txt" => Ok(ReportFormat::Text),
            other => Err(Error::ConfigError(format!(
                "Unsupported report format: {}",
                other
            ))),
        }
    }
}

/// One reported object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub kind: ObjectKind,
    pub identity_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_diffs: Option<Vec<AttributeDiff>>,
}

impl From<&DiffEntry> for ReportEntry {
    fn from(entry: &DiffEntry) -> Self {
        let attribute_diffs = if entry.attribute_diffs.is_empty() {
            None
        } else {
            Some(entry.attribute_diffs.clone())
        };

        Self {
            kind: entry.object_kind,
            identity_path: entry.identity_path.to_string(),
            attribute_diffs,
        }
    }
}

/// Serializable projection of a [`DiffResult`].
///
/// The four arrays keep the result's order, so the same inputs always
/// serialize to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub missing: Vec<ReportEntry>,
    pub unexpected: Vec<ReportEntry>,
    pub changed: Vec<ReportEntry>,
    pub unchanged: Vec<ReportEntry>,
}

impl DiffReport {
    /// Build a report; unchanged entries are left out unless asked for
    pub fn from_result(result: &DiffResult, include_unchanged: bool) -> Self {
        let project = |kind: EntryKind| -> Vec<ReportEntry> {
            result.entries_of_kind(kind).map(ReportEntry::from).collect()
        };

        Self {
            missing: project(EntryKind::Missing),
            unexpected: project(EntryKind::Unexpected),
            changed: project(EntryKind::Changed),
            unchanged: if include_unchanged {
                project(EntryKind::Unchanged)
            } else {
                Vec::new()
            },
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.changed.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Render a result in the given format and write it to `path`, creating
/// parent directories as needed
pub fn write_report(
    result: &DiffResult,
    path: &Path,
    format: ReportFormat,
    include_unchanged: bool,
) -> Result<()> {
    let content = match format {
        ReportFormat::Json => DiffReport::from_result(result, include_unchanged).to_json()?,
        ReportFormat::Yaml => DiffReport::from_result(result, include_unchanged).to_yaml()?,
        ReportFormat::Text => super::summary::render_summary(result),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    tracing::info!(path = %path.display(), ?format, "Diff report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::result::IdentityPath;
    use pretty_assertions::assert_eq;

    fn result() -> DiffResult {
        DiffResult::new(vec![
            DiffEntry {
                entry_kind: EntryKind::Missing,
                object_kind: ObjectKind::Column,
                identity_path: IdentityPath::new(vec!["orders".into(), "total".into()]),
                attribute_diffs: Vec::new(),
            },
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
        ])
    }

    #[test]
    fn json_uses_stable_field_names() {
        let report = DiffReport::from_result(&result(), false);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "missing": [{ "kind": "column", "identityPath": "orders.total" }],
                "unexpected": [],
                "changed": [{
                    "kind": "column",
                    "identityPath": "users.email",
                    "attributeDiffs": [
                        { "attribute": "nullable", "reference": false, "target": true }
                    ]
                }],
                "unchanged": []
            })
        );
    }

    #[test]
    fn unchanged_entries_are_opt_in() {
        let report = DiffReport::from_result(&result(), true);
        assert_eq!(report.unchanged.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn yaml_round_trips() {
        let report = DiffReport::from_result(&result(), true);
        let parsed: DiffReport = serde_yaml::from_str(&report.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn writes_reports_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("diff.json");

        write_report(&result(), &path, ReportFormat::Json, false).unwrap();

        let written: DiffReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, DiffReport::from_result(&result(), false));
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("YAML".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
