//! Catalog documents on disk
//!
//! A catalog document is the serialized form of a snapshot:
//!
//! ```json
//! { "dialect": "postgres", "schemas": [{ "name": "public", "tables": [...] }] }
//! ```
//!
//! The format follows the file extension: `.json`, `.yaml`/`.yml` or `.toml`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::types::Schema;
use crate::catalog::Catalog;
use crate::config::DialectSetting;
use crate::error::{Error, Result};
use crate::rules::dialect::Dialect;
use crate::snapshot::Snapshotter;

/// Serialized catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<DialectSetting>,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

impl CatalogDocument {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let dialect = catalog.dialect();
        // Built-in dialects are written by tag
        let setting = if Dialect::builtin(&dialect.name) == *dialect {
            DialectSetting::Tag(dialect.name.clone())
        } else {
            DialectSetting::Custom(dialect.clone())
        };

        Self {
            dialect: Some(setting),
            schemas: catalog.schemas().to_vec(),
        }
    }

    /// Validate the document into a catalog, optionally under another dialect
    pub fn into_catalog(self, dialect_override: Option<Dialect>) -> Result<Catalog> {
        let dialect = dialect_override
            .or_else(|| self.dialect.as_ref().map(DialectSetting::resolve))
            .unwrap_or_default();
        Catalog::with_dialect(dialect, self.schemas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "toml" => Ok(DocumentFormat::Toml),
            _ => Err(Error::ConfigError(format!(
                "Cannot tell the catalog format of {} (expected .json, .yaml or .toml)",
                path.display()
            ))),
        }
    }

    fn parse(self, content: &str) -> Result<CatalogDocument> {
        Ok(match self {
            DocumentFormat::Json => serde_json::from_str(content)?,
            DocumentFormat::Yaml => serde_yaml::from_str(content)?,
            DocumentFormat::Toml => toml::from_str(content)?,
        })
    }

    fn render(self, document: &CatalogDocument) -> Result<String> {
        Ok(match self {
            DocumentFormat::Json => serde_json::to_string_pretty(document)?,
            DocumentFormat::Yaml => serde_yaml::to_string(document)?,
            DocumentFormat::Toml => toml::to_string_pretty(document)?,
        })
    }
}

/// Read and validate a catalog document
pub fn read_catalog(path: &Path, dialect_override: Option<Dialect>) -> Result<Catalog> {
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    format.parse(&content)?.into_catalog(dialect_override)
}

/// Write a catalog document, creating parent directories as needed
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let format = DocumentFormat::from_path(path)?;
    let content = format.render(&CatalogDocument::from_catalog(catalog))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    tracing::info!(path = %path.display(), "Catalog written");
    Ok(())
}

/// Snapshots a catalog document
#[derive(Debug, Clone)]
pub struct FileSnapshotter {
    path: PathBuf,
    dialect: Option<Dialect>,
}

impl FileSnapshotter {
    pub fn new(path: impl Into<PathBuf>, dialect: Option<Dialect>) -> Self {
        Self {
            path: path.into(),
            dialect,
        }
    }
}

#[async_trait]
impl Snapshotter for FileSnapshotter {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    async fn snapshot(&self) -> Result<Catalog> {
        let format = DocumentFormat::from_path(&self.path)?;
        let content = tokio::fs::read_to_string(&self.path).await?;
        format.parse(&content)?.into_catalog(self.dialect.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Constraint, Table, TableRef};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn catalog() -> Catalog {
        Catalog::new(
            "postgres",
            vec![Schema::new("public")
                .with_table(
                    Table::new("users")
                        .with_column(Column::new("id", "bigint").not_null())
                        .with_column(Column::new("email", "varchar(255)"))
                        .with_constraint(Constraint::primary_key(Some("users_pkey"), &["id"])),
                )
                .with_table(
                    Table::new("orders")
                        .with_column(Column::new("id", "bigint").not_null())
                        .with_column(Column::new("user_id", "bigint"))
                        .with_constraint(Constraint::foreign_key(
                            Some("orders_user_fk"),
                            &["user_id"],
                            TableRef::new(None, "users"),
                            &["id"],
                        )),
                )],
        )
        .unwrap()
    }

    #[rstest]
    #[case("catalog.json")]
    #[case("catalog.yaml")]
    #[case("nested/catalog.toml")]
    fn written_catalogs_read_back(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);

        write_catalog(&catalog(), &path).unwrap();
        let read = read_catalog(&path, None).unwrap();

        assert_eq!(read, catalog());
    }

    #[test]
    fn hand_written_documents_fill_defaults() {
        let document: CatalogDocument = serde_json::from_str(
            r#"{
                "dialect": "h2",
                "schemas": [{
                    "name": "PUBLIC",
                    "tables": [{
                        "name": "ORDERS",
                        "columns": [
                            { "name": "ID", "data_type": "INTEGER", "nullable": false },
                            { "name": "TOTAL", "data_type": "DECIMAL(10,2)" }
                        ],
                        "constraints": [{ "type": "primary_key", "columns": ["ID"] }]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let catalog = document.into_catalog(None).unwrap();
        assert_eq!(catalog.dialect_tag(), "h2");

        let total = catalog.column(None, "orders", "total").unwrap();
        assert!(total.nullable);
        assert_eq!(total.ordinal_position, 2);
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let err = read_catalog(Path::new("catalog.xml"), None).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn snapshotter_applies_dialect_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        write_catalog(&catalog(), &path).unwrap();

        let snapshotter = FileSnapshotter::new(&path, Some(Dialect::h2()));
        let catalog = snapshotter.snapshot().await.unwrap();
        assert_eq!(catalog.dialect_tag(), "h2");
    }
}
