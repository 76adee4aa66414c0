//! Snapshotters
//!
//! A snapshotter turns some source (a live database, a catalog document, a
//! set of Rust model definitions) into a validated [`Catalog`]. The diff
//! engine never sees where a catalog came from.

pub mod database;
pub mod file;
pub mod models;

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::config::{Config, SourceConfig};
use crate::error::{Error, Result};

pub use database::DatabaseSnapshotter;
pub use file::{read_catalog, write_catalog, CatalogDocument, FileSnapshotter};
pub use models::{Entity, EntityDefinition, FieldDefinition, ModelRegistry, ModelSnapshotter};

/// Produces a catalog from one source
#[async_trait]
pub trait Snapshotter: Send + Sync {
    /// Name of the source, used in logs and [`Error::SnapshotFailure`]
    fn source_name(&self) -> String;

    /// Take a snapshot. Any failure to produce a complete catalog is an
    /// error; a partial catalog is never returned.
    async fn snapshot(&self) -> Result<Catalog>;
}

/// Take a snapshot, normalizing every failure into
/// [`Error::SnapshotFailure`] except malformed catalogs, which keep their
/// identity key
pub async fn take_snapshot(snapshotter: &dyn Snapshotter) -> Result<Catalog> {
    let source_name = snapshotter.source_name();
    tracing::info!(source = %source_name, "Taking snapshot");

    match snapshotter.snapshot().await {
        Ok(catalog) => {
            for warning in catalog.warnings() {
                tracing::warn!(
                    source = %source_name,
                    key = %warning.key,
                    "{}",
                    warning.message
                );
            }
            tracing::debug!(
                source = %source_name,
                schemas = catalog.schemas().len(),
                tables = catalog.tables().count(),
                "Snapshot complete"
            );
            Ok(catalog)
        }
        Err(err @ (Error::MalformedCatalog { .. } | Error::SnapshotFailure { .. })) => Err(err),
        Err(err) => Err(Error::snapshot(source_name, err)),
    }
}

/// A snapshotter over an already built catalog
#[derive(Debug, Clone)]
pub struct FixtureSnapshotter {
    name: String,
    catalog: Catalog,
}

impl FixtureSnapshotter {
    pub fn new(name: &str, catalog: Catalog) -> Self {
        Self {
            name: name.to_string(),
            catalog,
        }
    }
}

#[async_trait]
impl Snapshotter for FixtureSnapshotter {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn snapshot(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }
}

/// Build the snapshotter a source configuration describes
pub fn from_source(source: &SourceConfig, config: &Config) -> Box<dyn Snapshotter> {
    match source {
        SourceConfig::Database(db) => Box::new(DatabaseSnapshotter::new(db.clone())),
        SourceConfig::File(file) => Box::new(FileSnapshotter::new(
            file.path.clone(),
            file.dialect.as_ref().map(|d| d.resolve()),
        )),
        SourceConfig::Models(models) => Box::new(ModelSnapshotter::new(
            models.clone(),
            config.naming.clone(),
            config.type_mapping.clone(),
        )),
    }
}
