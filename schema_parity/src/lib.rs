//! schema_parity: compares two database catalogs and reports what differs
//!
//! A reference catalog (a changelog-built database, a catalog document, or
//! the tables a set of Rust models describe) is compared with a target
//! catalog. Every object ends up Missing, Unexpected, Changed or Unchanged,
//! with dialect differences in types, defaults, name casing and generated
//! names factored out.

// Lets `#[derive(Entity)]` expand to `::schema_parity` paths inside this crate
extern crate self as schema_parity;

pub mod catalog;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod report;
pub mod rules;
pub mod snapshot;
pub mod utils;

// Re-export main types for easier access
pub use catalog::Catalog;
pub use config::Config;
pub use diff::{diff, DiffEntry, DiffOptions, DiffResult, EntryKind, RuleGapPolicy};
pub use error::{Error, Result};
pub use report::{DiffReport, GateOutcome, GatePolicy, ReportFormat};
pub use rules::Dialect;
pub use schema_parity_macros::Entity;
pub use snapshot::{take_snapshot, Entity, ModelRegistry, Snapshotter};

/// Create a client from the specified configuration file
pub async fn init(config_path: &str) -> Result<ParityClient> {
    let config = config::load_from_file(config_path)?;
    Ok(ParityClient::new(config))
}

/// The main client: snapshots both sides and compares them
pub struct ParityClient {
    config: Config,
    reference: Box<dyn Snapshotter>,
    target: Box<dyn Snapshotter>,
}

impl ParityClient {
    /// Create a client with the snapshotters the configuration describes
    pub fn new(config: Config) -> Self {
        let reference = snapshot::from_source(&config.reference, &config);
        let target = snapshot::from_source(&config.target, &config);
        Self {
            config,
            reference,
            target,
        }
    }

    /// Replace the configured snapshotters
    pub fn with_snapshotters(
        mut self,
        reference: Box<dyn Snapshotter>,
        target: Box<dyn Snapshotter>,
    ) -> Self {
        self.reference = reference;
        self.target = target;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diff_options(&self) -> DiffOptions {
        self.config.diff.to_options()
    }

    /// Take the reference snapshot alone
    pub async fn snapshot_reference(&self) -> Result<Catalog> {
        take_snapshot(self.reference.as_ref()).await
    }

    /// Take the target snapshot alone
    pub async fn snapshot_target(&self) -> Result<Catalog> {
        take_snapshot(self.target.as_ref()).await
    }

    /// Take both snapshots concurrently. Either failure aborts the pair.
    pub async fn snapshot_both(&self) -> Result<(Catalog, Catalog)> {
        tokio::try_join!(
            take_snapshot(self.reference.as_ref()),
            take_snapshot(self.target.as_ref())
        )
    }

    /// Snapshot both sides and compare them
    pub async fn compare(&self) -> Result<DiffResult> {
        let (reference, target) = self.snapshot_both().await?;
        let result = diff::diff(&reference, &target, &self.diff_options())?;

        for line in report::render_summary(&result).lines() {
            tracing::info!("{}", line);
        }

        Ok(result)
    }

    /// Compare and evaluate the configured gate
    pub async fn check(&self) -> Result<(DiffResult, GateOutcome)> {
        let result = self.compare().await?;
        let outcome = self.config.gate.evaluate(&result);

        if outcome.passed {
            tracing::info!("Schema gate passed");
        } else {
            for violation in &outcome.violations {
                tracing::warn!(violation = %violation, "Schema gate violation");
            }
        }

        Ok((result, outcome))
    }
}
