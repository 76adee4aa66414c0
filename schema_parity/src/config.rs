//! Configuration handling for schema_parity

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::types::ObjectKind;
use crate::diff::options::{DiffOptions, RuleGapPolicy};
use crate::error::{Error, Result};
use crate::report::document::ReportFormat;
use crate::report::gate::GatePolicy;
use crate::rules::dialect::Dialect;
use crate::rules::equivalence::RuleSet;

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Represents the complete schema_parity configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// The catalog treated as the source of truth
    pub reference: SourceConfig,
    /// The catalog checked against the reference
    pub target: SourceConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub type_mapping: TypeMappingConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub gate: GatePolicy,
}

impl Config {
    /// Configuration comparing two catalog files with default settings
    pub fn from_catalog_files(reference: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            reference: SourceConfig::File(FileConfig {
                path: reference.into(),
                dialect: None,
            }),
            target: SourceConfig::File(FileConfig {
                path: target.into(),
                dialect: None,
            }),
            diff: DiffConfig::default(),
            type_mapping: TypeMappingConfig::default(),
            naming: NamingConfig::default(),
            logging: None,
            output: OutputConfig::default(),
            gate: GatePolicy::default(),
        }
    }
}

/// Where a catalog comes from
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Introspect a live database
    Database(DatabaseConfig),
    /// Read a catalog document (JSON, YAML or TOML)
    File(FileConfig),
    /// Build a catalog from Rust model definitions
    Models(ModelsConfig),
}

impl SourceConfig {
    /// Short human-readable name used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Database(db) => format!("{} database", db.driver),
            SourceConfig::File(file) => file.path.display().to_string(),
            SourceConfig::Models(models) => format!("models in {}", models.paths.join(", ")),
        }
    }
}

/// A dialect named by tag, or spelled out in full
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DialectSetting {
    Tag(String),
    Custom(Dialect),
}

impl DialectSetting {
    pub fn resolve(&self) -> Dialect {
        match self {
            DialectSetting::Tag(tag) => Dialect::builtin(tag),
            DialectSetting::Custom(dialect) => dialect.clone(),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres`, `mysql` or `sqlite`
    pub driver: String,
    pub url: String,
    /// Schemas to introspect; empty means every non-system schema
    #[serde(default)]
    pub schemas: Vec<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// Defaults to the driver's dialect
    pub dialect: Option<DialectSetting>,
}

impl DatabaseConfig {
    pub fn dialect(&self) -> Dialect {
        match &self.dialect {
            Some(setting) => setting.resolve(),
            None => Dialect::builtin(&self.driver),
        }
    }
}

/// Catalog document configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileConfig {
    pub path: PathBuf,
    /// Overrides the dialect recorded in the document
    pub dialect: Option<DialectSetting>,
}

/// Model discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelsConfig {
    pub paths: Vec<String>,
    pub exclude_paths: Option<Vec<String>>,
    /// Struct attributes that mark a model, e.g. `entity`
    #[serde(default = "default_model_attributes")]
    pub attributes: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive_scan: bool,
    /// Dialect of the DDL the models would produce
    pub dialect: Option<DialectSetting>,
    /// Schema the model tables live in; the dialect's default schema if unset
    pub schema: Option<String>,
}

impl ModelsConfig {
    pub fn dialect(&self) -> Dialect {
        self.dialect
            .as_ref()
            .map(DialectSetting::resolve)
            .unwrap_or_default()
    }
}

fn default_model_attributes() -> Vec<String> {
    vec!["entity".to_string()]
}

fn default_true() -> bool {
    true
}

/// Comparison settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiffConfig {
    #[serde(default)]
    pub include_schemas: Vec<String>,
    #[serde(default)]
    pub exclude_schemas: Vec<String>,
    /// Tool bookkeeping tables are excluded unless overridden
    #[serde(default = "default_exclude_tables")]
    pub exclude_tables: Vec<String>,
    #[serde(default)]
    pub type_equivalence: BTreeMap<String, String>,
    pub auto_name_patterns: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub compare_ordinal_position: bool,
    #[serde(default)]
    pub compare_comments: bool,
    #[serde(default)]
    pub rule_gap_policy: RuleGapPolicy,
    /// Object kinds left out of equivalence checks
    #[serde(default)]
    pub skip_object_kinds: Vec<ObjectKind>,
}

fn default_exclude_tables() -> Vec<String> {
    vec!["databasechangelog*".to_string()]
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            include_schemas: Vec::new(),
            exclude_schemas: Vec::new(),
            exclude_tables: default_exclude_tables(),
            type_equivalence: BTreeMap::new(),
            auto_name_patterns: None,
            compare_ordinal_position: true,
            compare_comments: false,
            rule_gap_policy: RuleGapPolicy::default(),
            skip_object_kinds: Vec::new(),
        }
    }
}

impl DiffConfig {
    pub fn to_options(&self) -> DiffOptions {
        let rules = self
            .skip_object_kinds
            .iter()
            .fold(RuleSet::default(), |rules, kind| rules.without(*kind));

        DiffOptions {
            include_schemas: self.include_schemas.clone(),
            exclude_schemas: self.exclude_schemas.clone(),
            exclude_tables: self.exclude_tables.clone(),
            dialects: None,
            type_equivalence: self.type_equivalence.clone(),
            auto_name_patterns: self.auto_name_patterns.clone(),
            compare_ordinal_position: self.compare_ordinal_position,
            compare_comments: self.compare_comments,
            rule_gap_policy: self.rule_gap_policy,
            rules,
        }
    }
}

/// Naming conventions applied to model definitions
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    pub table_style: String,
    pub column_style: String,
    pub pluralize_tables: bool,
    /// Patterns with `{table}` and `{columns}` placeholders; unset patterns
    /// produce hashed names the way ORMs do
    pub primary_key_pattern: Option<String>,
    pub unique_pattern: Option<String>,
    pub foreign_key_pattern: Option<String>,
    pub index_pattern: Option<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            table_style: "snake_case".to_string(),
            column_style: "snake_case".to_string(),
            pluralize_tables: false,
            primary_key_pattern: None,
            unique_pattern: None,
            foreign_key_pattern: None,
            index_pattern: None,
        }
    }
}

/// Rust to SQL type mapping for model definitions
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TypeMappingConfig {
    pub custom: Option<Vec<CustomTypeMapping>>,
    #[serde(rename = "override")]
    pub override_: Option<HashMap<String, String>>,
}

/// Custom type mapping
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomTypeMapping {
    pub rust_type: String,
    pub db_type: String,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub stdout: bool,
    #[serde(default = "default_true")]
    pub include_timestamps: bool,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Report output configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ReportFormat,
    /// Write the report here; printed to stdout when unset
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub include_unchanged: bool,
}
