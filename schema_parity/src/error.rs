//! Error types for schema_parity

use thiserror::Error;

/// Result type for schema_parity operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_parity
///
/// Structural differences between two catalogs are never errors; they are
/// reported through [`crate::diff::DiffResult`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot of '{source_name}' failed: {reason}")]
    SnapshotFailure { source_name: String, reason: String },

    #[error("Malformed catalog at '{key}': {reason}")]
    MalformedCatalog { key: String, reason: String },

    #[error("No equivalence rule for '{key}': {reason}")]
    EquivalenceRuleGap { key: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Model registration error: {0}")]
    ModelRegistrationError(String),

    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),
}

impl Error {
    /// Build a [`Error::MalformedCatalog`] for the given identity key
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedCatalog {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`Error::SnapshotFailure`] for the named source
    pub fn snapshot(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Error::SnapshotFailure {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convert Serde JSON errors to schema_parity errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to schema_parity errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_parity errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(error: toml::ser::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}
