//! Catalog module for schema_parity
//!
//! In-memory representation of a database's structural objects.

pub mod tree;
pub mod types;

// Re-export key types
pub use tree::{Catalog, CatalogWarning};
pub use types::{
    Column, Constraint, ConstraintKind, Index, ObjectKind, Schema, Sequence, Table, TableRef,
    View,
};
