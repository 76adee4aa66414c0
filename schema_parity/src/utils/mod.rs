//! Utilities for schema_parity
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use logging::init_logging;
pub use naming::{
    apply_naming_convention, collapse_whitespace, format_name, generated_constraint_name,
    get_column_name, get_constraint_name, get_table_name, unquote_identifier,
};
