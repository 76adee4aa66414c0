//! Database module for schema_parity
//!
//! This module handles database connections.

pub mod connection;

// Re-export key types
pub use connection::DatabaseConnection;
