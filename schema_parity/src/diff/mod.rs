//! Catalog comparison
//!
//! [`diff`] is the entry point; [`DiffResult`] is what it returns.

pub mod engine;
pub mod options;
pub mod result;

pub use engine::diff;
pub use options::{DiffOptions, ObjectFilter, RuleGapPolicy};
pub use result::{DiffEntry, DiffResult, EntryKind, IdentityPath};
