//! Identity and equivalence rules
//!
//! Pure functions deciding whether objects from two catalogs are the same
//! element, and whether same-identity objects are equivalent despite dialect
//! differences.

pub mod defaults;
pub mod dialect;
pub mod equivalence;
pub mod identity;
pub mod types;

// Re-export key types
pub use dialect::{CaseFolding, DefaultValueRules, Dialect, DialectPair};
pub use equivalence::{
    AttributeDiff, AttributeValue, Equivalence, EquivalenceRules, RuleGap, RuleSet,
};
pub use identity::{identity_key, schema_key, AutoNamePredicate};
pub use types::{CanonicalType, TypeCategory, TypeResolver};
