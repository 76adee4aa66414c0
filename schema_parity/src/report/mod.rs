//! Reporting and gating
//!
//! Everything here is a read-only projection of a [`crate::diff::DiffResult`].

pub mod document;
pub mod gate;
pub mod summary;

pub use document::{write_report, DiffReport, ReportEntry, ReportFormat};
pub use gate::{GateOutcome, GatePolicy};
pub use summary::render_summary;
