//! Hierarchical tally aggregation and cross-tier reconciliation.
//!
//! Pure engine crate: receives extracted fragments, returns tables, roll-up
//! views, and mismatch reports. No I/O.

pub mod summary;
pub mod table;
pub mod validate;

pub use summary::{SummaryBuilder, SummaryView};
pub use table::{AggregatedTable, MergeConflict, MergeOutcome};
pub use validate::{LabelMismatch, PrefixMismatch, ValidationReport, cross_validate, relative_percent};
