//! Output artifacts: per-tier CSV tables, summary and cross-check logs, and
//! the machine-readable cross-check report.

pub mod csv;
pub mod report;

pub use self::csv::{render_csv, write_csv};
pub use report::{
    CrossCheckDocument, TierStats, render_cross_check_json, write_check_section,
    write_summary_section,
};
