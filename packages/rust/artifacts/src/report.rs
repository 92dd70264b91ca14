//! Summary log, cross-check log, and the JSON cross-check report.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use tallycheck_aggregate::{SummaryView, ValidationReport};
use tallycheck_shared::{PathKey, Tier};

/// Write the whole-table totals of one tier.
///
/// ```text
/// **** Summary for top (aggregate over []):
///            1000 : Registered voters
/// ```
pub fn write_summary_section<W: Write>(out: &mut W, tier: Tier, view: &SummaryView) -> io::Result<()> {
    let root = PathKey::root();
    writeln!(out, "**** Summary for {tier} (aggregate over {root}):")?;

    match view.get(&root).filter(|record| !record.is_empty()) {
        Some(record) => {
            for (label, count) in record.iter() {
                writeln!(out, "{count:>15} : {label}")?;
            }
        }
        None => writeln!(out, "No data.")?,
    }

    writeln!(out)?;
    out.flush()
}

/// Write the mismatches between one pair of tiers.
///
/// ```text
/// **** Checking totals between 'top' and 'territorial':
/// Found mismatches in aggregates over [RegionX]:
///  {      450} vs {      500} [-10.0%]: Ballots issued
/// ```
pub fn write_check_section<W: Write>(out: &mut W, report: &ValidationReport) -> io::Result<()> {
    writeln!(
        out,
        "**** Checking totals between '{}' and '{}':",
        report.left, report.right
    )?;

    if report.is_clean() {
        writeln!(out, "No anomalies in data.")?;
    }

    for mismatch in &report.mismatches {
        writeln!(out, "Found mismatches in aggregates over {}:", mismatch.prefix)?;
        for m in &mismatch.labels {
            let pct = match m.relative_percent {
                Some(p) => format!("{p:4.1}%"),
                None => "n/a".to_string(),
            };
            writeln!(out, " {{{:>9}}} vs {{{:>9}}} [{pct}]: {}", m.left, m.right, m.label)?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    out.flush()
}

/// Per-tier counters carried by the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub tier: Tier,
    /// File name pattern that selected the tier's documents.
    pub pattern: String,
    /// Primary pattern that yielded nothing, when a fallback pattern was used.
    pub fallback_from: Option<String>,
    /// Documents read under every attempted pattern.
    pub documents: usize,
    pub errors: usize,
    pub conflicts: usize,
    /// Distinct paths in the tier's table.
    pub paths: usize,
}

/// The `cross-check.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct CrossCheckDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub cross_validate: bool,
    pub tiers: &'a [TierStats],
    pub reports: &'a [ValidationReport],
}

pub fn render_cross_check_json(doc: &CrossCheckDocument<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(doc)
}
