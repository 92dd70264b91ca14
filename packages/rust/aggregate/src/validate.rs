//! Cross-tier reconciliation of roll-up views.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, instrument};

use tallycheck_shared::{MetricLabel, PathKey, TallyRecord, Tier};

use crate::summary::SummaryView;

/// One label whose counts differ between the two tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMismatch {
    pub label: MetricLabel,
    pub left: u64,
    pub right: u64,
    /// `(left / right - 1) * 100`; `None` when `right` is zero.
    pub relative_percent: Option<f64>,
}

/// All differing labels under one shared prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefixMismatch {
    pub prefix: PathKey,
    pub labels: Vec<LabelMismatch>,
}

/// Outcome of comparing two tiers' roll-up views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub left: Tier,
    pub right: Tier,
    /// Prefixes present in both views.
    pub compared_prefixes: usize,
    /// Shared prefixes whose records differ, in prefix order.
    pub mismatches: Vec<PrefixMismatch>,
}

impl ValidationReport {
    /// Whether no shared prefix disagreed.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Relative deviation of `left` from `right`, in percent.
pub fn relative_percent(left: u64, right: u64) -> Option<f64> {
    (right != 0).then(|| (left as f64 / right as f64 - 1.0) * 100.0)
}

/// Compare every prefix present in both views, label by label.
///
/// Labels missing from one side count as zero.
#[instrument(skip_all, fields(left = %left_tier, right = %right_tier))]
pub fn cross_validate(
    left_tier: Tier,
    left: &SummaryView,
    right_tier: Tier,
    right: &SummaryView,
) -> ValidationReport {
    let mut compared_prefixes = 0;
    let mut mismatches = Vec::new();

    for (prefix, left_record) in left.iter() {
        let Some(right_record) = right.get(prefix) else {
            continue;
        };
        compared_prefixes += 1;

        let labels = diff_records(left_record, right_record);
        if !labels.is_empty() {
            mismatches.push(PrefixMismatch {
                prefix: prefix.clone(),
                labels,
            });
        }
    }

    debug!(compared_prefixes, mismatches = mismatches.len(), "tiers compared");

    ValidationReport {
        left: left_tier,
        right: right_tier,
        compared_prefixes,
        mismatches,
    }
}

fn diff_records(left: &TallyRecord, right: &TallyRecord) -> Vec<LabelMismatch> {
    let labels: BTreeSet<&MetricLabel> = left.keys().chain(right.keys()).collect();

    labels
        .into_iter()
        .filter_map(|label| {
            let (l, r) = (left.count(label), right.count(label));
            (l != r).then(|| LabelMismatch {
                label: label.clone(),
                left: l,
                right: r,
                relative_percent: relative_percent(l, r),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SummaryBuilder;
    use crate::table::AggregatedTable;

    fn path(components: &[&str]) -> PathKey {
        components.iter().copied().collect()
    }

    fn label(text: &str) -> MetricLabel {
        MetricLabel::from(text)
    }

    fn table(rows: &[(&[&str], &str, u64)]) -> AggregatedTable {
        let mut t = AggregatedTable::new();
        for (p, l, c) in rows {
            t.insert(path(p), label(l), *c);
        }
        t
    }

    #[test]
    fn same_table_has_no_anomalies() {
        let t = table(&[
            (&["RegionX", "D1", "U1"], "Ballots issued", 200),
            (&["RegionX", "D2", "U2"], "Ballots issued", 250),
            (&["RegionY", "D3", "U3"], "Registered voters", 900),
        ]);
        let view = SummaryBuilder::new(true).build(&t);
        let report = cross_validate(Tier::Top, &view, Tier::Territorial, &view);
        assert!(report.is_clean());
        assert_eq!(report.compared_prefixes, view.len());
    }

    #[test]
    fn single_differing_label_is_reported() {
        let top = table(&[
            (&["RegionX", "Sum"], "Ballots issued", 450),
            (&["RegionX", "Sum"], "Registered voters", 1000),
        ]);
        let territorial = table(&[
            (&["RegionX", "Sum"], "Ballots issued", 500),
            (&["RegionX", "Sum"], "Registered voters", 1000),
        ]);
        let builder = SummaryBuilder::new(false);
        let report = cross_validate(
            Tier::Top,
            &builder.build(&top),
            Tier::Territorial,
            &builder.build(&territorial),
        );

        // Both the root and ["RegionX"] roll up the same single leaf.
        let region = report
            .mismatches
            .iter()
            .find(|m| m.prefix == path(&["RegionX"]))
            .expect("mismatch at RegionX");
        assert_eq!(region.labels.len(), 1);
        let m = &region.labels[0];
        assert_eq!(m.label, label("Ballots issued"));
        assert_eq!((m.left, m.right), (450, 500));
        assert!((m.relative_percent.unwrap() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn views_differing_at_one_prefix_report_exactly_one_entry() {
        let record = |count: u64| -> TallyRecord { [(label("Ballots issued"), count)].into_iter().collect() };
        let left: SummaryView = [
            (PathKey::root(), record(950)),
            (path(&["RegionX"]), record(450)),
            (path(&["RegionY"]), record(500)),
        ]
        .into_iter()
        .collect();
        let right: SummaryView = [
            (PathKey::root(), record(950)),
            (path(&["RegionX"]), record(500)),
            (path(&["RegionY"]), record(500)),
            (path(&["RegionZ"]), record(1)),
        ]
        .into_iter()
        .collect();

        let report = cross_validate(Tier::Top, &left, Tier::Territorial, &right);
        assert_eq!(report.compared_prefixes, 3);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].prefix, path(&["RegionX"]));
        assert_eq!(report.mismatches[0].labels.len(), 1);
        let pct = report.mismatches[0].labels[0].relative_percent.unwrap();
        assert!((pct + 10.0).abs() < 1e-9);
    }

    #[test]
    fn absent_label_counts_as_zero() {
        let left = table(&[(&["R"], "a", 5)]);
        let right = table(&[(&["R"], "b", 3)]);
        let report = cross_validate(
            Tier::Territorial,
            &SummaryView::totals_only(&left),
            Tier::Precinct,
            &SummaryView::totals_only(&right),
        );
        let labels = &report.mismatches[0].labels;
        assert_eq!(labels.len(), 2);
        assert_eq!((labels[0].left, labels[0].right), (5, 0));
        assert_eq!(labels[0].relative_percent, None);
        assert_eq!((labels[1].left, labels[1].right), (0, 3));
        assert_eq!(labels[1].relative_percent, Some(-100.0));
    }

    #[test]
    fn explicit_zero_matches_absent_label() {
        let with_zero: TallyRecord = [(label("Spoiled"), 0), (label("Votes"), 4)].into_iter().collect();
        let without: TallyRecord = [(label("Votes"), 4)].into_iter().collect();
        let left: SummaryView = [(PathKey::root(), with_zero)].into_iter().collect();
        let right: SummaryView = [(PathKey::root(), without)].into_iter().collect();

        let report = cross_validate(Tier::Top, &left, Tier::Territorial, &right);
        assert_eq!(report.compared_prefixes, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn disjoint_views_compare_nothing() {
        let left = SummaryBuilder::new(true).build(&table(&[(&["A"], "x", 1)]));
        let right = SummaryBuilder::new(true).build(&table(&[(&["B"], "x", 1)]));
        let report = cross_validate(Tier::Top, &left, Tier::Precinct, &right);
        // Only the root prefix is shared, and its totals agree.
        assert_eq!(report.compared_prefixes, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn relative_percent_guards_zero() {
        assert_eq!(relative_percent(5, 0), None);
        assert_eq!(relative_percent(0, 4), Some(-100.0));
        assert_eq!(relative_percent(6, 4), Some(50.0));
    }
}
