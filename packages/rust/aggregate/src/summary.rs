//! Prefix roll-up views of an aggregated table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use tallycheck_shared::{PathKey, TallyRecord};

use crate::table::AggregatedTable;

/// Roll-up records keyed by path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryView {
    rollups: BTreeMap<PathKey, TallyRecord>,
}

impl SummaryView {
    /// A view holding only the whole-table totals under the empty prefix.
    pub fn totals_only(table: &AggregatedTable) -> Self {
        let mut rollups = BTreeMap::new();
        if !table.is_empty() {
            rollups.insert(PathKey::root(), table.rollup(&PathKey::root()));
        }
        Self { rollups }
    }

    pub fn get(&self, prefix: &PathKey) -> Option<&TallyRecord> {
        self.rollups.get(prefix)
    }

    /// Roll-up of the empty prefix, if the table had any entries.
    pub fn totals(&self) -> Option<&TallyRecord> {
        self.get(&PathKey::root())
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &PathKey> {
        self.rollups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &TallyRecord)> {
        self.rollups.iter()
    }

    pub fn len(&self) -> usize {
        self.rollups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rollups.is_empty()
    }
}

impl FromIterator<(PathKey, TallyRecord)> for SummaryView {
    fn from_iter<I: IntoIterator<Item = (PathKey, TallyRecord)>>(iter: I) -> Self {
        Self {
            rollups: iter.into_iter().collect(),
        }
    }
}

/// Enumerates the prefixes occurring in a table and rolls each one up.
#[derive(Debug, Clone, Copy)]
pub struct SummaryBuilder {
    include_leaf_level: bool,
}

impl SummaryBuilder {
    /// With `include_leaf_level` false, prefixes stop one level above the
    /// table's deepest paths.
    pub fn new(include_leaf_level: bool) -> Self {
        Self { include_leaf_level }
    }

    /// Distinct prefixes of the table's paths, from the empty prefix down to
    /// the depth limit.
    pub fn prefixes(&self, table: &AggregatedTable) -> BTreeSet<PathKey> {
        let max_depth = table.max_depth();
        let limit = if self.include_leaf_level {
            max_depth
        } else {
            max_depth.saturating_sub(1)
        };

        table
            .paths()
            .flat_map(|path| (0..=limit.min(path.len())).map(move |len| path.prefix(len)))
            .collect()
    }

    pub fn build(&self, table: &AggregatedTable) -> SummaryView {
        let rollups: BTreeMap<_, _> = self
            .prefixes(table)
            .into_iter()
            .map(|prefix| {
                let record = table.rollup(&prefix);
                (prefix, record)
            })
            .collect();

        debug!(
            prefixes = rollups.len(),
            include_leaf_level = self.include_leaf_level,
            "summary view built"
        );

        SummaryView { rollups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallycheck_shared::MetricLabel;

    fn path(components: &[&str]) -> PathKey {
        components.iter().copied().collect()
    }

    fn label(text: &str) -> MetricLabel {
        MetricLabel::from(text)
    }

    fn sample() -> AggregatedTable {
        let mut t = AggregatedTable::new();
        t.insert(path(&["R1", "D1", "U1"]), label("voters"), 100);
        t.insert(path(&["R1", "D1", "U2"]), label("voters"), 200);
        t.insert(path(&["R1", "D2"]), label("voters"), 50);
        t
    }

    #[test]
    fn prefixes_include_leaves() {
        let prefixes: Vec<_> = SummaryBuilder::new(true).prefixes(&sample()).into_iter().collect();
        assert_eq!(
            prefixes,
            vec![
                PathKey::root(),
                path(&["R1"]),
                path(&["R1", "D1"]),
                path(&["R1", "D1", "U1"]),
                path(&["R1", "D1", "U2"]),
                path(&["R1", "D2"]),
            ]
        );
    }

    #[test]
    fn prefixes_stop_above_deepest_level() {
        let prefixes = SummaryBuilder::new(false).prefixes(&sample());
        assert_eq!(prefixes.len(), 4);
        assert!(prefixes.contains(&path(&["R1", "D2"])));
        assert!(!prefixes.contains(&path(&["R1", "D1", "U1"])));
    }

    #[test]
    fn build_rolls_up_each_prefix() {
        let view = SummaryBuilder::new(true).build(&sample());
        assert_eq!(view.totals().unwrap().count(&label("voters")), 350);
        assert_eq!(view.get(&path(&["R1", "D1"])).unwrap().count(&label("voters")), 300);
        assert_eq!(view.get(&path(&["R1", "D1", "U2"])).unwrap().count(&label("voters")), 200);
    }

    #[test]
    fn empty_table_has_empty_view() {
        let table = AggregatedTable::new();
        assert!(SummaryBuilder::new(true).build(&table).is_empty());
        assert!(SummaryView::totals_only(&table).is_empty());
    }

    #[test]
    fn totals_only_holds_root() {
        let view = SummaryView::totals_only(&sample());
        assert_eq!(view.len(), 1);
        assert_eq!(view.totals().unwrap().count(&label("voters")), 350);
    }
}
