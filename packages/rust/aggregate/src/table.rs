//! Location-keyed store of tallies.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use tallycheck_shared::{MergePolicy, MetricLabel, PathKey, TallyRecord};

/// A write that met an existing, different count for the same (path, label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeConflict {
    pub path: PathKey,
    pub label: MetricLabel,
    /// Count stored before the write.
    pub previous: u64,
    /// Count carried by the write.
    pub incoming: u64,
}

/// Result of merging one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Facts applied from the fragment.
    pub facts: usize,
    /// Writes that met a different existing count.
    pub conflicts: Vec<MergeConflict>,
}

/// Tallies keyed by location path, iterated in [`PathKey`] order.
///
/// Each (path, label) pair holds at most one count. A repeated write follows
/// the table's [`MergePolicy`]: under `Overwrite` the last write wins, under
/// `Strict` the first count is kept. Writes are never additive; summing across
/// locations is [`rollup`](Self::rollup)'s job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedTable {
    entries: BTreeMap<PathKey, TallyRecord>,
    policy: MergePolicy,
}

impl AggregatedTable {
    /// An empty table with the `Overwrite` policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            entries: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Record `count` for (`path`, `label`). Zero is a count like any other.
    ///
    /// Returns the conflict when an existing count differed from `count`.
    pub fn insert(&mut self, path: PathKey, label: MetricLabel, count: u64) -> Option<MergeConflict> {
        let record = self.entries.entry(path.clone()).or_default();

        match record.get(&label) {
            Some(previous) if previous != count => {
                if self.policy == MergePolicy::Overwrite {
                    record.set_count(label.clone(), count);
                }
                Some(MergeConflict {
                    path,
                    label,
                    previous,
                    incoming: count,
                })
            }
            _ => {
                record.set_count(label, count);
                None
            }
        }
    }

    /// Apply every fact of `fragment`, in path then label order.
    pub fn merge(&mut self, fragment: &AggregatedTable) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for (path, record) in fragment.iter() {
            if record.is_empty() {
                self.entries.entry(path.clone()).or_default();
                continue;
            }
            for (label, count) in record.iter() {
                outcome.facts += 1;
                if let Some(conflict) = self.insert(path.clone(), label.clone(), count) {
                    outcome.conflicts.push(conflict);
                }
            }
        }

        outcome
    }

    /// Additive sum of every entry whose path starts with `prefix`
    /// (case-insensitive, component by component).
    pub fn rollup(&self, prefix: &PathKey) -> TallyRecord {
        let mut total = TallyRecord::new();
        for (_, record) in self.entries.iter().filter(|(path, _)| path.starts_with_ignore_case(prefix)) {
            total.add_all(record);
        }
        total
    }

    /// Every distinct label in the table, in label order.
    pub fn labels(&self) -> BTreeSet<MetricLabel> {
        self.entries
            .values()
            .flat_map(|record| record.keys().cloned())
            .collect()
    }

    /// Length of the longest path.
    pub fn max_depth(&self) -> usize {
        self.entries.keys().map(PathKey::len).max().unwrap_or(0)
    }

    /// Count for (`path`, `label`), zero when absent.
    pub fn count(&self, path: &PathKey, label: &MetricLabel) -> u64 {
        self.entries.get(path).map_or(0, |record| record.count(label))
    }

    pub fn get(&self, path: &PathKey) -> Option<&TallyRecord> {
        self.entries.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &TallyRecord)> {
        self.entries.iter()
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
