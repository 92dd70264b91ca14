//! Sorted associative counter.
//!
//! A [`Counter`] maps ordered keys to non-negative counts. An explicit zero is
//! stored like any other count, so a reported zero can overwrite an earlier
//! count. Reads of an absent key yield zero.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::MetricLabel;

/// Label → count tallies for one location.
pub type TallyRecord = Counter<MetricLabel>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counter<K: Ord> {
    counts: BTreeMap<K, u64>,
}

impl<K: Ord> Default for Counter<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Counter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `key`, zero when absent.
    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Stored count for `key`, `None` when absent.
    pub fn get(&self, key: &K) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Replace the count for `key`, returning the previous count if any.
    pub fn set_count(&mut self, key: K, count: u64) -> Option<u64> {
        self.counts.insert(key, count)
    }

    /// Add `count` to the existing count for `key`. Adding zero is a no-op.
    pub fn add(&mut self, key: K, count: u64) {
        if count > 0 {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    /// Add every count of `other` into `self`.
    pub fn add_all(&mut self, other: &Counter<K>)
    where
        K: Clone,
    {
        for (key, count) in other.iter() {
            self.add(key.clone(), count);
        }
    }

    /// Distinct keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.counts.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl<K: Ord> FromIterator<(K, u64)> for Counter<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut counter = Self::new();
        for (key, count) in iter {
            counter.set_count(key, count);
        }
        counter
    }
}
