//! Restore manifest.

use serde::Serialize;
use std::collections::BTreeMap;

/// Per-collection top-level record counts of an analyzed snapshot file.
///
/// Advisory only. Shown to the operator before a restore is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RestoreManifest {
    counts: BTreeMap<String, usize>,
}

impl RestoreManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the count for a collection.
    pub fn insert(&mut self, collection: impl Into<String>, count: usize) {
        self.counts.insert(collection.into(), count);
    }

    /// Returns the count for a collection.
    #[must_use]
    pub fn get(&self, collection: &str) -> Option<usize> {
        self.counts.get(collection).copied()
    }

    /// Returns the underlying counts.
    #[must_use]
    pub const fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Iterates `(collection, count)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Returns the number of collections.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.counts.len()
    }

    /// Returns the sum of all counts.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.counts.values().sum()
    }

    /// Returns whether the manifest lists no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, usize)> for RestoreManifest {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
