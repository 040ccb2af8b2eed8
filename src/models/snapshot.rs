//! Snapshot model.

use super::Record;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The in-memory export artifact: one ordered record sequence per collection.
///
/// Collection order is irrelevant; record order within a collection is the
/// order the document store listed them in and is preserved through
/// serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// Records keyed by collection name.
    pub collections: BTreeMap<String, Vec<Record>>,
    /// Parent collection to child collection relations in effect at export.
    pub relations: BTreeMap<String, String>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new(exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            collections: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Inserts (or replaces) the records of a collection.
    pub fn insert(&mut self, collection: impl Into<String>, records: Vec<Record>) {
        self.collections.insert(collection.into(), records);
    }

    /// Records a parent to child collection relation.
    pub fn add_relation(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        self.relations.insert(parent.into(), child.into());
    }

    /// Returns the records of a collection.
    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&[Record]> {
        self.collections.get(collection).map(Vec::as_slice)
    }

    /// Returns the collection names in the snapshot.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Returns the number of top-level records across all collections.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Returns the number of child records across all collections.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.collections
            .values()
            .flatten()
            .map(Record::child_count)
            .sum()
    }

    /// Returns whether the snapshot holds no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
