//! Collection registry.
//!
//! Declares which top-level collections are exportable and which of them own
//! a nested child collection. The registry is fixed for the lifetime of a
//! process; changing it is a deployment decision made through the
//! configuration file.

use crate::io::META_KEY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One exportable collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    /// Collection name in the document store.
    pub name: String,
    /// Human-readable label for selection screens.
    pub label: String,
    /// Child collection nested under each document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,
}

impl CollectionEntry {
    /// Creates an entry without a child relation.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            child: None,
        }
    }

    /// Declares a nested child collection.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }
}

/// Ordered set of exportable collections.
///
/// Declaration order drives export order, which keeps snapshot output
/// deterministic regardless of how the caller orders its selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRegistry {
    entries: Vec<CollectionEntry>,
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                CollectionEntry::new("users", "Users"),
                CollectionEntry::new("courses", "Courses").with_child("lessons"),
                CollectionEntry::new("blogPosts", "Blog posts"),
                CollectionEntry::new("forumThreads", "Forum threads").with_child("replies"),
                CollectionEntry::new("events", "Events"),
                CollectionEntry::new("partners", "Partners"),
                CollectionEntry::new("notifications", "Notifications"),
            ],
        }
    }
}

impl CollectionRegistry {
    /// Builds a registry from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a name is empty or declared twice,
    /// or if a collection names itself as its child.
    pub fn from_entries(entries: Vec<CollectionEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "collection name cannot be empty".to_string(),
                ));
            }
            if entry.name == META_KEY {
                return Err(Error::InvalidInput(format!(
                    "collection name '{META_KEY}' is reserved for snapshot metadata"
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "collection '{}' is declared more than once",
                    entry.name
                )));
            }
            match entry.child.as_deref() {
                Some(child) if child.trim().is_empty() => {
                    return Err(Error::InvalidInput(format!(
                        "collection '{}' has an empty child collection name",
                        entry.name
                    )));
                },
                Some(child) if child == entry.name => {
                    return Err(Error::InvalidInput(format!(
                        "collection '{}' cannot nest itself",
                        entry.name
                    )));
                },
                _ => {},
            }
        }
        Ok(Self { entries })
    }

    /// Returns the exportable collections in declaration order.
    #[must_use]
    pub fn list_exportable(&self) -> &[CollectionEntry] {
        &self.entries
    }

    /// Returns the child collection registered under `name`.
    #[must_use]
    pub fn child_relation_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.child.as_deref())
    }

    /// Returns whether `name` is a registered top-level collection.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }
}
