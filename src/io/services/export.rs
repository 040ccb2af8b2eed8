//! Snapshot export.
//!
//! Reads the selected collections (and their registered child collections)
//! into an in-memory [`Snapshot`]. Reads are sequential and fail fast: a
//! partial backup is worse than none.

use crate::io::traits::{ProgressReporter, percent};
use crate::models::{Record, Snapshot};
use crate::registry::CollectionRegistry;
use crate::storage::DocumentStore;
use crate::{Error, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

/// Reads collections from a document store into a snapshot.
pub struct SnapshotReader<'a, S> {
    store: &'a S,
    registry: &'a CollectionRegistry,
}

impl<'a, S: DocumentStore> SnapshotReader<'a, S> {
    /// Creates a reader.
    #[must_use]
    pub const fn new(store: &'a S, registry: &'a CollectionRegistry) -> Self {
        Self { store, registry }
    }

    /// Reads every selected collection.
    ///
    /// Collections are visited in registry order, not selection order, so
    /// the same selection always produces the same snapshot layout. Selected
    /// names the registry does not know are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] for the first listing that fails; nothing read
    /// so far is returned.
    #[instrument(skip_all, fields(selected = selected.len()))]
    pub async fn read(
        &self,
        selected: &BTreeSet<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<Snapshot> {
        for name in selected.iter().filter(|name| !self.registry.contains(name)) {
            warn!(collection = %name, "selected collection is not exportable; ignored");
        }

        let entries: Vec<_> = self
            .registry
            .list_exportable()
            .iter()
            .filter(|entry| selected.contains(&entry.name))
            .collect();
        let total = entries.len();
        let mut snapshot = Snapshot::new(Utc::now());

        for (index, entry) in entries.into_iter().enumerate() {
            let mut records = self.list(&entry.name, None).await?;

            if let Some(child) = entry.child.as_deref() {
                snapshot.add_relation(&entry.name, child);
                for record in &mut records {
                    let children = self.list(child, Some(&record.id)).await?;
                    record.children = Some(children);
                }
            }

            let children: usize = records.iter().map(|r| r.child_count()).sum();
            info!(
                collection = %entry.name,
                records = records.len(),
                children,
                "collection exported"
            );
            metrics::counter!("snapshot_records_exported_total", "collection" => entry.name.clone())
                .increment((records.len() + children) as u64);
            progress.report(
                percent(index + 1, total),
                &format!("Exported {} ({} records)", entry.label, records.len()),
            );
            snapshot.insert(entry.name.clone(), records);
        }

        Ok(snapshot)
    }

    async fn list(
        &self,
        collection: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Record>> {
        self.store
            .list(collection, parent_id)
            .await
            .map_err(|e| Error::Read {
                collection: parent_id.map_or_else(
                    || collection.to_string(),
                    |parent| format!("{collection} (under {parent})"),
                ),
                cause: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::traits::LastProgress;
    use crate::storage::InMemoryDocumentStore;
    use serde_json::json;

    fn record(id: &str) -> Record {
        Record::new(id, json!({"name": id}).as_object().cloned().unwrap_or_default())
    }

    fn selection(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn seeded() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        store.seed("users", vec![record("u1"), record("u2")]);
        store.seed_with_children(
            "courses",
            Some("lessons"),
            vec![
                record("c1").with_children(vec![record("l1"), record("l2")]),
                record("c2"),
            ],
        );
        store.seed("partners", (1..=5).map(|i| record(&format!("p{i}"))).collect());
        store
    }

    #[tokio::test]
    async fn test_reads_children_for_registered_relation() {
        let store = seeded();
        let registry = CollectionRegistry::default();
        let reader = SnapshotReader::new(&store, &registry);

        let snapshot = reader
            .read(&selection(&["courses"]), &LastProgress::new())
            .await
            .unwrap();

        let courses = snapshot.get("courses").unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].child_count(), 2);
        // No children is an empty sequence, not an error.
        assert_eq!(courses[1].children, Some(Vec::new()));
        assert_eq!(snapshot.relations.get("courses").map(String::as_str), Some("lessons"));
    }

    #[tokio::test]
    async fn test_single_collection_selection() {
        let store = seeded();
        let registry = CollectionRegistry::default();
        let progress = LastProgress::new();

        let snapshot = SnapshotReader::new(&store, &registry)
            .read(&selection(&["partners"]), &progress)
            .await
            .unwrap();

        assert_eq!(snapshot.collection_names().collect::<Vec<_>>(), vec!["partners"]);
        assert_eq!(snapshot.get("partners").unwrap().len(), 5);
        assert!(snapshot.get("partners").unwrap().iter().all(|r| r.children.is_none()));
        assert_eq!(progress.last().map(|(p, _)| p), Some(100));
    }

    #[tokio::test]
    async fn test_progress_follows_registry_order() {
        let store = seeded();
        let registry = CollectionRegistry::default();
        let seen = std::sync::Mutex::new(Vec::new());
        let progress = |p: u8, m: &str| {
            if let Ok(mut seen) = seen.lock() {
                seen.push((p, m.to_string()));
            }
        };

        SnapshotReader::new(&store, &registry)
            .read(&selection(&["partners", "users"]), &progress)
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 50);
        assert!(seen[0].1.contains("Users"));
        assert_eq!(seen[1].0, 100);
        assert!(seen[1].1.contains("Partners"));
    }

    #[tokio::test]
    async fn test_read_failure_aborts_export() {
        let store = seeded();
        store.fail_list_of("lessons");
        let registry = CollectionRegistry::default();

        let err = SnapshotReader::new(&store, &registry)
            .read(&selection(&["users", "courses"]), &LastProgress::new())
            .await
            .unwrap_err();

        match err {
            Error::Read { collection, .. } => assert!(collection.starts_with("lessons")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_selection_is_ignored() {
        let store = seeded();
        let registry = CollectionRegistry::default();
        let snapshot = SnapshotReader::new(&store, &registry)
            .read(&selection(&["nope"]), &LastProgress::new())
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }
}
