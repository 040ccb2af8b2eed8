//! Restore validation and expansion.
//!
//! Turns an untrusted [`RawSnapshot`] into the flat, ordered upsert sequence
//! a restore commits. Every parent's operation is queued before the
//! operations of its children. Records that cannot be addressed (no usable
//! id) are skipped and reported, never fatal.

use super::serializer::RawSnapshot;
use crate::models::{DocumentAddress, Fields, Record, WriteOperation};
use crate::registry::CollectionRegistry;
use std::collections::BTreeMap;

/// A non-fatal problem found while expanding a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Collection the problem was found in.
    pub collection: String,
    /// Description of the problem.
    pub message: String,
}

impl ValidationIssue {
    fn new(collection: &str, message: impl Into<String>) -> Self {
        Self {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}

/// Flattened restore work.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Upserts in commit order.
    pub operations: Vec<WriteOperation>,
    /// Operations per target collection.
    pub per_collection: BTreeMap<String, usize>,
    /// Records (parents or children) dropped because they cannot be written.
    pub skipped_records: usize,
    /// Why records were dropped.
    pub issues: Vec<ValidationIssue>,
}

/// Expands raw snapshots into write operations.
///
/// Child relations come from the registry first; for collections the
/// registry does not declare, the relations recorded in the snapshot itself
/// are used, so snapshots from a newer registry still restore their
/// children.
pub struct RestoreValidator<'a> {
    registry: &'a CollectionRegistry,
}

impl<'a> RestoreValidator<'a> {
    /// Creates a validator backed by `registry`.
    #[must_use]
    pub const fn new(registry: &'a CollectionRegistry) -> Self {
        Self { registry }
    }

    /// Flattens `snapshot` into an ordered upsert sequence.
    #[must_use]
    pub fn expand(&self, snapshot: RawSnapshot) -> Expansion {
        let recorded = snapshot.relations();
        let mut expansion = Expansion::default();

        for (collection, values) in snapshot.into_collections() {
            let child_collection = self
                .registry
                .child_relation_of(&collection)
                .or_else(|| recorded.get(&collection).map(String::as_str))
                .map(str::to_string);

            for (index, value) in values.into_iter().enumerate() {
                let mut skipped_children = 0;
                let Some(record) = Record::from_value(value, &mut skipped_children) else {
                    expansion.skip(&collection, 1, format!("record #{index} has no usable id"));
                    continue;
                };
                if skipped_children > 0 {
                    expansion.skip(
                        &collection,
                        skipped_children,
                        format!("record '{}': {skipped_children} children without a usable id", record.id),
                    );
                }
                expansion.push_record(&collection, child_collection.as_deref(), record);
            }
        }

        expansion
    }
}

impl Expansion {
    fn skip(&mut self, collection: &str, count: usize, message: String) {
        tracing::warn!(collection, count, "{message}; skipped");
        metrics::counter!("snapshot_records_skipped_total").increment(count as u64);
        self.skipped_records += count;
        self.issues.push(ValidationIssue::new(collection, message));
    }

    fn push(&mut self, target: DocumentAddress, fields: Fields) {
        *self
            .per_collection
            .entry(target.collection.clone())
            .or_default() += 1;
        self.operations.push(WriteOperation::upsert(target, fields));
    }

    fn push_record(&mut self, collection: &str, child_collection: Option<&str>, record: Record) {
        let Record {
            id,
            fields,
            children,
        } = record;
        self.push(DocumentAddress::top_level(collection, id.clone()), fields);

        let Some(children) = children.filter(|children| !children.is_empty()) else {
            return;
        };
        let Some(child_collection) = child_collection else {
            self.skip(
                collection,
                children.len(),
                format!("record '{id}' carries children but '{collection}' has no child relation"),
            );
            return;
        };

        for child in children {
            if child.child_count() > 0 {
                self.skip(
                    child_collection,
                    child.child_count(),
                    format!("record '{}' is nested more than one level deep", child.id),
                );
            }
            self.push(
                DocumentAddress::nested(child_collection, id.clone(), child.id),
                child.fields,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::serializer::SnapshotSerializer;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawSnapshot {
        SnapshotSerializer::deserialize(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_parent_before_children() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "courses": [
                {"id": "c1", "title": "Rust", "children": [{"id": "l1"}, {"id": "l2"}]},
                {"id": "c2", "children": [{"id": "l3"}]}
            ]
        })));

        let targets: Vec<_> = expansion
            .operations
            .iter()
            .map(|op| op.target.to_string())
            .collect();
        assert_eq!(
            targets,
            vec!["courses/c1", "lessons[c1]/l1", "lessons[c1]/l2", "courses/c2", "lessons[c2]/l3"]
        );
        assert_eq!(expansion.per_collection["courses"], 2);
        assert_eq!(expansion.per_collection["lessons"], 3);
        assert_eq!(expansion.skipped_records, 0);
    }

    #[test]
    fn test_reserved_keys_are_not_fields() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "courses": [{"id": "c1", "title": "Rust", "children": []}]
        })));

        let fields = &expansion.operations[0].fields;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["title"], json!("Rust"));
    }

    #[test]
    fn test_records_without_id_are_skipped_and_counted() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "users": [{"id": "u1"}, {"name": "anonymous"}, {"id": ""}, 7],
            "courses": [{"id": "c1", "children": [{"title": "orphan"}, {"id": "l1"}]}]
        })));

        assert_eq!(expansion.operations.len(), 3);
        assert_eq!(expansion.skipped_records, 4);
        assert_eq!(expansion.issues.len(), 4);
    }

    #[test]
    fn test_unknown_collections_restore_verbatim() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "badges": [{"id": "b1", "color": "gold"}]
        })));

        assert_eq!(expansion.operations.len(), 1);
        assert_eq!(expansion.operations[0].target, DocumentAddress::top_level("badges", "b1"));
    }

    #[test]
    fn test_recorded_relation_used_for_unregistered_collection() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "_snapshot": {"version": 1, "relations": {"quizzes": "questions"}},
            "quizzes": [{"id": "q1", "children": [{"id": "x1"}]}]
        })));

        assert_eq!(
            expansion.operations[1].target,
            DocumentAddress::nested("questions", "q1", "x1")
        );
    }

    #[test]
    fn test_children_without_relation_are_dropped() {
        let registry = CollectionRegistry::default();
        let expansion = RestoreValidator::new(&registry).expand(raw(json!({
            "users": [{"id": "u1", "children": [{"id": "x"}, {"id": "y"}]}]
        })));

        assert_eq!(expansion.operations.len(), 1);
        assert_eq!(expansion.skipped_records, 2);
    }
}
