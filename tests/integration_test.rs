//! Integration tests for snapvault.
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::too_many_lines,
    clippy::doc_markdown
)]

use serde_json::json;
use snapvault::io::{LastProgress, NoopProgress, RestoreAnalyzer};
use snapvault::models::{DocumentAddress, Fields, Record};
use snapvault::storage::{InMemoryDocumentStore, SqliteDocumentStore};
use snapvault::transfer::FilesystemTransfer;
use snapvault::{CollectionRegistry, Error, SnapshotEngine};
use std::collections::BTreeSet;
use std::sync::Arc;

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

fn selection(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

fn memory_engine(
    store: &Arc<InMemoryDocumentStore>,
    batch: usize,
) -> SnapshotEngine<InMemoryDocumentStore> {
    SnapshotEngine::new(Arc::clone(store), CollectionRegistry::default(), batch).unwrap()
}

fn seeded_platform() -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.seed(
        "users",
        (1..=3)
            .map(|i| Record::new(format!("u{i}"), fields(json!({"name": format!("user {i}"), "active": true}))))
            .collect(),
    );
    store.seed_with_children(
        "courses",
        Some("lessons"),
        vec![
            Record::new("c1", fields(json!({"title": "Rust"}))).with_children(vec![
                Record::new("l1", fields(json!({"order": 1}))),
                Record::new("l2", fields(json!({"order": 2}))),
            ]),
            Record::new("c2", fields(json!({"title": "Go"}))),
        ],
    );
    store.seed(
        "partners",
        (1..=5)
            .map(|i| Record::new(format!("p{i}"), fields(json!({"tier": i}))))
            .collect(),
    );
    store
}

#[test]
fn test_error_display() {
    let err = Error::PartialCommit {
        committed: 2,
        total: 5,
        cause: "quota exceeded".to_string(),
    };
    let display = err.to_string();
    assert!(display.contains("2 operations committed"));
    assert!(display.contains("of 5"));
    assert!(display.contains("quota exceeded"));

    let err = Error::Read {
        collection: "courses".to_string(),
        cause: "permission denied".to_string(),
    };
    assert!(err.to_string().contains("courses"));
    assert_eq!(err.committed(), None);
}

#[tokio::test]
async fn test_partners_only_export() {
    let store = seeded_platform();
    let engine = memory_engine(&store, 450);
    let progress = LastProgress::new();

    let exported = engine
        .export_snapshot(&selection(&["partners"]), &progress)
        .await
        .unwrap();
    assert_eq!(progress.last().map(|(p, _)| p), Some(100));

    let manifest = RestoreAnalyzer::default().analyze(&exported.bytes).unwrap();
    assert_eq!(manifest.collection_count(), 1);
    assert_eq!(manifest.get("partners"), Some(5));
}

#[test]
fn test_manifest_accuracy() {
    let bytes = json!({
        "users": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
        "courses": [{"id": "x", "children": [{"id": "l"}]}, {"id": "y"}]
    })
    .to_string();

    let manifest = RestoreAnalyzer::default().analyze(bytes.as_bytes()).unwrap();
    let counts: Vec<_> = manifest.iter().collect();
    assert_eq!(counts, vec![("courses", 2), ("users", 3)]);
    // Analysis is repeatable.
    assert_eq!(
        RestoreAnalyzer::default().analyze(bytes.as_bytes()).unwrap(),
        manifest
    );
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let source = seeded_platform();
    let exported = memory_engine(&source, 450)
        .export_snapshot(&selection(&["users", "courses", "partners"]), &NoopProgress)
        .await
        .unwrap();

    let target = Arc::new(InMemoryDocumentStore::new());
    let engine = memory_engine(&target, 3);

    let first = engine
        .restore(engine.analyze(&exported.bytes).unwrap(), &NoopProgress)
        .await
        .unwrap();
    let after_first = target.dump();

    let second = engine
        .restore(engine.analyze(&exported.bytes).unwrap(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(target.dump(), after_first);
    assert_eq!(after_first, source.dump());
    // 3 users + 2 courses + 2 lessons + 5 partners.
    assert_eq!(first.operations_committed, 12);
    assert_eq!(first.batches, 4);
}

#[tokio::test]
async fn test_restore_overwrites_existing_documents() {
    let target = Arc::new(InMemoryDocumentStore::new());
    target.seed("users", vec![Record::new("u1", fields(json!({"name": "stale", "extra": 1})))]);
    let engine = memory_engine(&target, 10);

    let bytes = json!({"users": [{"id": "u1", "name": "fresh"}]}).to_string();
    engine
        .restore(engine.analyze(bytes.as_bytes()).unwrap(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(
        target.get(&DocumentAddress::top_level("users", "u1")),
        Some(fields(json!({"name": "fresh"})))
    );
}

#[tokio::test]
async fn test_read_failure_returns_no_snapshot() {
    let store = seeded_platform();
    store.fail_list_of("courses");
    let engine = memory_engine(&store, 450);

    let err = engine
        .export_snapshot(&selection(&["users", "courses", "partners"]), &NoopProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Read { ref collection, .. } if collection == "courses"));
}

#[tokio::test]
async fn test_partial_commit_keeps_earlier_batches() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.fail_commit_at(2);
    let engine = memory_engine(&store, 2);

    let bytes = json!({
        "events": [{"id": "e1"}, {"id": "e2"}, {"id": "e3"}, {"id": "e4"}, {"id": "e5"}]
    })
    .to_string();
    let plan = engine.analyze(bytes.as_bytes()).unwrap();
    let err = engine.restore(plan, &NoopProgress).await.unwrap_err();

    assert!(err.to_string().contains("2 operations committed"));
    assert_eq!(err.committed(), Some(2));
    assert_eq!(store.commit_calls(), vec![2, 2]);
    assert_eq!(store.document_count(), 2);
    assert!(store.get(&DocumentAddress::top_level("events", "e1")).is_some());
    assert!(store.get(&DocumentAddress::top_level("events", "e3")).is_none());
}

#[tokio::test]
async fn test_sqlite_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let transfer = FilesystemTransfer::new(dir.path().join("snapshots"));

    let source = Arc::new(SqliteDocumentStore::open(dir.path().join("source.db")).unwrap());
    let seed = SnapshotEngine::new(Arc::clone(&source), CollectionRegistry::default(), 450).unwrap();
    let seed_bytes = json!({
        "forumThreads": [
            {"id": "t1", "title": "Welcome", "children": [{"id": "r1", "body": "hi"}, {"id": "r2", "body": "yo"}]}
        ],
        "events": [{"id": "e1", "when": "2026-10-19"}]
    })
    .to_string();
    seed.restore(seed.analyze(seed_bytes.as_bytes()).unwrap(), &NoopProgress)
        .await
        .unwrap();

    let (exported, location) = seed
        .export_to(&transfer, &selection(&["forumThreads", "events"]), &NoopProgress)
        .await
        .unwrap();
    assert!(location.ends_with(&exported.filename));
    assert_eq!(exported.manifest.get("forumThreads"), Some(1));

    let target = Arc::new(SqliteDocumentStore::open(dir.path().join("target.db")).unwrap());
    let engine = SnapshotEngine::new(Arc::clone(&target), CollectionRegistry::default(), 2).unwrap();
    let plan = engine.analyze_file(&transfer, &location).unwrap();
    let summary = engine.restore(plan, &NoopProgress).await.unwrap();
    assert_eq!(summary.operations_committed, 4);

    let reexported = engine
        .export_snapshot(&selection(&["forumThreads", "events"]), &NoopProgress)
        .await
        .unwrap();
    let (original, _) = snapvault::io::SnapshotSerializer::deserialize(&exported.bytes)
        .unwrap()
        .into_snapshot();
    let (copy, _) = snapvault::io::SnapshotSerializer::deserialize(&reexported.bytes)
        .unwrap()
        .into_snapshot();
    assert_eq!(copy.collections, original.collections);
}

#[tokio::test]
async fn test_whitespace_ids_survive_restore() {
    let source = Arc::new(InMemoryDocumentStore::new());
    source.seed(
        "users",
        vec![
            Record::new(" ", fields(json!({"name": "blank"}))),
            Record::new("u1", fields(json!({"name": "one"}))),
        ],
    );
    let exported = memory_engine(&source, 450)
        .export_snapshot(&selection(&["users"]), &NoopProgress)
        .await
        .unwrap();

    let target = Arc::new(InMemoryDocumentStore::new());
    let engine = memory_engine(&target, 450);
    let summary = engine
        .restore(engine.analyze(&exported.bytes).unwrap(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(summary.skipped_records, 0);
    assert_eq!(target.dump(), source.dump());
}

#[test]
fn test_metadata_key_cannot_be_registered() {
    let entries = vec![snapvault::registry::CollectionEntry::new(
        snapvault::io::META_KEY,
        "Metadata",
    )];
    let err = CollectionRegistry::from_entries(entries).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
