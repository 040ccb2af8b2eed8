//! In-memory document store for testing.
//!
//! Provides a fast, non-persistent implementation of [`DocumentStore`] for
//! unit tests and for embedding the engine without a database. It records the
//! size of every commit call and can be told to fail a specific commit or
//! listing, so partial-failure paths can be exercised.

use crate::models::{DocumentAddress, Fields, Record, WriteOperation};
use crate::storage::STORE_BATCH_CEILING;
use crate::storage::traits::DocumentStore;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Collection plus optional parent id.
type Scope = (String, Option<String>);

#[derive(Debug, Default)]
struct State {
    documents: HashMap<Scope, BTreeMap<String, Fields>>,
    commit_calls: Vec<usize>,
    fail_commit_at: Option<usize>,
    fail_list_of: Option<String>,
}

/// In-memory document store.
///
/// Documents within a scope are listed in id order.
///
/// # Example
///
/// ```rust,ignore
/// use snapvault::storage::InMemoryDocumentStore;
///
/// let store = InMemoryDocumentStore::new();
/// store.seed("users", vec![record]);
/// ```
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
    ceiling: usize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store with the default commit ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ceiling(STORE_BATCH_CEILING)
    }

    /// Creates an empty store with a custom commit ceiling.
    #[must_use]
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            ceiling,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|e| Error::OperationFailed {
            operation: "memory_store_read".to_string(),
            cause: e.to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|e| Error::OperationFailed {
            operation: "memory_store_write".to_string(),
            cause: e.to_string(),
        })
    }

    /// Inserts top-level records, including their children if present.
    ///
    /// Children are stored under `child_collection` scoped by the parent id.
    pub fn seed_with_children(
        &self,
        collection: &str,
        child_collection: Option<&str>,
        records: Vec<Record>,
    ) {
        let Ok(mut state) = self.write() else {
            return;
        };
        for record in records {
            if let (Some(child_collection), Some(children)) = (child_collection, record.children) {
                let scope = (child_collection.to_string(), Some(record.id.clone()));
                let entry = state.documents.entry(scope).or_default();
                for child in children {
                    entry.insert(child.id, child.fields);
                }
            }
            state
                .documents
                .entry((collection.to_string(), None))
                .or_default()
                .insert(record.id, record.fields);
        }
    }

    /// Inserts top-level records.
    pub fn seed(&self, collection: &str, records: Vec<Record>) {
        self.seed_with_children(collection, None, records);
    }

    /// Returns the fields stored at an address.
    #[must_use]
    pub fn get(&self, address: &DocumentAddress) -> Option<Fields> {
        let state = self.read().ok()?;
        state
            .documents
            .get(&(address.collection.clone(), address.parent_id.clone()))
            .and_then(|docs| docs.get(&address.id))
            .cloned()
    }

    /// Returns the number of documents in a scope.
    #[must_use]
    pub fn count(&self, collection: &str, parent_id: Option<&str>) -> usize {
        self.read()
            .ok()
            .and_then(|state| {
                state
                    .documents
                    .get(&(collection.to_string(), parent_id.map(str::to_string)))
                    .map(BTreeMap::len)
            })
            .unwrap_or(0)
    }

    /// Returns the number of documents across every scope.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.read()
            .map(|state| state.documents.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Returns every stored document keyed by address.
    #[must_use]
    pub fn dump(&self) -> BTreeMap<DocumentAddress, Fields> {
        let Ok(state) = self.read() else {
            return BTreeMap::new();
        };
        state
            .documents
            .iter()
            .flat_map(|((collection, parent_id), docs)| {
                docs.iter().map(move |(id, fields)| {
                    (
                        DocumentAddress {
                            collection: collection.clone(),
                            parent_id: parent_id.clone(),
                            id: id.clone(),
                        },
                        fields.clone(),
                    )
                })
            })
            .collect()
    }

    /// Returns the size of every commit call, failed ones included.
    #[must_use]
    pub fn commit_calls(&self) -> Vec<usize> {
        self.read()
            .map(|state| state.commit_calls.clone())
            .unwrap_or_default()
    }

    /// Makes the `call`-th commit (1-based) fail.
    pub fn fail_commit_at(&self, call: usize) {
        if let Ok(mut state) = self.write() {
            state.fail_commit_at = Some(call);
        }
    }

    /// Makes every listing of `collection` fail.
    pub fn fail_list_of(&self, collection: &str) {
        if let Ok(mut state) = self.write() {
            state.fail_list_of = Some(collection.to_string());
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, collection: &str, parent_id: Option<&str>) -> Result<Vec<Record>> {
        let state = self.read()?;
        if state.fail_list_of.as_deref() == Some(collection) {
            return Err(Error::OperationFailed {
                operation: "memory_store_list".to_string(),
                cause: format!("injected failure listing '{collection}'"),
            });
        }

        let scope = (collection.to_string(), parent_id.map(str::to_string));
        Ok(state
            .documents
            .get(&scope)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit_batch(&self, operations: &[WriteOperation]) -> Result<()> {
        let mut state = self.write()?;
        state.commit_calls.push(operations.len());
        let call = state.commit_calls.len();

        if operations.len() > self.ceiling {
            return Err(Error::OperationFailed {
                operation: "memory_store_commit".to_string(),
                cause: format!(
                    "batch of {} exceeds store ceiling of {}",
                    operations.len(),
                    self.ceiling
                ),
            });
        }
        if state.fail_commit_at == Some(call) {
            return Err(Error::OperationFailed {
                operation: "memory_store_commit".to_string(),
                cause: format!("injected failure on commit {call}"),
            });
        }

        for op in operations {
            let scope = (op.target.collection.clone(), op.target.parent_id.clone());
            state
                .documents
                .entry(scope)
                .or_default()
                .insert(op.target.id.clone(), op.fields.clone());
        }
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.ceiling
    }
}
