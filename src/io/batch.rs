//! Capped, ordered batch commits.
//!
//! The document store is atomic only within a single commit call, so a long
//! operation sequence is committed as consecutive groups, strictly one after
//! another. Groups are never committed concurrently: a later group may hold
//! children whose parents sit in an earlier one.

use crate::models::WriteOperation;
use crate::storage::DocumentStore;
use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Default number of operations per commit, below the store ceiling of 500.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 450;

/// Cooperative cancellation flag checked between batch commits.
///
/// Cancelling never interrupts a commit already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Commits operation sequences in groups of at most `max_batch_size`.
#[derive(Debug)]
pub struct BatchCommitter<S> {
    store: Arc<S>,
    max_batch_size: usize,
    cancel: Option<CancelFlag>,
}

impl<S: DocumentStore> BatchCommitter<S> {
    /// Creates a committer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless
    /// `0 < max_batch_size < store.max_batch_size()`; the gap leaves room for
    /// the store's own per-commit bookkeeping.
    pub fn new(store: Arc<S>, max_batch_size: usize) -> Result<Self> {
        let ceiling = store.max_batch_size();
        if max_batch_size == 0 || max_batch_size >= ceiling {
            return Err(Error::InvalidInput(format!(
                "max batch size must be between 1 and {} (store ceiling is {ceiling}), got {max_batch_size}",
                ceiling.saturating_sub(1)
            )));
        }
        Ok(Self {
            store,
            max_batch_size,
            cancel: None,
        })
    }

    /// Checks `flag` before every batch.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Returns the configured batch cap.
    #[must_use]
    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Returns how many commit calls `operation_count` operations need.
    #[must_use]
    pub const fn batch_count(&self, operation_count: usize) -> usize {
        operation_count.div_ceil(self.max_batch_size)
    }

    /// Commits `operations` in order and returns how many were committed.
    ///
    /// # Errors
    ///
    /// See [`Self::commit_with_progress`].
    pub async fn commit(&self, operations: &[WriteOperation]) -> Result<usize> {
        self.commit_with_progress(operations, |_, _| {}).await
    }

    /// Commits `operations` in order, calling `on_batch(committed, total)`
    /// after each successful group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialCommit`] when a group fails, carrying the
    /// number of operations in groups that had already committed, or
    /// [`Error::Cancelled`] when the cancel flag is set between groups.
    /// Nothing is retried.
    pub async fn commit_with_progress<F>(
        &self,
        operations: &[WriteOperation],
        mut on_batch: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let total = operations.len();
        let batches = self.batch_count(total);
        let mut committed = 0;

        for (index, batch) in operations.chunks(self.max_batch_size).enumerate() {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                warn!(committed, total, "restore cancelled between batches");
                return Err(Error::Cancelled { committed, total });
            }

            if let Err(e) = self.store.commit_batch(batch).await {
                metrics::counter!("snapshot_commit_failures_total").increment(1);
                warn!(
                    batch = index + 1,
                    batches,
                    committed,
                    error = %e,
                    "batch commit failed"
                );
                return Err(Error::PartialCommit {
                    committed,
                    total,
                    cause: e.to_string(),
                });
            }

            committed += batch.len();
            metrics::counter!("snapshot_batches_committed_total").increment(1);
            debug!(batch = index + 1, batches, size = batch.len(), committed, "batch committed");
            on_batch(committed, total);
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentAddress, Fields};
    use crate::storage::InMemoryDocumentStore;
    use test_case::test_case;

    fn ops(n: usize) -> Vec<WriteOperation> {
        (0..n)
            .map(|i| {
                WriteOperation::upsert(DocumentAddress::top_level("events", format!("e{i}")), Fields::new())
            })
            .collect()
    }

    #[test_case(0, 450 ; "at zero")]
    #[test_case(500, 500 ; "at the ceiling")]
    #[test_case(501, 500 ; "above the ceiling")]
    fn test_rejects_invalid_batch_size(size: usize, ceiling: usize) {
        let store = Arc::new(InMemoryDocumentStore::with_ceiling(ceiling));
        assert!(matches!(
            BatchCommitter::new(store, size),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_five_operations_in_batches_of_two() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let committer = BatchCommitter::new(Arc::clone(&store), 2).unwrap();

        let committed = committer.commit(&ops(5)).await.unwrap();
        assert_eq!(committed, 5);
        assert_eq!(store.commit_calls(), vec![2, 2, 1]);
        assert_eq!(store.document_count(), 5);
    }

    #[tokio::test]
    async fn test_failure_on_second_batch_reports_committed_prefix() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.fail_commit_at(2);
        let committer = BatchCommitter::new(Arc::clone(&store), 2).unwrap();

        let err = committer.commit(&ops(5)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::PartialCommit { committed: 2, total: 5, .. }
        ));
        assert!(err.to_string().contains("2 operations committed"));
        // Stops immediately: no third call.
        assert_eq!(store.commit_calls(), vec![2, 2]);
        assert_eq!(store.document_count(), 2);
    }

    #[tokio::test]
    async fn test_progress_callback_after_each_batch() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let committer = BatchCommitter::new(store, 3).unwrap();

        let mut seen = Vec::new();
        committer
            .commit_with_progress(&ops(7), |done, total| seen.push((done, total)))
            .await
            .unwrap();
        assert_eq!(seen, vec![(3, 7), (6, 7), (7, 7)]);
    }

    #[tokio::test]
    async fn test_cancel_between_batches() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let flag = CancelFlag::new();
        let committer = BatchCommitter::new(Arc::clone(&store), 2)
            .unwrap()
            .with_cancel_flag(flag.clone());

        let err = committer
            .commit_with_progress(&ops(5), |done, _| {
                if done == 2 {
                    flag.cancel();
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { committed: 2, total: 5 }));
        assert_eq!(store.commit_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_empty_sequence_makes_no_calls() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let committer = BatchCommitter::new(Arc::clone(&store), 2).unwrap();
        assert_eq!(committer.commit(&[]).await.unwrap(), 0);
        assert!(store.commit_calls().is_empty());
        assert_eq!(committer.batch_count(0), 0);
        assert_eq!(committer.batch_count(5), 3);
    }
}
