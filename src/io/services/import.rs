//! Snapshot restore.
//!
//! Restore is two steps. [`RestoreAnalyzer`] parses an untrusted file and
//! produces a [`RestorePlan`] whose manifest can be shown to the operator
//! without touching the store. [`RestoreExecutor`] consumes an approved plan
//! and writes it through a [`BatchCommitter`].

use crate::io::batch::BatchCommitter;
use crate::io::serializer::{RawSnapshot, SnapshotSerializer};
use crate::io::traits::{ProgressReporter, percent};
use crate::io::validation::{RestoreValidator, ValidationIssue};
use crate::models::RestoreManifest;
use crate::registry::CollectionRegistry;
use crate::storage::DocumentStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Default upper bound on snapshot file size (256 MiB).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 256 * 1024 * 1024;

/// Parses snapshot files into restore plans.
#[derive(Debug, Clone, Copy)]
pub struct RestoreAnalyzer {
    max_bytes: u64,
}

impl Default for RestoreAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOT_BYTES)
    }
}

impl RestoreAnalyzer {
    /// Creates an analyzer that rejects inputs larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Computes the per-collection record counts of a snapshot file.
    ///
    /// Counts top-level records only; nested children are not included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a well-formed snapshot.
    pub fn analyze(&self, bytes: &[u8]) -> Result<RestoreManifest> {
        self.plan(bytes).map(RestorePlan::into_manifest)
    }

    /// Parses a snapshot file into a plan ready for confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the input is too large or not a
    /// well-formed snapshot.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn plan(&self, bytes: &[u8]) -> Result<RestorePlan> {
        if bytes.len() as u64 > self.max_bytes {
            return Err(Error::Parse(format!(
                "snapshot is {} bytes, larger than the {} byte limit",
                bytes.len(),
                self.max_bytes
            )));
        }
        let snapshot = SnapshotSerializer::deserialize(bytes)?;
        let manifest = manifest_of(&snapshot);
        info!(
            collections = manifest.collection_count(),
            records = manifest.total_records(),
            "snapshot analyzed"
        );
        Ok(RestorePlan { manifest, snapshot })
    }
}

/// Counts the array entries of every collection in a raw snapshot.
#[must_use]
pub fn manifest_of(snapshot: &RawSnapshot) -> RestoreManifest {
    snapshot
        .collections()
        .map(|(name, records)| (name.to_string(), records.len()))
        .collect()
}

/// An analyzed snapshot awaiting confirmation.
///
/// Executing a plan consumes it, so one analysis backs at most one restore.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    manifest: RestoreManifest,
    snapshot: RawSnapshot,
}

impl RestorePlan {
    /// Returns the manifest shown to the operator.
    #[must_use]
    pub const fn manifest(&self) -> &RestoreManifest {
        &self.manifest
    }

    /// Returns the parsed snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &RawSnapshot {
        &self.snapshot
    }

    /// Discards the snapshot, keeping the manifest.
    #[must_use]
    pub fn into_manifest(self) -> RestoreManifest {
        self.manifest
    }
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Operations committed (parents and children).
    pub operations_committed: usize,
    /// Commit calls made.
    pub batches: usize,
    /// Operations per target collection.
    pub per_collection: BTreeMap<String, usize>,
    /// Records that could not be written.
    pub skipped_records: usize,
    /// Why records were skipped.
    pub warnings: Vec<ValidationIssue>,
}

/// Writes approved restore plans into a document store.
pub struct RestoreExecutor<'a, S> {
    committer: &'a BatchCommitter<S>,
    registry: &'a CollectionRegistry,
}

impl<'a, S: DocumentStore> RestoreExecutor<'a, S> {
    /// Creates an executor.
    #[must_use]
    pub const fn new(committer: &'a BatchCommitter<S>, registry: &'a CollectionRegistry) -> Self {
        Self { committer, registry }
    }

    /// Expands `plan` into upserts and commits them in order.
    ///
    /// Progress starts at 0, advances after every batch, and reaches 100 only
    /// once the last batch has committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialCommit`] or [`Error::Cancelled`] from the
    /// committer. Batches already committed stay committed.
    #[instrument(skip_all, fields(collections = plan.manifest.collection_count()))]
    pub async fn execute(
        &self,
        plan: RestorePlan,
        progress: &dyn ProgressReporter,
    ) -> Result<RestoreSummary> {
        let RestorePlan { manifest, snapshot } = plan;
        progress.report(
            0,
            &format!(
                "Restoring {} records across {} collections",
                manifest.total_records(),
                manifest.collection_count()
            ),
        );

        let expansion = RestoreValidator::new(self.registry).expand(snapshot);
        let total = expansion.operations.len();
        if total == 0 {
            progress.report(100, "Nothing to restore");
            return Ok(RestoreSummary {
                skipped_records: expansion.skipped_records,
                warnings: expansion.issues,
                ..RestoreSummary::default()
            });
        }

        let committed = self
            .committer
            .commit_with_progress(&expansion.operations, |done, total| {
                progress.report(
                    percent(done, total).min(99),
                    &format!("Committed {done} of {total} operations"),
                );
            })
            .await?;

        info!(
            committed,
            batches = self.committer.batch_count(total),
            skipped = expansion.skipped_records,
            "restore complete"
        );
        progress.report(100, &format!("Restore complete: {committed} operations committed"));

        Ok(RestoreSummary {
            operations_committed: committed,
            batches: self.committer.batch_count(total),
            per_collection: expansion.per_collection,
            skipped_records: expansion.skipped_records,
            warnings: expansion.issues,
        })
    }
}
