//! Snapshot engine.
//!
//! Owns the store handle, the registry and the batch committer, and exposes
//! the operator-level operations: list, export, analyze and restore.

use super::export::SnapshotReader;
use super::import::{DEFAULT_MAX_SNAPSHOT_BYTES, RestoreAnalyzer, RestoreExecutor, RestorePlan, RestoreSummary};
use crate::io::batch::{BatchCommitter, CancelFlag};
use crate::io::serializer::SnapshotSerializer;
use crate::io::traits::ProgressReporter;
use crate::models::RestoreManifest;
use crate::registry::{CollectionEntry, CollectionRegistry};
use crate::storage::DocumentStore;
use crate::transfer::{TransferSurface, snapshot_filename};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// A serialized snapshot ready for delivery.
#[derive(Debug, Clone)]
pub struct ExportedSnapshot {
    /// Serialized snapshot file contents.
    pub bytes: Vec<u8>,
    /// Suggested download name (`snapshot-YYYY-MM-DD.json`).
    pub filename: String,
    /// Top-level record counts of the exported collections.
    pub manifest: RestoreManifest,
}

/// Export and restore over one document store.
pub struct SnapshotEngine<S> {
    store: Arc<S>,
    registry: CollectionRegistry,
    committer: BatchCommitter<S>,
    analyzer: RestoreAnalyzer,
}

impl<S: DocumentStore> SnapshotEngine<S> {
    /// Creates an engine committing at most `max_batch_size` operations per
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `max_batch_size` is zero or not
    /// below the store's ceiling.
    pub fn new(store: Arc<S>, registry: CollectionRegistry, max_batch_size: usize) -> Result<Self> {
        let committer = BatchCommitter::new(Arc::clone(&store), max_batch_size)?;
        Ok(Self {
            store,
            registry,
            committer,
            analyzer: RestoreAnalyzer::new(DEFAULT_MAX_SNAPSHOT_BYTES),
        })
    }

    /// Sets the largest snapshot file accepted for analysis.
    #[must_use]
    pub const fn with_max_snapshot_bytes(mut self, max_bytes: u64) -> Self {
        self.analyzer = RestoreAnalyzer::new(max_bytes);
        self
    }

    /// Lets `flag` stop a restore between batches.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.committer = self.committer.with_cancel_flag(flag);
        self
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Returns the exportable collections in export order.
    #[must_use]
    pub fn list_exportable(&self) -> &[CollectionEntry] {
        self.registry.list_exportable()
    }

    /// Reads and serializes the selected collections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no selected name is exportable,
    /// or [`Error::Read`] if any listing fails.
    #[instrument(skip_all, fields(selected = selection.len()))]
    pub async fn export_snapshot(
        &self,
        selection: &BTreeSet<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<ExportedSnapshot> {
        if !selection.iter().any(|name| self.registry.contains(name)) {
            return Err(Error::InvalidInput(
                "select at least one exportable collection".to_string(),
            ));
        }

        let snapshot = SnapshotReader::new(self.store.as_ref(), &self.registry)
            .read(selection, progress)
            .await?;
        let bytes = SnapshotSerializer::serialize(&snapshot)?;
        let manifest = snapshot
            .collections
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect();

        info!(
            collections = snapshot.collections.len(),
            records = snapshot.record_count(),
            children = snapshot.child_count(),
            bytes = bytes.len(),
            "snapshot exported"
        );
        Ok(ExportedSnapshot {
            bytes,
            filename: snapshot_filename(snapshot.exported_at),
            manifest,
        })
    }

    /// Exports the selection and delivers it through `transfer`.
    ///
    /// Returns the export together with the delivered location.
    ///
    /// # Errors
    ///
    /// Returns export errors, or the transfer surface's error if delivery
    /// fails.
    pub async fn export_to<T: TransferSurface + ?Sized>(
        &self,
        transfer: &T,
        selection: &BTreeSet<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<(ExportedSnapshot, String)> {
        let exported = self.export_snapshot(selection, progress).await?;
        let location = transfer.download(&exported.bytes, &exported.filename)?;
        info!(location = %location, "snapshot delivered");
        Ok((exported, location))
    }

    /// Parses snapshot bytes into a plan. Never touches the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a well-formed snapshot.
    pub fn analyze(&self, bytes: &[u8]) -> Result<RestorePlan> {
        self.analyzer.plan(bytes)
    }

    /// Reads `location` through `transfer` and analyzes it.
    ///
    /// # Errors
    ///
    /// Returns the transfer surface's error if the file cannot be read, or
    /// [`Error::Parse`] if it is not a well-formed snapshot.
    pub fn analyze_file<T: TransferSurface + ?Sized>(
        &self,
        transfer: &T,
        location: &str,
    ) -> Result<RestorePlan> {
        let bytes = transfer.pick_file(location)?;
        self.analyze(&bytes)
    }

    /// Commits an approved plan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialCommit`] or [`Error::Cancelled`]; batches
    /// committed before the error stay committed.
    pub async fn restore(
        &self,
        plan: RestorePlan,
        progress: &dyn ProgressReporter,
    ) -> Result<RestoreSummary> {
        RestoreExecutor::new(&self.committer, &self.registry)
            .execute(plan, progress)
            .await
    }
}
