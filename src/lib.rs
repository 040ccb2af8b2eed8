//! # Snapvault
//!
//! Snapshot export and restore for document collections.
//!
//! Snapvault reads a selection of top-level collections (and one level of
//! nested child collections) from a document store into a single portable
//! snapshot file, and replays such a file back into the store as a sequence
//! of capped, ordered upsert batches.
//!
//! ## Features
//!
//! - Deterministic export order driven by the [`CollectionRegistry`]
//! - Schema-agnostic records (opaque JSON field maps)
//! - Two-step restore: analyze (preview manifest) then commit
//! - Batches bounded by a configurable cap below the store's own ceiling
//! - Explicit partial-commit reporting when a batch fails mid-restore
//!
//! ## Example
//!
//! ```rust,ignore
//! use snapvault::{CollectionRegistry, SnapshotEngine};
//! use snapvault::io::NoopProgress;
//! use snapvault::storage::InMemoryDocumentStore;
//! use std::sync::Arc;
//!
//! let engine = SnapshotEngine::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     CollectionRegistry::default(),
//!     450,
//! )?;
//! let export = engine.export_snapshot(&["users".to_string()].into(), &NoopProgress).await?;
//! let plan = engine.analyze(&export.bytes)?;
//! let summary = engine.restore(plan, &NoopProgress).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod registry;
pub mod storage;
pub mod transfer;

pub use config::SnapvaultConfig;
pub use io::{ProgressReporter, SnapshotEngine};
pub use models::{Record, RestoreManifest, Snapshot, WriteOperation};
pub use registry::CollectionRegistry;
pub use storage::DocumentStore;
pub use transfer::TransferSurface;

/// Error type for snapvault operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Bad configuration values, unknown flags, oversized batch caps |
/// | `OperationFailed` | Filesystem I/O, `SQLite` queries, task joins |
/// | `Read` | A collection or child listing fails during export |
/// | `Parse` | A snapshot file is not well-formed or has an unsupported version |
/// | `PartialCommit` | A batch commit fails during restore |
/// | `Cancelled` | The operator cancelled a restore between batches |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised by storage backends and the transfer surface for I/O and
    /// database errors.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Reading a collection failed during export.
    ///
    /// Fatal to the whole export. No partial snapshot is returned.
    #[error("failed to read collection '{collection}': {cause}")]
    Read {
        /// The collection (or child collection) being listed.
        collection: String,
        /// The underlying cause.
        cause: String,
    },

    /// A snapshot file could not be parsed.
    ///
    /// Never touches the document store.
    #[error("invalid snapshot: {0}")]
    Parse(String),

    /// A batch commit failed part way through a restore.
    ///
    /// Operations from batches committed before the failure stay committed.
    /// Re-running the whole restore is safe because every write is an upsert
    /// keyed by id.
    #[error("restore failed: {committed} operations committed of {total} before failure: {cause}")]
    PartialCommit {
        /// Operations belonging to batches that committed successfully.
        committed: usize,
        /// Total operations in the restore.
        total: usize,
        /// The underlying cause.
        cause: String,
    },

    /// A restore was cancelled between batches.
    #[error("restore cancelled: {committed} operations committed of {total}")]
    Cancelled {
        /// Operations belonging to batches that committed before cancellation.
        committed: usize,
        /// Total operations in the restore.
        total: usize,
    },
}

impl Error {
    /// Returns how many operations were committed before a restore stopped.
    ///
    /// `None` for errors that never reach the commit phase.
    #[must_use]
    pub const fn committed(&self) -> Option<usize> {
        match self {
            Self::PartialCommit { committed, .. } | Self::Cancelled { committed, .. } => {
                Some(*committed)
            },
            _ => None,
        }
    }
}

/// Result type alias for snapvault operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Read {
            collection: "courses".to_string(),
            cause: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read collection 'courses': timeout"
        );
    }

    #[test]
    fn test_partial_commit_reports_committed_count() {
        let err = Error::PartialCommit {
            committed: 2,
            total: 5,
            cause: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("2 operations committed"));
        assert_eq!(err.committed(), Some(2));
        assert_eq!(Error::Parse("bad".to_string()).committed(), None);
    }
}
