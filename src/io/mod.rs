//! Snapshot export and restore.
//!
//! # Architecture
//!
//! - **Reader** walks the registry and lists collections from the store
//! - **Serializer** renders snapshots to JSON and parses them back
//! - **Analyzer** previews a snapshot file as a per-collection manifest
//! - **Validation** flattens a parsed snapshot into ordered upserts
//! - **Batch committer** writes upserts in capped groups, one at a time
//! - **Engine** ties these together behind the operator-level operations
//!
//! # Examples
//!
//! ## Export two collections
//!
//! ```rust,ignore
//! use snapvault::io::{SnapshotEngine, TracingProgress};
//!
//! let selection = ["users".to_string(), "courses".to_string()].into();
//! let (export, location) = engine.export_to(&transfer, &selection, &TracingProgress).await?;
//! println!("Wrote {} bytes to {location}", export.bytes.len());
//! ```
//!
//! ## Restore after confirmation
//!
//! ```rust,ignore
//! let plan = engine.analyze_file(&transfer, "snapshot-2026-10-19.json")?;
//! for (collection, count) in plan.manifest().iter() {
//!     println!("{collection}: {count}");
//! }
//! let summary = engine.restore(plan, &TracingProgress).await?;
//! println!("Committed {} operations", summary.operations_committed);
//! ```

pub mod batch;
pub mod serializer;
pub mod services;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use batch::{BatchCommitter, CancelFlag, DEFAULT_MAX_BATCH_SIZE};
pub use serializer::{META_KEY, RawSnapshot, SNAPSHOT_VERSION, SnapshotSerializer};
pub use services::{
    DEFAULT_MAX_SNAPSHOT_BYTES, ExportedSnapshot, RestoreAnalyzer, RestoreExecutor, RestorePlan,
    RestoreSummary, SnapshotEngine, SnapshotReader, manifest_of,
};
pub use traits::{LastProgress, NoopProgress, ProgressReporter, TracingProgress, percent};
pub use validation::{Expansion, RestoreValidator, ValidationIssue};
