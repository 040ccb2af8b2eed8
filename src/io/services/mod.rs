//! Export and restore services.
//!
//! Orchestrates store reads, serialization, validation and batched commits.

pub mod engine;
pub mod export;
pub mod import;

pub use engine::{ExportedSnapshot, SnapshotEngine};
pub use export::SnapshotReader;
pub use import::{
    DEFAULT_MAX_SNAPSHOT_BYTES, RestoreAnalyzer, RestoreExecutor, RestorePlan, RestoreSummary,
    manifest_of,
};
