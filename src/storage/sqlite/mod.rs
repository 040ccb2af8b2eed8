//! `SQLite` document store.
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, parent_id, id)`; the field map is stored as JSON text.
//! Top-level documents use an empty `parent_id`.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition with poison recovery and pragmas
//! - [`metrics`]: per-operation counters and latency histograms
//! - [`documents`]: the [`DocumentStore`](crate::storage::DocumentStore) implementation

mod connection;
mod documents;
mod metrics;

pub use connection::{acquire_lock, configure_connection};
pub use documents::SqliteDocumentStore;
pub use metrics::record_operation_metrics;
