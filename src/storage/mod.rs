//! Document store abstraction.
//!
//! The snapshot engine depends only on the [`DocumentStore`] trait. Two
//! backends ship with the crate:
//!
//! - [`SqliteDocumentStore`]: durable single-file store
//! - [`InMemoryDocumentStore`]: non-persistent store for tests and embedding

// Dropping the connection guard slightly earlier buys nothing.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use traits::DocumentStore;

/// Hard ceiling on operations per commit call for the bundled backends.
///
/// The engine's configured batch size must stay strictly below this value.
pub const STORE_BATCH_CEILING: usize = 500;
