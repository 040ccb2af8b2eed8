//! Document store trait.

use crate::Result;
use crate::models::{Record, WriteOperation};
use std::future::Future;

/// Trait for document databases the snapshot engine reads from and writes to.
///
/// A store lists whole collections (optionally scoped under a parent
/// document) and commits groups of upserts. Each group commit is atomic at
/// the store level; nothing is atomic across groups.
pub trait DocumentStore: Send + Sync {
    /// Lists every document of a collection.
    ///
    /// With `parent_id`, lists the child documents nested under that parent.
    /// Returned records have no `children`.
    fn list(
        &self,
        collection: &str,
        parent_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Commits a group of upserts all-or-nothing.
    ///
    /// Implementations reject groups larger than [`Self::max_batch_size`].
    fn commit_batch(&self, operations: &[WriteOperation]) -> impl Future<Output = Result<()>> + Send;

    /// The store's hard ceiling on operations per commit call.
    fn max_batch_size(&self) -> usize;
}
