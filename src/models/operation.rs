//! Write operations produced during restore.

use super::Fields;
use std::fmt;

/// Address of a document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentAddress {
    /// Collection name.
    pub collection: String,
    /// Parent document id, for documents in a child collection.
    pub parent_id: Option<String>,
    /// Document id.
    pub id: String,
}

impl DocumentAddress {
    /// Address of a top-level document.
    #[must_use]
    pub fn top_level(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            parent_id: None,
            id: id.into(),
        }
    }

    /// Address of a document nested under a parent.
    #[must_use]
    pub fn nested(
        collection: impl Into<String>,
        parent_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            parent_id: Some(parent_id.into()),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent_id {
            Some(parent) => write!(f, "{}[{}]/{}", self.collection, parent, self.id),
            None => write!(f, "{}/{}", self.collection, self.id),
        }
    }
}

/// One upsert: overwrite (or create) the document at `target` with `fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOperation {
    /// Where to write.
    pub target: DocumentAddress,
    /// Full replacement field mapping.
    pub fields: Fields,
}

impl WriteOperation {
    /// Creates an upsert operation.
    #[must_use]
    pub const fn upsert(target: DocumentAddress, fields: Fields) -> Self {
        Self { target, fields }
    }
}
