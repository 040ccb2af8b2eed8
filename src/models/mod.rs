//! Data models for snapvault.
//!
//! Records carry opaque JSON field maps; the engine never interprets field
//! semantics, only the reserved `id` and `children` keys.

mod manifest;
mod operation;
mod record;
mod snapshot;

pub use manifest::RestoreManifest;
pub use operation::{DocumentAddress, WriteOperation};
pub use record::{CHILDREN_KEY, Fields, ID_KEY, Record};
pub use snapshot::Snapshot;
