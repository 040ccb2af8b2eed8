//! Snapshot serialization.
//!
//! A snapshot file is a single JSON object keyed by collection name. Each
//! value is an array of records with the record id folded into the object
//! and, for collections with a child relation, a nested `children` array:
//!
//! ```json
//! {
//!   "_snapshot": { "version": 1, "exported_at": "2026-10-19T08:00:00Z",
//!                  "relations": { "courses": "lessons" } },
//!   "courses": [ { "id": "c1", "title": "Rust", "children": [ { "id": "l1" } ] } ],
//!   "users": [ { "id": "u1", "name": "Ada" } ]
//! }
//! ```
//!
//! The `_snapshot` entry is an object, not an array, so readers that only
//! look at array-valued keys skip it. Files without it are version 1.

use crate::models::{Record, Snapshot};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u64 = 1;

/// Reserved top-level key carrying snapshot metadata.
pub const META_KEY: &str = "_snapshot";

/// Renders snapshots to bytes and parses bytes back into raw structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotSerializer;

impl SnapshotSerializer {
    /// Serializes a snapshot to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if JSON encoding fails.
    pub fn serialize(snapshot: &Snapshot) -> Result<Vec<u8>> {
        let mut root = Map::new();
        root.insert(
            META_KEY.to_string(),
            json!({
                "version": SNAPSHOT_VERSION,
                "exported_at": snapshot.exported_at.to_rfc3339(),
                "relations": snapshot.relations,
            }),
        );
        for (collection, records) in &snapshot.collections {
            root.insert(
                collection.clone(),
                Value::Array(records.iter().map(Record::to_value).collect()),
            );
        }

        serde_json::to_vec_pretty(&Value::Object(root)).map_err(|e| Error::OperationFailed {
            operation: "serialize_snapshot".to_string(),
            cause: e.to_string(),
        })
    }

    /// Parses bytes into an unvalidated [`RawSnapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a JSON object or declare
    /// a format version newer than [`SNAPSHOT_VERSION`].
    pub fn deserialize(bytes: &[u8]) -> Result<RawSnapshot> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::Parse(format!("not valid JSON: {e}")))?;
        let Value::Object(entries) = value else {
            return Err(Error::Parse(
                "expected a JSON object keyed by collection name".to_string(),
            ));
        };

        let raw = RawSnapshot { entries };
        let version = raw.version()?;
        if version > SNAPSHOT_VERSION {
            return Err(Error::Parse(format!(
                "snapshot format version {version} is newer than supported version {SNAPSHOT_VERSION}"
            )));
        }
        Ok(raw)
    }
}

/// Parsed but unvalidated snapshot file contents.
///
/// Only array-valued top-level keys are treated as collections; everything
/// else is ignored so hand-edited or foreign files degrade gracefully.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    entries: Map<String, Value>,
}

impl RawSnapshot {
    fn meta(&self) -> Option<&Map<String, Value>> {
        self.entries.get(META_KEY).and_then(Value::as_object)
    }

    /// Returns the declared format version (1 when absent).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the version is present but not an
    /// unsigned integer.
    pub fn version(&self) -> Result<u64> {
        match self.meta().and_then(|meta| meta.get("version")) {
            None => Ok(1),
            Some(value) => value.as_u64().ok_or_else(|| {
                Error::Parse(format!("snapshot version must be an unsigned integer, got {value}"))
            }),
        }
    }

    /// Returns the export timestamp, if recorded and well-formed.
    #[must_use]
    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        self.meta()
            .and_then(|meta| meta.get("exported_at"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    /// Returns the parent to child relations recorded at export time.
    ///
    /// Malformed entries are ignored.
    #[must_use]
    pub fn relations(&self) -> BTreeMap<String, String> {
        self.meta()
            .and_then(|meta| meta.get("relations"))
            .and_then(Value::as_object)
            .map(|relations| {
                relations
                    .iter()
                    .filter_map(|(parent, child)| {
                        child.as_str().map(|child| (parent.clone(), child.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates the array-valued top-level entries.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries.iter().filter_map(|(name, value)| match value {
            Value::Array(items) if name != META_KEY => Some((name.as_str(), items.as_slice())),
            _ => None,
        })
    }

    /// Consumes the snapshot, yielding array-valued entries by value.
    pub fn into_collections(self) -> impl Iterator<Item = (String, Vec<Value>)> {
        self.entries
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::Array(items) if name != META_KEY => Some((name, items)),
                _ => None,
            })
    }

    /// Converts to a typed [`Snapshot`], dropping records without a usable id.
    ///
    /// Returns the snapshot and the number of dropped records (children
    /// included).
    #[must_use]
    pub fn into_snapshot(self) -> (Snapshot, usize) {
        let mut snapshot = Snapshot::new(self.exported_at().unwrap_or_else(Utc::now));
        for (parent, child) in self.relations() {
            snapshot.add_relation(parent, child);
        }

        let mut skipped = 0;
        for (collection, values) in self.into_collections() {
            let mut records = Vec::with_capacity(values.len());
            for value in values {
                match Record::from_value(value, &mut skipped) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }
            snapshot.insert(collection, records);
        }
        (snapshot, skipped)
    }
}
