//! Record model.

use serde_json::{Map, Value};

/// Reserved key holding a record's identifier in serialized form.
pub const ID_KEY: &str = "id";

/// Reserved key holding a record's child records in serialized form.
pub const CHILDREN_KEY: &str = "children";

/// Opaque field mapping of a document.
pub type Fields = Map<String, Value>;

/// A single document.
///
/// The `id` is assigned by the document store or the application and is
/// never regenerated. `children` is `Some` only for records of collections
/// with a registered child relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Document identifier, unique within its collection.
    pub id: String,
    /// Field name to value mapping (never contains `id` or `children`).
    pub fields: Fields,
    /// Child records from the registered sub-collection.
    pub children: Option<Vec<Self>>,
}

impl Record {
    /// Creates a record without children.
    ///
    /// Reserved keys in `fields` are dropped.
    #[must_use]
    pub fn new(id: impl Into<String>, mut fields: Fields) -> Self {
        fields.remove(ID_KEY);
        fields.remove(CHILDREN_KEY);
        Self {
            id: id.into(),
            fields,
            children: None,
        }
    }

    /// Attaches child records.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = Some(children);
        self
    }

    /// Returns the number of child records.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }

    /// Renders the record as a JSON object with the id folded into its fields.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        if let Some(children) = &self.children {
            object.insert(
                CHILDREN_KEY.to_string(),
                Value::Array(children.iter().map(Self::to_value).collect()),
            );
        }
        Value::Object(object)
    }

    /// Decodes a record from an untrusted JSON value.
    ///
    /// Returns `None` when the value is not an object or has no usable id;
    /// such entries cannot be addressed as an upsert target. Children without
    /// a usable id are dropped and added to `skipped`.
    #[must_use]
    pub fn from_value(value: Value, skipped: &mut usize) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };

        let id = match object.remove(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => return None,
        };

        let children = match object.remove(CHILDREN_KEY) {
            Some(Value::Array(values)) => {
                let mut children = Vec::with_capacity(values.len());
                for child in values {
                    match Self::from_value(child, skipped) {
                        Some(child) => children.push(child),
                        None => *skipped += 1,
                    }
                }
                Some(children)
            },
            _ => None,
        };

        Some(Self {
            id,
            fields: object,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn test_new_strips_reserved_keys() {
        let record = Record::new("u1", fields(json!({"id": "other", "children": [], "name": "Ada"})));
        assert_eq!(record.id, "u1");
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields["name"], json!("Ada"));
    }

    #[test]
    fn test_to_value_folds_id_and_children() {
        let record = Record::new("c1", fields(json!({"title": "Rust"})))
            .with_children(vec![Record::new("l1", fields(json!({"order": 1})))]);

        let value = record.to_value();
        assert_eq!(value["id"], json!("c1"));
        assert_eq!(value["title"], json!("Rust"));
        assert_eq!(value["children"][0]["id"], json!("l1"));
        assert_eq!(value["children"][0]["order"], json!(1));
    }

    #[test]
    fn test_from_value_restores_structure() {
        let mut skipped = 0;
        let value = json!({"id": "c1", "title": "Rust", "children": [{"id": "l1"}, {"title": "no id"}]});

        let record = Record::from_value(value, &mut skipped).unwrap();
        assert_eq!(record.id, "c1");
        assert!(!record.fields.contains_key("id"));
        assert!(!record.fields.contains_key("children"));
        assert_eq!(record.child_count(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_from_value_rejects_missing_or_empty_id() {
        let mut skipped = 0;
        assert!(Record::from_value(json!({"title": "x"}), &mut skipped).is_none());
        assert!(Record::from_value(json!({"id": ""}), &mut skipped).is_none());
        assert!(Record::from_value(json!({"id": 42}), &mut skipped).is_none());
        assert!(Record::from_value(json!("scalar"), &mut skipped).is_none());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_from_value_keeps_whitespace_id() {
        let mut skipped = 0;
        let record = Record::from_value(json!({"id": " ", "name": "blank"}), &mut skipped).unwrap();
        assert_eq!(record.id, " ");
        assert_eq!(record.fields.get("name"), Some(&json!("blank")));
    }

    #[test]
    fn test_children_absent_when_not_an_array() {
        let mut skipped = 0;
        let record = Record::from_value(json!({"id": "a", "children": "bogus"}), &mut skipped).unwrap();
        assert!(record.children.is_none());
        assert!(record.fields.is_empty());
    }
}
