#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::cmp::Ordering;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::dao::storage::StorageResult;

/// Schemaless JSON object as persisted in a collection.
pub type Document = Map<String, Value>;

/// A document together with the identifier the store addresses it by.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Storage-assigned identifier.
    pub id: String,
    /// Document body (never contains the storage identifier itself).
    pub document: Document,
}

/// How [`DocumentStore::set`] treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document (creating it when absent).
    Replace,
    /// Overwrite only the provided top-level fields (creating the document when absent).
    Merge,
}

/// Abstraction over the persistence layer: named collections of JSON documents.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str)
    -> BoxFuture<'static, StorageResult<Option<Document>>>;
    /// List a whole collection, ascending on `order_by` when given.
    fn get_all(
        &self,
        collection: &str,
        order_by: Option<&str>,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>>;
    /// Documents whose top-level `field` equals `value`, at most `limit` of them.
    fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>>;
    /// Insert a document under a freshly generated id and return that id.
    fn add(&self, collection: &str, document: Document) -> BoxFuture<'static, StorageResult<String>>;
    fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite the provided fields of an existing document.
    ///
    /// Fails with [`StorageError::NotFound`](crate::dao::storage::StorageError::NotFound)
    /// when the document does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a document; deleting an absent document is not an error.
    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Generate a storage identifier for [`DocumentStore::add`].
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Apply a merge: every top-level field of `fields` replaces the one in `target`.
pub fn merge_into(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Order two documents on `field` the way the backends sort: missing and null
/// values first, then booleans, numbers, strings.
pub fn compare_on_field(left: &Document, right: &Document, field: &str) -> Ordering {
    compare_values(left.get(field), right.get(field))
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (left, right) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_overwrites_present_keys_only() {
        let mut target = document(json!({"torneo": "A", "ronda": "1", "saque": true}));
        merge_into(&mut target, document(json!({"ronda": "2", "saque": false})));
        assert_eq!(
            Value::Object(target),
            json!({"torneo": "A", "ronda": "2", "saque": false})
        );
    }

    #[test]
    fn numbers_compare_numerically() {
        let low = document(json!({"ranking": 2}));
        let high = document(json!({"ranking": 10}));
        assert_eq!(compare_on_field(&low, &high, "ranking"), Ordering::Less);
    }

    #[test]
    fn missing_field_sorts_first() {
        let missing = document(json!({}));
        let dated = document(json!({"fecha": "2024-05-01"}));
        assert_eq!(compare_on_field(&missing, &dated, "fecha"), Ordering::Less);
        assert_eq!(compare_on_field(&dated, &missing, "fecha"), Ordering::Greater);
    }
}
