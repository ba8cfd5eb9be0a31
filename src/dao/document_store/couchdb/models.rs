use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::document_store::{Document, StoredDocument};

/// Separates the collection name from the storage id inside a CouchDB `_id`.
const KEY_SEPARATOR: &str = "::";
/// Upper bound appended to a prefix to range-scan `_all_docs`.
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Body of a Mango `_find` request.
#[derive(Debug, Serialize)]
pub struct FindRequest {
    pub selector: Value,
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

/// Raw CouchDB document: metadata plus the application fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: Document,
}

impl CouchDocument {
    pub fn new(collection: &str, id: &str, rev: Option<String>, body: Document) -> Self {
        Self {
            id: doc_id(collection, id),
            rev,
            body,
        }
    }

    /// Drop CouchDB metadata and the collection prefix.
    pub fn into_stored(self, collection: &str) -> StoredDocument {
        let id = strip_collection(collection, &self.id)
            .unwrap_or(&self.id)
            .to_owned();
        let document = self
            .body
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .collect();
        StoredDocument { id, document }
    }
}

pub fn collection_prefix(collection: &str) -> String {
    format!("{collection}{KEY_SEPARATOR}")
}

pub fn doc_id(collection: &str, id: &str) -> String {
    format!("{collection}{KEY_SEPARATOR}{id}")
}

fn strip_collection<'a>(collection: &str, doc_id: &'a str) -> Option<&'a str> {
    doc_id
        .strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
}
