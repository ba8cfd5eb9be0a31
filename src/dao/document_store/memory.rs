//! In-process document store used by the test-suite and the `memory` backend.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use super::{
    Document, DocumentStore, SetMode, StoredDocument, compare_on_field, generate_id, merge_into,
};
use crate::dao::storage::{StorageError, StorageResult};

/// Failure injected while the memory store is switched offline.
#[derive(Debug, Error)]
#[error("memory store is offline")]
pub struct MemoryStoreOffline;

/// Document store keeping every collection in memory, in insertion order.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<DashMap<String, IndexMap<String, Document>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the backend went away.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of a collection's documents, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, document)| StoredDocument {
                        id: id.clone(),
                        document: document.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                "memory store is offline".into(),
                MemoryStoreOffline,
            ))
        } else {
            Ok(())
        }
    }

    fn find(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        self.check_online()?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    fn list(&self, collection: &str, order_by: Option<&str>) -> StorageResult<Vec<StoredDocument>> {
        self.check_online()?;
        let mut documents = self.documents(collection);
        if let Some(field) = order_by {
            documents.sort_by(|a, b| compare_on_field(&a.document, &b.document, field));
        }
        Ok(documents)
    }

    fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> StorageResult<Vec<StoredDocument>> {
        self.check_online()?;
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|stored| stored.document.get(field) == Some(value))
            .take(limit)
            .collect())
    }

    fn insert(&self, collection: &str, document: Document) -> StorageResult<String> {
        self.check_online()?;
        let id = generate_id();
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    fn write(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> StorageResult<()> {
        self.check_online()?;
        let mut docs = self.collections.entry(collection.to_owned()).or_default();
        if mode == SetMode::Merge {
            if let Some(existing) = docs.get_mut(id) {
                merge_into(existing, document);
                return Ok(());
            }
        }
        docs.insert(id.to_owned(), document);
        Ok(())
    }

    fn patch(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        self.check_online()?;
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StorageError::not_found(collection, id))?;
        let existing = docs
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(collection, id))?;
        merge_into(existing, fields);
        Ok(())
    }

    fn remove(&self, collection: &str, id: &str) -> StorageResult<()> {
        self.check_online()?;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.shift_remove(id);
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        Box::pin(ready(self.find(collection, id)))
    }

    fn get_all(
        &self,
        collection: &str,
        order_by: Option<&str>,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>> {
        Box::pin(ready(self.list(collection, order_by)))
    }

    fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>> {
        Box::pin(ready(self.query(collection, field, &value, limit)))
    }

    fn add(&self, collection: &str, document: Document) -> BoxFuture<'static, StorageResult<String>> {
        Box::pin(ready(self.insert(collection, document)))
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.write(collection, id, document, mode)))
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.patch(collection, id, fields)))
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.remove(collection, id)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.check_online()))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.check_online()))
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

    #[tokio::test]
    async fn add_then_get_returns_document() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add("jugadores", document(json!({"nombre": "Rafa"})))
            .await
            .unwrap();

        let found = store.get("jugadores", &id).await.unwrap();
        assert_eq!(found, Some(document(json!({"nombre": "Rafa"}))));
        assert_eq!(store.get("jugadores", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_set_keeps_untouched_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set(
                "estado_global",
                "config",
                document(json!({"torneo": "A", "ronda": "1"})),
                SetMode::Replace,
            )
            .await
            .unwrap();
        store
            .set(
                "estado_global",
                "config",
                document(json!({"ronda": "2"})),
                SetMode::Merge,
            )
            .await
            .unwrap();

        let config = store.get("estado_global", "config").await.unwrap().unwrap();
        assert_eq!(Value::Object(config), json!({"torneo": "A", "ronda": "2"}));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("jugadores", "ghost", document(json!({"nombre": "X"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(store.documents("jugadores").is_empty());
    }

    #[tokio::test]
    async fn query_equals_honours_limit() {
        let store = MemoryDocumentStore::new();
        for _ in 0..3 {
            store
                .add("partidosFuturos", document(json!({"id": "M"})))
                .await
                .unwrap();
        }
        store
            .add("partidosFuturos", document(json!({"id": "N"})))
            .await
            .unwrap();

        let hits = store
            .query_equals("partidosFuturos", "id", json!("M"), 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.get("id"), Some(&json!("M")));
    }

    #[tokio::test]
    async fn get_all_sorts_on_requested_field() {
        let store = MemoryDocumentStore::new();
        for ranking in [3, 1, 2] {
            store
                .add("jugadores", document(json!({"ranking": ranking})))
                .await
                .unwrap();
        }

        let rankings = store
            .get_all("jugadores", Some("ranking"))
            .await
            .unwrap()
            .into_iter()
            .map(|stored| stored.document["ranking"].clone())
            .collect::<Vec<_>>();
        assert_eq!(rankings, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        let err = store.get_all("jugadores", None).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
    }
}
