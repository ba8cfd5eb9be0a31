use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document as BsonDocument, doc},
    options::IndexOptions,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{doc_id, from_bson_document, to_bson, to_bson_document, upsert_key},
};
use crate::dao::{
    document_store::{Document, DocumentStore, SetMode, StoredDocument, generate_id},
    storage::{StorageError, StorageResult},
};

/// [`DocumentStore`] backed by one MongoDB database, one MongoDB collection per store collection.
#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    /// Swapped wholesale on reconnect; the handle keeps its client alive.
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoDocumentStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        Ok(Self { inner })
    }

    /// Create an ascending index on `field`, used by equality lookups.
    pub async fn ensure_index(&self, collection: &str, field: &str) -> MongoResult<()> {
        let mut keys = BsonDocument::new();
        keys.insert(field, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(Some(format!("{collection}_{field}_idx")))
                    .build(),
            )
            .build();

        self.collection(collection)
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: collection.to_owned(),
                index: field.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn collection(&self, name: &str) -> Collection<BsonDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<BsonDocument>(name)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> MongoResult<Option<Document>> {
        let found = self
            .collection(collection)
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(found.map(|raw| from_bson_document(raw).document))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: BsonDocument,
        sort_on: Option<&str>,
        limit: Option<usize>,
    ) -> MongoResult<Vec<StoredDocument>> {
        let read_error = |source: mongodb::error::Error| MongoDaoError::Read {
            collection: collection.to_owned(),
            source,
        };

        let handle = self.collection(collection).await;
        let mut query = handle.find(filter);
        if let Some(field) = sort_on {
            let mut sort = BsonDocument::new();
            sort.insert(field, 1);
            query = query.sort(sort);
        }
        if let Some(limit) = limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let raw: Vec<BsonDocument> = query
            .await
            .map_err(read_error)?
            .try_collect()
            .await
            .map_err(read_error)?;

        Ok(raw.into_iter().map(from_bson_document).collect())
    }

    async fn insert(&self, collection: &str, document: Document) -> MongoResult<String> {
        let id = generate_id();
        self.collection(collection)
            .await
            .insert_one(to_bson_document(document, Some(id.as_str())))
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                id: id.clone(),
                source,
            })?;
        Ok(id)
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> MongoResult<()> {
        let write_error = |source: mongodb::error::Error| MongoDaoError::Write {
            collection: collection.to_owned(),
            id: id.to_owned(),
            source,
        };
        let handle = self.collection(collection).await;

        match mode {
            SetMode::Replace => {
                handle
                    .replace_one(upsert_key(id), to_bson_document(document, None))
                    .upsert(true)
                    .await
                    .map_err(write_error)?;
            }
            // `$set` rejects an empty document; merging nothing is a no-op anyway.
            SetMode::Merge if document.is_empty() => {}
            SetMode::Merge => {
                handle
                    .update_one(upsert_key(id), doc! { "$set": to_bson_document(document, None) })
                    .upsert(true)
                    .await
                    .map_err(write_error)?;
            }
        }
        Ok(())
    }

    async fn patch(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        if fields.is_empty() {
            return match self.find_by_id(collection, id).await? {
                Some(_) => Ok(()),
                None => Err(StorageError::not_found(collection, id)),
            };
        }

        let result = self
            .collection(collection)
            .await
            .update_one(doc_id(id), doc! { "$set": to_bson_document(fields, None) })
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                id: id.to_owned(),
                source,
            })?;

        if result.matched_count == 0 {
            debug!(collection, id, "update matched no document");
            return Err(StorageError::not_found(collection, id));
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> MongoResult<()> {
        self.collection(collection)
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection: collection.to_owned(),
                id: id.to_owned(),
                source,
            })?;
        Ok(())
    }
}

impl DocumentStore for MongoDocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let (collection, id) = (collection.to_owned(), id.to_owned());
        Box::pin(async move { store.find_by_id(&collection, &id).await.map_err(Into::into) })
    }

    fn get_all(
        &self,
        collection: &str,
        order_by: Option<&str>,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let order_by = order_by.map(str::to_owned);
        Box::pin(async move {
            store
                .find_many(&collection, doc! {}, order_by.as_deref(), None)
                .await
                .map_err(Into::into)
        })
    }

    fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredDocument>>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let mut filter = BsonDocument::new();
        filter.insert(field, to_bson(value));
        Box::pin(async move {
            store
                .find_many(&collection, filter, None, Some(limit))
                .await
                .map_err(Into::into)
        })
    }

    fn add(&self, collection: &str, document: Document) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move { store.insert(&collection, document).await.map_err(Into::into) })
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (collection, id) = (collection.to_owned(), id.to_owned());
        Box::pin(async move {
            store
                .write(&collection, &id, document, mode)
                .await
                .map_err(Into::into)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (collection, id) = (collection.to_owned(), id.to_owned());
        Box::pin(async move { store.patch(&collection, &id, fields).await })
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (collection, id) = (collection.to_owned(), id.to_owned());
        Box::pin(async move { store.remove(&collection, &id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
