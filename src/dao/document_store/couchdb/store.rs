use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};

use crate::dao::{
    document_store::{
        Document, DocumentStore, SetMode, StoredDocument, compare_on_field, generate_id,
        merge_into,
    },
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, END_SUFFIX, FindRequest, FindResponse,
        collection_prefix, doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";
const FIND: &str = "_find";

/// [`DocumentStore`] keeping every collection in a single CouchDB database, documents being
/// namespaced by a `collection::` prefix on their `_id`.
#[derive(Clone)]
pub struct CouchDocumentStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchDocumentStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url =
            Url::parse(&config.base_url).map_err(|source| CouchDaoError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: source.to_string(),
            })?;
        let database_url = segment_url(&base_url, &config.database);

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = segment_url(&self.database_url, path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url.as_ref().clone();

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn send_json<T>(&self, builder: reqwest::RequestBuilder, path: &str) -> CouchResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: path.to_owned(),
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: path.to_owned(),
                source,
            })
    }

    async fn get_document(&self, collection: &str, id: &str) -> CouchResult<Option<CouchDocument>> {
        let path = doc_id(collection, id);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse { path, source }),
            other => Err(CouchDaoError::RequestStatus {
                path,
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, document: &T, path: &str) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let _: Value = self
            .send_json(self.request(Method::PUT, path).json(document), path)
            .await?;
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> CouchResult<Vec<StoredDocument>> {
        let prefix = collection_prefix(collection);
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let payload: AllDocsResponse = self
            .send_json(self.request(Method::GET, ALL_DOCS).query(&query), ALL_DOCS)
            .await?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(doc_id, doc)| parse_document(doc_id, doc, collection))
            .collect()
    }

    async fn find_documents(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: usize,
    ) -> CouchResult<Vec<StoredDocument>> {
        let prefix = collection_prefix(collection);
        let upper = format!("{prefix}{END_SUFFIX}");
        let mut selector = serde_json::Map::new();
        selector.insert("_id".into(), json!({ "$gt": prefix, "$lt": upper }));
        selector.insert(field.to_owned(), json!({ "$eq": value }));
        let request = FindRequest {
            selector: Value::Object(selector),
            limit,
        };

        let payload: FindResponse = self
            .send_json(self.request(Method::POST, FIND).json(&request), FIND)
            .await?;

        payload
            .docs
            .into_iter()
            .map(|doc| {
                let doc_id = doc
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                parse_document(doc_id, doc, collection)
            })
            .collect()
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        mode: SetMode,
    ) -> CouchResult<()> {
        let existing = self.get_document(collection, id).await?;
        let (rev, body) = match (mode, existing) {
            (SetMode::Merge, Some(mut current)) => {
                merge_into(&mut current.body, document);
                (current.rev, current.body)
            }
            (_, existing) => (existing.and_then(|current| current.rev), document),
        };

        let doc = CouchDocument::new(collection, id, rev, body);
        self.put_document(&doc, &doc.id).await
    }

    async fn patch(&self, collection: &str, id: &str, fields: Document) -> StorageResult<()> {
        let Some(mut current) = self.get_document(collection, id).await? else {
            return Err(StorageError::not_found(collection, id));
        };
        merge_into(&mut current.body, fields);
        self.put_document(&current, &current.id).await?;
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> CouchResult<()> {
        let Some(current) = self.get_document(collection, id).await? else {
            return Ok(());
        };
        let Some(rev) = current.rev else {
            return Ok(());
        };

        let _: Value = self
            .send_json(
                self.request(Method::DELETE, &current.id)
                    .query(&[("rev", rev)]),
                &current.id,
            )
            .await?;
        Ok(())
    }
}

/// Append `segment` as a single percent-encoded path segment, so ids holding `/`, `?` or `#`
/// still address one document.
fn segment_url(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url
}

fn parse_document(doc_id: String, doc: Value, collection: &str) -> CouchResult<StoredDocument> {
    from_value::<CouchDocument>(doc)
        .map(|parsed| parsed.into_stored(collection))
        .map_err(|_| CouchDaoError::MalformedDocument { doc_id })
}

impl DocumentStore for CouchDocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let (collection, id) = (collection.to_owned(), id.to_owned());
        Box::pin(async move {
            let found = store.get_document(&collection, &id).await?;
            Ok(found.map(|doc| doc.into_stored(&collection).document))
        })
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
            let mut documents = store.list_documents(&collection).await?;
            // Mango sorting needs a dedicated index; the collections are small enough to sort here.
            if let Some(field) = order_by {
                documents.sort_by(|a, b| compare_on_field(&a.document, &b.document, &field));
            }
            Ok(documents)
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
        let (collection, field) = (collection.to_owned(), field.to_owned());
        Box::pin(async move {
            store
                .find_documents(&collection, &field, value, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn add(&self, collection: &str, document: Document) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            let id = generate_id();
            let doc = CouchDocument::new(&collection, &id, None, document);
            store.put_document(&doc, &doc.id).await?;
            Ok(id)
        })
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
        Box::pin(async move {
            let url = store.database_url.to_string();
            let response = store
                .authorize(store.client.get(store.database_url.as_ref().clone()))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_stay_in_one_path_segment() {
        let base = Url::parse("http://couch:5984/").unwrap();
        let database = segment_url(&base, "tenis");
        assert_eq!(database.as_str(), "http://couch:5984/tenis");

        let url = segment_url(&database, &doc_id("jugadores", "a/b?c#d"));
        assert_eq!(url.path_segments().map(Iterator::count), Some(2));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/tenis/jugadores::a%2Fb%3Fc%23d");
    }
}
