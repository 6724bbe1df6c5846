//! In-memory storage implementation.
//!
//! Documents are kept per collection in a `BTreeMap` keyed by `_key`, behind an async-aware
//! read-write lock.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use tracing::debug;
use uuid::Uuid;

use docbridge_core::{
    backend::{InsertManyResult, StoreBackend, StoreConnector},
    config::DatabaseConfig,
    document::{KEY_FIELD, document_key},
    error::{AdapterError, AdapterResult},
    filter::Filter,
};

type CollectionMap = BTreeMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Clones of the same
/// instance share the same underlying data.
///
/// Collections are created implicitly by the first insert. Reads from a collection that does not
/// exist return nothing; updates and deletes fail with
/// [`AdapterError::CollectionNotFound`].
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStore;
/// use docbridge_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_document(doc! { "_key": "alice", "name": "Alice" }, "users").await?;
/// assert_eq!(store.count_documents("users").await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document key -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn open_collection(&self, collection: &str) -> AdapterResult<()> {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default();

        Ok(())
    }

    async fn has_document(&self, key: &str, collection: &str) -> AdapterResult<bool> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .is_some_and(|documents| documents.contains_key(key)))
    }

    async fn find_documents(
        &self,
        filter: &Filter,
        collection: &str,
    ) -> AdapterResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(collection_map
            .values()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn insert_document(&self, document: Document, collection: &str) -> AdapterResult<()> {
        let key = document_key(&document)?;

        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        if collection_map.contains_key(&key) {
            return Err(AdapterError::DocumentAlreadyExists(key, collection.to_string()));
        }

        collection_map.insert(key, document);

        Ok(())
    }

    async fn update_document(&self, document: Document, collection: &str) -> AdapterResult<()> {
        let key = document_key(&document)?;

        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(AdapterError::CollectionNotFound(collection.to_string())),
        };

        let stored = match collection_map.get_mut(&key) {
            Some(stored) => stored,
            None => return Err(AdapterError::DocumentNotFound(key, collection.to_string())),
        };

        for (field, value) in document {
            stored.insert(field, value);
        }

        Ok(())
    }

    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> AdapterResult<InsertManyResult> {
        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        let mut keyed = Vec::with_capacity(documents.len());
        for mut document in documents {
            let key = if document.contains_key(KEY_FIELD) {
                document_key(&document)?
            } else {
                let key = Uuid::new_v4().simple().to_string();
                document.insert(KEY_FIELD, key.as_str());
                key
            };

            if collection_map.contains_key(&key) || keyed.iter().any(|(k, _)| *k == key) {
                return Err(AdapterError::DocumentAlreadyExists(key, collection.to_string()));
            }

            keyed.push((key, document));
        }

        let keys = keyed.iter().map(|(key, _)| key.clone()).collect();
        collection_map.extend(keyed);

        debug!(collection, "bulk insert applied");

        Ok(InsertManyResult { keys })
    }

    async fn all_documents(&self, collection: &str) -> AdapterResult<Vec<Document>> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_documents(&self, keys: Vec<String>, collection: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(AdapterError::CollectionNotFound(collection.to_string())),
        };

        for key in keys {
            collection_map.remove(&key);
        }

        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> AdapterResult<u64> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .map_or(0, |documents| documents.len() as u64))
    }

    async fn create_collection(&self, name: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;

        if store.contains_key(name) {
            return Err(AdapterError::Backend(format!(
                "Collection {name} already exists"
            )));
        }

        store.insert(name.to_string(), CollectionMap::new());

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> AdapterResult<()> {
        match self.store.write().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(AdapterError::CollectionNotFound(name.to_string())),
        }
    }

    async fn list_collections(&self) -> AdapterResult<Vec<String>> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();

        Ok(names)
    }
}

/// Connector producing [`InMemoryStore`] backends.
///
/// By default every connection gets a fresh, empty store. A connector built with
/// [`InMemoryConnector::with_store`] hands out clones of one store instead, so every adapter it
/// connects sees the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    store: Option<InMemoryStore>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store: Some(store) }
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, _config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
        Ok(Arc::new(self.store.clone().unwrap_or_default()))
    }
}
