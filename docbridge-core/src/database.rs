//! Database adapter.
//!
//! A [`DatabaseAdapter`] owns one backend connection and hands out [`CollectionAdapter`]s. The
//! first request for a collection opens it on the backend and caches the adapter; later requests
//! for the same name return that same adapter, so callbacks registered on it stay in effect.

use std::{collections::HashMap, sync::Arc};

use mea::mutex::Mutex;
use tracing::{debug, info};

use crate::{
    backend::{StoreBackend, StoreConnector},
    codec::Codec,
    collection::CollectionAdapter,
    config::DatabaseConfig,
    error::AdapterResult,
};

/// Adapter over one store database.
pub struct DatabaseAdapter {
    name: String,
    backend: Arc<dyn StoreBackend>,
    codec: Codec,
    collections: Mutex<HashMap<String, Arc<CollectionAdapter>>>,
}

impl DatabaseAdapter {
    /// Wraps an existing backend connection.
    pub fn new(name: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            codec: Codec::default(),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the codec used by collections opened afterwards.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Validates `config` and connects to the store through `connector`.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::Configuration`](crate::error::AdapterError::Configuration) if a connection
    ///   parameter is missing
    /// - any error returned by the connector
    pub async fn connect<C>(config: &DatabaseConfig, connector: &C) -> AdapterResult<Self>
    where
        C: StoreConnector + ?Sized,
    {
        config.validate()?;

        let backend = connector.connect(config).await?;

        info!(
            backend = config.backend.as_str(),
            host = %config.host,
            port = config.port,
            database = %config.name,
            "connected to document store"
        );

        Ok(Self::new(config.name.clone(), backend).with_codec(Codec::new(config.signature_mode)))
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying backend handle.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Returns the adapter for collection `name`, opening it on first access.
    ///
    /// The cache lock is held while the collection is opened, so concurrent first accesses
    /// produce a single adapter.
    pub async fn collection(&self, name: &str) -> AdapterResult<Arc<CollectionAdapter>> {
        let mut collections = self.collections.lock().await;

        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        self.backend.open_collection(name).await?;

        let collection = Arc::new(CollectionAdapter::new(
            name,
            self.backend.clone(),
            self.codec,
        ));
        collections.insert(name.to_string(), collection.clone());

        debug!(database = %self.name, collection = name, "opened collection");

        Ok(collection)
    }

    /// Names of the collections with a cached adapter.
    pub async fn cached_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Creates an empty collection on the backend.
    pub async fn create_collection(&self, name: &str) -> AdapterResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and forgets its cached adapter.
    pub async fn drop_collection(&self, name: &str) -> AdapterResult<()> {
        self.backend.drop_collection(name).await?;
        self.collections.lock().await.remove(name);
        Ok(())
    }

    /// Lists the collections known to the backend, cached or not.
    pub async fn list_collections(&self) -> AdapterResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Releases the backend connection.
    pub async fn close(&self) -> AdapterResult<()> {
        self.backend.close().await
    }
}

impl std::fmt::Debug for DatabaseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAdapter")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
