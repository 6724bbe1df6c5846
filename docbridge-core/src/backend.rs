//! Storage backend abstraction wrapped by the adapters.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait is the driver contract: everything a collection or database adapter
//! needs from a document store, and nothing more. Backends receive documents that have already
//! been through the [`Codec`](crate::codec::Codec), so they only ever see JSON primitive values.
//! Every document carries its key in the reserved [`KEY_FIELD`](crate::document::KEY_FIELD).
//!
//! # Traits
//!
//! - [`StoreBackend`]: The driver contract
//! - [`StoreConnector`]: Factory trait creating a backend from a [`DatabaseConfig`]
//!
//! # Examples
//!
//! ```ignore
//! use docbridge_core::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = connector.connect(&config).await?;
//! backend.insert_document(doc! { "_key": "alice", "name": "Alice" }, "users").await?;
//! assert!(backend.has_document("alice", "users").await?);
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::Document;

use crate::{config::DatabaseConfig, error::AdapterResult, filter::Filter};

/// Keys of the documents stored by a bulk insert, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    pub keys: Vec<String>,
}

/// Abstract interface for document storage backends.
///
/// Implementations must be thread-safe; adapters share one backend handle across every
/// collection of a database.
///
/// # Error Handling
///
/// Backend errors are returned to the caller as they are. Implementers should document which
/// [`AdapterError`](crate::error::AdapterError) variants each operation may return.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Prepares a collection for use, creating it if the store requires it.
    async fn open_collection(&self, collection: &str) -> AdapterResult<()>;

    /// Returns `true` if a document with the given key exists in the collection.
    async fn has_document(&self, key: &str, collection: &str) -> AdapterResult<bool>;

    /// Returns every document matching `filter`. An empty filter matches all documents.
    async fn find_documents(&self, filter: &Filter, collection: &str)
    -> AdapterResult<Vec<Document>>;

    /// Inserts a single document keyed by its `_key` field.
    ///
    /// # Errors
    ///
    /// [`AdapterError::DocumentAlreadyExists`](crate::error::AdapterError::DocumentAlreadyExists)
    /// if the key is taken.
    async fn insert_document(&self, document: Document, collection: &str) -> AdapterResult<()>;

    /// Merges the fields of `document` into the stored document with the same `_key`.
    ///
    /// Fields missing from `document` are left untouched.
    ///
    /// # Errors
    ///
    /// [`AdapterError::DocumentNotFound`](crate::error::AdapterError::DocumentNotFound) if no
    /// document has that key.
    async fn update_document(&self, document: Document, collection: &str) -> AdapterResult<()>;

    /// Inserts several documents at once.
    ///
    /// Documents without a `_key` get a generated one. Either every document is stored or none
    /// is.
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> AdapterResult<InsertManyResult>;

    /// Returns every document of the collection.
    async fn all_documents(&self, collection: &str) -> AdapterResult<Vec<Document>>;

    /// Removes the documents with the given keys. Unknown keys are skipped.
    async fn delete_documents(&self, keys: Vec<String>, collection: &str) -> AdapterResult<()>;

    async fn count_documents(&self, collection: &str) -> AdapterResult<u64>;

    async fn create_collection(&self, name: &str) -> AdapterResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> AdapterResult<()>;

    async fn list_collections(&self) -> AdapterResult<Vec<String>>;

    /// Releases connections held by the backend.
    ///
    /// The default implementation is a no-op.
    async fn close(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Factory trait for connecting to a store.
///
/// Connectors are how the database adapter and the shared registry obtain a backend from
/// configuration, without knowing which store is behind it.
///
/// # Example
///
/// ```ignore
/// struct InMemoryConnector;
///
/// #[async_trait]
/// impl StoreConnector for InMemoryConnector {
///     async fn connect(&self, _config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
///         Ok(Arc::new(InMemoryStore::new()))
///     }
/// }
/// ```
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connects to the store described by `config`.
    async fn connect(&self, config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>>;
}
