//! Collection adapter.
//!
//! A [`CollectionAdapter`] wraps one collection of the backing store. Documents written through
//! it are serialized by the [`Codec`] before reaching the store and unserialized on the way back,
//! and every operation notifies the matching [`OperationKind`] callbacks.
//!
//! | Operation       | Callback kind | Payload                                             |
//! |-----------------|---------------|-----------------------------------------------------|
//! | [`read`]        | read          | every matching document                             |
//! | [`write`]       | create/update | the serialized document, as sent to the store       |
//! | [`insert_many`] | create        | the batch as given, before anything is inserted     |
//! | [`delete`]      | delete        | the removed document                                |
//!
//! [`read`]: CollectionAdapter::read
//! [`write`]: CollectionAdapter::write
//! [`insert_many`]: CollectionAdapter::insert_many
//! [`delete`]: CollectionAdapter::delete
//!
//! [`contains`](CollectionAdapter::contains), [`all`](CollectionAdapter::all) and
//! [`count`](CollectionAdapter::count) notify nothing.
//!
//! # Example
//!
//! ```ignore
//! let users = db.collection("users").await?;
//!
//! users.write("alice", doc! { "name": "Alice" }).await?;
//! let found = users.read("name=Alice").await?;
//! assert_eq!(found[0].get_str("_key")?, "alice");
//! ```

use std::sync::Arc;

use bson::{Bson, Document};
use tracing::debug;

use crate::{
    backend::{InsertManyResult, StoreBackend},
    callback::{CallbackRegistry, CallbackResult, OperationKind, OperationKinds, Payload},
    codec::Codec,
    document::{KEY_FIELD, KeyRef},
    error::{AdapterError, AdapterResult},
    filter::Filter,
};

/// Whether a keyed write created a new document or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key was unknown and the document was inserted.
    Created,
    /// The key existed and the document's fields were merged into the stored one.
    Updated,
}

/// Adapter over a single store collection.
#[derive(Debug)]
pub struct CollectionAdapter {
    name: String,
    backend: Arc<dyn StoreBackend>,
    codec: Codec,
    callbacks: CallbackRegistry,
}

impl CollectionAdapter {
    /// Creates an adapter for an already opened collection.
    pub fn new(name: impl Into<String>, backend: Arc<dyn StoreBackend>, codec: Codec) -> Self {
        Self {
            name: name.into(),
            backend,
            codec,
            callbacks: CallbackRegistry::default(),
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying backend handle.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Returns the codec applied to documents of this collection.
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Returns the callback tables of this collection.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Returns every document matching a `field=value&...` expression.
    ///
    /// The empty expression matches every document. Read callbacks receive the full result.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or [`AdapterError::Callback`] if a read callback fails.
    pub async fn read(&self, expression: &str) -> AdapterResult<Vec<Document>> {
        self.read_filter(Filter::parse(expression)).await
    }

    /// Like [`CollectionAdapter::read`], with a programmatic filter.
    pub async fn read_filter(&self, filter: impl Into<Filter>) -> AdapterResult<Vec<Document>> {
        let filter = filter.into();
        let documents: Vec<Document> = self
            .backend
            .find_documents(&filter, &self.name)
            .await?
            .iter()
            .map(|document| self.codec.unserialize(document))
            .collect();

        debug!(collection = %self.name, matched = documents.len(), "read documents");

        self.callbacks
            .notify(OperationKind::Read, Payload::Batch(&documents))
            .await?;

        Ok(documents)
    }

    /// Stores `document` under the key resolved from `key`.
    ///
    /// The document is created when the key is unknown and updated otherwise. Exactly one of the
    /// create or update callbacks fires, after the store accepted the write, and receives the
    /// serialized document as it was sent to the store.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::InvalidKey`] if the key is missing or not a string
    /// - [`AdapterError::Serialization`] if a field cannot be encoded
    /// - [`AdapterError::Callback`] if a callback fails; the write itself is kept
    pub async fn write(
        &self,
        key: impl Into<KeyRef>,
        mut document: Document,
    ) -> AdapterResult<WriteOutcome> {
        let key = key.into().resolve(Some(&document))?;
        document.insert(KEY_FIELD, key.as_str());

        let serialized = self.codec.serialize(&document)?;

        let outcome = if self.backend.has_document(&key, &self.name).await? {
            self.backend
                .update_document(serialized.clone(), &self.name)
                .await?;
            WriteOutcome::Updated
        } else {
            self.backend
                .insert_document(serialized.clone(), &self.name)
                .await?;
            WriteOutcome::Created
        };

        debug!(collection = %self.name, %key, ?outcome, "wrote document");

        let kind = match outcome {
            WriteOutcome::Created => OperationKind::Create,
            WriteOutcome::Updated => OperationKind::Update,
        };
        self.callbacks
            .notify(kind, Payload::Document(&serialized))
            .await?;

        Ok(outcome)
    }

    /// Inserts a batch of documents.
    ///
    /// Every value must be a document. Create callbacks receive the batch before anything is sent
    /// to the store, so a failing callback prevents the insert.
    ///
    /// # Errors
    ///
    /// [`AdapterError::InvalidDocument`] if any value is not a document; nothing is inserted.
    pub async fn insert_many<I, T>(&self, values: I) -> AdapterResult<InsertManyResult>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bson>,
    {
        let documents = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value.into() {
                Bson::Document(document) => Ok(document),
                other => Err(AdapterError::InvalidDocument(format!(
                    "Value at position {index} is a {:?}, not a document",
                    other.element_type()
                ))),
            })
            .collect::<AdapterResult<Vec<Document>>>()?;

        self.callbacks
            .notify(OperationKind::Create, Payload::Batch(&documents))
            .await?;

        let serialized = documents
            .iter()
            .map(|document| self.codec.serialize(document))
            .collect::<AdapterResult<Vec<Document>>>()?;

        let result = self
            .backend
            .insert_documents(serialized, &self.name)
            .await?;

        debug!(collection = %self.name, inserted = result.keys.len(), "inserted documents");

        Ok(result)
    }

    /// Returns `true` if a document with the resolved key exists.
    ///
    /// # Errors
    ///
    /// [`AdapterError::InvalidKey`] if the key is missing or not a string.
    pub async fn contains(&self, key: impl Into<KeyRef>) -> AdapterResult<bool> {
        let key = key.into().resolve(None)?;

        self.backend.has_document(&key, &self.name).await
    }

    /// Returns every document of the collection.
    pub async fn all(&self) -> AdapterResult<Vec<Document>> {
        Ok(self
            .backend
            .all_documents(&self.name)
            .await?
            .iter()
            .map(|document| self.codec.unserialize(document))
            .collect())
    }

    /// Removes the document with the resolved key and returns it.
    ///
    /// Delete callbacks receive the removed document.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::InvalidKey`] if the key is missing or not a string
    /// - [`AdapterError::DocumentNotFound`] if no document has that key
    pub async fn delete(&self, key: impl Into<KeyRef>) -> AdapterResult<Document> {
        let key = key.into().resolve(None)?;

        let stored = self
            .backend
            .find_documents(&Filter::new().eq(KEY_FIELD, key.as_str()), &self.name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::DocumentNotFound(key.clone(), self.name.clone()))?;

        self.backend
            .delete_documents(vec![key.clone()], &self.name)
            .await?;

        debug!(collection = %self.name, %key, "deleted document");

        let document = self.codec.unserialize(&stored);
        self.callbacks
            .notify(OperationKind::Delete, Payload::Document(&document))
            .await?;

        Ok(document)
    }

    /// Returns the number of documents in the collection. No callbacks fire.
    pub async fn count(&self) -> AdapterResult<u64> {
        self.backend.count_documents(&self.name).await
    }

    /// Registers a callback for the given operation kinds. Returns the name used.
    ///
    /// See [`CallbackRegistry::register`].
    pub async fn on_event<F>(
        &self,
        kinds: impl Into<OperationKinds>,
        name: &str,
        callback: F,
    ) -> AdapterResult<String>
    where
        F: Fn(OperationKind, Payload<'_>) -> CallbackResult + Send + Sync + 'static,
    {
        self.callbacks.register(kinds, name, callback).await
    }
}
