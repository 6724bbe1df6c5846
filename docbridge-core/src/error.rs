//! Error types and result types for adapter operations.
//!
//! Every fallible operation in this crate returns [`AdapterResult<T>`]. Errors raised by a
//! storage backend are surfaced as they are; the adapters never retry or swallow them.

use bson::error::Error as BsonError;
use config::ConfigError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::callback::OperationKind;

/// Error type returned by user callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents all possible errors that can occur when going through an adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The resolved document key is missing or is not a string.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    /// A value expected to be a document is not a mapping.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A callback registration could not be accepted.
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),
    /// Serialization was attempted on a value that is not a document.
    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),
    /// No adapter instance was available after a registry lookup.
    #[error("Adapter creation error: {0}")]
    AdapterCreation(String),
    /// A registered callback returned an error while being notified.
    #[error("Callback {name} failed on {kind}: {source}")]
    Callback {
        /// Name the callback was registered under.
        name: String,
        /// Operation kind being notified.
        kind: OperationKind,
        /// Error returned by the callback.
        #[source]
        source: CallbackError,
    },
    /// Serialization/deserialization error when converting between BSON and JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The connection configuration is incomplete or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Error during backend connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given key already exists in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<BsonError> for AdapterError {
    fn from(err: BsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for AdapterError {
    fn from(err: SerdeJsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for AdapterError {
    fn from(err: ConfigError) -> Self {
        AdapterError::Configuration(err.to_string())
    }
}
