//! Convenient re-exports of commonly used types from docbridge.
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```

pub use docbridge_core::{
    backend::{InsertManyResult, StoreBackend, StoreConnector},
    callback::{CallbackRegistry, CallbackResult, OperationKind, OperationKinds, Payload},
    codec::{Codec, SignatureMode},
    collection::{CollectionAdapter, WriteOutcome},
    config::{BackendKind, DatabaseConfig},
    database::DatabaseAdapter,
    document::{KEY_FIELD, KeyRef},
    error::{AdapterError, AdapterResult},
    filter::{Filter, FilterParser},
    registry::AdapterRegistry,
};

pub use crate::connector::{BackendConnector, get_adapter};
