//! Main docbridge crate providing a unified entry point to the adapter layer.
//!
//! This crate re-exports the core types from `docbridge-core`, gives access to the available
//! storage backends, and holds the process-wide shared database adapter.
//!
//! # Features
//!
//! - **Reversible field codec** - Dates, object ids, binary data and other non-JSON values are
//!   stored as tagged strings and restored on read
//! - **CRUD callbacks** - Observe or extend create/read/update/delete per collection
//! - **Shared adapter** - One database adapter per process, created from configuration on first use
//! - **Multiple backends** - In-memory, and MongoDB behind the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::prelude::*;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> AdapterResult<()> {
//!     // Install the shared adapter
//!     let config = DatabaseConfig::memory("app");
//!     docbridge::get_adapter(Some(&config), true).await?;
//!
//!     // Anywhere else in the process
//!     let db = docbridge::get_adapter(None, true).await?;
//!     let users = db.collection("users").await?;
//!
//!     users.on_event(OperationKinds::parse("cu")?, "audit", |kind, payload| {
//!         tracing::info!(%kind, documents = payload.documents().len(), "users changed");
//!         Ok(())
//!     }).await?;
//!
//!     users.write("alice", doc! { "name": "Alice", "joined": bson::DateTime::now() }).await?;
//!
//!     let found = users.read("name=Alice").await?;
//!     println!("Found users: {:?}", found);
//!
//!     db.close().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

pub mod connector;
pub mod prelude;

pub use docbridge_core::{
    backend, callback, codec, collection, config, database, document, error, filter, registry,
};

pub use connector::{BackendConnector, get_adapter, shared_registry};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbridge_memory::{InMemoryConnector, InMemoryStore};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbridge_mongodb::{MongoDbConnector, MongoDbStore};
}
