//! In-memory document storage backend for docbridge.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Ordered collections** - Documents are kept sorted by their `_key`
//! - **Exact-match filtering** - Filters are evaluated by scanning the collection
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{memory::InMemoryConnector, prelude::*};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::memory("app");
//!     let db = DatabaseAdapter::connect(&config, &InMemoryConnector::new()).await?;
//!     let users = db.collection("users").await?;
//!
//!     users.write("alice", doc! { "name": "Alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_memory;

pub mod store;

pub use store::{InMemoryConnector, InMemoryStore};
