//! MongoDB backend implementation for docbridge.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. Documents are
//! stored with their `_key` mirrored into MongoDB's `_id`, so key uniqueness is enforced by the
//! server.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! [`MongoDbConnector`] builds a client from the same five parameters as every other backend:
//! username, password, host, port and database name.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{mongodb::MongoDbConnector, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = DatabaseConfig::memory("inventory");
//!     config.backend = BackendKind::MongoDb;
//!
//!     let db = DatabaseAdapter::connect(&config, &MongoDbConnector).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_mongodb;

pub mod store;

pub use store::{MongoDbConnector, MongoDbStore};
