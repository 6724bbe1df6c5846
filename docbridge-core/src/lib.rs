//! A document-store adapter layer that sits between application code and a schema-less
//! document database driver.
//!
//! This crate is the core of the docbridge project and provides:
//!
//! - **Field codec** ([`codec`]) - Reversible tagging of values outside the JSON primitive set
//! - **Document keys** ([`document`]) - The reserved `_key` field and key resolution
//! - **Filters** ([`filter`]) - Exact-match predicates and the `field=value` expression syntax
//! - **Callbacks** ([`callback`]) - Per-operation observer tables for create/read/update/delete
//! - **Store backend abstraction** ([`backend`]) - The driver contract wrapped by the adapters
//! - **Collection adapter** ([`collection`]) - CRUD routed through the codec and the callbacks
//! - **Database adapter** ([`database`]) - Lazily cached collection adapters over one backend
//! - **Shared registry** ([`registry`]) - An explicit, mutex-guarded shared adapter slot
//! - **Configuration** ([`config`]) - Connection parameters loaded from files and the environment
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::{config::DatabaseConfig, database::DatabaseAdapter};
//! use bson::doc;
//!
//! let db = DatabaseAdapter::connect(&DatabaseConfig::memory("app"), &connector).await?;
//! let users = db.collection("users").await?;
//!
//! users.on_event(OperationKind::Create, "audit", |_, payload| {
//!     println!("created {} document(s)", payload.documents().len());
//!     Ok(())
//! }).await?;
//!
//! users.write("alice", doc! { "name": "Alice", "joined": bson::DateTime::now() }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_core;

pub mod backend;
pub mod callback;
pub mod codec;
pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod filter;
pub mod registry;
