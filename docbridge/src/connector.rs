//! Backend selection and the process-wide shared adapter.
//!
//! [`BackendConnector`] picks a store implementation from [`DatabaseConfig::backend`].
//! [`get_adapter`] goes through one process-wide [`AdapterRegistry`] built on it.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tracing::debug;

use docbridge_core::{
    backend::{StoreBackend, StoreConnector},
    config::{BackendKind, DatabaseConfig},
    database::DatabaseAdapter,
    error::AdapterResult,
    registry::AdapterRegistry,
};
use docbridge_memory::InMemoryConnector;

static SHARED: LazyLock<AdapterRegistry<BackendConnector>> =
    LazyLock::new(|| AdapterRegistry::new(BackendConnector::default()));

/// Connector dispatching on the configured [`BackendKind`].
#[derive(Debug, Clone, Default)]
pub struct BackendConnector {
    memory: InMemoryConnector,
}

impl BackendConnector {
    /// Uses `memory` for configurations targeting the in-memory backend.
    pub fn with_memory(memory: InMemoryConnector) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl StoreConnector for BackendConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
        debug!(backend = config.backend.as_str(), "selecting store backend");

        match config.backend {
            BackendKind::Memory => self.memory.connect(config).await,
            BackendKind::MongoDb => connect_mongodb(config).await,
        }
    }
}

#[cfg(feature = "mongodb")]
async fn connect_mongodb(config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
    docbridge_mongodb::MongoDbConnector.connect(config).await
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(_config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
    Err(docbridge_core::error::AdapterError::Configuration(
        "The mongodb backend requires the `mongodb` feature".to_string(),
    ))
}

/// Returns a database adapter from the process-wide registry.
///
/// - `get_adapter(Some(&config), true)` connects, and installs the adapter as the shared one if
///   none is installed yet
/// - `get_adapter(None, true)` returns the shared adapter
/// - `get_adapter(Some(&config), false)` always connects a new adapter
///
/// # Errors
///
/// [`AdapterError::AdapterCreation`](docbridge_core::error::AdapterError::AdapterCreation) when
/// no adapter can be returned, or any configuration or connection error.
pub async fn get_adapter(
    config: Option<&DatabaseConfig>,
    share: bool,
) -> AdapterResult<Arc<DatabaseAdapter>> {
    SHARED.get(config, share).await
}

/// The process-wide registry used by [`get_adapter`].
pub fn shared_registry() -> &'static AdapterRegistry<BackendConnector> {
    &SHARED
}
