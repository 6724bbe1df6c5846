//! Shared database adapter registry.
//!
//! An [`AdapterRegistry`] builds [`DatabaseAdapter`]s from configuration and keeps at most one of
//! them in a shared slot. Callers that ask for sharing without configuration get the shared
//! adapter; callers that opt out of sharing always get a fresh one and never touch the slot.
//!
//! | config | share | result                                               |
//! |--------|-------|------------------------------------------------------|
//! | none   | yes   | the shared adapter, or an error if none is installed |
//! | none   | no    | error                                                |
//! | some   | no    | a new adapter                                        |
//! | some   | yes   | a new adapter, installed if the slot is empty        |

use std::sync::Arc;

use mea::mutex::Mutex;
use tracing::info;

use crate::{
    backend::StoreConnector,
    config::DatabaseConfig,
    database::DatabaseAdapter,
    error::{AdapterError, AdapterResult},
};

/// Builds database adapters and holds the shared one.
pub struct AdapterRegistry<C> {
    connector: C,
    shared: Mutex<Option<Arc<DatabaseAdapter>>>,
}

impl<C: StoreConnector> AdapterRegistry<C> {
    /// Creates a registry with an empty shared slot.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            shared: Mutex::new(None),
        }
    }

    /// Returns the connector used to build adapters.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns a database adapter according to the table in the module docs.
    ///
    /// The slot lock is held across construction when sharing with configuration, so two
    /// concurrent callers cannot both install an adapter.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::AdapterCreation`] if no adapter can be returned
    /// - any configuration or connection error
    pub async fn get(
        &self,
        config: Option<&DatabaseConfig>,
        share: bool,
    ) -> AdapterResult<Arc<DatabaseAdapter>> {
        match (config, share) {
            (None, true) => self.shared().await.ok_or_else(|| {
                AdapterError::AdapterCreation(
                    "No shared adapter installed and no configuration given".to_string(),
                )
            }),
            (None, false) => Err(AdapterError::AdapterCreation(
                "A configuration is required for a non-shared adapter".to_string(),
            )),
            (Some(config), false) => Ok(Arc::new(
                DatabaseAdapter::connect(config, &self.connector).await?,
            )),
            (Some(config), true) => {
                let mut shared = self.shared.lock().await;
                let adapter = Arc::new(DatabaseAdapter::connect(config, &self.connector).await?);

                if shared.is_none() {
                    info!(database = %config.name, "installed shared database adapter");
                    *shared = Some(adapter.clone());
                }

                Ok(adapter)
            }
        }
    }

    /// Returns the shared adapter, if one is installed.
    pub async fn shared(&self) -> Option<Arc<DatabaseAdapter>> {
        self.shared.lock().await.clone()
    }
}

impl<C> std::fmt::Debug for AdapterRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry").finish_non_exhaustive()
    }
}
