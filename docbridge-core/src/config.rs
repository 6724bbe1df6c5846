//! Connection configuration.
//!
//! A [`DatabaseConfig`] names the store to connect to. It can be built in code, deserialized with
//! serde, or loaded with [`DatabaseConfig::load`], which layers:
//!
//! 1. an optional configuration file (format picked from its extension),
//! 2. `ADB_*` environment variables, which take precedence.
//!
//! | Variable             | Field            |
//! |----------------------|------------------|
//! | `ADB_USERNAME`       | `username`       |
//! | `ADB_PASSWORD`       | `password`       |
//! | `ADB_HOST`           | `host`           |
//! | `ADB_PORT`           | `port`           |
//! | `ADB_NAME`           | `name`           |
//! | `ADB_BACKEND`        | `backend`        |
//! | `ADB_SIGNATURE_MODE` | `signature_mode` |
//!
//! # Example
//!
//! ```ignore
//! let config = DatabaseConfig::load("config/database.toml")?;
//! config.validate()?;
//! ```

use std::{fmt, path::Path, str::FromStr};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    codec::SignatureMode,
    error::{AdapterError, AdapterResult},
};

/// Prefix of the environment variables read by [`DatabaseConfig::load`].
pub const ENV_PREFIX: &str = "ADB";

/// Which store implementation a configuration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "mongodb")]
    MongoDb,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::MongoDb => "mongodb",
        }
    }
}

impl FromStr for BackendKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            other => Err(AdapterError::Configuration(format!(
                "Unknown backend '{other}', expected 'memory' or 'mongodb'"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters needed to connect to a document store.
#[derive(Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: BackendKind,
    pub username: String,
    /// `None` when no source supplied a password; an explicit empty password is `Some("")`.
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(alias = "database")]
    pub name: String,
    pub signature_mode: SignatureMode,
}

impl DatabaseConfig {
    /// A configuration for the in-memory backend with placeholder connection parameters.
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Memory,
            username: "root".to_string(),
            password: Some(String::new()),
            host: "127.0.0.1".to_string(),
            port: 27017,
            name: name.into(),
            signature_mode: SignatureMode::default(),
        }
    }

    /// Loads a configuration from an optional file, overridden by `ADB_*` environment variables.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Configuration`] if the sources cannot be read or do not deserialize.
    pub fn load(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads a configuration from a file only, ignoring the environment.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Configuration`] if the file is missing or does not deserialize.
    pub fn from_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads a configuration from `ADB_*` environment variables only.
    pub fn from_env() -> AdapterResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Checks that every connection parameter is present.
    ///
    /// The password must be given but may be empty. The username, host and database name may
    /// not be empty, and the port must be non-zero.
    pub fn validate(&self) -> AdapterResult<()> {
        let missing: Vec<&str> = [
            ("username", self.username.is_empty()),
            ("password", self.password.is_none()),
            ("host", self.host.is_empty()),
            ("port", self.port == 0),
            ("name", self.name.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::Configuration(format!(
                "Missing connection parameters: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("signature_mode", &self.signature_mode)
            .finish()
    }
}
