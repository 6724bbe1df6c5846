//! Operation callbacks.
//!
//! Each collection adapter owns a [`CallbackRegistry`]: one table per [`OperationKind`], each
//! mapping a callback name to a callback. Tables only grow. Registering a name that is already
//! present replaces the callback in place and keeps its position, so notification order is
//! always registration order.
//!
//! Callbacks run inline, after the store operation succeeds (bulk insert notifies before). The
//! first callback error stops notification and is returned to the caller.
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::callback::{CallbackRegistry, OperationKinds, Payload};
//!
//! let registry = CallbackRegistry::default();
//! registry.register(OperationKinds::parse("cu")?, "audit", |kind, payload| {
//!     tracing::info!(%kind, count = payload.documents().len(), "document change");
//!     Ok(())
//! }).await?;
//! ```

use std::{fmt, sync::Arc};

use bson::Document;
use mea::rwlock::RwLock;
use tracing::trace;
use uuid::Uuid;

use crate::error::{AdapterError, AdapterResult, CallbackError};

/// The four observable operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A document was inserted. Code `c`.
    Create,
    /// Documents were read through a filter. Code `r`.
    Read,
    /// An existing document was written. Code `u`.
    Update,
    /// A document was removed. Code `d`.
    Delete,
}

impl OperationKind {
    /// Every kind, in notification table order.
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Create,
        OperationKind::Read,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    /// Returns the lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    /// Maps a single-letter code (`c`, `r`, `u`, `d`) to its kind.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'c' => Some(OperationKind::Create),
            'r' => Some(OperationKind::Read),
            'u' => Some(OperationKind::Update),
            'd' => Some(OperationKind::Delete),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            OperationKind::Create => 0,
            OperationKind::Read => 1,
            OperationKind::Update => 2,
            OperationKind::Delete => 3,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of operation kinds.
///
/// Defaults to create + update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationKinds(u8);

impl OperationKinds {
    /// The set with no kinds.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set with all four kinds, same as `"crud"`.
    pub const fn all() -> Self {
        Self(0b1111)
    }

    /// Parses a string of single-letter codes, e.g. `"cu"` or `"crud"`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidCallback`] on an unknown code.
    pub fn parse(codes: &str) -> AdapterResult<Self> {
        codes.chars().try_fold(Self::empty(), |kinds, code| {
            OperationKind::from_code(code)
                .map(|kind| kinds.with(kind))
                .ok_or_else(|| {
                    AdapterError::InvalidCallback(format!(
                        "Unknown operation code '{code}', expected one of 'c', 'r', 'u', 'd'"
                    ))
                })
        })
    }

    /// Returns this set with `kind` added.
    pub fn with(self, kind: OperationKind) -> Self {
        Self(self.0 | 1 << kind.index())
    }

    /// Returns `true` if `kind` is in the set.
    pub fn contains(&self, kind: OperationKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the kinds in the set, in [`OperationKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = OperationKind> + '_ {
        OperationKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }
}

impl Default for OperationKinds {
    fn default() -> Self {
        Self::empty()
            .with(OperationKind::Create)
            .with(OperationKind::Update)
    }
}

impl From<OperationKind> for OperationKinds {
    fn from(kind: OperationKind) -> Self {
        Self::empty().with(kind)
    }
}

impl<const N: usize> From<[OperationKind; N]> for OperationKinds {
    fn from(kinds: [OperationKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl FromIterator<OperationKind> for OperationKinds {
    fn from_iter<I: IntoIterator<Item = OperationKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Data handed to a callback.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// A single document, as written or removed.
    Document(&'a Document),
    /// Several documents: a read result or a bulk insert batch.
    Batch(&'a [Document]),
}

impl<'a> Payload<'a> {
    pub fn documents(&self) -> &'a [Document] {
        match *self {
            Payload::Document(document) => std::slice::from_ref(document),
            Payload::Batch(documents) => documents,
        }
    }
}

pub type CallbackResult = Result<(), CallbackError>;

/// A registered callback.
pub type Callback = Arc<dyn Fn(OperationKind, Payload<'_>) -> CallbackResult + Send + Sync>;

type Table = Vec<(String, Callback)>;

/// Per-kind callback tables.
pub struct CallbackRegistry {
    tables: RwLock<[Table; 4]>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Default::default()),
        }
    }
}

impl CallbackRegistry {
    /// Registers `callback` under `name` for every kind in `kinds`.
    ///
    /// An empty name is replaced by a generated unique one. Returns the name used.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidCallback`] if `kinds` is empty.
    pub async fn register<F>(
        &self,
        kinds: impl Into<OperationKinds>,
        name: &str,
        callback: F,
    ) -> AdapterResult<String>
    where
        F: Fn(OperationKind, Payload<'_>) -> CallbackResult + Send + Sync + 'static,
    {
        let kinds = kinds.into();
        if kinds.is_empty() {
            return Err(AdapterError::InvalidCallback(
                "A callback must target at least one operation kind".to_string(),
            ));
        }

        let name = if name.is_empty() {
            format!("callback-{}", Uuid::new_v4().simple())
        } else {
            name.to_string()
        };
        let callback: Callback = Arc::new(callback);

        let mut tables = self.tables.write().await;
        for kind in kinds.iter() {
            let table = &mut tables[kind.index()];
            match table.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = callback.clone(),
                None => table.push((name.clone(), callback.clone())),
            }
        }

        Ok(name)
    }

    /// Invokes every callback registered for `kind`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Callback`] for the first callback that fails; later callbacks are
    /// not invoked.
    pub async fn notify(&self, kind: OperationKind, payload: Payload<'_>) -> AdapterResult<()> {
        let table = self.tables.read().await[kind.index()].clone();

        for (name, callback) in table {
            trace!(callback = %name, %kind, "invoking callback");
            callback(kind, payload).map_err(|source| AdapterError::Callback {
                name,
                kind,
                source,
            })?;
        }

        Ok(())
    }

    /// Number of callbacks registered for `kind`.
    pub async fn len(&self, kind: OperationKind) -> usize {
        self.tables.read().await[kind.index()].len()
    }

    /// Callback names registered for `kind`, in notification order.
    pub async fn names(&self, kind: OperationKind) -> Vec<String> {
        self.tables.read().await[kind.index()]
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry").finish_non_exhaustive()
    }
}
