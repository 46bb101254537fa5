//! Object store abstraction and implementations.
//!
//! The runner talks to stores only through [`ObjectStore`]. Writes are
//! conditioned on the `resourceVersion` read at fetch time, so concurrent
//! modifications surface as [`StoreError::Conflict`].

mod config;
mod memory;
mod sled_store;

pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::resource::{ObjectKey, Resource, TypeDescriptor};
use thiserror::Error;

/// Errors returned by object stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: ObjectKey },

    #[error("{kind} {key} was modified: expected version {expected}, found {found}")]
    Conflict {
        kind: String,
        key: ObjectKey,
        expected: String,
        found: String,
    },

    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

/// A blocking store of configuration objects.
pub trait ObjectStore: Send + Sync {
    /// Fetch one object; `Ok(None)` when absent.
    fn get(&self, ty: &TypeDescriptor, key: &ObjectKey) -> Result<Option<Resource>, StoreError>;

    /// All objects of a type in one namespace, ordered by name.
    fn list(&self, ty: &TypeDescriptor, namespace: &str) -> Result<Vec<Resource>, StoreError>;

    /// Replace an existing object, provided its stored version still equals
    /// `expected_version` (unconditional when `None`). Returns the object as
    /// stored, carrying its new `resourceVersion`.
    fn patch(
        &self,
        resource: &Resource,
        expected_version: Option<&str>,
    ) -> Result<Resource, StoreError>;
}

/// Check the optimistic-concurrency precondition for a write.
pub(crate) fn check_version(
    resource: &Resource,
    stored: &Resource,
    expected_version: Option<&str>,
) -> Result<(), StoreError> {
    match expected_version {
        Some(expected) if stored.resource_version() != Some(expected) => {
            Err(StoreError::Conflict {
                kind: resource.kind().to_string(),
                key: resource.key(),
                expected: expected.to_string(),
                found: stored.resource_version().unwrap_or_default().to_string(),
            })
        }
        _ => Ok(()),
    }
}
