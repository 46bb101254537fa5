//! Object store persisted in a sled database.

use super::{check_version, ObjectStore, StoreConfig, StoreError};
use crate::resource::{ObjectKey, Resource, TypeDescriptor};
use serde_json::Value;
use sled::{Db, Tree};
use tracing::debug;

/// Tree name for configuration objects.
const OBJECTS_TREE: &str = "objects";

/// Separator between key segments; never valid inside a name.
const SEPARATOR: u8 = 0;

/// Object store backed by sled. Objects are JSON-encoded and keyed by
/// `group/version/kind/namespace/name`.
pub struct SledStore {
    /// The underlying sled database.
    db: Db,

    /// Tree for JSON-encoded objects.
    objects: Tree,

    flush_on_write: bool,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let db = config.to_sled_config().open()?;
        let objects = db.open_tree(OBJECTS_TREE)?;

        Ok(Self {
            db,
            objects,
            flush_on_write: config.flush_on_write,
        })
    }

    /// Insert or overwrite an object, stamping a fresh resource version.
    pub fn insert(&self, value: Value) -> Result<Resource, StoreError> {
        let mut resource = Resource::from_value(value)?;
        resource.set_resource_version(self.next_version()?);

        let key = Self::object_key(&resource.type_descriptor(), &resource.key());
        self.objects
            .insert(key, serde_json::to_vec(resource.as_object())?)?;
        self.after_write()?;

        debug!(object = %resource.identity(), "Inserted object");
        Ok(resource)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn next_version(&self) -> Result<String, StoreError> {
        Ok((self.db.generate_id()? + 1).to_string())
    }

    fn after_write(&self) -> Result<(), StoreError> {
        if self.flush_on_write {
            self.flush()?;
        }
        Ok(())
    }

    fn prefix(ty: &TypeDescriptor, namespace: &str) -> Vec<u8> {
        let mut key = Vec::new();
        for segment in [&ty.group, &ty.version, &ty.kind] {
            key.extend_from_slice(segment.as_bytes());
            key.push(SEPARATOR);
        }
        key.extend_from_slice(namespace.as_bytes());
        key.push(SEPARATOR);
        key
    }

    fn object_key(ty: &TypeDescriptor, key: &ObjectKey) -> Vec<u8> {
        let mut bytes = Self::prefix(ty, &key.namespace);
        bytes.extend_from_slice(key.name.as_bytes());
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<Resource, StoreError> {
        Resource::from_value(serde_json::from_slice(bytes)?)
    }
}

impl ObjectStore for SledStore {
    fn get(&self, ty: &TypeDescriptor, key: &ObjectKey) -> Result<Option<Resource>, StoreError> {
        match self.objects.get(Self::object_key(ty, key))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list(&self, ty: &TypeDescriptor, namespace: &str) -> Result<Vec<Resource>, StoreError> {
        self.objects
            .scan_prefix(Self::prefix(ty, namespace))
            .map(|entry| {
                let (_, bytes) = entry?;
                Self::decode(&bytes)
            })
            .collect()
    }

    fn patch(
        &self,
        resource: &Resource,
        expected_version: Option<&str>,
    ) -> Result<Resource, StoreError> {
        let key = Self::object_key(&resource.type_descriptor(), &resource.key());
        let current = self
            .objects
            .get(&key)?
            .ok_or_else(|| StoreError::NotFound {
                kind: resource.kind().to_string(),
                key: resource.key(),
            })?;
        check_version(resource, &Self::decode(&current)?, expected_version)?;

        let mut updated = resource.clone();
        updated.set_resource_version(self.next_version()?);
        let encoded = serde_json::to_vec(updated.as_object())?;

        // A concurrent writer between the read above and this swap is a
        // conflict as well.
        if let Err(swap) = self
            .objects
            .compare_and_swap(&key, Some(&current), Some(encoded))?
        {
            let found = match swap.current {
                Some(bytes) => Self::decode(&bytes)?
                    .resource_version()
                    .unwrap_or_default()
                    .to_string(),
                None => String::new(),
            };
            return Err(StoreError::Conflict {
                kind: resource.kind().to_string(),
                key: resource.key(),
                expected: expected_version.unwrap_or_default().to_string(),
                found,
            });
        }
        self.after_write()?;

        Ok(updated)
    }
}
