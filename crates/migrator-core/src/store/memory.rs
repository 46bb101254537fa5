//! In-memory object store.

use super::{check_version, ObjectStore, StoreError};
use crate::resource::{ObjectKey, Resource, TypeDescriptor};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<(TypeDescriptor, ObjectKey), Resource>,
    last_version: u64,
}

impl Inner {
    fn stamp(&mut self, resource: &mut Resource) {
        self.last_version += 1;
        resource.set_resource_version(self.last_version.to_string());
    }
}

/// Object store held in process memory, with monotonically increasing
/// resource versions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an object, stamping a fresh resource version.
    pub fn insert(&self, value: Value) -> Result<Resource, StoreError> {
        let mut resource = Resource::from_value(value)?;
        let mut inner = self.inner.write();
        inner.stamp(&mut resource);
        inner
            .objects
            .insert((resource.type_descriptor(), resource.key()), resource.clone());
        Ok(resource)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.inner.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, ty: &TypeDescriptor, key: &ObjectKey) -> Result<Option<Resource>, StoreError> {
        Ok(self
            .inner
            .read()
            .objects
            .get(&(ty.clone(), key.clone()))
            .cloned())
    }

    fn list(&self, ty: &TypeDescriptor, namespace: &str) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .inner
            .read()
            .objects
            .iter()
            .filter(|((t, k), _)| t == ty && k.namespace == namespace)
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    fn patch(
        &self,
        resource: &Resource,
        expected_version: Option<&str>,
    ) -> Result<Resource, StoreError> {
        let id = (resource.type_descriptor(), resource.key());
        let mut inner = self.inner.write();

        let stored = inner.objects.get(&id).ok_or_else(|| StoreError::NotFound {
            kind: resource.kind().to_string(),
            key: resource.key(),
        })?;
        check_version(resource, stored, expected_version)?;

        let mut updated = resource.clone();
        inner.stamp(&mut updated);
        inner.objects.insert(id, updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_map(name: &str, namespace: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": namespace},
            "data": {"testing": "test"}
        })
    }

    fn config_map_type() -> TypeDescriptor {
        TypeDescriptor::new("", "v1", "ConfigMap")
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryStore::new();
        let inserted = store.insert(config_map("test-cm", "default")).unwrap();
        assert_eq!(inserted.resource_version(), Some("1"));

        let fetched = store
            .get(&config_map_type(), &ObjectKey::new("default", "test-cm"))
            .unwrap()
            .unwrap();
        assert_eq!(fetched, inserted);

        assert!(store
            .get(&config_map_type(), &ObjectKey::new("default", "missing"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_filters_type_and_namespace() {
        let store = MemoryStore::new();
        store.insert(config_map("b", "default")).unwrap();
        store.insert(config_map("a", "default")).unwrap();
        store.insert(config_map("c", "other")).unwrap();
        store
            .insert(json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "s", "namespace": "default"}}))
            .unwrap();

        let names: Vec<_> = store
            .list(&config_map_type(), "default")
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_patch_checks_version() {
        let store = MemoryStore::new();
        let original = store.insert(config_map("test-cm", "default")).unwrap();

        let updated = store.patch(&original, Some("1")).unwrap();
        assert_eq!(updated.resource_version(), Some("2"));

        let err = store.patch(&original, Some("1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        assert!(store.patch(&original, None).is_ok());
    }

    #[test]
    fn test_patch_missing_object() {
        let store = MemoryStore::new();
        let resource = Resource::from_value(config_map("ghost", "default")).unwrap();
        assert!(matches!(
            store.patch(&resource, None),
            Err(StoreError::NotFound { .. })
        ));
    }
}
