//! Resolving a migration target to the objects it selects.

use super::definition::TargetDescriptor;
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::store::ObjectStore;
use tracing::debug;

/// Fetch the objects selected by `target`.
///
/// A named target must exist. A fleet target lists every object of the
/// type in the namespace; an empty listing is not an error.
pub fn resolve(store: &dyn ObjectStore, target: &TargetDescriptor) -> Result<Vec<Resource>> {
    let type_descriptor = target.type_descriptor();

    if target.is_fleet() {
        let resources = store.list(&type_descriptor, &target.namespace)?;
        debug!(
            kind = %type_descriptor.kind,
            namespace = %target.namespace,
            count = resources.len(),
            "Resolved fleet target"
        );
        return Ok(resources);
    }

    let key = target.object_key();
    match store.get(&type_descriptor, &key)? {
        Some(resource) => Ok(vec![resource]),
        None => Err(Error::TargetNotFound {
            target: type_descriptor,
            key,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, namespace) in [("a", "default"), ("b", "default"), ("c", "other")] {
            store
                .insert(json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": name, "namespace": namespace}
                }))
                .unwrap();
        }
        store
            .insert(json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": {"name": "s", "namespace": "default"}
            }))
            .unwrap();
        store
    }

    #[test]
    fn test_single_object() {
        let target = TargetDescriptor::new("", "v1", "ConfigMap", "default").with_name("b");
        let resources = resolve(&store(), &target).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name(), "b");
    }

    #[test]
    fn test_single_object_missing() {
        let target = TargetDescriptor::new("", "v1", "ConfigMap", "default").with_name("zzz");
        let err = resolve(&store(), &target).unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "getting migration target ConfigMap default/zzz: not found"
        );
    }

    #[test]
    fn test_fleet_filters_type_and_namespace() {
        let target = TargetDescriptor::new("", "v1", "ConfigMap", "default");
        let names: Vec<_> = resolve(&store(), &target)
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_fleet_is_not_an_error() {
        let target = TargetDescriptor::new("apps", "v1", "Deployment", "default");
        assert!(resolve(&store(), &target).unwrap().is_empty());
    }
}
