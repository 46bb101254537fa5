//! Configuration objects and the identities used to address them.

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Group, version and kind of an object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// API group; empty for the core group.
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl TypeDescriptor {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Split an `apiVersion` such as `apps/v1` or `v1`.
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` string for this type.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Namespace and name of an object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ObjectKey {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// A configuration object: a JSON object with `apiVersion`, `kind` and
/// `metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    object: Map<String, Value>,
}

impl Resource {
    /// Wrap a JSON value, which must be an object with a `kind` and a
    /// `metadata.name`.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let Value::Object(object) = value else {
            return Err(StoreError::Codec(format!(
                "configuration object must be a map, got {}",
                json_type(&value)
            )));
        };
        let resource = Self { object };
        if resource.kind().is_empty() {
            return Err(StoreError::Codec("object has no kind".to_string()));
        }
        if resource.name().is_empty() {
            return Err(StoreError::Codec("object has no metadata.name".to_string()));
        }
        Ok(resource)
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.object
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
    }

    pub fn api_version(&self) -> &str {
        self.object
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name").unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace").unwrap_or_default()
    }

    /// Version stamped by the store on the last write.
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata_str("resourceVersion")
    }

    /// Replace `metadata.resourceVersion`.
    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        let metadata = self
            .object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(metadata) = metadata {
            metadata.insert("resourceVersion".to_string(), Value::String(version.into()));
        }
    }

    pub fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::from_api_version(self.api_version(), self.kind())
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    /// `Kind namespace/name`, used in diagnostics.
    pub fn identity(&self) -> String {
        format!("{} {}", self.kind(), self.key())
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.object.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

impl TryFrom<Value> for Resource {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Resource::from_value(value)
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        resource.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_descriptor_api_version() {
        let core = TypeDescriptor::from_api_version("v1", "Service");
        assert_eq!(core, TypeDescriptor::new("", "v1", "Service"));
        assert_eq!(core.api_version(), "v1");
        assert_eq!(core.to_string(), "v1, Kind=Service");

        let apps = TypeDescriptor::from_api_version("apps/v1", "Deployment");
        assert_eq!(apps.group, "apps");
        assert_eq!(apps.api_version(), "apps/v1");
    }

    #[test]
    fn test_object_key_display() {
        assert_eq!(ObjectKey::new("default", "testing").to_string(), "default/testing");
        assert_eq!(ObjectKey::new("", "cluster-thing").to_string(), "cluster-thing");
    }

    #[test]
    fn test_resource_accessors() {
        let mut resource = Resource::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "test-cm", "namespace": "default"},
        }))
        .unwrap();
        assert_eq!(resource.identity(), "ConfigMap default/test-cm");
        assert_eq!(resource.resource_version(), None);

        resource.set_resource_version("7");
        assert_eq!(resource.resource_version(), Some("7"));
    }

    #[test]
    fn test_resource_rejects_non_objects() {
        assert!(matches!(
            Resource::from_value(json!(["not", "an", "object"])),
            Err(StoreError::Codec(_))
        ));
        assert!(Resource::from_value(json!({"kind": "ConfigMap", "metadata": {}})).is_err());
    }
}
