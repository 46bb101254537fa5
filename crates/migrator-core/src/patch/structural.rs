//! Structural (RFC 6902) patch application.

use crate::error::{Error, Result};
use serde_json::Value;

/// Apply every operation to `doc` in order.
///
/// The first operation whose precondition fails (missing path, failed
/// `test`) aborts with [`Error::PatchApply`] naming its path.
pub fn apply(doc: &mut Value, operations: &json_patch::Patch) -> Result<()> {
    json_patch::patch(doc, &operations.0).map_err(|e| Error::PatchApply {
        operation: e.operation,
        path: e.path.to_string(),
        reason: e.kind.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn service() -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "testing", "namespace": "default"},
            "spec": {
                "ports": [{"name": "http-80", "port": 80, "protocol": "TCP", "targetPort": 9376}],
                "selector": {"app.kubernetes.io/name": "MyApp"}
            }
        })
    }

    fn ops(value: Value) -> json_patch::Patch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_replace_port() {
        let mut doc = service();
        apply(
            &mut doc,
            &ops(json!([{"op": "replace", "path": "/spec/ports/0/port", "value": 81}])),
        )
        .unwrap();
        assert_eq!(doc["spec"]["ports"][0]["port"], json!(81));
    }

    #[test]
    fn test_all_operation_kinds() {
        let mut doc = service();
        apply(
            &mut doc,
            &ops(json!([
                {"op": "test", "path": "/spec/ports/0/protocol", "value": "TCP"},
                {"op": "add", "path": "/spec/type", "value": "ClusterIP"},
                {"op": "copy", "from": "/spec/type", "path": "/metadata/labels"},
                {"op": "move", "from": "/metadata/labels", "path": "/metadata/annotations"},
                {"op": "remove", "path": "/spec/selector"}
            ])),
        )
        .unwrap();
        assert_eq!(doc["spec"]["type"], json!("ClusterIP"));
        assert_eq!(doc["metadata"]["annotations"], json!("ClusterIP"));
        assert!(doc["metadata"].get("labels").is_none());
        assert!(doc["spec"].get("selector").is_none());
    }

    #[test]
    fn test_missing_path_names_path() {
        let mut doc = service();
        let err = apply(
            &mut doc,
            &ops(json!([{"op": "replace", "path": "/spec/sports/0/port", "value": 81}])),
        )
        .unwrap_err();
        match err {
            Error::PatchApply { operation, path, .. } => {
                assert_eq!(operation, 0);
                assert_eq!(path, "/spec/sports/0/port");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remove_missing_reports_path() {
        let mut doc = service();
        let err = apply(&mut doc, &ops(json!([{"op": "remove", "path": "/spec/missing"}])))
            .unwrap_err();
        assert!(err.to_string().contains("/spec/missing"));
    }

    #[test]
    fn test_failed_test_operation() {
        let mut doc = service();
        let err = apply(
            &mut doc,
            &ops(json!([{"op": "test", "path": "/spec/ports/0/port", "value": 443}])),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchApply { .. }));
    }
}
