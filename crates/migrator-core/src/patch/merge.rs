//! Merge (RFC 7396) patch application.

use serde_json::Value;

/// Merge `patch` into `doc`: objects merge recursively, `null` deletes a
/// key, and anything else replaces the target value.
pub fn apply(doc: &mut Value, patch: &Value) {
    json_patch::merge(doc, patch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_merge_nested_objects() {
        let mut doc = json!({"spec": {"ports": [{"port": 80}], "selector": {"app": "a"}}});
        apply(&mut doc, &json!({"spec": {"selector": {"tier": "web"}}}));
        assert_eq!(
            doc,
            json!({"spec": {"ports": [{"port": 80}], "selector": {"app": "a", "tier": "web"}}})
        );
    }

    #[test]
    fn test_null_deletes_key() {
        let mut doc = json!({"data": {"testing": "test", "tested": "this-value"}});
        apply(&mut doc, &json!({"data": {"tested": null}}));
        assert_eq!(doc, json!({"data": {"testing": "test"}}));
    }

    #[test]
    fn test_arrays_are_replaced_whole() {
        let mut doc = json!({"ports": [{"port": 80}, {"port": 443}]});
        apply(&mut doc, &json!({"ports": [{"port": 81}]}));
        assert_eq!(doc, json!({"ports": [{"port": 81}]}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let mut doc = json!({"a": {"b": 1}});
        apply(&mut doc, &json!({"a": "flat"}));
        assert_eq!(doc, json!({"a": "flat"}));
    }
}
