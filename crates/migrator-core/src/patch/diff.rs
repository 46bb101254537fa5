//! Merge-patch shaped diffs between two documents.

use serde_json::{Map, Value};

/// Compute the RFC 7396 merge patch that turns `before` into `after`.
///
/// Keys missing from `after` become `null`, nested objects are diffed
/// recursively and every other changed value is carried whole. A `null`
/// stored inside `after` cannot be expressed in a merge patch and reads
/// back as a deletion.
pub fn merge_diff(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            let mut patch = Map::new();
            for key in old.keys() {
                if !new.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            for (key, new_value) in new {
                match old.get(key) {
                    Some(old_value) if old_value == new_value => {}
                    Some(old_value) if old_value.is_object() && new_value.is_object() => {
                        patch.insert(key.clone(), merge_diff(old_value, new_value));
                    }
                    _ => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            Value::Object(patch)
        }
        _ => after.clone(),
    }
}

/// [`merge_diff`] rendered as compact JSON.
pub fn diff_string(before: &Value, after: &Value) -> String {
    merge_diff(before, after).to_string()
}

/// Whether a diff describes no change at all.
pub fn is_empty(diff: &Value) -> bool {
    matches!(diff, Value::Object(map) if map.is_empty())
}
