//! Dotted-path assignment into JSON documents.
//!
//! A path such as `metadata.labels.tier` names nested object keys. A
//! backslash escapes the next character, so `metadata.annotations.example\.com/owner`
//! addresses the single key `example.com/owner`. Numeric segments index
//! arrays; `-1` or an index equal to the array length appends, and an
//! index past that is rejected.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Split a dotted path into its segments, honouring `\` escapes.
pub fn split_path(path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            '.' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(Error::PathAssignment {
            path: path.to_string(),
            reason: "path contains an empty segment".to_string(),
        });
    }
    Ok(segments)
}

/// Assign `value` at `path` inside `doc`, creating intermediate containers.
///
/// Scalar intermediates are replaced by a container.
pub fn set(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = split_path(path)?;
    let mut current = doc;
    for segment in &segments {
        current = slot(current, segment, path)?;
    }
    *current = value;
    Ok(())
}

fn slot<'a>(current: &'a mut Value, segment: &str, path: &str) -> Result<&'a mut Value> {
    match current {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = array_index(segment, items.len()).ok_or_else(|| Error::PathAssignment {
                path: path.to_string(),
                reason: format!("cannot index an array with key {segment:?}"),
            })?;
            if index > items.len() {
                return Err(Error::PathAssignment {
                    path: path.to_string(),
                    reason: format!(
                        "index {index} is past the end of an array of length {}",
                        items.len()
                    ),
                });
            }
            if index == items.len() {
                items.push(Value::Null);
            }
            Ok(&mut items[index])
        }
        other => {
            *other = if array_index(segment, 0).is_some() {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
            slot(other, segment, path)
        }
    }
}

fn array_index(segment: &str, len: usize) -> Option<usize> {
    if segment == "-1" {
        return Some(len);
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}
