//! Patch engine: applies ordered patch lists to configuration documents.
//!
//! Three mechanics are supported:
//! - structural patches (RFC 6902 operations),
//! - merge patches (RFC 7396 partial documents),
//! - expression patches (dotted keys assigned from evaluated expressions).
//!
//! The engine always works on a private copy of the input document, so a
//! failed chain never alters the caller's value.

pub mod diff;
pub mod expression;
pub mod merge;
pub mod path;
pub mod structural;

pub use diff::{diff_string, merge_diff};
pub use expression::ExpressionEvaluator;

use crate::error::Result;
use migrator_lang::ExpressionLibrary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One expression-driven field rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Dotted path of the field to assign; `\.` escapes a literal dot.
    pub key: String,
    /// Expression producing the new string value.
    #[serde(rename = "newValue", alias = "expression")]
    pub expression: String,
}

impl Change {
    pub fn new(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expression: expression.into(),
        }
    }
}

/// A single patch. Exactly one mechanic per patch.
#[derive(Debug, Clone)]
pub enum Patch {
    /// RFC 6902 operations, applied in order.
    Structural(json_patch::Patch),
    /// RFC 7396 merge document.
    Merge(Value),
    /// Batch of expression changes evaluated against one snapshot.
    Expression(Vec<Change>),
}

impl Patch {
    /// The canonical `type` name of this patch.
    pub fn type_name(&self) -> &'static str {
        match self {
            Patch::Structural(_) => "structural",
            Patch::Merge(_) => "merge",
            Patch::Expression(_) => "expression",
        }
    }
}

/// Applies patch lists, carrying the expression libraries used by
/// expression patches.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    evaluator: ExpressionEvaluator,
}

impl PatchEngine {
    pub fn new(libraries: Vec<Arc<dyn ExpressionLibrary>>) -> Self {
        Self {
            evaluator: ExpressionEvaluator::new(libraries),
        }
    }

    /// Apply `patches` in order to a copy of `doc`. Each patch sees the
    /// output of the previous one; the first failure aborts the chain.
    pub fn apply(&self, doc: &Value, patches: &[Patch]) -> Result<Value> {
        let mut current = doc.clone();

        for (index, patch) in patches.iter().enumerate() {
            debug!(index, patch_type = patch.type_name(), "Applying patch");
            match patch {
                Patch::Structural(operations) => structural::apply(&mut current, operations)?,
                Patch::Merge(document) => merge::apply(&mut current, document),
                Patch::Expression(changes) => {
                    current = self.evaluator.evaluate(&current, changes)?;
                }
            }
        }

        Ok(current)
    }
}

/// Apply `patches` to a copy of `doc` with the given extension libraries.
pub fn apply_patches(
    doc: &Value,
    patches: &[Patch],
    libraries: &[Arc<dyn ExpressionLibrary>],
) -> Result<Value> {
    PatchEngine::new(libraries.to_vec()).apply(doc, patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config_map() -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "test-cm", "namespace": "default"},
            "data": {"testing": "test", "tested": "this-value"}
        })
    }

    fn structural(ops: Value) -> Patch {
        Patch::Structural(serde_json::from_value(ops).unwrap())
    }

    #[test]
    fn test_empty_patch_list_is_identity() {
        let doc = config_map();
        assert_eq!(apply_patches(&doc, &[], &[]).unwrap(), doc);
    }

    #[test]
    fn test_sequential_composition() {
        let doc = config_map();
        let p1 = structural(json!([{"op": "replace", "path": "/data/testing", "value": "one"}]));
        let p2 = Patch::Expression(vec![Change::new("data.copy", "resource.data.testing")]);

        let both = apply_patches(&doc, &[p1.clone(), p2.clone()], &[]).unwrap();
        let stepwise = apply_patches(&apply_patches(&doc, &[p1], &[]).unwrap(), &[p2], &[]).unwrap();
        assert_eq!(both, stepwise);
        assert_eq!(both["data"]["copy"], json!("one"));
    }

    #[test]
    fn test_mixed_mechanics_chain() {
        let doc = config_map();
        let patches = vec![
            Patch::Merge(json!({"data": {"tested": null, "merged": "yes"}})),
            structural(json!([{"op": "add", "path": "/data/added", "value": "op"}])),
            Patch::Expression(vec![Change::new(
                "metadata.labels.app",
                "resource.data.merged + '-' + resource.data.added",
            )]),
        ];
        let result = apply_patches(&doc, &patches, &[]).unwrap();
        assert_eq!(
            result["data"],
            json!({"testing": "test", "merged": "yes", "added": "op"})
        );
        assert_eq!(result["metadata"]["labels"]["app"], json!("yes-op"));
    }

    #[test]
    fn test_failure_leaves_input_untouched() {
        let doc = config_map();
        let before = doc.clone();
        let patches = vec![
            Patch::Merge(json!({"data": {"testing": "changed"}})),
            structural(json!([{"op": "remove", "path": "/data/missing"}])),
        ];
        let err = apply_patches(&doc, &patches, &[]).unwrap_err();
        assert!(matches!(err, Error::PatchApply { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_change_text_form_uses_new_value() {
        let change: Change =
            serde_json::from_value(json!({"key": "data.testing", "newValue": "'x'"})).unwrap();
        assert_eq!(change, Change::new("data.testing", "'x'"));
        let alias: Change =
            serde_json::from_value(json!({"key": "data.testing", "expression": "'x'"})).unwrap();
        assert_eq!(alias, change);
    }
}
