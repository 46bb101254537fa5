//! Expression patch evaluation.
//!
//! A batch of [`Change`]s is evaluated against one read-only snapshot of
//! the document: every expression sees the document as it was before the
//! batch, never the effect of an earlier change in the same batch. All
//! expressions are compiled and evaluated before any field is assigned, so
//! a failing change leaves the document untouched.

use super::{path, Change};
use crate::error::{Error, Result};
use migrator_lang::{
    Activation, Env, EnvBuilder, ExpressionLibrary, LangError, Program, Type, Value,
};
use serde_json::Value as Json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the variable bound to the document snapshot.
pub const RESOURCE_VARIABLE: &str = "resource";

/// Evaluates expression batches with a caller-chosen set of extension
/// libraries on top of the standard ones.
#[derive(Clone, Default)]
pub struct ExpressionEvaluator {
    libraries: Vec<Arc<dyn ExpressionLibrary>>,
}

impl fmt::Debug for ExpressionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionEvaluator")
            .field(
                "libraries",
                &self.libraries.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ExpressionEvaluator {
    pub fn new(libraries: Vec<Arc<dyn ExpressionLibrary>>) -> Self {
        Self { libraries }
    }

    /// Build a fresh environment declaring `resource` and every library.
    pub fn environment(&self) -> Result<Env> {
        Ok(EnvBuilder::standard()
            .variable(RESOURCE_VARIABLE, Type::document())
            .libraries(self.libraries.iter().cloned())
            .build()?)
    }

    /// Evaluate `changes` against `doc` and return the rewritten copy.
    ///
    /// Assignments happen in declaration order, so when two keys overlap
    /// the later change wins.
    pub fn evaluate(&self, doc: &Json, changes: &[Change]) -> Result<Json> {
        if let Some(index) = changes.iter().position(|c| c.key.is_empty()) {
            return Err(Error::EmptyChangeKey { index });
        }

        let env = self.environment()?;
        let programs = changes
            .iter()
            .map(|change| compile(&env, &change.expression))
            .collect::<Result<Vec<_>>>()?;

        let activation = Activation::new().bind(RESOURCE_VARIABLE, Value::from_json(doc));
        let mut assignments = Vec::with_capacity(changes.len());
        for (change, program) in changes.iter().zip(&programs) {
            let value = program.eval(&activation).map_err(|source| Error::Evaluation {
                expression: change.expression.clone(),
                source,
            })?;
            match value {
                Value::String(s) => assignments.push((change.key.as_str(), s)),
                other => {
                    return Err(Error::EvaluationType {
                        expression: change.expression.clone(),
                        found: other.type_name().to_string(),
                    })
                }
            }
        }

        let mut result = doc.clone();
        for (key, value) in assignments {
            debug!(key, "Assigning expression result");
            path::set(&mut result, key, Json::String(value))?;
        }
        Ok(result)
    }
}

fn compile(env: &Env, expression: &str) -> Result<Program> {
    let program = env.compile(expression).map_err(|e| match e {
        LangError::Parse(source) => Error::ExpressionSyntax {
            expression: expression.to_string(),
            source,
        },
        LangError::Check(source) => Error::ExpressionType {
            expression: expression.to_string(),
            source,
        },
    })?;

    if !Type::String.is_assignable_from(program.result_type()) {
        return Err(Error::EvaluationType {
            expression: expression.to_string(),
            found: program.result_type().to_string(),
        });
    }
    Ok(program)
}
