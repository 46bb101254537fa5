//! Core error types.

use crate::resource::{ObjectKey, TypeDescriptor};
use crate::store::StoreError;
use migrator_lang::{CheckError, EnvError, EvalError, ParseError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, patching or running migrations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed migration definition.
    #[error("parsing migration {}: {message}", file.display())]
    Parse {
        /// File the definition was read from.
        file: PathBuf,
        /// 1-based line of the problem, when known.
        line: Option<usize>,
        /// 1-based column of the problem, when known.
        column: Option<usize>,
        /// Decoder message.
        message: String,
    },

    /// A single-object migration named an object that does not exist.
    #[error("getting migration target {} {key}: not found", target.kind)]
    TargetNotFound {
        target: TypeDescriptor,
        key: ObjectKey,
    },

    /// `type` of a patch is not one of the recognised values.
    #[error("unknown patch type {0:?}")]
    UnknownPatchType(String),

    /// Patch payload is missing, duplicated or malformed.
    #[error("decoding {patch_type} patch: {message}")]
    PatchDecode { patch_type: String, message: String },

    /// A structural operation's precondition failed.
    #[error("patch operation {operation} failed at path {path}: {reason}")]
    PatchApply {
        /// Index of the failing operation.
        operation: usize,
        /// JSON pointer of the failing operation.
        path: String,
        reason: String,
    },

    /// An expression change has an empty key.
    #[error("path cannot be empty")]
    EmptyChangeKey {
        /// Position of the change in its batch.
        index: usize,
    },

    /// The expression environment could not be assembled.
    #[error("failed to setup expression environment: {0}")]
    Environment(#[from] EnvError),

    #[error("failed to parse expression {expression:?}: {source}")]
    ExpressionSyntax {
        expression: String,
        #[source]
        source: ParseError,
    },

    #[error("expression {expression} check failed: {source}")]
    ExpressionType {
        expression: String,
        #[source]
        source: CheckError,
    },

    /// The expression produced a value that is not a string.
    #[error("expression {expression:?} did not evaluate to a string")]
    EvaluationType {
        expression: String,
        /// Type name of the value actually produced.
        found: String,
    },

    #[error("expression {expression} failed to evaluate: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },

    /// A dotted path could not be assigned in the document.
    #[error("setting {path}: {reason}")]
    PathAssignment { path: String, reason: String },

    /// A patch rewrote `apiVersion`, `kind`, `metadata.name` or
    /// `metadata.namespace`.
    #[error("migration may not change the identity of {} {key} (patched to {found})", target.kind)]
    IdentityChanged {
        target: TypeDescriptor,
        key: ObjectKey,
        found: String,
    },

    /// The object changed in the store since it was fetched.
    #[error("conflict writing {} {key}: object was modified concurrently", target.kind)]
    Conflict {
        target: TypeDescriptor,
        key: ObjectKey,
    },

    /// Object store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Filesystem failure.
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Context wrapper naming the migration and target that failed.
    #[error("migration {migration} ({}) on {target}: {source}", filename.display())]
    Migration {
        migration: String,
        filename: PathBuf,
        target: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The innermost error, looking through [`Error::Migration`] wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Migration { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_not_found_message() {
        let err = Error::TargetNotFound {
            target: TypeDescriptor::new("", "v1", "Service"),
            key: ObjectKey::new("default", "testing"),
        };
        assert_eq!(
            err.to_string(),
            "getting migration target Service default/testing: not found"
        );
    }

    #[test]
    fn test_root_unwraps_context() {
        let err = Error::Migration {
            migration: "test-migration".to_string(),
            filename: PathBuf::from("testdata/0001.yaml"),
            target: "Service default/testing".to_string(),
            source: Box::new(Error::EmptyChangeKey { index: 0 }),
        };
        assert!(matches!(err.root(), Error::EmptyChangeKey { index: 0 }));
        assert_eq!(
            err.to_string(),
            "migration test-migration (testdata/0001.yaml) on Service default/testing: path cannot be empty"
        );
    }
}
