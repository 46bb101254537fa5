//! Error types for parsing, checking and evaluating expressions.

use crate::span::{render_snippet, Span};
use thiserror::Error;

/// Error during lexing/parsing.
#[derive(Debug, Error)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// Source span where the error occurred.
    pub span: Span,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Add a hint to the error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with source context.
    pub fn format_with_source(&self, source: &str) -> String {
        let mut result = format!("error: {}\n", self.message);
        result.push_str(&render_snippet(source, self.span));
        if let Some(hint) = &self.hint {
            result.push_str(&format!("   = hint: {}\n", hint));
        }
        result
    }
}

/// Error raised by the static type checker.
#[derive(Debug, Error)]
pub struct CheckError {
    /// The error message.
    pub message: String,
    /// Source span where the error occurred.
    pub span: Span,
    /// Error kind for programmatic handling.
    pub kind: CheckErrorKind,
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Kinds of check errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckErrorKind {
    /// Reference to a variable that was never declared.
    UndeclaredReference,
    /// Call to a function with no declaration.
    UnknownFunction,
    /// No overload accepts the argument types.
    NoMatchingOverload,
    /// Operand type does not fit the operator.
    TypeMismatch,
}

impl CheckError {
    /// Create a new check error.
    pub fn new(message: impl Into<String>, span: Span, kind: CheckErrorKind) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
        }
    }

    /// Create an undeclared reference error.
    pub fn undeclared(name: &str, span: Span) -> Self {
        Self::new(
            format!("undeclared reference to '{}'", name),
            span,
            CheckErrorKind::UndeclaredReference,
        )
    }

    /// Create an unknown function error.
    pub fn unknown_function(name: &str, span: Span) -> Self {
        Self::new(
            format!("undeclared reference to function '{}'", name),
            span,
            CheckErrorKind::UnknownFunction,
        )
    }

    /// Create a no matching overload error.
    pub fn no_overload(name: &str, args: &str, span: Span) -> Self {
        Self::new(
            format!("found no matching overload for '{}' applied to ({})", name, args),
            span,
            CheckErrorKind::NoMatchingOverload,
        )
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: &str, got: &str, span: Span) -> Self {
        Self::new(
            format!("type mismatch: expected {}, got {}", expected, got),
            span,
            CheckErrorKind::TypeMismatch,
        )
    }

    /// Format the error with source context.
    pub fn format_with_source(&self, source: &str) -> String {
        let mut result = format!("error[{:?}]: {}\n", self.kind, self.message);
        result.push_str(&render_snippet(source, self.span));
        result
    }
}

/// Error raised while evaluating a compiled program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no such key: {0}")]
    NoSuchKey(String),

    #[error("index out of bounds: {index} (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulus by zero")]
    ModulusByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("no such overload: {function}({args})")]
    NoSuchOverload { function: String, args: String },

    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("{function}: {message}")]
    Function { function: String, message: String },
}

impl EvalError {
    /// Create an error reported by a library function.
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Error while assembling an environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("variable '{0}' declared twice")]
    DuplicateVariable(String),

    #[error("overload '{0}' declared twice")]
    DuplicateOverload(String),

    #[error("function '{0}' conflicts with a declared variable")]
    FunctionShadowsVariable(String),
}

/// A combined error type for compiling an expression.
#[derive(Debug, Error)]
pub enum LangError {
    /// Parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// Check error.
    #[error("check error: {0}")]
    Check(#[from] CheckError),
}

impl LangError {
    /// Format the error with source context.
    pub fn format_with_source(&self, source: &str) -> String {
        match self {
            LangError::Parse(e) => e.format_with_source(source),
            LangError::Check(e) => e.format_with_source(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_with_hint() {
        let err = ParseError::new("unexpected identifier 'is'", Span::new(5, 7))
            .with_hint("quote strings");
        let formatted = err.format_with_source("this is migrated");
        assert!(formatted.starts_with("error: unexpected identifier 'is'\n"));
        assert!(formatted.contains("line 1:6"));
        assert!(formatted.contains("^~"));
        assert!(formatted.ends_with("   = hint: quote strings\n"));
    }

    #[test]
    fn test_check_error_kind_in_output() {
        let err = CheckError::undeclared("this", Span::new(0, 4));
        assert_eq!(err.kind, CheckErrorKind::UndeclaredReference);
        assert!(err
            .format_with_source("this")
            .starts_with("error[UndeclaredReference]: undeclared reference to 'this'"));
    }

    #[test]
    fn test_lang_error_display() {
        let err: LangError = CheckError::type_mismatch("bool", "string", Span::new(0, 1)).into();
        assert_eq!(
            err.to_string(),
            "check error: type mismatch: expected bool, got string"
        );
    }
}
