//! Migrator Expression Language
//!
//! A small, sandboxed expression language in the style of CEL, used by
//! expression patches to compute new field values from a snapshot of the
//! document being migrated.
//!
//! # Syntax
//!
//! ```text
//! 'this is migrated'
//! resource.data.tested
//! resource.metadata.name + '-' + string(resource.spec.ports[0].port)
//! has(resource.data.owner) ? resource.data.owner : 'nobody'
//! resource.data.tested.upperAscii().replace('-', '_')
//! base64.encode(bytes(resource.metadata.name))
//! ```
//!
//! # Usage
//!
//! ```rust
//! use migrator_lang::{Activation, EnvBuilder, Type, Value};
//!
//! let env = EnvBuilder::standard()
//!     .variable("resource", Type::document())
//!     .build()
//!     .unwrap();
//! let program = env.compile("resource.kind + '/v2'").unwrap();
//!
//! let doc = serde_json::json!({"kind": "ConfigMap"});
//! let activation = Activation::new().bind("resource", Value::from_json(&doc));
//! assert_eq!(program.eval(&activation).unwrap(), Value::from("ConfigMap/v2"));
//! ```

pub mod ast;
mod checker;
pub mod env;
pub mod error;
pub mod eval;
pub mod ext;
pub mod lexer;
pub mod library;
pub mod parser;
pub mod span;
pub mod types;
pub mod value;

// Re-export main types
pub use env::{Env, EnvBuilder, ExpressionLibrary, FunctionDecl, Implementation, Overload, Program};
pub use error::{CheckError, CheckErrorKind, EnvError, EvalError, LangError, ParseError};
pub use eval::Activation;
pub use ext::{DirectoryLibrary, DirectoryResolver, StaticDirectory};
pub use library::{CoreLibrary, EncodersLibrary, StringsLibrary};
pub use span::{Location, Span};
pub use types::Type;
pub use value::Value;

/// Parse a source string into an AST without type checking.
///
/// # Example
///
/// ```rust
/// use migrator_lang::parse;
///
/// let expr = parse("resource.data.tested").unwrap();
/// assert_eq!(expr.qualified_name().as_deref(), Some("resource.data.tested"));
/// ```
pub fn parse(source: &str) -> Result<ast::Expr, ParseError> {
    parser::parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_end_to_end_with_extension() {
        let directory = StaticDirectory::new().fallback([("guid", "27f7c407-99d7-4c5a-8ebd-206a5c2e3f3d")]);
        let env = EnvBuilder::standard()
            .variable("resource", Type::document())
            .library(Arc::new(DirectoryLibrary::new(Arc::new(directory))))
            .build()
            .unwrap();

        let doc = serde_json::json!({"metadata": {"name": "u-b4qkhsnliz"}});
        let activation = Activation::new().bind("resource", Value::from_json(&doc));

        let program = env
            .compile("'local://' + resource.metadata.name")
            .unwrap();
        assert_eq!(
            program.eval(&activation).unwrap(),
            Value::from("local://u-b4qkhsnliz")
        );

        let program = env
            .compile("directory.lookup('testuser@example.com').guid")
            .unwrap();
        assert_eq!(program.result_type(), &Type::Dyn);
        assert_eq!(
            program.eval(&activation).unwrap(),
            Value::from("27f7c407-99d7-4c5a-8ebd-206a5c2e3f3d")
        );
    }

    #[test]
    fn test_errors_render_with_source() {
        let env = EnvBuilder::standard().build().unwrap();
        let err = env.compile("this is migrated").unwrap_err();
        let rendered = err.format_with_source("this is migrated");
        assert!(rendered.contains("line 1:6"));
        assert!(rendered.contains("hint"));
    }
}
