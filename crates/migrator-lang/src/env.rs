//! Expression environments: declared variables, function overloads, and
//! compiled programs.

use crate::checker::{Checker, Node};
use crate::error::{EnvError, EvalError, LangError};
use crate::eval::{self, Activation};
use crate::library::{CoreLibrary, EncodersLibrary, StringsLibrary};
use crate::parser::parse;
use crate::types::Type;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Native implementation backing an overload. Receiver overloads get the
/// receiver as the first argument.
pub type Implementation = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// One typed signature of a function.
#[derive(Clone)]
pub struct Overload {
    /// Unique overload identifier, e.g. `size_string`.
    pub id: String,
    /// Whether the function is called as `receiver.f(args)`.
    pub receiver: bool,
    /// Parameter types, receiver first when `receiver` is set.
    pub params: Vec<Type>,
    /// Result type.
    pub result: Type,
    /// Native implementation.
    pub implementation: Implementation,
}

impl Overload {
    /// A global overload called as `f(args)`.
    pub fn global<F>(id: impl Into<String>, params: Vec<Type>, result: Type, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            receiver: false,
            params,
            result,
            implementation: Arc::new(f),
        }
    }

    /// A receiver overload called as `target.f(args)`.
    pub fn member<F>(id: impl Into<String>, params: Vec<Type>, result: Type, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Self {
            receiver: true,
            ..Self::global(id, params, result, f)
        }
    }

    pub(crate) fn accepts_types(&self, args: &[Type]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.is_assignable_from(arg))
    }

    pub(crate) fn accepts_values(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(param, arg)| match param {
                Type::Dyn => true,
                Type::List(_) => matches!(arg, Value::List(_)),
                Type::Map(..) => matches!(arg, Value::Map(_)),
                other => &arg.type_of() == other,
            })
    }

    pub(crate) fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.implementation)(args)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("id", &self.id)
            .field("receiver", &self.receiver)
            .field("params", &self.params)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// A named function with its overloads.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// Function name; namespaced functions use dots, e.g. `base64.encode`.
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    /// Add an overload.
    pub fn overload(mut self, overload: Overload) -> Self {
        self.overloads.push(overload);
        self
    }
}

/// A bundle of functions that can be registered with an [`EnvBuilder`].
pub trait ExpressionLibrary: Send + Sync {
    /// Library name, used in diagnostics.
    fn name(&self) -> &str;

    /// Function declarations contributed by this library.
    fn functions(&self) -> Vec<FunctionDecl>;
}

/// Builder for [`Env`].
#[derive(Default, Clone)]
pub struct EnvBuilder {
    variables: Vec<(String, Type)>,
    libraries: Vec<Arc<dyn ExpressionLibrary>>,
}

impl EnvBuilder {
    /// An empty builder with no variables or functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-loaded with the core, strings and encoders libraries.
    pub fn standard() -> Self {
        Self::new()
            .library(Arc::new(CoreLibrary))
            .library(Arc::new(StringsLibrary))
            .library(Arc::new(EncodersLibrary))
    }

    /// Declare a variable.
    pub fn variable(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.variables.push((name.into(), ty));
        self
    }

    /// Register a library.
    pub fn library(mut self, library: Arc<dyn ExpressionLibrary>) -> Self {
        self.libraries.push(library);
        self
    }

    /// Register several libraries in order.
    pub fn libraries<I>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ExpressionLibrary>>,
    {
        self.libraries.extend(libraries);
        self
    }

    /// Build the environment.
    pub fn build(self) -> Result<Env, EnvError> {
        let mut variables = BTreeMap::new();
        for (name, ty) in self.variables {
            if variables.insert(name.clone(), ty).is_some() {
                return Err(EnvError::DuplicateVariable(name));
            }
        }

        let mut functions: BTreeMap<String, Vec<Overload>> = BTreeMap::new();
        let mut ids = BTreeSet::new();
        for library in &self.libraries {
            for decl in library.functions() {
                let root = decl.name.split('.').next().unwrap_or(&decl.name);
                if variables.contains_key(root) {
                    return Err(EnvError::FunctionShadowsVariable(decl.name));
                }
                for overload in &decl.overloads {
                    if !ids.insert(overload.id.clone()) {
                        return Err(EnvError::DuplicateOverload(overload.id.clone()));
                    }
                }
                functions
                    .entry(decl.name)
                    .or_default()
                    .extend(decl.overloads);
            }
        }

        Ok(Env {
            variables,
            functions,
        })
    }
}

/// A checked set of declarations against which expressions are compiled.
#[derive(Debug)]
pub struct Env {
    variables: BTreeMap<String, Type>,
    functions: BTreeMap<String, Vec<Overload>>,
}

impl Env {
    pub fn builder() -> EnvBuilder {
        EnvBuilder::new()
    }

    /// Type of a declared variable.
    pub fn variable_type(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    /// Overloads registered under `name`.
    pub fn overloads(&self, name: &str) -> Option<&[Overload]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    /// Parse and type-check `source`.
    pub fn compile(&self, source: &str) -> Result<Program, LangError> {
        let expr = parse(source)?;
        let (root, result_type) = Checker::new(self).check(&expr)?;
        Ok(Program {
            source: source.to_string(),
            root,
            result_type,
        })
    }
}

/// A compiled expression.
#[derive(Debug)]
pub struct Program {
    source: String,
    root: Node,
    result_type: Type,
}

impl Program {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Statically inferred result type.
    pub fn result_type(&self) -> &Type {
        &self.result_type
    }

    /// Evaluate against the given bindings.
    pub fn eval(&self, activation: &Activation) -> Result<Value, EvalError> {
        eval::evaluate(&self.root, activation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Twice;

    impl ExpressionLibrary for Twice {
        fn name(&self) -> &str {
            "twice"
        }

        fn functions(&self) -> Vec<FunctionDecl> {
            vec![FunctionDecl::new("size").overload(Overload::global(
                "size_string",
                vec![Type::String],
                Type::Int,
                |_| Ok(Value::Int(0)),
            ))]
        }
    }

    #[test]
    fn test_duplicate_overload_rejected() {
        let err = EnvBuilder::standard()
            .library(Arc::new(Twice))
            .build()
            .unwrap_err();
        assert_eq!(err, EnvError::DuplicateOverload("size_string".to_string()));
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let err = Env::builder()
            .variable("resource", Type::Dyn)
            .variable("resource", Type::String)
            .build()
            .unwrap_err();
        assert_eq!(err, EnvError::DuplicateVariable("resource".to_string()));
    }

    #[test]
    fn test_function_namespace_cannot_shadow_variable() {
        let err = EnvBuilder::standard()
            .variable("base64", Type::String)
            .build()
            .unwrap_err();
        assert!(matches!(err, EnvError::FunctionShadowsVariable(_)));
    }

    #[test]
    fn test_compile_and_eval() {
        let env = EnvBuilder::standard()
            .variable("resource", Type::document())
            .build()
            .unwrap();
        let program = env.compile("resource.data.tested + '-suffix'").unwrap();
        assert_eq!(program.result_type(), &Type::String);

        let doc = serde_json::json!({"data": {"tested": "this-value"}});
        let activation = Activation::new().bind("resource", Value::from_json(&doc));
        assert_eq!(
            program.eval(&activation).unwrap(),
            Value::from("this-value-suffix")
        );
    }

    #[test]
    fn test_undeclared_reference_fails_compile() {
        let env = EnvBuilder::standard().build().unwrap();
        assert!(matches!(env.compile("this"), Err(LangError::Check(_))));
        assert!(matches!(
            env.compile("this is migrated"),
            Err(LangError::Parse(_))
        ));
    }
}
