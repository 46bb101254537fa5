//! Static types used by the checker.

use std::fmt;

/// A static expression type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Unknown until runtime; assignable to and from anything.
    Dyn,
    Null,
    Bool,
    Int,
    Double,
    String,
    Bytes,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
}

impl Type {
    /// `list(elem)`.
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    /// `map(key, value)`.
    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// The type of parsed configuration documents: `map(string, dyn)`.
    pub fn document() -> Self {
        Type::map(Type::String, Type::Dyn)
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Type::Dyn)
    }

    /// Whether a value of type `other` may be used where `self` is expected.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Dyn, _) | (_, Type::Dyn) => true,
            (Type::List(a), Type::List(b)) => a.is_assignable_from(b),
            (Type::Map(ka, va), Type::Map(kb, vb)) => {
                ka.is_assignable_from(kb) && va.is_assignable_from(vb)
            }
            (a, b) => a == b,
        }
    }

    /// The narrowest type covering both `self` and `other`.
    pub fn join(&self, other: &Type) -> Type {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Type::List(a), Type::List(b)) => Type::list(a.join(b)),
            (Type::Map(ka, va), Type::Map(kb, vb)) => Type::map(ka.join(kb), va.join(vb)),
            _ => Type::Dyn,
        }
    }

    /// Whether the type is `int`, `double`, or possibly one of them.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double | Type::Dyn)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dyn => write!(f, "dyn"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::List(elem) => write!(f, "list({})", elem),
            Type::Map(key, value) => write!(f, "map({}, {})", key, value),
        }
    }
}

/// Render a list of types as `a, b, c` for diagnostics.
pub(crate) fn describe_all(types: &[Type]) -> String {
    types
        .iter()
        .map(Type::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
