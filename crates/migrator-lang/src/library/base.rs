//! Size, conversion and substring-test functions.

use super::{bytes_arg, int_arg, string_arg};
use crate::env::{ExpressionLibrary, FunctionDecl, Overload};
use crate::error::EvalError;
use crate::types::Type;
use crate::value::Value;

/// Baseline functions: `size`, `string`, `int`, `double`, `bytes`,
/// `contains`, `startsWith`, `endsWith`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreLibrary;

fn size_of(args: &[Value]) -> Result<Value, EvalError> {
    let len = match args.first() {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Bytes(b)) => b.len(),
        Some(Value::List(items)) => items.len(),
        Some(Value::Map(fields)) => fields.len(),
        Some(other) => {
            return Err(EvalError::function(
                "size",
                format!("unsupported type {}", other.type_name()),
            ))
        }
        None => return Err(EvalError::function("size", "missing argument 0")),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| EvalError::Overflow)
}

fn sized() -> [Type; 4] {
    [
        Type::String,
        Type::Bytes,
        Type::list(Type::Dyn),
        Type::map(Type::Dyn, Type::Dyn),
    ]
}

fn size_decl() -> FunctionDecl {
    let names = ["string", "bytes", "list", "map"];
    let mut decl = FunctionDecl::new("size");
    for (name, ty) in names.iter().zip(sized()) {
        decl = decl
            .overload(Overload::global(
                format!("size_{}", name),
                vec![ty.clone()],
                Type::Int,
                size_of,
            ))
            .overload(Overload::member(
                format!("{}_size", name),
                vec![ty],
                Type::Int,
                size_of,
            ));
    }
    decl
}

fn string_decl() -> FunctionDecl {
    FunctionDecl::new("string")
        .overload(Overload::global(
            "string_to_string",
            vec![Type::String],
            Type::String,
            |args| Ok(Value::from(string_arg("string", args, 0)?)),
        ))
        .overload(Overload::global(
            "int_to_string",
            vec![Type::Int],
            Type::String,
            |args| Ok(Value::from(int_arg("string", args, 0)?.to_string())),
        ))
        .overload(Overload::global(
            "double_to_string",
            vec![Type::Double],
            Type::String,
            |args| match args.first() {
                Some(Value::Double(d)) => Ok(Value::from(d.to_string())),
                _ => Err(EvalError::function("string", "expected double argument")),
            },
        ))
        .overload(Overload::global(
            "bool_to_string",
            vec![Type::Bool],
            Type::String,
            |args| match args.first() {
                Some(Value::Bool(b)) => Ok(Value::from(b.to_string())),
                _ => Err(EvalError::function("string", "expected bool argument")),
            },
        ))
        .overload(Overload::global(
            "bytes_to_string",
            vec![Type::Bytes],
            Type::String,
            |args| {
                let bytes = bytes_arg("string", args, 0)?;
                String::from_utf8(bytes.to_vec())
                    .map(Value::String)
                    .map_err(|e| EvalError::function("string", e.to_string()))
            },
        ))
}

fn int_decl() -> FunctionDecl {
    FunctionDecl::new("int")
        .overload(Overload::global(
            "int_to_int",
            vec![Type::Int],
            Type::Int,
            |args| Ok(Value::Int(int_arg("int", args, 0)?)),
        ))
        .overload(Overload::global(
            "string_to_int",
            vec![Type::String],
            Type::Int,
            |args| {
                let s = string_arg("int", args, 0)?;
                s.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| EvalError::function("int", format!("'{}': {}", s, e)))
            },
        ))
        .overload(Overload::global(
            "double_to_int",
            vec![Type::Double],
            Type::Int,
            |args| match args.first() {
                Some(Value::Double(d)) if d.is_finite() && d.abs() < 9.223_372_036_854_775e18 => {
                    Ok(Value::Int(d.trunc() as i64))
                }
                Some(Value::Double(d)) => Err(EvalError::function(
                    "int",
                    format!("{} is out of integer range", d),
                )),
                _ => Err(EvalError::function("int", "expected double argument")),
            },
        ))
}

fn double_decl() -> FunctionDecl {
    FunctionDecl::new("double")
        .overload(Overload::global(
            "double_to_double",
            vec![Type::Double],
            Type::Double,
            |args| match args.first() {
                Some(Value::Double(d)) => Ok(Value::Double(*d)),
                _ => Err(EvalError::function("double", "expected double argument")),
            },
        ))
        .overload(Overload::global(
            "int_to_double",
            vec![Type::Int],
            Type::Double,
            |args| Ok(Value::Double(int_arg("double", args, 0)? as f64)),
        ))
        .overload(Overload::global(
            "string_to_double",
            vec![Type::String],
            Type::Double,
            |args| {
                let s = string_arg("double", args, 0)?;
                s.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|e| EvalError::function("double", format!("'{}': {}", s, e)))
            },
        ))
}

fn bytes_decl() -> FunctionDecl {
    FunctionDecl::new("bytes")
        .overload(Overload::global(
            "bytes_to_bytes",
            vec![Type::Bytes],
            Type::Bytes,
            |args| Ok(Value::Bytes(bytes_arg("bytes", args, 0)?.to_vec())),
        ))
        .overload(Overload::global(
            "string_to_bytes",
            vec![Type::String],
            Type::Bytes,
            |args| Ok(Value::Bytes(string_arg("bytes", args, 0)?.as_bytes().to_vec())),
        ))
}

fn string_test(name: &'static str, id: &str, test: fn(&str, &str) -> bool) -> FunctionDecl {
    FunctionDecl::new(name).overload(Overload::member(
        id,
        vec![Type::String, Type::String],
        Type::Bool,
        move |args| {
            let subject = string_arg(name, args, 0)?;
            let needle = string_arg(name, args, 1)?;
            Ok(Value::Bool(test(subject, needle)))
        },
    ))
}

impl ExpressionLibrary for CoreLibrary {
    fn name(&self) -> &str {
        "core"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        vec![
            size_decl(),
            string_decl(),
            int_decl(),
            double_decl(),
            bytes_decl(),
            string_test("contains", "contains_string", |s, n| s.contains(n)),
            string_test("startsWith", "starts_with_string", |s, n| s.starts_with(n)),
            string_test("endsWith", "ends_with_string", |s, n| s.ends_with(n)),
        ]
    }
}
