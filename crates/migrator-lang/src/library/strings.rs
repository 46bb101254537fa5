//! String manipulation functions.

use super::{int_arg, list_arg, string_arg};
use crate::env::{ExpressionLibrary, FunctionDecl, Overload};
use crate::error::EvalError;
use crate::types::Type;
use crate::value::Value;

/// String extension functions, mostly called on a string receiver.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringsLibrary;

fn chars_of(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Convert a code point index argument to `usize`, bounded by `len`.
fn position(function: &str, index: i64, len: usize) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i <= len)
        .ok_or_else(|| EvalError::IndexOutOfBounds { index, len })
        .map_err(|e| EvalError::function(function, e.to_string()))
}

fn index_of(subject: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > subject.len() {
        return None;
    }
    (from..=subject.len() - needle.len()).find(|&i| subject[i..i + needle.len()] == *needle)
}

fn last_index_of(subject: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > subject.len() {
        return None;
    }
    let start = from.min(subject.len() - needle.len());
    (0..=start)
        .rev()
        .find(|&i| subject[i..i + needle.len()] == *needle)
}

fn found(index: Option<usize>) -> Value {
    index.map(|i| Value::Int(i as i64)).unwrap_or(Value::Int(-1))
}

fn replace(args: &[Value]) -> Result<Value, EvalError> {
    let subject = string_arg("replace", args, 0)?;
    let from = string_arg("replace", args, 1)?;
    let to = string_arg("replace", args, 2)?;
    let replaced = match args.get(3) {
        Some(Value::Int(n)) if *n >= 0 => subject.replacen(from, to, *n as usize),
        _ => subject.replace(from, to),
    };
    Ok(Value::String(replaced))
}

fn split(args: &[Value]) -> Result<Value, EvalError> {
    let subject = string_arg("split", args, 0)?;
    let separator = string_arg("split", args, 1)?;
    let parts: Vec<Value> = match args.get(2) {
        Some(Value::Int(0)) => Vec::new(),
        Some(Value::Int(n)) if *n > 0 => subject
            .splitn(*n as usize, separator)
            .map(Value::from)
            .collect(),
        _ => subject.split(separator).map(Value::from).collect(),
    };
    Ok(Value::List(parts))
}

fn join(args: &[Value]) -> Result<Value, EvalError> {
    let items = list_arg("join", args, 0)?;
    let separator = match args.get(1) {
        Some(_) => string_arg("join", args, 1)?,
        None => "",
    };
    let parts = items
        .iter()
        .map(|item| {
            item.as_str().ok_or_else(|| {
                EvalError::function(
                    "join",
                    format!("list element is {}, not string", item.type_name()),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

fn substring(args: &[Value]) -> Result<Value, EvalError> {
    let chars = chars_of(string_arg("substring", args, 0)?);
    let start = position("substring", int_arg("substring", args, 1)?, chars.len())?;
    let end = match args.get(2) {
        Some(_) => position("substring", int_arg("substring", args, 2)?, chars.len())?,
        None => chars.len(),
    };
    if start > end {
        return Err(EvalError::function(
            "substring",
            format!("invalid range {}..{}", start, end),
        ));
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn index_of_fn(args: &[Value]) -> Result<Value, EvalError> {
    let chars = chars_of(string_arg("indexOf", args, 0)?);
    let needle = chars_of(string_arg("indexOf", args, 1)?);
    let from = match args.get(2) {
        Some(_) => position("indexOf", int_arg("indexOf", args, 2)?, chars.len())?,
        None => 0,
    };
    Ok(found(index_of(&chars, &needle, from)))
}

fn last_index_of_fn(args: &[Value]) -> Result<Value, EvalError> {
    let chars = chars_of(string_arg("lastIndexOf", args, 0)?);
    let needle = chars_of(string_arg("lastIndexOf", args, 1)?);
    let from = match args.get(2) {
        Some(_) => position("lastIndexOf", int_arg("lastIndexOf", args, 2)?, chars.len())?,
        None => chars.len(),
    };
    Ok(found(last_index_of(&chars, &needle, from)))
}

fn char_at(args: &[Value]) -> Result<Value, EvalError> {
    let chars = chars_of(string_arg("charAt", args, 0)?);
    let index = position("charAt", int_arg("charAt", args, 1)?, chars.len())?;
    Ok(Value::String(
        chars.get(index).map(char::to_string).unwrap_or_default(),
    ))
}

/// Double-quote a string, escaping control characters.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unary(name: &'static str, id: &str, f: fn(&str) -> String) -> FunctionDecl {
    FunctionDecl::new(name).overload(Overload::member(
        id,
        vec![Type::String],
        Type::String,
        move |args| Ok(Value::String(f(string_arg(name, args, 0)?))),
    ))
}

fn strings(extra: usize) -> Vec<Type> {
    vec![Type::String; extra + 1]
}

impl ExpressionLibrary for StringsLibrary {
    fn name(&self) -> &str {
        "strings"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        let with_int = |mut params: Vec<Type>| {
            params.push(Type::Int);
            params
        };

        vec![
            unary("lowerAscii", "string_lower_ascii", |s| s.to_ascii_lowercase()),
            unary("upperAscii", "string_upper_ascii", |s| s.to_ascii_uppercase()),
            unary("trim", "string_trim", |s| s.trim().to_string()),
            FunctionDecl::new("replace")
                .overload(Overload::member("string_replace_string_string", strings(2), Type::String, replace))
                .overload(Overload::member(
                    "string_replace_string_string_int",
                    with_int(strings(2)),
                    Type::String,
                    replace,
                )),
            FunctionDecl::new("split")
                .overload(Overload::member(
                    "string_split_string",
                    strings(1),
                    Type::list(Type::String),
                    split,
                ))
                .overload(Overload::member(
                    "string_split_string_int",
                    with_int(strings(1)),
                    Type::list(Type::String),
                    split,
                )),
            FunctionDecl::new("join")
                .overload(Overload::member(
                    "list_join",
                    vec![Type::list(Type::String)],
                    Type::String,
                    join,
                ))
                .overload(Overload::member(
                    "list_join_string",
                    vec![Type::list(Type::String), Type::String],
                    Type::String,
                    join,
                )),
            FunctionDecl::new("substring")
                .overload(Overload::member(
                    "string_substring_int",
                    with_int(strings(0)),
                    Type::String,
                    substring,
                ))
                .overload(Overload::member(
                    "string_substring_int_int",
                    with_int(with_int(strings(0))),
                    Type::String,
                    substring,
                )),
            FunctionDecl::new("indexOf")
                .overload(Overload::member("string_index_of_string", strings(1), Type::Int, index_of_fn))
                .overload(Overload::member(
                    "string_index_of_string_int",
                    with_int(strings(1)),
                    Type::Int,
                    index_of_fn,
                )),
            FunctionDecl::new("lastIndexOf")
                .overload(Overload::member(
                    "string_last_index_of_string",
                    strings(1),
                    Type::Int,
                    last_index_of_fn,
                ))
                .overload(Overload::member(
                    "string_last_index_of_string_int",
                    with_int(strings(1)),
                    Type::Int,
                    last_index_of_fn,
                )),
            FunctionDecl::new("charAt").overload(Overload::member(
                "string_char_at_int",
                with_int(strings(0)),
                Type::String,
                char_at,
            )),
            FunctionDecl::new("strings.quote").overload(Overload::global(
                "strings_quote",
                strings(0),
                Type::String,
                |args| Ok(Value::String(quote(string_arg("strings.quote", args, 0)?))),
            )),
        ]
    }
}
