//! Function libraries registered with every expression environment.

mod base;
mod encoders;
mod strings;

pub use self::base::CoreLibrary;
pub use self::encoders::EncodersLibrary;
pub use self::strings::StringsLibrary;

use crate::error::EvalError;
use crate::value::Value;

fn arg<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a Value, EvalError> {
    args.get(index)
        .ok_or_else(|| EvalError::function(function, format!("missing argument {}", index)))
}

fn wrong_type(function: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::function(
        function,
        format!("expected {} argument, got {}", expected, got.type_name()),
    )
}

pub(crate) fn string_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a str, EvalError> {
    match arg(function, args, index)? {
        Value::String(s) => Ok(s),
        other => Err(wrong_type(function, "string", other)),
    }
}

pub(crate) fn int_arg(function: &str, args: &[Value], index: usize) -> Result<i64, EvalError> {
    match arg(function, args, index)? {
        Value::Int(i) => Ok(*i),
        other => Err(wrong_type(function, "int", other)),
    }
}

pub(crate) fn bytes_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a [u8], EvalError> {
    match arg(function, args, index)? {
        Value::Bytes(b) => Ok(b),
        other => Err(wrong_type(function, "bytes", other)),
    }
}

pub(crate) fn list_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a [Value], EvalError> {
    match arg(function, args, index)? {
        Value::List(items) => Ok(items),
        other => Err(wrong_type(function, "list", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_helpers() {
        let args = vec![Value::from("a"), Value::Int(2)];
        assert_eq!(string_arg("f", &args, 0).unwrap(), "a");
        assert_eq!(int_arg("f", &args, 1).unwrap(), 2);
        assert_eq!(
            int_arg("f", &args, 0).unwrap_err().to_string(),
            "f: expected int argument, got string"
        );
        assert_eq!(
            string_arg("f", &args, 5).unwrap_err().to_string(),
            "f: missing argument 5"
        );
    }
}
