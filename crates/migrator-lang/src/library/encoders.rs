//! Base64 encoding functions.

use super::{bytes_arg, string_arg};
use crate::env::{ExpressionLibrary, FunctionDecl, Overload};
use crate::error::EvalError;
use crate::types::Type;
use crate::value::Value;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;

/// `base64.encode(bytes) -> string` and `base64.decode(string) -> bytes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodersLibrary;

impl ExpressionLibrary for EncodersLibrary {
    fn name(&self) -> &str {
        "encoders"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        vec![
            FunctionDecl::new("base64.encode").overload(Overload::global(
                "base64_encode_bytes",
                vec![Type::Bytes],
                Type::String,
                |args| Ok(Value::String(STANDARD.encode(bytes_arg("base64.encode", args, 0)?))),
            )),
            FunctionDecl::new("base64.decode").overload(Overload::global(
                "base64_decode_string",
                vec![Type::String],
                Type::Bytes,
                |args| {
                    let encoded = string_arg("base64.decode", args, 0)?;
                    // Unpadded input is accepted as well.
                    STANDARD
                        .decode(encoded)
                        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
                        .map(Value::Bytes)
                        .map_err(|e| EvalError::function("base64.decode", e.to_string()))
                },
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use crate::env::EnvBuilder;
    use crate::eval::Activation;
    use crate::value::Value;

    fn eval(source: &str) -> Result<Value, crate::error::EvalError> {
        EnvBuilder::standard()
            .build()
            .unwrap()
            .compile(source)
            .unwrap()
            .eval(&Activation::new())
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            eval("base64.encode(bytes('hello'))").unwrap(),
            Value::from("aGVsbG8=")
        );
    }

    #[test]
    fn test_decode_padded_and_unpadded() {
        assert_eq!(
            eval("string(base64.decode('aGVsbG8='))").unwrap(),
            Value::from("hello")
        );
        assert_eq!(
            eval("string(base64.decode('aGVsbG8'))").unwrap(),
            Value::from("hello")
        );
    }

    #[test]
    fn test_decode_invalid() {
        let err = eval("base64.decode('!!!')").unwrap_err();
        assert!(err.to_string().starts_with("base64.decode: "));
    }
}
