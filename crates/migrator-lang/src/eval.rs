//! Tree-walking evaluator for checked programs.

use crate::ast::BinaryOp;
use crate::checker::Node;
use crate::error::EvalError;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Variable bindings for one evaluation. Never mutated by evaluation.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    bindings: BTreeMap<String, Value>,
}

impl Activation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, builder style.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

fn no_overload(function: &str, args: &[&Value]) -> EvalError {
    EvalError::NoSuchOverload {
        function: function.to_string(),
        args: args
            .iter()
            .map(|v| v.type_name())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn expect_bool(function: &str, value: &Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| no_overload(function, &[value]))
}

pub(crate) fn evaluate(node: &Node, activation: &Activation) -> Result<Value, EvalError> {
    match node {
        Node::Const(value) => Ok(value.clone()),

        Node::Var(name) => activation
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundVariable(name.clone())),

        Node::Select { operand, field } => match evaluate(operand, activation)? {
            Value::Map(mut fields) => fields
                .remove(field)
                .ok_or_else(|| EvalError::NoSuchKey(field.clone())),
            other => Err(no_overload(&format!("_.{}", field), &[&other])),
        },

        Node::Has { operand, field } => match evaluate(operand, activation)? {
            Value::Map(fields) => Ok(Value::Bool(fields.contains_key(field))),
            other => Err(no_overload("has", &[&other])),
        },

        Node::Index { operand, index } => {
            let container = evaluate(operand, activation)?;
            let index = evaluate(index, activation)?;
            match (container, index) {
                (Value::List(mut items), Value::Int(i)) => {
                    let len = items.len();
                    if i < 0 || i as usize >= len {
                        return Err(EvalError::IndexOutOfBounds { index: i, len });
                    }
                    Ok(items.swap_remove(i as usize))
                }
                (Value::Map(mut fields), Value::String(key)) => {
                    fields.remove(&key).ok_or(EvalError::NoSuchKey(key))
                }
                (container, index) => Err(no_overload("_[_]", &[&container, &index])),
            }
        }

        Node::Call {
            function,
            overloads,
            args,
        } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, activation))
                .collect::<Result<Vec<_>, _>>()?;
            match overloads.iter().find(|o| o.accepts_values(&values)) {
                Some(overload) => overload.invoke(&values),
                None => Err(no_overload(function, &values.iter().collect::<Vec<_>>())),
            }
        }

        Node::Not(operand) => {
            let value = evaluate(operand, activation)?;
            Ok(Value::Bool(!expect_bool("!_", &value)?))
        }

        Node::Negate(operand) => match evaluate(operand, activation)? {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(no_overload("-_", &[&other])),
        },

        Node::And(left, right) => {
            if !expect_bool("_&&_", &evaluate(left, activation)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool("_&&_", &evaluate(right, activation)?)?))
        }

        Node::Or(left, right) => {
            if expect_bool("_||_", &evaluate(left, activation)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool("_||_", &evaluate(right, activation)?)?))
        }

        Node::Binary { op, left, right } => {
            let left = evaluate(left, activation)?;
            let right = evaluate(right, activation)?;
            binary(*op, left, right)
        }

        Node::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if expect_bool("_?_:_", &evaluate(condition, activation)?)? {
                evaluate(then, activation)
            } else {
                evaluate(otherwise, activation)
            }
        }

        Node::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| evaluate(item, activation))
                .collect::<Result<_, _>>()?,
        )),

        Node::Map(entries) => {
            let mut fields = BTreeMap::new();
            for (key, value) in entries {
                match evaluate(key, activation)? {
                    Value::String(key) => {
                        fields.insert(key, evaluate(value, activation)?);
                    }
                    other => return Err(no_overload("{_:_}", &[&other])),
                }
            }
            Ok(Value::Map(fields))
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let name = format!("_{}_", op.symbol());

    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left.equals(&right))),
        BinaryOp::Ne => return Ok(Value::Bool(!left.equals(&right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = left
                .compare(&right)
                .ok_or_else(|| no_overload(&name, &[&left, &right]))?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Value::Bool(result));
        }
        BinaryOp::In => {
            return match &right {
                Value::List(items) => Ok(Value::Bool(items.iter().any(|v| v.equals(&left)))),
                Value::Map(fields) => match &left {
                    Value::String(key) => Ok(Value::Bool(fields.contains_key(key))),
                    _ => Err(no_overload(&name, &[&left, &right])),
                },
                _ => Err(no_overload(&name, &[&left, &right])),
            };
        }
        _ => {}
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => {
            a.checked_mul(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        (BinaryOp::Div, Value::Int(_), Value::Int(0)) => Err(EvalError::DivisionByZero),
        (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
            a.checked_div(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        (BinaryOp::Rem, Value::Int(_), Value::Int(0)) => Err(EvalError::ModulusByZero),
        (BinaryOp::Rem, Value::Int(a), Value::Int(b)) => {
            a.checked_rem(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        (BinaryOp::Add, Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        (BinaryOp::Sub, Value::Double(a), Value::Double(b)) => Ok(Value::Double(a - b)),
        (BinaryOp::Mul, Value::Double(a), Value::Double(b)) => Ok(Value::Double(a * b)),
        (BinaryOp::Div, Value::Double(a), Value::Double(b)) => Ok(Value::Double(a / b)),
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (BinaryOp::Add, Value::Bytes(mut a), Value::Bytes(b)) => {
            a.extend(b);
            Ok(Value::Bytes(a))
        }
        (BinaryOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (_, left, right) => Err(no_overload(&name, &[&left, &right])),
    }
}
