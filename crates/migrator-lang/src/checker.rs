//! Type checker: resolves names and overloads and lowers the AST to an
//! executable tree.

use crate::ast::*;
use crate::env::{Env, Overload};
use crate::error::{CheckError, CheckErrorKind};
use crate::span::Span;
use crate::types::{describe_all, Type};
use crate::value::Value;

/// A checked expression, ready for evaluation.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Const(Value),
    Var(String),
    Select {
        operand: Box<Node>,
        field: String,
    },
    Has {
        operand: Box<Node>,
        field: String,
    },
    Index {
        operand: Box<Node>,
        index: Box<Node>,
    },
    /// Call with the overloads that survived checking; the receiver, if any,
    /// is the first argument.
    Call {
        function: String,
        overloads: Vec<Overload>,
        args: Vec<Node>,
    },
    Not(Box<Node>),
    Negate(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
}

/// Checker bound to one environment.
pub(crate) struct Checker<'env> {
    env: &'env Env,
}

impl<'env> Checker<'env> {
    pub(crate) fn new(env: &'env Env) -> Self {
        Self { env }
    }

    /// Check an expression, returning the lowered node and its type.
    pub(crate) fn check(&self, expr: &Expr) -> Result<(Node, Type), CheckError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(Self::check_literal(lit)),

            ExprKind::Ident(name) => match self.env.variable_type(name) {
                Some(ty) => Ok((Node::Var(name.clone()), ty.clone())),
                None => Err(CheckError::undeclared(name, expr.span)),
            },

            ExprKind::Select { operand, field } => {
                let (node, ty) = self.check(operand)?;
                let result = Self::field_type(&ty, expr.span)?;
                Ok((
                    Node::Select {
                        operand: Box::new(node),
                        field: field.clone(),
                    },
                    result,
                ))
            }

            ExprKind::Has { operand, field } => {
                let (node, ty) = self.check(operand)?;
                Self::field_type(&ty, expr.span)?;
                Ok((
                    Node::Has {
                        operand: Box::new(node),
                        field: field.clone(),
                    },
                    Type::Bool,
                ))
            }

            ExprKind::Index { operand, index } => self.check_index(operand, index, expr.span),

            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(target.as_deref(), function, args, expr.span),

            ExprKind::Unary { op, operand } => {
                let (node, ty) = self.check(operand)?;
                match op {
                    UnaryOp::Not => {
                        Self::expect(&Type::Bool, &ty, operand.span)?;
                        Ok((Node::Not(Box::new(node)), Type::Bool))
                    }
                    UnaryOp::Negate => {
                        if !ty.is_numeric() {
                            return Err(CheckError::no_overload("-_", &ty.to_string(), expr.span));
                        }
                        Ok((Node::Negate(Box::new(node)), ty))
                    }
                }
            }

            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right, expr.span),

            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let (cond_node, cond_ty) = self.check(condition)?;
                Self::expect(&Type::Bool, &cond_ty, condition.span)?;
                let (then_node, then_ty) = self.check(then)?;
                let (else_node, else_ty) = self.check(otherwise)?;
                Ok((
                    Node::Conditional {
                        condition: Box::new(cond_node),
                        then: Box::new(then_node),
                        otherwise: Box::new(else_node),
                    },
                    then_ty.join(&else_ty),
                ))
            }

            ExprKind::List(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                let mut elem: Option<Type> = None;
                for item in items {
                    let (node, ty) = self.check(item)?;
                    elem = Some(match elem {
                        Some(prev) => prev.join(&ty),
                        None => ty,
                    });
                    nodes.push(node);
                }
                Ok((Node::List(nodes), Type::list(elem.unwrap_or(Type::Dyn))))
            }

            ExprKind::Map(entries) => {
                let mut nodes = Vec::with_capacity(entries.len());
                let mut value_ty: Option<Type> = None;
                for (key, value) in entries {
                    let (key_node, key_ty) = self.check(key)?;
                    Self::expect(&Type::String, &key_ty, key.span)?;
                    let (value_node, ty) = self.check(value)?;
                    value_ty = Some(match value_ty {
                        Some(prev) => prev.join(&ty),
                        None => ty,
                    });
                    nodes.push((key_node, value_node));
                }
                Ok((
                    Node::Map(nodes),
                    Type::map(Type::String, value_ty.unwrap_or(Type::Dyn)),
                ))
            }
        }
    }

    fn check_literal(lit: &Literal) -> (Node, Type) {
        let (value, ty) = match lit {
            Literal::Null => (Value::Null, Type::Null),
            Literal::Bool(b) => (Value::Bool(*b), Type::Bool),
            Literal::Int(i) => (Value::Int(*i), Type::Int),
            Literal::Double(d) => (Value::Double(*d), Type::Double),
            Literal::String(s) => (Value::String(s.clone()), Type::String),
        };
        (Node::Const(value), ty)
    }

    /// Type of a field selected from a value of type `ty`.
    fn field_type(ty: &Type, span: Span) -> Result<Type, CheckError> {
        match ty {
            Type::Dyn => Ok(Type::Dyn),
            Type::Map(key, value) if key.is_assignable_from(&Type::String) => {
                Ok((**value).clone())
            }
            other => Err(CheckError::new(
                format!("type '{}' does not support field selection", other),
                span,
                CheckErrorKind::TypeMismatch,
            )),
        }
    }

    fn check_index(
        &self,
        operand: &Expr,
        index: &Expr,
        span: Span,
    ) -> Result<(Node, Type), CheckError> {
        let (operand_node, operand_ty) = self.check(operand)?;
        let (index_node, index_ty) = self.check(index)?;

        let result = match &operand_ty {
            Type::Dyn => {
                if !matches!(index_ty, Type::Int | Type::String | Type::Dyn) {
                    return Err(CheckError::no_overload(
                        "_[_]",
                        &describe_all(&[operand_ty.clone(), index_ty]),
                        span,
                    ));
                }
                Type::Dyn
            }
            Type::List(elem) => {
                Self::expect(&Type::Int, &index_ty, index.span)?;
                (**elem).clone()
            }
            Type::Map(key, value) => {
                Self::expect(key, &index_ty, index.span)?;
                (**value).clone()
            }
            _ => {
                return Err(CheckError::no_overload(
                    "_[_]",
                    &describe_all(&[operand_ty.clone(), index_ty]),
                    span,
                ))
            }
        };

        Ok((
            Node::Index {
                operand: Box::new(operand_node),
                index: Box::new(index_node),
            },
            result,
        ))
    }

    fn check_call(
        &self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<(Node, Type), CheckError> {
        let Some(target) = target else {
            return self.resolve(function, false, Vec::new(), Vec::new(), args, span);
        };

        // `ns.f(x)` names a namespaced global unless `ns` is a variable.
        if let Some(qualified) = target.qualified_name() {
            let root = qualified.split('.').next().unwrap_or(&qualified);
            if self.env.variable_type(root).is_none() {
                let name = format!("{}.{}", qualified, function);
                return self.resolve(&name, false, Vec::new(), Vec::new(), args, span);
            }
        }

        let (receiver_node, receiver_ty) = self.check(target)?;
        self.resolve(
            function,
            true,
            vec![receiver_node],
            vec![receiver_ty],
            args,
            span,
        )
    }

    /// Resolve `name` against registered overloads of the requested style.
    fn resolve(
        &self,
        name: &str,
        receiver: bool,
        mut nodes: Vec<Node>,
        mut types: Vec<Type>,
        args: &[Expr],
        span: Span,
    ) -> Result<(Node, Type), CheckError> {
        let declared = self
            .env
            .overloads(name)
            .ok_or_else(|| CheckError::unknown_function(name, span))?;

        for arg in args {
            let (node, ty) = self.check(arg)?;
            nodes.push(node);
            types.push(ty);
        }

        let candidates: Vec<Overload> = declared
            .iter()
            .filter(|o| o.receiver == receiver && o.accepts_types(&types))
            .cloned()
            .collect();

        let mut result: Option<Type> = None;
        for candidate in &candidates {
            result = Some(match result {
                Some(prev) => prev.join(&candidate.result),
                None => candidate.result.clone(),
            });
        }

        match result {
            Some(result) => Ok((
                Node::Call {
                    function: name.to_string(),
                    overloads: candidates,
                    args: nodes,
                },
                result,
            )),
            None => Err(CheckError::no_overload(name, &describe_all(&types), span)),
        }
    }

    fn check_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<(Node, Type), CheckError> {
        let (left_node, left_ty) = self.check(left)?;
        let (right_node, right_ty) = self.check(right)?;
        let mismatch = || {
            CheckError::no_overload(
                &format!("_{}_", op.symbol()),
                &describe_all(&[left_ty.clone(), right_ty.clone()]),
                span,
            )
        };

        let result = match op {
            BinaryOp::And | BinaryOp::Or => {
                Self::expect(&Type::Bool, &left_ty, left.span)?;
                Self::expect(&Type::Bool, &right_ty, right.span)?;
                let (l, r) = (Box::new(left_node), Box::new(right_node));
                let node = if op == BinaryOp::And {
                    Node::And(l, r)
                } else {
                    Node::Or(l, r)
                };
                return Ok((node, Type::Bool));
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let comparable = left_ty.is_assignable_from(&right_ty)
                    || right_ty.is_assignable_from(&left_ty)
                    || (left_ty.is_numeric() && right_ty.is_numeric())
                    || left_ty == Type::Null
                    || right_ty == Type::Null;
                if !comparable {
                    return Err(mismatch());
                }
                Type::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !Self::ordered(&left_ty, &right_ty) {
                    return Err(mismatch());
                }
                Type::Bool
            }
            BinaryOp::In => {
                let ok = match &right_ty {
                    Type::Dyn => true,
                    Type::List(elem) => elem.is_assignable_from(&left_ty),
                    Type::Map(key, _) => key.is_assignable_from(&left_ty),
                    _ => false,
                };
                if !ok {
                    return Err(mismatch());
                }
                Type::Bool
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                Self::arithmetic(op, &left_ty, &right_ty).ok_or_else(mismatch)?
            }
        };

        Ok((
            Node::Binary {
                op,
                left: Box::new(left_node),
                right: Box::new(right_node),
            },
            result,
        ))
    }

    fn ordered(left: &Type, right: &Type) -> bool {
        let orderable = |t: &Type| {
            matches!(
                t,
                Type::Dyn | Type::Int | Type::Double | Type::String | Type::Bytes | Type::Bool
            )
        };
        if !orderable(left) || !orderable(right) {
            return false;
        }
        left.is_dyn()
            || right.is_dyn()
            || left == right
            || (left.is_numeric() && right.is_numeric())
    }

    fn arithmetic(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
        let supports = |t: &Type| match op {
            BinaryOp::Add => matches!(
                t,
                Type::Int | Type::Double | Type::String | Type::Bytes | Type::List(_)
            ),
            BinaryOp::Rem => matches!(t, Type::Int),
            _ => matches!(t, Type::Int | Type::Double),
        };

        match (left, right) {
            (Type::Dyn, Type::Dyn) => Some(Type::Dyn),
            (Type::Dyn, other) | (other, Type::Dyn) => supports(other).then(|| other.clone()),
            (Type::List(a), Type::List(b)) if op == BinaryOp::Add => Some(Type::list(a.join(b))),
            (a, b) if a == b && supports(a) => Some(a.clone()),
            _ => None,
        }
    }

    fn expect(expected: &Type, got: &Type, span: Span) -> Result<(), CheckError> {
        if expected.is_assignable_from(got) {
            Ok(())
        } else {
            Err(CheckError::type_mismatch(
                &expected.to_string(),
                &got.to_string(),
                span,
            ))
        }
    }
}
