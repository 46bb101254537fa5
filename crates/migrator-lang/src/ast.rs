//! Abstract Syntax Tree types for the expression language.

use crate::span::Span;

/// An expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The expression kind.
    pub kind: ExprKind,
    /// Span of the whole expression.
    pub span: Span,
    height: usize,
}

impl Expr {
    /// Create a new expression node.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let height = 1 + kind.child_height();
        Self { kind, span, height }
    }

    /// Number of nodes on the longest path from this node to a leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The dotted name of an identifier/selection chain such as
    /// `directory.lookup`, or `None` for any other shape.
    pub fn qualified_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name.clone()),
            ExprKind::Select { operand, field } => {
                let mut prefix = operand.qualified_name()?;
                prefix.push('.');
                prefix.push_str(field);
                Some(prefix)
            }
            _ => None,
        }
    }
}

/// Kinds of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A variable reference.
    Ident(String),
    /// Field selection: `operand.field`.
    Select {
        operand: Box<Expr>,
        field: String,
    },
    /// Presence test: `has(operand.field)`.
    Has {
        operand: Box<Expr>,
        field: String,
    },
    /// Indexing: `operand[index]`.
    Index {
        operand: Box<Expr>,
        index: Box<Expr>,
    },
    /// Function call. `target` is set for `x.f(...)` forms; whether that is
    /// a receiver call or a namespaced global is decided by the checker.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    /// Unary operator.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operator.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `condition ? then : otherwise`.
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// List literal.
    List(Vec<Expr>),
    /// Map literal.
    Map(Vec<(Expr, Expr)>),
}

impl ExprKind {
    fn child_height(&self) -> usize {
        match self {
            ExprKind::Literal(_) | ExprKind::Ident(_) => 0,
            ExprKind::Select { operand, .. }
            | ExprKind::Has { operand, .. }
            | ExprKind::Unary { operand, .. } => operand.height,
            ExprKind::Index { operand, index } => operand.height.max(index.height),
            ExprKind::Call { target, args, .. } => args
                .iter()
                .map(|arg| arg.height)
                .chain(target.as_ref().map(|t| t.height))
                .max()
                .unwrap_or(0),
            ExprKind::Binary { left, right, .. } => left.height.max(right.height),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => condition.height.max(then.height).max(otherwise.height),
            ExprKind::List(items) => items.iter().map(|item| item.height).max().unwrap_or(0),
            ExprKind::Map(entries) => entries
                .iter()
                .map(|(key, value)| key.height.max(value.height))
                .max()
                .unwrap_or(0),
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Double value.
    Double(f64),
    /// String value.
    String(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical not (`!`).
    Not,
    /// Numeric negation (`-`).
    Negate,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// The operator's source symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.to_string()), Span::default())
    }

    #[test]
    fn test_qualified_name_of_selection_chain() {
        let expr = Expr::new(
            ExprKind::Select {
                operand: Box::new(ident("directory")),
                field: "lookup".to_string(),
            },
            Span::default(),
        );
        assert_eq!(expr.qualified_name(), Some("directory.lookup".to_string()));
    }

    #[test]
    fn test_qualified_name_stops_at_index() {
        let expr = Expr::new(
            ExprKind::Index {
                operand: Box::new(ident("list")),
                index: Box::new(Expr::new(
                    ExprKind::Literal(Literal::Int(0)),
                    Span::default(),
                )),
            },
            Span::default(),
        );
        assert_eq!(expr.qualified_name(), None);
    }

    #[test]
    fn test_height_follows_deepest_child() {
        let select = Expr::new(
            ExprKind::Select {
                operand: Box::new(ident("resource")),
                field: "data".to_string(),
            },
            Span::default(),
        );
        assert_eq!(ident("a").height(), 1);
        assert_eq!(select.height(), 2);

        let sum = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(ident("a")),
                right: Box::new(select),
            },
            Span::default(),
        );
        assert_eq!(sum.height(), 3);
    }
}
