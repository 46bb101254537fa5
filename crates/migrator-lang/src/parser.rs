//! Recursive descent parser for the expression language.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::Span;

/// Maximum nesting depth accepted before parsing is abandoned.
const MAX_DEPTH: usize = 64;

/// Maximum height of a parsed tree. Operator and member chains grow the
/// tree without recursing in the parser, so they are bounded separately.
const MAX_HEIGHT: usize = 256;

/// Parser for a single expression.
pub struct Parser<'source> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
            source,
        })
    }

    /// Parse a complete expression, rejecting trailing input.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_conditional()?;

        if let Some(tok) = self.peek() {
            return Err(ParseError::new(
                format!("unexpected {} after end of expression", tok.token.describe()),
                tok.span,
            )
            .with_hint("string literals must be quoted, e.g. 'value'"));
        }

        Ok(expr)
    }

    /// Parse `cond ? a : b` (right associative).
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let condition = self.parse_or()?;

        let result = if self.eat(&Token::Question).is_some() {
            let then = self.parse_conditional()?;
            self.expect_token(Token::Colon)?;
            let otherwise = self.parse_conditional()?;
            let span = condition.span.merge(otherwise.span);
            Expr::new(
                ExprKind::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
                span,
            )
        } else {
            condition
        };

        self.depth -= 1;
        Ok(result)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or).is_some() {
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relation()?;
        while self.eat(&Token::And).is_some() {
            let right = self.parse_relation()?;
            left = self.binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    fn parse_relation(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => BinaryOp::In,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_addition()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplication()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(bang) = self.eat(&Token::Bang) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            let span = bang.span.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        if let Some(minus) = self.eat(&Token::Minus) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            let span = minus.span.merge(operand.span);
            // Fold negative numeric literals so `-1` stays a constant.
            let kind = match operand.kind {
                ExprKind::Literal(Literal::Int(i)) => ExprKind::Literal(Literal::Int(-i)),
                ExprKind::Literal(Literal::Double(d)) => ExprKind::Literal(Literal::Double(-d)),
                kind => ExprKind::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(Expr::new(kind, operand.span)),
                },
            };
            return Ok(Expr::new(kind, span));
        }

        self.parse_member()
    }

    /// Parse selections, receiver calls and index operations.
    fn parse_member(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat(&Token::Dot).is_some() {
                let field = self.expect_ident()?;
                if self.eat(&Token::LParen).is_some() {
                    let (args, close) = self.parse_args()?;
                    let span = expr.span.merge(close);
                    expr = Expr::new(
                        ExprKind::Call {
                            target: Some(Box::new(expr)),
                            function: field.0,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.merge(field.1);
                    expr = Expr::new(
                        ExprKind::Select {
                            operand: Box::new(expr),
                            field: field.0,
                        },
                        span,
                    );
                }
            } else if self.eat(&Token::LBracket).is_some() {
                let index = self.parse_conditional()?;
                let close = self.expect_token(Token::RBracket)?;
                let span = expr.span.merge(close.span);
                expr = Expr::new(
                    ExprKind::Index {
                        operand: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                break;
            }
            expr = self.bounded(expr)?;
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.next_token()?;
        let span = tok.span;

        let literal = |lit: Literal| Ok(Expr::new(ExprKind::Literal(lit), span));

        match tok.token {
            Token::Null => literal(Literal::Null),
            Token::True => literal(Literal::Bool(true)),
            Token::False => literal(Literal::Bool(false)),
            Token::Int(i) => literal(Literal::Int(i)),
            Token::Float(f) => literal(Literal::Double(f)),
            Token::String(s) | Token::StringSingle(s) => literal(Literal::String(s)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen).is_none() {
                    return Ok(Expr::new(ExprKind::Ident(name), span));
                }
                let (mut args, close) = self.parse_args()?;
                let span = span.merge(close);
                if name == "has" {
                    return match (args.len(), args.pop()) {
                        (1, Some(Expr { kind: ExprKind::Select { operand, field }, .. })) => {
                            Ok(Expr::new(ExprKind::Has { operand, field }, span))
                        }
                        _ => Err(ParseError::new(
                            "has() requires a single field selection argument",
                            span,
                        )
                        .with_hint("use has(resource.data.key)")),
                    };
                }
                Ok(Expr::new(
                    ExprKind::Call {
                        target: None,
                        function: name,
                        args,
                    },
                    span,
                ))
            }
            Token::LParen => {
                let inner = self.parse_conditional()?;
                self.expect_token(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_list(span),
            Token::LBrace => self.parse_map(span),
            other => Err(ParseError::new(
                format!("expected expression, found {}", other.describe()),
                span,
            )),
        }
    }

    /// Parse the remainder of a list literal after `[`.
    fn parse_list(&mut self, open: Span) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        loop {
            if let Some(close) = self.eat(&Token::RBracket) {
                return Ok(Expr::new(ExprKind::List(items), open.merge(close.span)));
            }
            items.push(self.parse_conditional()?);
            if self.eat(&Token::Comma).is_none() {
                let close = self.expect_token(Token::RBracket)?;
                return Ok(Expr::new(ExprKind::List(items), open.merge(close.span)));
            }
        }
    }

    /// Parse the remainder of a map literal after `{`.
    fn parse_map(&mut self, open: Span) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        loop {
            if let Some(close) = self.eat(&Token::RBrace) {
                return Ok(Expr::new(ExprKind::Map(entries), open.merge(close.span)));
            }
            let key = self.parse_conditional()?;
            self.expect_token(Token::Colon)?;
            let value = self.parse_conditional()?;
            entries.push((key, value));
            if self.eat(&Token::Comma).is_none() {
                let close = self.expect_token(Token::RBrace)?;
                return Ok(Expr::new(ExprKind::Map(entries), open.merge(close.span)));
            }
        }
    }

    /// Parse call arguments after `(`, returning them with the closing span.
    fn parse_args(&mut self) -> Result<(Vec<Expr>, Span), ParseError> {
        let mut args = Vec::new();
        if let Some(close) = self.eat(&Token::RParen) {
            return Ok((args, close.span));
        }
        loop {
            args.push(self.parse_conditional()?);
            if self.eat(&Token::Comma).is_none() {
                let close = self.expect_token(Token::RParen)?;
                return Ok((args, close.span));
            }
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let span = self
                .peek()
                .map(|t| t.span)
                .unwrap_or_else(|| Span::new(self.source.len(), self.source.len()));
            return Err(ParseError::new("expression nested too deeply", span));
        }
        Ok(())
    }

    fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, ParseError> {
        let span = left.span.merge(right.span);
        self.bounded(Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    fn bounded(&self, expr: Expr) -> Result<Expr, ParseError> {
        if expr.height() > MAX_HEIGHT {
            return Err(ParseError::new("expression nested too deeply", expr.span)
                .with_hint("split long operator chains into separate changes"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    /// Consume the next token if it matches `expected`.
    fn eat(&mut self, expected: &Token) -> Option<SpannedToken> {
        match self.tokens.get(self.pos) {
            Some(tok) if &tok.token == expected => {
                self.pos += 1;
                Some(tok.clone())
            }
            _ => None,
        }
    }

    /// Expect and consume an identifier.
    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) => Ok((name, tok.span)),
            other => Err(ParseError::new(
                format!("expected identifier, found {}", other.describe()),
                tok.span,
            )),
        }
    }

    /// Expect and consume a specific token.
    fn expect_token(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {}", expected, tok.token.describe()),
                tok.span,
            ))
        }
    }

    /// Get the next token or error if EOF.
    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or_else(|| {
            ParseError::new(
                "unexpected end of input",
                Span::new(self.source.len(), self.source.len()),
            )
        })?;
        self.pos += 1;
        Ok(tok)
    }
}


/// Parse a source string into an expression.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse_expression()
}
