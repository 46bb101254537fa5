//! Lexer for the expression language using logos.

use crate::error::ParseError;
use crate::span::Span;
use logos::Logos;

/// Token types for the expression language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Comparison operators
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Logical operators
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Bang,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Conditional
    #[token("?")]
    Question,

    // Keyword operators and literals
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Identifier
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // String literal (double-quoted)
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    String(String),

    // String literal (single-quoted)
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    StringSingle(String),

    // Integer literal
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Float literal
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Punctuation
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

impl Token {
    /// Human readable rendering used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::String(s) | Token::StringSingle(s) => format!("string '{}'", s),
            Token::Int(i) => format!("integer {}", i),
            Token::Float(f) => format!("number {}", f),
            other => format!("{:?}", other),
        }
    }
}

/// Unescape a string literal, handling common escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a source string into a vector of spanned tokens.
///
/// Any unrecognised input is an error.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected character sequence '{}'", lexer.slice()),
                    span,
                ))
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_member_access() {
        let tokens = kinds("resource.data.tested");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("resource".to_string()),
                Token::Dot,
                Token::Ident("data".to_string()),
                Token::Dot,
                Token::Ident("tested".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("a == b && c != d || !e ? f : g");
        assert!(tokens.contains(&Token::Eq));
        assert!(tokens.contains(&Token::And));
        assert!(tokens.contains(&Token::Ne));
        assert!(tokens.contains(&Token::Or));
        assert!(tokens.contains(&Token::Bang));
        assert!(tokens.contains(&Token::Question));
        assert!(tokens.contains(&Token::Colon));
    }

    #[test]
    fn test_numbers_are_unsigned() {
        let tokens = kinds("52 3.25 -1");
        assert_eq!(tokens[0], Token::Int(52));
        assert_eq!(tokens[1], Token::Float(3.25));
        assert_eq!(tokens[2], Token::Minus);
        assert_eq!(tokens[3], Token::Int(1));
    }

    #[test]
    fn test_string_quotes_and_escapes() {
        let tokens = kinds(r#"'this is migrated' "tab\there" 'it\'s'"#);
        assert_eq!(tokens[0], Token::StringSingle("this is migrated".to_string()));
        assert_eq!(tokens[1], Token::String("tab\there".to_string()));
        assert_eq!(tokens[2], Token::StringSingle("it's".to_string()));
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        let tokens = kinds("'a' in list && true != null");
        assert_eq!(tokens[1], Token::In);
        assert_eq!(tokens[4], Token::True);
        assert_eq!(tokens[6], Token::Null);
    }

    #[test]
    fn test_invalid_character_is_rejected() {
        let err = tokenize("resource.data # comment").unwrap_err();
        assert!(err.message.contains("unexpected character"));
        assert_eq!(err.span, Span::new(14, 15));
    }
}
