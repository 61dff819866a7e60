//! Parse error types

use std::fmt;

use crate::lexer::{LexError, Token};

/// Parse error with the byte offset where it occurred
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input that is not a token
    Lexical,
    /// Found X, expected Y
    UnexpectedToken,
    UnexpectedEof,
    /// Well-formed tokens in an invalid arrangement
    InvalidSyntax,
}

impl ParseError {
    pub fn expected_token(expected: &Token, found: Option<&Token>, offset: usize) -> Self {
        match found {
            Some(token) => Self {
                kind: ParseErrorKind::UnexpectedToken,
                offset,
                message: format!("expected '{}', found '{}'", expected, token),
            },
            None => Self {
                kind: ParseErrorKind::UnexpectedEof,
                offset,
                message: format!("expected '{}', found end of input", expected),
            },
        }
    }

    pub fn unexpected_token(found: Option<&Token>, context: &str, offset: usize) -> Self {
        match found {
            Some(token) => Self {
                kind: ParseErrorKind::UnexpectedToken,
                offset,
                message: format!("unexpected '{}' {}", token, context),
            },
            None => Self {
                kind: ParseErrorKind::UnexpectedEof,
                offset,
                message: format!("unexpected end of input {}", context),
            },
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            offset,
            message: message.into(),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            kind: ParseErrorKind::Lexical,
            offset: err.offset,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}
