//! Token stream wrapper for the recursive descent parser

use std::mem;

use super::error::ParseError;
use crate::lexer::{Spanned, Token};

/// Deepest syntax tree the parser accepts
pub const MAX_DEPTH: usize = 128;

/// Token stream with lookahead and byte-offset tracking
pub struct TokenStream<'src> {
    source: &'src str,
    tokens: &'src [Spanned],
    pos: usize,
    /// Current grammar nesting: groups, arguments, unary and `**` operands
    depth: usize,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str, tokens: &'src [Spanned]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn peek(&self) -> Option<&'src Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'src Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    /// Consumes the current token
    pub fn advance(&mut self) -> Option<&'src Token> {
        let token = self.tokens.get(self.pos).map(|s| &s.token);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Compares discriminants only, so `Token::Int(_)` matches any integer
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if mem::discriminant(t) == mem::discriminant(expected))
    }

    /// Consumes the token if it matches
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(ParseError::expected_token(
                &expected,
                self.peek(),
                self.offset(),
            ))
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token, or the input length at the end
    pub fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.span.start)
            .unwrap_or(self.source.len())
    }

    /// Descends one nesting level
    pub fn enter(&mut self) -> Result<(), ParseError> {
        self.check_depth(1)?;
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fails if a node `height` levels tall would not fit below the current nesting
    pub fn check_depth(&self, height: usize) -> Result<(), ParseError> {
        if self.depth + height > MAX_DEPTH {
            return Err(ParseError::invalid_syntax(
                "expression nests too deeply",
                self.offset(),
            ));
        }
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Source text covered by the tokens consumed since `start`
    pub fn text_since(&self, start: usize) -> &'src str {
        let begin = self.tokens.get(start).map(|s| s.span.start);
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|last| self.tokens.get(last))
            .map(|s| s.span.end);
        match (begin, end) {
            (Some(b), Some(e)) if b <= e => &self.source[b..e],
            _ => "",
        }
    }
}
