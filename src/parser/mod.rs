//! Hand-written recursive descent parser
//!
//! - `stream`: token stream with lookahead
//! - `error`: parse errors
//! - `ast`: the untyped syntax tree
//! - `expr`: the expression grammar

pub mod ast;
mod error;
mod expr;
mod stream;

pub use ast::{Fragment, FunctionSyntax, Node, PathSegment, PathSyntax};
pub use error::{ParseError, ParseErrorKind};
pub use stream::MAX_DEPTH;

use crate::lexer;
use stream::TokenStream;

/// Parses a complete expression; trailing tokens are an error
///
/// Trees taller than [`MAX_DEPTH`] are rejected, so later passes can walk
/// them recursively.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let tokens = lexer::tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::invalid_syntax("empty expression", 0));
    }

    let mut stream = TokenStream::new(source, &tokens);
    let node = expr::parse_expr(&mut stream)?;
    if !stream.at_end() {
        return Err(ParseError::unexpected_token(
            stream.peek(),
            "after end of expression",
            stream.offset(),
        ));
    }
    if node.depth() > MAX_DEPTH {
        return Err(ParseError::invalid_syntax("expression nests too deeply", 0));
    }
    Ok(node)
}
