//! Expression parser
//!
//! Precedence, lowest first: `or`, `and`, comparison, additive,
//! multiplicative, power, bitwise, shift, unary, postfix cast, primary.
//! `not(..)`, `exclusive(..)`, `when(..)` and `with(..) do (..)` are parsed
//! as primaries.

use super::ast::{Fragment, FunctionSyntax, Node, PathSegment, PathSyntax};
use super::error::ParseError;
use super::stream::TokenStream;
use crate::lexer::Token;
use crate::model::{BinaryOp, ValueType};

type ParseResult<T> = Result<T, ParseError>;

pub fn parse_expr(s: &mut TokenStream) -> ParseResult<Node> {
    nested(s, parse_or)
}

/// Runs `parse` one nesting level down
fn nested<'src, T>(
    s: &mut TokenStream<'src>,
    parse: impl FnOnce(&mut TokenStream<'src>) -> ParseResult<T>,
) -> ParseResult<T> {
    s.enter()?;
    let result = parse(s);
    s.leave();
    result
}

fn parse_or(s: &mut TokenStream) -> ParseResult<Node> {
    let first = parse_and(s)?;
    if !s.check(&Token::Or) {
        return Ok(first);
    }
    let mut operands = vec![first];
    while s.eat(&Token::Or) {
        operands.push(parse_and(s)?);
    }
    Ok(Node::Or(operands))
}

fn parse_and(s: &mut TokenStream) -> ParseResult<Node> {
    let first = parse_comparison(s)?;
    if !s.check(&Token::And) {
        return Ok(first);
    }
    let mut operands = vec![first];
    while s.eat(&Token::And) {
        operands.push(parse_comparison(s)?);
    }
    Ok(Node::And(operands))
}

fn comparison_op(token: Option<&Token>) -> Option<BinaryOp> {
    match token? {
        Token::Gt => Some(BinaryOp::Gt),
        Token::Ge => Some(BinaryOp::Ge),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Le => Some(BinaryOp::Le),
        Token::EqEq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::Ne),
        Token::In => Some(BinaryOp::In),
        _ => None,
    }
}

fn parse_comparison(s: &mut TokenStream) -> ParseResult<Node> {
    let left = parse_additive(s)?;
    let Some(op) = comparison_op(s.peek()) else {
        return Ok(left);
    };
    s.advance();
    let right = parse_additive(s)?;

    if comparison_op(s.peek()).is_some() {
        return Err(ParseError::invalid_syntax(
            "comparison operators cannot be chained",
            s.offset(),
        ));
    }

    Ok(binary(op, left, right))
}

fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn additive_op(token: Option<&Token>) -> Option<BinaryOp> {
    match token? {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative_op(token: Option<&Token>) -> Option<BinaryOp> {
    match token? {
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        Token::Percent => Some(BinaryOp::Mod),
        _ => None,
    }
}

fn bitwise_op(token: Option<&Token>) -> Option<BinaryOp> {
    match token? {
        Token::Amp => Some(BinaryOp::BitAnd),
        Token::Pipe => Some(BinaryOp::BitOr),
        Token::Caret => Some(BinaryOp::BitXor),
        _ => None,
    }
}

fn shift_op(token: Option<&Token>) -> Option<BinaryOp> {
    match token? {
        Token::Shl => Some(BinaryOp::LShift),
        Token::Shr => Some(BinaryOp::ARShift),
        Token::UShr => Some(BinaryOp::LRShift),
        _ => None,
    }
}

/// Left-associative `operand (op operand)*`
///
/// Every link makes the tree one level taller, so the chain is bounded
/// by the same depth limit as nested groups.
fn parse_left_assoc(
    s: &mut TokenStream,
    operand: fn(&mut TokenStream) -> ParseResult<Node>,
    operator: fn(Option<&Token>) -> Option<BinaryOp>,
) -> ParseResult<Node> {
    let mut left = operand(s)?;
    let mut height = left.depth();
    while let Some(op) = operator(s.peek()) {
        s.advance();
        let right = operand(s)?;
        height = 1 + height.max(right.depth());
        s.check_depth(height)?;
        left = binary(op, left, right);
    }
    Ok(left)
}

fn parse_additive(s: &mut TokenStream) -> ParseResult<Node> {
    parse_left_assoc(s, parse_multiplicative, additive_op)
}

fn parse_multiplicative(s: &mut TokenStream) -> ParseResult<Node> {
    parse_left_assoc(s, parse_power, multiplicative_op)
}

/// `**` is right-associative
fn parse_power(s: &mut TokenStream) -> ParseResult<Node> {
    let base = parse_bitwise(s)?;
    if s.eat(&Token::StarStar) {
        let exponent = nested(s, parse_power)?;
        return Ok(binary(BinaryOp::Pow, base, exponent));
    }
    Ok(base)
}

fn parse_bitwise(s: &mut TokenStream) -> ParseResult<Node> {
    parse_left_assoc(s, parse_shift, bitwise_op)
}

fn parse_shift(s: &mut TokenStream) -> ParseResult<Node> {
    parse_left_assoc(s, parse_unary, shift_op)
}

fn parse_unary(s: &mut TokenStream) -> ParseResult<Node> {
    match s.peek() {
        Some(Token::Minus) => {
            s.advance();
            Ok(Node::Negate(Box::new(nested(s, parse_unary)?)))
        }
        Some(Token::Plus) => {
            s.advance();
            nested(s, parse_unary)
        }
        Some(Token::Tilde) => {
            s.advance();
            Ok(Node::BitNot(Box::new(nested(s, parse_unary)?)))
        }
        _ => parse_postfix(s),
    }
}

/// `5.asFloat()`, `(1 + 2).asInt()`
fn parse_postfix(s: &mut TokenStream) -> ParseResult<Node> {
    let mut node = parse_primary(s)?;
    let mut height = node.depth();
    while !matches!(node, Node::Path(_) | Node::Metadata { .. }) && s.check(&Token::Dot) {
        let target = match s.peek_nth(1) {
            Some(Token::Ident(name)) if name == "asInt" => ValueType::Int,
            Some(Token::Ident(name)) if name == "asFloat" => ValueType::Float,
            found => {
                return Err(ParseError::unexpected_token(
                    found,
                    "after '.', expected asInt() or asFloat()",
                    s.offset(),
                ))
            }
        };
        s.advance();
        s.advance();
        s.expect(Token::LParen)?;
        s.expect(Token::RParen)?;
        height += 1;
        s.check_depth(height)?;
        node = Node::Cast {
            operand: Box::new(node),
            target,
        };
    }
    Ok(node)
}

fn parse_primary(s: &mut TokenStream) -> ParseResult<Node> {
    let offset = s.offset();
    let Some(token) = s.advance() else {
        return Err(ParseError::unexpected_token(None, "in expression", offset));
    };

    match token {
        Token::Int(text) => Ok(Node::Int(text.clone())),
        Token::Float(text) => Ok(Node::Float(text.clone())),
        Token::Str(value) => Ok(Node::Str(value.clone())),
        Token::True => Ok(Node::Bool(true)),
        Token::False => Ok(Node::Bool(false)),
        Token::Placeholder(index) => Ok(Node::Placeholder(*index)),
        Token::LBracket => {
            let items = parse_list_items(s, Token::RBracket)?;
            Ok(Node::List(items))
        }
        Token::LBrace => parse_map(s),
        Token::LParen => {
            let inner = parse_expr(s)?;
            s.expect(Token::RParen)?;
            Ok(inner)
        }
        Token::Dollar => {
            if s.eat(&Token::LBrace) {
                let name = parse_name(s, "as variable name")?;
                s.expect(Token::RBrace)?;
                return Ok(Node::Variable(name));
            }
            s.expect(Token::Dot)?;
            parse_path(s)
        }
        Token::Not => {
            s.expect(Token::LParen)?;
            let inner = parse_expr(s)?;
            s.expect(Token::RParen)?;
            Ok(Node::Not(Box::new(inner)))
        }
        Token::Exclusive => {
            s.expect(Token::LParen)?;
            let operands = parse_list_items(s, Token::RParen)?;
            Ok(Node::Exclusive(operands))
        }
        Token::When => parse_when(s),
        Token::With => parse_with(s),
        Token::Ident(name) => {
            s.expect(Token::LParen)?;
            let args = parse_list_items(s, Token::RParen)?;
            Ok(Node::Call {
                name: name.clone(),
                args,
            })
        }
        other => Err(ParseError::unexpected_token(
            Some(other),
            "in expression",
            offset,
        )),
    }
}

/// Comma-separated expressions up to and including `close`
fn parse_list_items(s: &mut TokenStream, close: Token) -> ParseResult<Vec<Node>> {
    let mut items = Vec::new();
    if s.eat(&close) {
        return Ok(items);
    }
    loop {
        items.push(parse_expr(s)?);
        if !s.eat(&Token::Comma) {
            break;
        }
    }
    s.expect(close)?;
    Ok(items)
}

fn parse_map(s: &mut TokenStream) -> ParseResult<Node> {
    let mut entries = Vec::new();
    if s.eat(&Token::RBrace) {
        return Ok(Node::Map(entries));
    }
    loop {
        let key = parse_expr(s)?;
        s.expect(Token::Colon)?;
        let value = parse_expr(s)?;
        entries.push((key, value));
        if !s.eat(&Token::Comma) {
            break;
        }
    }
    s.expect(Token::RBrace)?;
    Ok(Node::Map(entries))
}

fn parse_name(s: &mut TokenStream, context: &str) -> ParseResult<String> {
    let offset = s.offset();
    match s.peek().and_then(Token::as_name) {
        Some(name) => {
            s.advance();
            Ok(name)
        }
        None => Err(ParseError::unexpected_token(s.peek(), context, offset)),
    }
}

/// `when (c1 => r1, c2 => r2, default => r)`
fn parse_when(s: &mut TokenStream) -> ParseResult<Node> {
    s.expect(Token::LParen)?;
    let mut arms = Vec::new();
    loop {
        if s.eat(&Token::Default) {
            s.expect(Token::Arrow)?;
            let default = parse_expr(s)?;
            s.expect(Token::RParen)?;
            if arms.is_empty() {
                return Err(ParseError::invalid_syntax(
                    "when requires at least one condition arm",
                    s.offset(),
                ));
            }
            return Ok(Node::When {
                arms,
                default: Box::new(default),
            });
        }

        let condition = parse_expr(s)?;
        s.expect(Token::Arrow)?;
        let result = parse_expr(s)?;
        arms.push((condition, result));

        if !s.eat(&Token::Comma) {
            return Err(ParseError::invalid_syntax(
                "when requires a default arm",
                s.offset(),
            ));
        }
    }
}

/// `with (a = e1, b = e2) do (body)`
fn parse_with(s: &mut TokenStream) -> ParseResult<Node> {
    s.expect(Token::LParen)?;
    let mut definitions = Vec::new();
    loop {
        let name = parse_name(s, "as variable name")?;
        s.expect(Token::Assign)?;
        let value = parse_expr(s)?;
        definitions.push((name, value));
        if !s.eat(&Token::Comma) {
            break;
        }
    }
    s.expect(Token::RParen)?;
    s.expect(Token::Do)?;
    s.expect(Token::LParen)?;
    let body = parse_expr(s)?;
    s.expect(Token::RParen)?;
    Ok(Node::With {
        definitions,
        body: Box::new(body),
    })
}

fn is_call(s: &TokenStream) -> bool {
    matches!(s.peek().and_then(Token::as_name), Some(_))
        && matches!(s.peek_nth(1), Some(Token::LParen))
}

/// Everything after `$.`
fn parse_path(s: &mut TokenStream) -> ParseResult<Node> {
    if is_call(s) {
        let name = parse_name(s, "as metadata function")?;
        s.expect(Token::LParen)?;
        let args = parse_list_items(s, Token::RParen)?;
        return Ok(Node::Metadata { name, args });
    }

    let mut segments = vec![parse_segment(s)?];
    let mut function = None;

    while s.check(&Token::Dot) {
        let callee = s.peek_nth(1).and_then(Token::as_name);
        if callee.is_some() && matches!(s.peek_nth(2), Some(Token::LParen)) {
            s.advance();
            function = Some(parse_path_function(s)?);
            break;
        }
        s.advance();
        segments.push(parse_segment(s)?);
    }

    Ok(Node::Path(PathSyntax { segments, function }))
}

fn parse_segment(s: &mut TokenStream) -> ParseResult<PathSegment> {
    let offset = s.offset();
    if let Some(name) = s.peek().and_then(Token::as_name) {
        s.advance();
        return Ok(PathSegment::Name(name));
    }
    match s.peek() {
        Some(Token::Str(name)) => {
            s.advance();
            Ok(PathSegment::Name(name.clone()))
        }
        Some(Token::LBracket) => Ok(PathSegment::List(parse_fragment(
            s,
            &Token::LBracket,
            &Token::RBracket,
        )?)),
        Some(Token::LBrace) => Ok(PathSegment::Map(parse_fragment(
            s,
            &Token::LBrace,
            &Token::RBrace,
        )?)),
        found => Err(ParseError::unexpected_token(
            found,
            "in path, expected a name or a descriptor",
            offset,
        )),
    }
}

/// Collects the raw tokens of a bracketed descriptor
fn parse_fragment(s: &mut TokenStream, open: &Token, close: &Token) -> ParseResult<Fragment> {
    let start = s.position();
    let offset = s.offset();
    s.advance();

    let mut depth = 1usize;
    let mut tokens = Vec::new();
    loop {
        let Some(token) = s.advance() else {
            return Err(ParseError::invalid_syntax(
                format!("unterminated path descriptor starting with '{}'", open),
                offset,
            ));
        };
        if token == open {
            depth += 1;
        } else if token == close {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        tokens.push(token.clone());
    }

    Ok(Fragment {
        text: s.text_since(start).to_string(),
        tokens,
    })
}

/// `get(type: INT, return: VALUE)`, `count()`, ...
fn parse_path_function(s: &mut TokenStream) -> ParseResult<FunctionSyntax> {
    let name = parse_name(s, "as path function")?;
    s.expect(Token::LParen)?;
    let mut params = Vec::new();
    if !s.eat(&Token::RParen) {
        loop {
            let key = parse_name(s, "as path function parameter")?;
            s.expect(Token::Colon)?;
            let value = parse_name(s, "as path function parameter value")?;
            params.push((key, value));
            if !s.eat(&Token::Comma) {
                break;
            }
        }
        s.expect(Token::RParen)?;
    }
    Ok(FunctionSyntax { name, params })
}

#[cfg(test)]
mod tests {
    use super::super::{parse, MAX_DEPTH};
    use super::*;

    #[test]
    fn test_precedence() {
        let node = parse("$.a + 2 * 3 > 10 and $.b").unwrap();
        let Node::And(operands) = node else {
            panic!("expected and");
        };
        assert_eq!(operands.len(), 2);
        let Node::Binary { op, left, .. } = &operands[0] else {
            panic!("expected comparison");
        };
        assert_eq!(*op, BinaryOp::Gt);
        let Node::Binary { op, right, .. } = left.as_ref() else {
            panic!("expected addition");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(right.as_ref(), Node::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_power_right_associative() {
        let node = parse("2 ** 3 ** 2").unwrap();
        let Node::Binary { op, left, right } = node else {
            panic!("expected pow");
        };
        assert_eq!(op, BinaryOp::Pow);
        assert_eq!(*left, Node::Int("2".into()));
        assert!(matches!(*right, Node::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_or_lower_than_and() {
        let node = parse("$.a and $.b or $.c").unwrap();
        let Node::Or(operands) = node else {
            panic!("expected or");
        };
        assert!(matches!(operands[0], Node::And(_)));
    }

    #[test]
    fn test_path_segments() {
        let node = parse("$.m.a.'b c'.[1:3].{=5}.count()").unwrap();
        let Node::Path(path) = node else {
            panic!("expected path");
        };
        assert_eq!(path.segments.len(), 5);
        assert_eq!(path.segments[2], PathSegment::Name("b c".into()));
        let PathSegment::List(fragment) = &path.segments[3] else {
            panic!("expected list fragment");
        };
        assert_eq!(fragment.text, "[1:3]");
        assert_eq!(fragment.tokens.len(), 3);
        assert_eq!(path.function.unwrap().name, "count");
    }

    #[test]
    fn test_path_function_params() {
        let node = parse("$.l.[0].get(type: INT, return: VALUE)").unwrap();
        let Node::Path(path) = node else {
            panic!("expected path");
        };
        let function = path.function.unwrap();
        assert_eq!(function.name, "get");
        assert_eq!(
            function.params,
            vec![
                ("type".to_string(), "INT".to_string()),
                ("return".to_string(), "VALUE".to_string())
            ]
        );
    }

    #[test]
    fn test_metadata_and_variable() {
        assert_eq!(
            parse("$.digestModulo(3)").unwrap(),
            Node::Metadata {
                name: "digestModulo".into(),
                args: vec![Node::Int("3".into())]
            }
        );
        assert_eq!(parse("${x}").unwrap(), Node::Variable("x".into()));
    }

    #[test]
    fn test_when_requires_default() {
        assert!(parse("when ($.a == 1 => 2, default => 3)").is_ok());
        assert!(parse("when ($.a == 1 => 2)").is_err());
    }

    #[test]
    fn test_with_do() {
        let node = parse("with (x = 1, y = ${x} + 1) do (${y} > 0)").unwrap();
        let Node::With { definitions, .. } = node else {
            panic!("expected with");
        };
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[1].0, "y");
    }

    #[test]
    fn test_literal_cast() {
        assert_eq!(
            parse("5.asFloat()").unwrap(),
            Node::Cast {
                operand: Box::new(Node::Int("5".into())),
                target: ValueType::Float
            }
        );
    }

    #[test]
    fn test_chained_comparison_rejected() {
        assert!(parse("1 < $.a < 3").is_err());
    }

    #[test]
    fn test_node_depth() {
        assert_eq!(parse("$.a").unwrap().depth(), 1);
        assert_eq!(parse("$.a + 1 > 2").unwrap().depth(), 3);
        assert_eq!(parse("$.a + 1 + 1 + 1").unwrap().depth(), 4);
    }

    #[test]
    fn test_nesting_limit() {
        let long = format!("$.a{}", " * 2".repeat(MAX_DEPTH * 4));
        let err = parse(&long).unwrap_err();
        assert_eq!(err.kind, crate::parser::ParseErrorKind::InvalidSyntax);
        assert_eq!(err.message, "expression nests too deeply");

        let within = format!("$.a{}", " * 2".repeat(MAX_DEPTH / 2));
        assert!(parse(&within).is_ok());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("$.a > 1 2").is_err());
        assert!(parse("").is_err());
    }
}
