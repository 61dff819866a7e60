//! Tokenizer for the path-expression language
//!
//! Tokens are produced by `logos`. Whitespace is skipped. String tokens carry
//! their unescaped content; numeric tokens keep their source text so the
//! compiler can report overflow and handle `-9223372036854775808`.

use std::fmt;
use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // === Keywords ===
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("not", ignore(ascii_case))]
    Not,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("exclusive", ignore(ascii_case))]
    Exclusive,
    #[token("when")]
    When,
    #[token("with")]
    With,
    #[token("do")]
    Do,
    #[token("default")]
    Default,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // === Punctuation ===
    #[token("$")]
    Dollar,
    #[token(".")]
    Dot,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,
    #[token("=")]
    Assign,
    #[token("#")]
    Hash,
    #[token("!")]
    Bang,

    // === Operators ===
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
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
    #[token("**")]
    StarStar,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    UShr,

    // === Literals ===
    /// `?N` placeholder
    #[regex(r"\?[0-9]+", |lex| lex.slice()[1..].parse::<usize>().ok())]
    Placeholder(usize),
    /// Decimal, `0x` or `0b` integer text
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01]+", |lex| lex.slice().to_string())]
    Int(String),
    /// Float text; a digit after the point is required
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9]+", |lex| lex.slice().to_string())]
    Float(String),
    /// Quoted string, quotes stripped and escapes resolved
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Text usable as a bin, key or function name. Keywords qualify so that
    /// a bin named `in` or `default` stays addressable.
    pub fn as_name(&self) -> Option<String> {
        let keyword = match self {
            Token::Ident(name) => return Some(name.clone()),
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::In => "in",
            Token::Exclusive => "exclusive",
            Token::When => "when",
            Token::With => "with",
            Token::Do => "do",
            Token::Default => "default",
            _ => return None,
        };
        Some(keyword.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::In => "in",
            Token::Exclusive => "exclusive",
            Token::When => "when",
            Token::With => "with",
            Token::Do => "do",
            Token::Default => "default",
            Token::True => "true",
            Token::False => "false",
            Token::Dollar => "$",
            Token::Dot => ".",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Arrow => "=>",
            Token::Assign => "=",
            Token::Hash => "#",
            Token::Bang => "!",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::StarStar => "**",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::UShr => ">>>",
            Token::Placeholder(n) => return write!(f, "?{}", n),
            Token::Int(text) | Token::Float(text) | Token::Ident(text) => text,
            Token::Str(s) => return write!(f, "{:?}", s),
        };
        write!(f, "{}", text)
    }
}

/// A token with its byte range in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Input that does not form a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub fragment: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized input '{}' at offset {}",
            self.fragment, self.offset
        )
    }
}

/// Tokenizes the whole input, failing on the first unrecognized fragment
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                span: lexer.span(),
            }),
            Err(()) => {
                return Err(LexError {
                    offset: lexer.span().start,
                    fragment: lexer.slice().to_string(),
                })
            }
        }
    }
    Ok(tokens)
}

/// Strips the surrounding quotes and resolves backslash escapes
fn unquote(raw: &str) -> Option<String> {
    let inner = raw.get(1..raw.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}
