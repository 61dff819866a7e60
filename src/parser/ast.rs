//! Syntax tree produced by the parser
//!
//! The tree is untyped: literals keep their source text and path descriptors
//! keep their raw tokens. Types are decided later by the compiler.

use crate::lexer::Token;
use crate::model::{BinaryOp, ValueType};

/// Syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Integer text, e.g. `255`, `0xFF`, `0b11`
    Int(String),
    /// Float text, e.g. `1.5`, `.5`
    Float(String),
    /// Unquoted string content
    Str(String),
    Bool(bool),
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
    /// `?N`
    Placeholder(usize),
    /// `${name}`
    Variable(String),
    /// `$.bin...`
    Path(PathSyntax),
    /// `$.ttl()`, `$.digestModulo(3)`
    Metadata { name: String, args: Vec<Node> },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Unary `-`
    Negate(Box<Node>),
    /// Unary `~`
    BitNot(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Exclusive(Vec<Node>),
    /// `abs(x)`, `max(a, b, c)`
    Call { name: String, args: Vec<Node> },
    /// Literal cast `5.asFloat()`
    Cast {
        operand: Box<Node>,
        target: ValueType,
    },
    When {
        arms: Vec<(Node, Node)>,
        default: Box<Node>,
    },
    With {
        definitions: Vec<(String, Node)>,
        body: Box<Node>,
    },
}

impl Node {
    /// Height of the tree rooted here, leaves count as 1
    ///
    /// Walks with an explicit stack so measuring never recurses.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.children().into_iter().map(|child| (child, level + 1)));
        }
        deepest
    }

    fn children(&self) -> Vec<&Node> {
        match self {
            Node::Int(_)
            | Node::Float(_)
            | Node::Str(_)
            | Node::Bool(_)
            | Node::Placeholder(_)
            | Node::Variable(_)
            | Node::Path(_) => Vec::new(),
            Node::List(items) | Node::And(items) | Node::Or(items) | Node::Exclusive(items) => {
                items.iter().collect()
            }
            Node::Metadata { args, .. } | Node::Call { args, .. } => args.iter().collect(),
            Node::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            Node::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Node::Negate(inner) | Node::BitNot(inner) | Node::Not(inner) => vec![inner.as_ref()],
            Node::Cast { operand, .. } => vec![operand.as_ref()],
            Node::When { arms, default } => arms
                .iter()
                .flat_map(|(condition, result)| [condition, result])
                .chain(std::iter::once(default.as_ref()))
                .collect(),
            Node::With { definitions, body } => definitions
                .iter()
                .map(|(_, value)| value)
                .chain(std::iter::once(body.as_ref()))
                .collect(),
        }
    }
}

/// A bin path: root name, descriptor segments, terminal function
#[derive(Debug, Clone, PartialEq)]
pub struct PathSyntax {
    pub segments: Vec<PathSegment>,
    pub function: Option<FunctionSyntax>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `.name` or `.'quoted name'`
    Name(String),
    /// `.[ ... ]`
    List(Fragment),
    /// `.{ ... }`
    Map(Fragment),
}

/// Raw contents of one bracketed path descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Source text including the brackets, used in error messages
    pub text: String,
    /// Tokens between the brackets
    pub tokens: Vec<Token>,
}

/// `.get(type: INT, return: VALUE)`, `.count()`, ...
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSyntax {
    pub name: String,
    pub params: Vec<(String, String)>,
}
