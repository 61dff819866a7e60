//! Type resolution
//!
//! Types are decided top-down. A comparison (or arithmetic root, `when`,
//! `with` definition) scans its operands for the first literal kind, falling
//! back to the first explicitly typed operand, and threads the result down as
//! a [`TypeHint`]. Bins and untyped collection accessors take the hint's
//! type when they are built. Nothing is patched afterwards.

use super::errors::{CompileError, CompileResult};
use super::literals::decode_blob;
use super::path::declared_type;
use super::placeholder::PlaceholderValues;
use crate::model::{BinaryOp, Expr, Function, Literal, MetadataFunction, OpCategory, ValueType};
use crate::parser::Node;

/// Type context passed into child compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHint {
    /// Type discovered from a sibling literal or typed operand
    pub ambient: Option<ValueType>,
    /// Type used when nothing was discovered
    pub default: ValueType,
}

impl TypeHint {
    /// Arithmetic, bitwise and comparison operands default to INT
    pub const NUMERIC: TypeHint = TypeHint {
        ambient: None,
        default: ValueType::Int,
    };

    /// Operands of `and`, `or`, `not`, `exclusive` and `when` conditions
    pub const LOGICAL: TypeHint = TypeHint {
        ambient: None,
        default: ValueType::Bool,
    };

    pub fn exact(ty: ValueType) -> Self {
        Self {
            ambient: Some(ty),
            default: ty,
        }
    }

    pub fn numeric(ambient: Option<ValueType>) -> Self {
        Self {
            ambient,
            default: ValueType::Int,
        }
    }

    /// Keeps an existing ambient type, otherwise adopts `discovered`
    pub fn or_discovered(self, discovered: impl FnOnce() -> Option<ValueType>) -> Self {
        match self.ambient {
            Some(_) => self,
            None => Self {
                ambient: discovered(),
                default: self.default,
            },
        }
    }

    pub fn resolve(&self) -> ValueType {
        self.ambient.unwrap_or(self.default)
    }
}

/// Scans syntax for the type a group of operands should share
pub struct Inference<'a> {
    values: &'a PlaceholderValues,
    scope: &'a [(String, ValueType)],
}

impl<'a> Inference<'a> {
    pub fn new(values: &'a PlaceholderValues, scope: &'a [(String, ValueType)]) -> Self {
        Self { values, scope }
    }

    /// First literal kind in pre-order, else the first explicit type
    pub fn infer(&self, nodes: &[&Node]) -> Option<ValueType> {
        nodes
            .iter()
            .find_map(|node| self.literal_kind(node))
            .or_else(|| nodes.iter().find_map(|node| self.explicit_kind(node)))
    }

    fn literal_kind(&self, node: &Node) -> Option<ValueType> {
        match node {
            Node::Int(_) => Some(ValueType::Int),
            Node::Float(_) => Some(ValueType::Float),
            Node::Str(_) => Some(ValueType::String),
            Node::Bool(_) => Some(ValueType::Bool),
            Node::List(_) => Some(ValueType::List),
            Node::Map(_) => Some(ValueType::Map),
            Node::Placeholder(index) => self.values.peek(*index).map(Literal::value_type),
            Node::Cast { operand, target } => self.literal_kind(operand).map(|_| *target),
            Node::Negate(operand) | Node::BitNot(operand) => self.literal_kind(operand),
            Node::Binary { op, left, right } if op.category() != OpCategory::Comparison => self
                .literal_kind(left)
                .or_else(|| self.literal_kind(right)),
            Node::Call { name, args } if follows_arguments(name) => {
                args.iter().find_map(|arg| self.literal_kind(arg))
            }
            Node::When { arms, default } => arms
                .iter()
                .map(|(_, result)| result)
                .chain(std::iter::once(&**default))
                .find_map(|result| self.literal_kind(result)),
            Node::With { body, .. } => self.literal_kind(body),
            _ => None,
        }
    }

    fn explicit_kind(&self, node: &Node) -> Option<ValueType> {
        match node {
            Node::Path(path) => declared_type(path),
            Node::Metadata { name, .. } => {
                MetadataFunction::from_name(name).map(|m| m.value_type())
            }
            Node::Variable(name) => self
                .scope
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, ty)| *ty),
            Node::Cast { target, .. } => Some(*target),
            Node::Negate(operand) | Node::BitNot(operand) => self.explicit_kind(operand),
            Node::Binary { op, left, right } if op.category() != OpCategory::Comparison => self
                .explicit_kind(left)
                .or_else(|| self.explicit_kind(right)),
            Node::Call { name, args } => match Function::from_name(name) {
                Some(function) => function
                    .result_type()
                    .or_else(|| args.iter().find_map(|arg| self.explicit_kind(arg))),
                None => None,
            },
            Node::When { arms, default } => arms
                .iter()
                .map(|(_, result)| result)
                .chain(std::iter::once(&**default))
                .find_map(|result| self.explicit_kind(result)),
            _ => None,
        }
    }
}

/// abs, min and max return the type of their arguments
fn follows_arguments(name: &str) -> bool {
    Function::from_name(name).is_some_and(|f| f.result_type().is_none())
}

/// Checks comparison operands, decoding a STRING literal compared to a BLOB
pub fn unify_comparison(left: Expr, right: Expr) -> CompileResult<(Expr, Expr)> {
    let (lt, rt) = (left.value_type(), right.value_type());
    if lt == rt {
        return Ok((left, right));
    }
    if lt == ValueType::Blob {
        if let Some(Literal::String(text)) = right.as_literal() {
            let bytes = decode_blob(text)?;
            return Ok((left, Expr::literal(Literal::Blob(bytes))));
        }
    }
    if rt == ValueType::Blob {
        if let Some(Literal::String(text)) = left.as_literal() {
            let bytes = decode_blob(text)?;
            return Ok((Expr::literal(Literal::Blob(bytes)), right));
        }
    }
    Err(CompileError::incompatible(lt, rt))
}

/// Arithmetic operands must be INT or FLOAT and agree; bitwise needs INT
pub fn check_arithmetic(op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<()> {
    let (lt, rt) = (left.value_type(), right.value_type());
    for ty in [lt, rt] {
        if !ty.is_numeric() {
            return Err(CompileError::type_mismatch(format!(
                "Operator '{}' requires numeric operands, got {}",
                op, ty
            )));
        }
        if op.category() == OpCategory::Bitwise && ty != ValueType::Int {
            return Err(CompileError::type_mismatch(format!(
                "Operator '{}' requires INT operands, got {}",
                op, ty
            )));
        }
    }
    if lt != rt {
        return Err(CompileError::type_mismatch(format!(
            "Operator '{}' cannot mix {} and {}",
            op, lt, rt
        )));
    }
    Ok(())
}

/// Requires one exact type
pub fn expect_type(expr: &Expr, expected: ValueType, context: &str) -> CompileResult<()> {
    let actual = expr.value_type();
    if actual == expected {
        Ok(())
    } else {
        Err(CompileError::type_mismatch(format!(
            "{} requires {}, got {}",
            context, expected, actual
        )))
    }
}
