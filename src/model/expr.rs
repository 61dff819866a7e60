//! Compiled expression tree
//!
//! The output of compilation. Every node knows its resolved [`ValueType`];
//! nodes are immutable once built, so a compiled tree can be shared across
//! threads without synchronization.

use std::fmt;

use serde::Serialize;

use super::cdt::PathResult;
use super::value::{Literal, ValueType};

/// Binary operators (arithmetic, bitwise, comparison)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    ARShift,
    LRShift,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    In,
}

/// Operator families, used for type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCategory {
    Arithmetic,
    Bitwise,
    Comparison,
}

impl BinaryOp {
    pub fn category(&self) -> OpCategory {
        match self {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Pow => OpCategory::Arithmetic,
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LShift
            | BinaryOp::ARShift
            | BinaryOp::LRShift => OpCategory::Bitwise,
            BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::In => OpCategory::Comparison,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::BitAnd => "intAnd",
            BinaryOp::BitOr => "intOr",
            BinaryOp::BitXor => "intXor",
            BinaryOp::LShift => "lshift",
            BinaryOp::ARShift => "arshift",
            BinaryOp::LRShift => "rshift",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::In => "in",
        }
    }

    /// The operator that gives the same result with swapped operands
    pub fn mirrored(&self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Gt => Some(BinaryOp::Lt),
            BinaryOp::Ge => Some(BinaryOp::Le),
            BinaryOp::Lt => Some(BinaryOp::Gt),
            BinaryOp::Le => Some(BinaryOp::Ge),
            BinaryOp::Eq => Some(BinaryOp::Eq),
            BinaryOp::Ne => Some(BinaryOp::Ne),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnaryOp {
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOp {
    And,
    Or,
    Exclusive,
}

impl LogicalOp {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Exclusive => "exclusive",
        }
    }
}

/// Record metadata accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataFunction {
    DeviceSize,
    MemorySize,
    RecordSize,
    DigestModulo,
    IsTombstone,
    KeyExists,
    LastUpdate,
    SinceUpdate,
    SetName,
    Ttl,
    VoidTime,
}

impl MetadataFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "deviceSize" => Some(MetadataFunction::DeviceSize),
            "memorySize" => Some(MetadataFunction::MemorySize),
            "recordSize" => Some(MetadataFunction::RecordSize),
            "digestModulo" => Some(MetadataFunction::DigestModulo),
            "isTombstone" => Some(MetadataFunction::IsTombstone),
            "keyExists" => Some(MetadataFunction::KeyExists),
            "lastUpdate" => Some(MetadataFunction::LastUpdate),
            "sinceUpdate" => Some(MetadataFunction::SinceUpdate),
            "setName" => Some(MetadataFunction::SetName),
            "ttl" => Some(MetadataFunction::Ttl),
            "voidTime" => Some(MetadataFunction::VoidTime),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetadataFunction::DeviceSize => "deviceSize",
            MetadataFunction::MemorySize => "memorySize",
            MetadataFunction::RecordSize => "recordSize",
            MetadataFunction::DigestModulo => "digestModulo",
            MetadataFunction::IsTombstone => "isTombstone",
            MetadataFunction::KeyExists => "keyExists",
            MetadataFunction::LastUpdate => "lastUpdate",
            MetadataFunction::SinceUpdate => "sinceUpdate",
            MetadataFunction::SetName => "setName",
            MetadataFunction::Ttl => "ttl",
            MetadataFunction::VoidTime => "voidTime",
        }
    }

    /// Metadata results have a fixed type and never need inference
    pub fn value_type(&self) -> ValueType {
        match self {
            MetadataFunction::IsTombstone | MetadataFunction::KeyExists => ValueType::Bool,
            MetadataFunction::SetName => ValueType::String,
            MetadataFunction::DeviceSize
            | MetadataFunction::MemorySize
            | MetadataFunction::RecordSize
            | MetadataFunction::DigestModulo
            | MetadataFunction::LastUpdate
            | MetadataFunction::SinceUpdate
            | MetadataFunction::Ttl
            | MetadataFunction::VoidTime => ValueType::Int,
        }
    }

    /// Number of integer arguments the accessor takes
    pub fn arity(&self) -> usize {
        match self {
            MetadataFunction::DigestModulo => 1,
            _ => 0,
        }
    }
}

/// Math and bit functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Function {
    Abs,
    Ceil,
    Floor,
    Log,
    Min,
    Max,
    CountOneBits,
    FindBitLeft,
    FindBitRight,
}

/// Accepted argument count of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Function::Abs),
            "ceil" => Some(Function::Ceil),
            "floor" => Some(Function::Floor),
            "log" => Some(Function::Log),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "countOneBits" => Some(Function::CountOneBits),
            "findBitLeft" => Some(Function::FindBitLeft),
            "findBitRight" => Some(Function::FindBitRight),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Ceil => "ceil",
            Function::Floor => "floor",
            Function::Log => "log",
            Function::Min => "min",
            Function::Max => "max",
            Function::CountOneBits => "countOneBits",
            Function::FindBitLeft => "findBitLeft",
            Function::FindBitRight => "findBitRight",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::Abs | Function::Ceil | Function::Floor | Function::CountOneBits => {
                Arity::Exactly(1)
            }
            Function::Log | Function::FindBitLeft | Function::FindBitRight => Arity::Exactly(2),
            Function::Min | Function::Max => Arity::AtLeast(2),
        }
    }

    /// Parameter types; `None` means "same numeric type as the call"
    pub fn parameter_type(&self, position: usize) -> Option<ValueType> {
        match self {
            Function::Abs | Function::Min | Function::Max => None,
            Function::Ceil | Function::Floor | Function::Log => Some(ValueType::Float),
            Function::CountOneBits => Some(ValueType::Int),
            Function::FindBitLeft | Function::FindBitRight => {
                if position == 0 {
                    Some(ValueType::Int)
                } else {
                    Some(ValueType::Bool)
                }
            }
        }
    }

    /// Fixed result type; `None` when it follows the arguments
    pub fn result_type(&self) -> Option<ValueType> {
        match self {
            Function::Abs | Function::Min | Function::Max => None,
            Function::Ceil | Function::Floor | Function::Log => Some(ValueType::Float),
            Function::CountOneBits | Function::FindBitLeft | Function::FindBitRight => {
                Some(ValueType::Int)
            }
        }
    }
}

/// A typed bin reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BinRef {
    pub name: String,
    pub value_type: ValueType,
    /// Set when a cast or `get(type:)` fixed the type
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MetadataRef {
    pub function: MetadataFunction,
    pub arg: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhenArm {
    pub condition: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name: String,
    pub value: Expr,
}

/// Compiled expression node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Literal,
    },
    Bin(BinRef),
    BinExists {
        name: String,
    },
    Metadata(MetadataRef),
    Variable {
        name: String,
        value_type: ValueType,
    },
    Path(Box<PathResult>),
    Cast {
        target: ValueType,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    When {
        arms: Vec<WhenArm>,
        default: Box<Expr>,
    },
    With {
        definitions: Vec<Definition>,
        body: Box<Expr>,
    },
}

impl Expr {
    // Constructors

    pub fn literal(value: Literal) -> Self {
        Expr::Literal { value }
    }

    pub fn int(value: i64) -> Self {
        Expr::literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::literal(Literal::String(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Expr::literal(Literal::Bool(value))
    }

    /// Bin typed by inference
    pub fn bin(name: impl Into<String>, value_type: ValueType) -> Self {
        Expr::Bin(BinRef {
            name: name.into(),
            value_type,
            explicit: false,
        })
    }

    /// Bin typed by `get(type:)` or a cast
    pub fn explicit_bin(name: impl Into<String>, value_type: ValueType) -> Self {
        Expr::Bin(BinRef {
            name: name.into(),
            value_type,
            explicit: true,
        })
    }

    pub fn int_bin(name: impl Into<String>) -> Self {
        Expr::bin(name, ValueType::Int)
    }

    pub fn float_bin(name: impl Into<String>) -> Self {
        Expr::bin(name, ValueType::Float)
    }

    pub fn string_bin(name: impl Into<String>) -> Self {
        Expr::bin(name, ValueType::String)
    }

    pub fn bool_bin(name: impl Into<String>) -> Self {
        Expr::bin(name, ValueType::Bool)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ge, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, left, right)
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Le, left, right)
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ne, left, right)
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Sub, left, right)
    }

    pub fn and(operands: Vec<Expr>) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Expr>) -> Self {
        Expr::Logical {
            op: LogicalOp::Or,
            operands,
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn cast(target: ValueType, operand: Expr) -> Self {
        Expr::Cast {
            target,
            operand: Box::new(operand),
        }
    }

    pub fn path(result: PathResult) -> Self {
        Expr::Path(Box::new(result))
    }

    /// Resolved value type of this node
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Literal { value } => value.value_type(),
            Expr::Bin(bin) => bin.value_type,
            Expr::BinExists { .. } => ValueType::Bool,
            Expr::Metadata(meta) => meta.function.value_type(),
            Expr::Variable { value_type, .. } => *value_type,
            Expr::Path(path) => path.value_type,
            Expr::Cast { target, .. } => *target,
            Expr::Binary { op, left, .. } => match op.category() {
                OpCategory::Comparison => ValueType::Bool,
                OpCategory::Arithmetic | OpCategory::Bitwise => left.value_type(),
            },
            Expr::Unary { op, .. } => match op {
                UnaryOp::Not => ValueType::Bool,
                UnaryOp::BitNot => ValueType::Int,
            },
            Expr::Logical { .. } => ValueType::Bool,
            Expr::Call { function, args } => function
                .result_type()
                .or_else(|| args.first().map(Expr::value_type))
                .unwrap_or(ValueType::Int),
            Expr::When { default, .. } => default.value_type(),
            Expr::With { body, .. } => body.value_type(),
        }
    }

    /// Returns the literal if this node is a constant
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the bin if this node is a bare bin reference
    pub fn as_bin(&self) -> Option<&BinRef> {
        match self {
            Expr::Bin(bin) => Some(bin),
            _ => None,
        }
    }

    /// True for the nodes the index engine treats as leaves
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Expr::Logical { .. }
                | Expr::Unary {
                    op: UnaryOp::Not,
                    ..
                }
        )
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, items: &[Expr]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Bin(bin) => write!(f, "{}Bin({:?})", bin.value_type.bin_prefix(), bin.name),
            Expr::BinExists { name } => write!(f, "binExists({:?})", name),
            Expr::Metadata(meta) => match meta.arg {
                Some(arg) => write!(f, "{}({})", meta.function.name(), arg),
                None => write!(f, "{}()", meta.function.name()),
            },
            Expr::Variable { name, .. } => write!(f, "var({:?})", name),
            Expr::Path(path) => write!(f, "{}", path),
            Expr::Cast { target, operand } => match target {
                ValueType::Float => write!(f, "toFloat({})", operand),
                _ => write!(f, "toInt({})", operand),
            },
            Expr::Binary { op, left, right } => write!(f, "{}({}, {})", op, left, right),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "not({})", operand),
                UnaryOp::BitNot => write!(f, "intNot({})", operand),
            },
            Expr::Logical { op, operands } => write_list(f, op.name(), operands),
            Expr::Call { function, args } => write_list(f, function.name(), args),
            Expr::When { arms, default } => {
                write!(f, "cond(")?;
                for arm in arms {
                    write!(f, "{}, {}, ", arm.condition, arm.result)?;
                }
                write!(f, "{})", default)
            }
            Expr::With { definitions, body } => {
                write!(f, "let(")?;
                for def in definitions {
                    write!(f, "def({:?}, {}), ", def.name, def.value)?;
                }
                write!(f, "{})", body)
            }
        }
    }
}
