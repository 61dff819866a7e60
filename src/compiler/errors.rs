//! Compilation error types
//!
//! Error codes:
//! - DSL_SYNTAX_ERROR
//! - DSL_TYPE_MISMATCH
//! - DSL_ARITY_ERROR
//! - DSL_UNRESOLVED_REFERENCE
//! - DSL_INVALID_PATH
//!
//! Every error aborts the compilation; nothing is accumulated.

use std::fmt;

use thiserror::Error;

use crate::model::{Arity, ValueType};
use crate::parser::ParseError;

/// Fixed lead of every syntax error message
pub const SYNTAX_ERROR_MESSAGE: &str = "Could not parse given input, wrong syntax";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorCode {
    /// Malformed source text
    Syntax,
    /// Incompatible operand types
    TypeMismatch,
    /// Wrong number of arguments
    Arity,
    /// Undefined variable, placeholder, function or parameter
    UnresolvedReference,
    /// Bad path root or descriptor
    InvalidPath,
}

impl CompileErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorCode::Syntax => "DSL_SYNTAX_ERROR",
            CompileErrorCode::TypeMismatch => "DSL_TYPE_MISMATCH",
            CompileErrorCode::Arity => "DSL_ARITY_ERROR",
            CompileErrorCode::UnresolvedReference => "DSL_UNRESOLVED_REFERENCE",
            CompileErrorCode::InvalidPath => "DSL_INVALID_PATH",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The single error type of compilation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct CompileError {
    code: CompileErrorCode,
    message: String,
}

impl CompileError {
    /// Malformed input; `detail` is appended to the fixed message
    pub fn syntax(detail: impl fmt::Display) -> Self {
        Self {
            code: CompileErrorCode::Syntax,
            message: format!("{}: {}", SYNTAX_ERROR_MESSAGE, detail),
        }
    }

    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self {
            code: CompileErrorCode::TypeMismatch,
            message: reason.into(),
        }
    }

    /// Two operands of different types
    pub fn incompatible(left: ValueType, right: ValueType) -> Self {
        Self::type_mismatch(format!(
            "Cannot compare {} to {}: operand types must match",
            left, right
        ))
    }

    pub fn arity(function: &str, expected: Arity, found: usize) -> Self {
        Self {
            code: CompileErrorCode::Arity,
            message: format!(
                "Function '{}' expects {} argument(s), got {}",
                function, expected, found
            ),
        }
    }

    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self {
            code: CompileErrorCode::UnresolvedReference,
            message: reason.into(),
        }
    }

    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Self {
            code: CompileErrorCode::InvalidPath,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> CompileErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        Self::syntax(err)
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
