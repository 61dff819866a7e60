//! bindsl - A strict, deterministic compiler for record path expressions
//!
//! Source text is compiled into a typed filter-expression tree, and the tree
//! is split into at most one secondary-index filter plus a residual.
//!
//! ```ignore
//! use bindsl::{compile, select_filter};
//!
//! let expr = compile("$.intBin1 > 100 and $.intBin2 > 100", None)?;
//! let selection = select_filter(&expr, "test", &indexes, None);
//! ```

pub mod cli;
pub mod compiler;
pub mod filter;
pub mod lexer;
pub mod model;
pub mod observability;
pub mod parser;

pub use compiler::{
    compile, parse, CompileError, CompileErrorCode, CompileResult, ParsedExpression,
    PlaceholderValues,
};
pub use filter::{
    select_filter, FilterOperation, FilterSelection, FilterValue, IndexFilter, IndexSelector,
    SelectionExplain, RANGE_MAX, RANGE_MIN,
};
pub use model::{Expr, Index, IndexCollectionType, IndexHint, IndexType, Literal, ValueType};
