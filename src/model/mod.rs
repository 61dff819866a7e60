//! Data model shared by the compiler and the index selection engine

pub mod cdt;
pub mod expr;
pub mod index;
pub mod value;

pub use cdt::{
    Accessor, CdtStep, CollectionKind, ContextFrame, PathChain, PathFunction, PathResult,
    ReturnType, RETURN_INVERTED,
};
pub use expr::{
    Arity, BinRef, BinaryOp, Definition, Expr, Function, LogicalOp, MetadataFunction, MetadataRef,
    OpCategory, UnaryOp, WhenArm,
};
pub use index::{
    Index, IndexBuilder, IndexCollectionType, IndexError, IndexHint, IndexSelectionContext,
    IndexType,
};
pub use value::{Literal, MapKey, ValueType};
