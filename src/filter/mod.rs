//! Secondary-index filter selection
//!
//! Splits a compiled expression into at most one index filter plus the
//! residual expression that must still be evaluated per record.
//!
//! # Eligibility
//!
//! Only the conjuncts of a top-level AND (nested ANDs flattened), or the
//! whole tree when it is a single comparison, can become a filter. Anything
//! under OR, EXCLUSIVE or NOT stays in the residual, as do IN leaves.
//!
//! # Selection Priority (strict order)
//!
//! 1. Index-name hint
//! 2. Bin-name hint
//! 3. Highest cardinality hint among bins with a candidate and an index
//!
//! Ties broken alphabetically by bin name. A hint that selects nothing falls
//! back to automatic selection over the whole namespace. Selection never
//! fails; the worst outcome is "no filter".

mod candidate;
mod explain;
mod residual;
mod selector;

pub use candidate::{extract, Candidate, CandidateValue, Interval};
pub use explain::{CandidateExplain, SelectionExplain};
pub use residual::residual;
pub use selector::{IndexSelector, SelectionReason};

use std::fmt;

use serde::Serialize;

use crate::model::{BinaryOp, Expr, Index, IndexHint, IndexType, LogicalOp};

/// Lower sentinel of an open range filter
pub const RANGE_MIN: i64 = i64::MIN;

/// Upper sentinel of an open range filter
pub const RANGE_MAX: i64 = i64::MAX;

/// Value of an equality filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterValue {
    Int(i64),
    String(String),
    Blob(Vec<u8>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::String(s) => write!(f, "{:?}", s),
            FilterValue::Blob(bytes) => write!(f, "blob({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterOperation {
    Equal { value: FilterValue },
    /// Inclusive bounds
    Range { begin: i64, end: i64 },
}

/// An index-backed predicate on one bin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFilter {
    pub bin: String,
    /// Name of the serving index, when the catalog entry has one
    pub index_name: Option<String>,
    pub index_type: IndexType,
    pub operation: FilterOperation,
}

impl IndexFilter {
    /// Builds the filter a candidate produces on `index`
    pub fn from_candidate(candidate: &Candidate<'_>, index: &Index) -> Self {
        let operation = match &candidate.value {
            CandidateValue::Int { begin, end } if begin == end && candidate.op == BinaryOp::Eq => {
                FilterOperation::Equal {
                    value: FilterValue::Int(*begin),
                }
            }
            CandidateValue::Int { begin, end } => FilterOperation::Range {
                begin: *begin,
                end: *end,
            },
            CandidateValue::String(s) => FilterOperation::Equal {
                value: FilterValue::String(s.clone()),
            },
            CandidateValue::Blob(bytes) => FilterOperation::Equal {
                value: FilterValue::Blob(bytes.clone()),
            },
        };

        Self {
            bin: candidate.bin.to_string(),
            index_name: index.name().map(str::to_string),
            index_type: index.index_type(),
            operation,
        }
    }

    pub fn equal(bin: impl Into<String>, value: FilterValue) -> Self {
        let index_type = match value {
            FilterValue::Int(_) => IndexType::Numeric,
            FilterValue::String(_) => IndexType::String,
            FilterValue::Blob(_) => IndexType::Blob,
        };
        Self {
            bin: bin.into(),
            index_name: None,
            index_type,
            operation: FilterOperation::Equal { value },
        }
    }

    pub fn range(bin: impl Into<String>, begin: i64, end: i64) -> Self {
        Self {
            bin: bin.into(),
            index_name: None,
            index_type: IndexType::Numeric,
            operation: FilterOperation::Range { begin, end },
        }
    }
}

impl fmt::Display for IndexFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            FilterOperation::Equal { value } => write!(f, "equal({}, {})", self.bin, value),
            FilterOperation::Range { begin, end } => {
                write!(f, "range({}, {}, {})", self.bin, begin, end)
            }
        }
    }
}

/// Outcome of filter selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSelection {
    pub filter: Option<IndexFilter>,
    /// What is left to evaluate; `None` when the filter covers everything
    pub residual: Option<Expr>,
}

/// Selects at most one index filter for `expr` on `namespace`
pub fn select_filter(
    expr: &Expr,
    namespace: &str,
    indexes: &[Index],
    hint: Option<&IndexHint>,
) -> FilterSelection {
    IndexSelector::new(namespace, indexes).select(expr, hint)
}

/// Leaves that may become a filter, in source order
pub fn eligible_leaves(expr: &Expr) -> Vec<&Expr> {
    let mut leaves = Vec::new();
    collect_leaves(expr, &mut leaves);
    leaves
}

fn collect_leaves<'e>(expr: &'e Expr, leaves: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Logical {
            op: LogicalOp::And,
            operands,
        } => {
            for operand in operands {
                collect_leaves(operand, leaves);
            }
        }
        other if other.is_logical() => {}
        leaf => leaves.push(leaf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryOp, Literal};

    #[test]
    fn test_leaves_flatten_nested_and() {
        let expr = Expr::and(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::and(vec![
                Expr::gt(Expr::int_bin("b"), Expr::int(2)),
                Expr::or(vec![
                    Expr::gt(Expr::int_bin("c"), Expr::int(3)),
                    Expr::gt(Expr::int_bin("d"), Expr::int(4)),
                ]),
            ]),
        ]);
        let leaves = eligible_leaves(&expr);
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1], &Expr::gt(Expr::int_bin("b"), Expr::int(2)));
    }

    #[test]
    fn test_or_root_has_no_leaves() {
        let expr = Expr::or(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::gt(Expr::int_bin("b"), Expr::int(2)),
        ]);
        assert!(eligible_leaves(&expr).is_empty());
        assert!(eligible_leaves(&Expr::not(Expr::bool_bin("a"))).is_empty());
    }

    #[test]
    fn test_single_comparison_is_a_leaf() {
        let expr = Expr::binary(
            BinaryOp::In,
            Expr::int_bin("a"),
            Expr::literal(Literal::List(vec![Literal::Int(1)])),
        );
        assert_eq!(eligible_leaves(&expr).len(), 1);
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(
            IndexFilter::range("intBin2", 101, RANGE_MAX).to_string(),
            "range(intBin2, 101, 9223372036854775807)"
        );
        assert_eq!(
            IndexFilter::equal("name", FilterValue::String("bob".into())).to_string(),
            "equal(name, \"bob\")"
        );
    }
}
