//! Residual expression after removing the filtered leaf

use std::ptr;

use crate::model::{Expr, LogicalOp};

/// Removes `chosen` (by identity) from the AND chain of `expr`
///
/// ANDs left with one operand collapse to that operand; `None` means the
/// filter covers the whole expression.
pub fn residual(expr: &Expr, chosen: &Expr) -> Option<Expr> {
    if ptr::eq(expr, chosen) {
        return None;
    }

    match expr {
        Expr::Logical {
            op: LogicalOp::And,
            operands,
        } => {
            let mut rest: Vec<Expr> = operands
                .iter()
                .filter_map(|operand| residual(operand, chosen))
                .collect();
            match rest.len() {
                0 => None,
                1 => rest.pop(),
                _ => Some(Expr::and(rest)),
            }
        }
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_leaf_leaves_nothing() {
        let expr = Expr::eq(Expr::int_bin("a"), Expr::int(1));
        assert_eq!(residual(&expr, &expr), None);
    }

    #[test]
    fn test_and_collapses_to_remaining_leaf() {
        let expr = Expr::and(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::gt(Expr::int_bin("b"), Expr::int(2)),
        ]);
        let Expr::Logical { operands, .. } = &expr else {
            unreachable!()
        };
        assert_eq!(
            residual(&expr, &operands[1]),
            Some(Expr::gt(Expr::int_bin("a"), Expr::int(1)))
        );
    }

    #[test]
    fn test_nested_and_keeps_shape() {
        let expr = Expr::and(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::and(vec![
                Expr::gt(Expr::int_bin("b"), Expr::int(2)),
                Expr::gt(Expr::int_bin("c"), Expr::int(3)),
            ]),
        ]);
        let Expr::Logical { operands, .. } = &expr else {
            unreachable!()
        };
        let Expr::Logical { operands: inner, .. } = &operands[1] else {
            unreachable!()
        };
        assert_eq!(
            residual(&expr, &inner[0]),
            Some(Expr::and(vec![
                Expr::gt(Expr::int_bin("a"), Expr::int(1)),
                Expr::gt(Expr::int_bin("c"), Expr::int(3)),
            ]))
        );
    }

    #[test]
    fn test_equal_but_distinct_leaf_kept() {
        let leaf = Expr::gt(Expr::int_bin("a"), Expr::int(1));
        let expr = Expr::and(vec![leaf.clone(), leaf.clone()]);
        let Expr::Logical { operands, .. } = &expr else {
            unreachable!()
        };
        assert_eq!(residual(&expr, &operands[0]), Some(leaf));
    }
}
