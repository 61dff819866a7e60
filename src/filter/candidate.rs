//! Index candidates
//!
//! A candidate is an eligible leaf reduced to "bin X lies in this set":
//! an integer interval for INT bins, a single value for STRING and BLOB.
//! Arithmetic around the bin (`$.a - 5 == 10`, `$.a * -2 > 7`) is solved
//! back onto the bin over i128, so no intermediate step can overflow i64.

use super::{RANGE_MAX, RANGE_MIN};
use crate::model::{BinaryOp, Expr, Literal, OpCategory, ValueType};

/// Closed integer interval; `None` is unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub low: Option<i128>,
    pub high: Option<i128>,
}

impl Interval {
    /// Interval of the values satisfying `x <op> value`
    pub fn from_comparison(op: BinaryOp, value: i64) -> Option<Self> {
        let v = i128::from(value);
        let (low, high) = match op {
            BinaryOp::Eq => (Some(v), Some(v)),
            BinaryOp::Gt => (Some(v + 1), None),
            BinaryOp::Ge => (Some(v), None),
            BinaryOp::Lt => (None, Some(v - 1)),
            BinaryOp::Le => (None, Some(v)),
            _ => return None,
        };
        Some(Self { low, high })
    }

    fn map_bounds(
        self,
        low: impl Fn(i128) -> Option<i128>,
        high: impl Fn(i128) -> Option<i128>,
    ) -> Option<Self> {
        Some(Self {
            low: match self.low {
                Some(v) => Some(low(v)?),
                None => None,
            },
            high: match self.high {
                Some(v) => Some(high(v)?),
                None => None,
            },
        })
    }

    /// `{x - c : x in self}`
    fn shift(self, c: i128) -> Option<Self> {
        self.map_bounds(|v| v.checked_sub(c), |v| v.checked_sub(c))
    }

    /// `{c - x : x in self}`
    fn reflect(self, c: i128) -> Option<Self> {
        Some(Self {
            low: match self.high {
                Some(v) => Some(c.checked_sub(v)?),
                None => None,
            },
            high: match self.low {
                Some(v) => Some(c.checked_sub(v)?),
                None => None,
            },
        })
    }

    /// `{e : e * c in self}`
    fn unscale(self, c: i128) -> Option<Self> {
        if c > 0 {
            self.map_bounds(|v| Some(div_ceil(v, c)), |v| Some(div_floor(v, c)))
        } else if c < 0 {
            // e * c = (-e) * |c|
            self.unscale(-c)?.reflect(0)
        } else {
            None
        }
    }

    /// `{e : e / c in self}` with truncating division
    fn untruncate(self, c: i128) -> Option<Self> {
        if c > 0 {
            let slack = c - 1;
            self.map_bounds(
                |q| {
                    let base = q.checked_mul(c)?;
                    if q > 0 {
                        Some(base)
                    } else {
                        base.checked_sub(slack)
                    }
                },
                |q| {
                    let base = q.checked_mul(c)?;
                    if q >= 0 {
                        base.checked_add(slack)
                    } else {
                        Some(base)
                    }
                },
            )
        } else if c < 0 {
            // e / c = -(e / |c|)
            self.reflect(0)?.untruncate(-c)
        } else {
            None
        }
    }

    /// Clamps to the range sentinels; `None` when nothing remains
    pub fn clamp(self) -> Option<(i64, i64)> {
        let (min, max) = (i128::from(RANGE_MIN), i128::from(RANGE_MAX));
        let low = self.low.map_or(min, |v| v.max(min));
        let high = self.high.map_or(max, |v| v.min(max));
        if low > high {
            return None;
        }
        Some((i64::try_from(low).ok()?, i64::try_from(high).ok()?))
    }
}

fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// What the candidate says about its bin
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateValue {
    /// Inclusive i64 bounds, already clamped
    Int { begin: i64, end: i64 },
    String(String),
    Blob(Vec<u8>),
}

/// One eligible leaf reduced to a bin constraint
#[derive(Debug, Clone)]
pub struct Candidate<'e> {
    /// The leaf in the compiled tree
    pub leaf: &'e Expr,
    pub bin: &'e str,
    /// Comparison after moving the literal to the right
    pub op: BinaryOp,
    pub value: CandidateValue,
}

impl<'e> Candidate<'e> {
    pub fn value_type(&self) -> ValueType {
        match self.value {
            CandidateValue::Int { .. } => ValueType::Int,
            CandidateValue::String(_) => ValueType::String,
            CandidateValue::Blob(_) => ValueType::Blob,
        }
    }
}

/// Reduces a leaf to a candidate, or `None` when no index can serve it
pub fn extract(leaf: &Expr) -> Option<Candidate<'_>> {
    let Expr::Binary { op, left, right } = leaf else {
        return None;
    };
    if op.category() != OpCategory::Comparison || matches!(op, BinaryOp::In | BinaryOp::Ne) {
        return None;
    }

    let (op, operand, literal) = match (left.as_literal(), right.as_literal()) {
        (None, Some(literal)) => (*op, left.as_ref(), literal),
        (Some(literal), None) => (op.mirrored()?, right.as_ref(), literal),
        _ => return None,
    };

    match literal {
        Literal::Int(value) => {
            let interval = Interval::from_comparison(op, *value)?;
            let (bin, interval) = solve(operand, interval)?;
            let (begin, end) = interval.clamp()?;
            Some(Candidate {
                leaf,
                bin,
                op,
                value: CandidateValue::Int { begin, end },
            })
        }
        Literal::String(s) if op == BinaryOp::Eq => {
            let bin = operand.as_bin().filter(|b| b.value_type == ValueType::String)?;
            Some(Candidate {
                leaf,
                bin: &bin.name,
                op,
                value: CandidateValue::String(s.clone()),
            })
        }
        Literal::Blob(bytes) if op == BinaryOp::Eq => {
            let bin = operand.as_bin().filter(|b| b.value_type == ValueType::Blob)?;
            Some(Candidate {
                leaf,
                bin: &bin.name,
                op,
                value: CandidateValue::Blob(bytes.clone()),
            })
        }
        _ => None,
    }
}

/// Peels `+ - * /` with an INT constant off `expr` until a bare INT bin
/// remains, moving each step onto `interval`
fn solve(expr: &Expr, interval: Interval) -> Option<(&str, Interval)> {
    match expr {
        Expr::Bin(bin) if bin.value_type == ValueType::Int => Some((&bin.name, interval)),
        Expr::Binary { op, left, right } => {
            match (op, int_constant(left), int_constant(right)) {
                // e + c, c + e
                (BinaryOp::Add, None, Some(c)) => solve(left, interval.shift(c)?),
                (BinaryOp::Add, Some(c), None) => solve(right, interval.shift(c)?),
                // e - c
                (BinaryOp::Sub, None, Some(c)) => solve(left, interval.shift(c.checked_neg()?)?),
                // c - e
                (BinaryOp::Sub, Some(c), None) => solve(right, interval.reflect(c)?),
                // e * c, c * e
                (BinaryOp::Mul, None, Some(c)) => solve(left, interval.unscale(c)?),
                (BinaryOp::Mul, Some(c), None) => solve(right, interval.unscale(c)?),
                // e / c; c / e has no interval form
                (BinaryOp::Div, None, Some(c)) => solve(left, interval.untruncate(c)?),
                _ => None,
            }
        }
        _ => None,
    }
}

fn int_constant(expr: &Expr) -> Option<i128> {
    match expr.as_literal() {
        Some(Literal::Int(c)) => Some(i128::from(*c)),
        _ => None,
    }
}
