//! Index Selection Tests
//!
//! Tests for secondary-index filter selection on compiled expressions:
//! - Highest cardinality wins, ties broken by bin name
//! - Arithmetic around a bin is solved back onto the bin
//! - OR, NOT and IN never produce a filter
//! - Hint misses behave like no hint

use bindsl::{
    compile, select_filter, Expr, FilterOperation, FilterSelection, FilterValue, Index,
    IndexFilter, IndexHint, IndexSelector, IndexType, RANGE_MAX, RANGE_MIN,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn numeric(bin: &str, cardinality: i64) -> Index {
    Index::builder("test", bin)
        .name(format!("idx_{}", bin))
        .index_type(IndexType::Numeric)
        .cardinality_hint(cardinality)
        .build()
        .unwrap()
}

fn select(source: &str, indexes: &[Index], hint: Option<&IndexHint>) -> FilterSelection {
    let expr = compile(source, None).unwrap();
    select_filter(&expr, "test", indexes, hint)
}

fn filter_bounds(selection: &FilterSelection) -> Option<(String, i64, i64)> {
    let filter = selection.filter.as_ref()?;
    match filter.operation {
        FilterOperation::Range { begin, end } => Some((filter.bin.clone(), begin, end)),
        FilterOperation::Equal {
            value: FilterValue::Int(v),
        } => Some((filter.bin.clone(), v, v)),
        _ => None,
    }
}

// =============================================================================
// Cardinality Policy
// =============================================================================

/// The higher cardinality bin gets the filter; the other leaf stays.
#[test]
fn test_cardinality_selects_range() {
    let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1)];
    let selection = select("$.intBin1 > 100 and $.intBin2 > 100", &indexes, None);

    let filter = selection.filter.clone().unwrap();
    assert_eq!(filter.to_string(), IndexFilter::range("intBin2", 101, RANGE_MAX).to_string());
    assert_eq!(
        selection.residual,
        Some(compile("$.intBin1 > 100", None).unwrap())
    );
}

/// Equal cardinality picks the alphabetically first bin.
#[test]
fn test_tie_break_alphabetical() {
    let indexes = vec![numeric("zeta", 3), numeric("alpha", 3), numeric("mid", 3)];
    let selection = select("$.zeta == 1 and $.mid == 2 and $.alpha == 3", &indexes, None);
    assert_eq!(filter_bounds(&selection), Some(("alpha".into(), 3, 3)));
}

/// Bins without an index never win, whatever their position.
#[test]
fn test_unindexed_bins_skipped() {
    let indexes = vec![numeric("b", 0)];
    let selection = select("$.a == 1 and $.b < 5", &indexes, None);
    assert_eq!(filter_bounds(&selection), Some(("b".into(), RANGE_MIN, 4)));
    assert_eq!(selection.residual, Some(compile("$.a == 1", None).unwrap()));
}

// =============================================================================
// Arithmetic Equivalence
// =============================================================================

/// Constant arithmetic around the bin gives the same filter as the
/// solved comparison.
#[test]
fn test_arithmetic_equivalence() {
    let indexes = vec![numeric("apples", 1)];
    let direct = filter_bounds(&select("$.apples == 15", &indexes, None));
    assert_eq!(direct, Some(("apples".into(), 15, 15)));

    for source in [
        "($.apples - 5) == 10",
        "(20 - $.apples) == 5",
        "$.apples + 5 == 20",
        "5 + $.apples == 20",
        "$.apples * 2 == 30",
    ] {
        assert_eq!(
            filter_bounds(&select(source, &indexes, None)),
            direct,
            "source: {}",
            source
        );
    }
}

/// Equality on a single value becomes an equality filter.
#[test]
fn test_equality_filter() {
    let indexes = vec![numeric("apples", 1)];
    let selection = select("$.apples == 15", &indexes, None);
    assert_eq!(
        selection.filter.unwrap().operation,
        FilterOperation::Equal {
            value: FilterValue::Int(15)
        }
    );
    assert_eq!(selection.residual, None);
}

/// Division by zero compiles but gives no filter.
#[test]
fn test_division_by_zero_no_filter() {
    let indexes = vec![numeric("apples", 1)];
    let selection = select("$.apples / 0 <= 10", &indexes, None);
    assert!(selection.filter.is_none());
    assert_eq!(selection.residual, Some(compile("$.apples / 0 <= 10", None).unwrap()));
}

/// Membership never produces a filter.
#[test]
fn test_membership_no_filter() {
    let indexes = vec![numeric("a", 1)];
    let selection = select("$.a + 5 in [10, 20, 30]", &indexes, None);
    assert!(selection.filter.is_none());
}

// =============================================================================
// Logical Structure
// =============================================================================

/// Leaves under OR, NOT or EXCLUSIVE are never eligible.
#[test]
fn test_or_exclusion() {
    let indexes = vec![numeric("a", 1), numeric("b", 1)];
    for source in [
        "$.a > 1 or $.b > 2",
        "not($.a > 1)",
        "exclusive($.a > 1, $.b > 2)",
    ] {
        let selection = select(source, &indexes, None);
        assert!(selection.filter.is_none(), "source: {}", source);
        assert_eq!(selection.residual, Some(compile(source, None).unwrap()));
    }
}

/// A conjunct next to an OR can still be filtered.
#[test]
fn test_and_beside_or() {
    let indexes = vec![numeric("a", 1), numeric("b", 5)];
    let selection = select("$.a > 1 and ($.b > 2 or $.b < 0)", &indexes, None);
    assert_eq!(filter_bounds(&selection), Some(("a".into(), 2, RANGE_MAX)));
    assert_eq!(
        selection.residual,
        Some(compile("$.b > 2 or $.b < 0", None).unwrap())
    );
}

// =============================================================================
// Hints
// =============================================================================

/// A hint that names nothing gives the same result as no hint.
#[test]
fn test_hint_fallback_equivalence() {
    let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1)];
    let source = "$.intBin1 > 100 and $.intBin2 > 100";
    let unhinted = select(source, &indexes, None);

    for hint in [
        IndexHint::IndexName("no_such_index".into()),
        IndexHint::BinName("no_such_bin".into()),
    ] {
        assert_eq!(select(source, &indexes, Some(&hint)), unhinted);
    }
}

/// Index-name hints override cardinality.
#[test]
fn test_index_name_hint() {
    let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1)];
    let hint = IndexHint::IndexName("idx_intBin1".into());
    let selection = select("$.intBin1 > 100 and $.intBin2 > 100", &indexes, Some(&hint));
    assert_eq!(filter_bounds(&selection), Some(("intBin1".into(), 101, RANGE_MAX)));
}

/// Explain reports the chosen index and the residual.
#[test]
fn test_explain_matches_selection() {
    let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1)];
    let expr: Expr = compile("$.intBin1 > 100 and $.intBin2 > 100", None).unwrap();
    let selector = IndexSelector::new("test", &indexes);

    let selection = selector.select(&expr, None);
    let explain = selector.explain(&expr, None);

    assert_eq!(explain.filter, selection.filter.map(|f| f.to_string()));
    assert_eq!(explain.residual, selection.residual.map(|r| r.to_string()));
    assert_eq!(explain.selected_index.as_deref(), Some("idx_intBin2"));
}
