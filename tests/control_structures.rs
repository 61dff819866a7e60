//! Control Structure Tests
//!
//! Tests for `when`, `with`, logical operators and function calls compiled
//! through the public API.

use bindsl::model::{Function, LogicalOp, UnaryOp};
use bindsl::{compile, CompileErrorCode, Expr, ValueType};

fn ok(source: &str) -> Expr {
    compile(source, None).unwrap()
}

// =============================================================================
// when
// =============================================================================

/// Arms compile to condition/result pairs with a shared result type.
#[test]
fn test_when_arms() {
    let expr = ok("when ($.a == 1 => 10, $.a == 2 => 20, default => 0) > $.b");
    let Expr::Binary { left, right, .. } = expr else {
        panic!("expected binary");
    };
    let Expr::When { arms, default } = *left else {
        panic!("expected when");
    };
    assert_eq!(arms.len(), 2);
    assert_eq!(arms[0].condition, Expr::eq(Expr::int_bin("a"), Expr::int(1)));
    assert_eq!(arms[1].result, Expr::int(20));
    assert_eq!(*default, Expr::int(0));
    assert_eq!(*right, Expr::int_bin("b"));
}

/// Mixed result types are rejected.
#[test]
fn test_when_mixed_results() {
    let err = compile("when ($.a == 1 => 1.5, default => 'x') == $.b", None).unwrap_err();
    assert_eq!(err.code(), CompileErrorCode::TypeMismatch);
}

// =============================================================================
// with
// =============================================================================

/// Definitions are visible to later definitions and the body.
#[test]
fn test_with_bindings() {
    let expr = ok("with (x = 2.5, y = ${x} * 2.0) do (${y} < $.a)");
    let Expr::With { definitions, body } = expr else {
        panic!("expected with");
    };
    assert_eq!(definitions[0].value.value_type(), ValueType::Float);
    assert_eq!(definitions[1].value.value_type(), ValueType::Float);
    let Expr::Binary { right, .. } = *body else {
        panic!("expected binary body");
    };
    assert_eq!(*right, Expr::float_bin("a"));
}

/// Variables outside their scope are unresolved.
#[test]
fn test_with_unknown_variable() {
    let err = compile("with (x = 1) do (${y} == 1)", None).unwrap_err();
    assert_eq!(err.code(), CompileErrorCode::UnresolvedReference);
}

// =============================================================================
// Logical Operators
// =============================================================================

/// Keywords are case-insensitive and `and` binds tighter than `or`.
#[test]
fn test_logical_precedence() {
    assert_eq!(
        ok("$.a > 1 OR $.b > 2 And $.c > 3"),
        Expr::or(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::and(vec![
                Expr::gt(Expr::int_bin("b"), Expr::int(2)),
                Expr::gt(Expr::int_bin("c"), Expr::int(3)),
            ]),
        ])
    );
}

/// not() and exclusive() take BOOL operands.
#[test]
fn test_not_and_exclusive() {
    assert!(matches!(
        ok("not($.a > 1)"),
        Expr::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
    assert!(matches!(
        ok("exclusive($.a > 1, $.b > 2)"),
        Expr::Logical {
            op: LogicalOp::Exclusive,
            ..
        }
    ));
    assert_eq!(
        compile("exclusive($.a > 1)", None).unwrap_err().code(),
        CompileErrorCode::Arity
    );
}

// =============================================================================
// Functions and Arithmetic
// =============================================================================

/// Function arguments follow the comparison type.
#[test]
fn test_function_calls() {
    assert_eq!(
        ok("abs($.a) > 5"),
        Expr::gt(
            Expr::Call {
                function: Function::Abs,
                args: vec![Expr::int_bin("a")],
            },
            Expr::int(5)
        )
    );
    assert_eq!(
        compile("abs($.a, $.b) > 5", None).unwrap_err().code(),
        CompileErrorCode::Arity
    );
}

/// Division by a zero literal compiles; it is the runtime's concern.
#[test]
fn test_division_by_zero_compiles() {
    assert!(compile("$.apples / 0 <= 10", None).is_ok());
}
