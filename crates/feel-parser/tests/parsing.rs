//! Integration tests for the public parse() API.

mod common;

use feel_parser::{Args, BinaryOp, Expr, Quantifier, RangeBound};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ============================================================================
// Literals and references
// ============================================================================

#[test]
fn parse_number_literals() {
    assert_eq!(common::assert_parses("0").node, Expr::Number(dec("0")));
    assert_eq!(common::assert_parses("123").node, Expr::Number(dec("123")));
    assert_eq!(common::assert_parses("1.5").node, Expr::Number(dec("1.5")));
    assert_eq!(common::assert_parses(".25").node, Expr::Number(dec("0.25")));
}

#[test]
fn scientific_notation_is_rejected() {
    // `1e10` lexes as a number followed by a name, which is not a valid
    // expression.
    common::assert_parse_fails("1e10");
}

#[test]
fn parse_string_literals() {
    assert_eq!(
        common::assert_parses(r#""hello world""#).node,
        Expr::String("hello world".to_string())
    );
    assert_eq!(
        common::assert_parses(r#""line\nbreak""#).node,
        Expr::String("line\nbreak".to_string())
    );
    // Unknown escapes survive verbatim.
    assert_eq!(
        common::assert_parses(r#""\d+""#).node,
        Expr::String(r"\d+".to_string())
    );
}

#[test]
fn parse_backtick_reference() {
    assert_eq!(
        common::assert_parses("`order number`").node,
        Expr::Ref(vec!["order number".to_string()])
    );
}

#[test]
fn multi_word_reference_requires_backticks() {
    common::assert_parse_fails("order number");
}

#[test]
fn reserved_words_are_not_references() {
    common::assert_parse_fails("then");
    common::assert_parse_fails("satisfies");
}

// ============================================================================
// Operator structure
// ============================================================================

#[test]
fn parse_arithmetic_grouping() {
    // 2 * (3 + 5)
    if let Expr::Binary { op, left, right } = common::assert_parses("2 * (3 + 5)").node {
        assert_eq!(op, BinaryOp::Mul);
        assert_eq!(left.node, Expr::Number(dec("2")));
        assert!(matches!(
            right.node,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    } else {
        panic!("expected binary");
    }
}

#[test]
fn parse_logical_layering() {
    // a or b and c parses as a or (b and c)
    if let Expr::Binary { op, right, .. } = common::assert_parses("a or b and c").node {
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(
            right.node,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    } else {
        panic!("expected binary");
    }
}

#[test]
fn parse_comparison_of_additive_operands() {
    // a + 1 = b - 2
    if let Expr::Binary { op, left, right } = common::assert_parses("a + 1 = b - 2").node {
        assert_eq!(op, BinaryOp::Eq);
        assert!(matches!(left.node, Expr::Binary { op: BinaryOp::Add, .. }));
        assert!(matches!(right.node, Expr::Binary { op: BinaryOp::Sub, .. }));
    } else {
        panic!("expected binary");
    }
}

// ============================================================================
// Compound expressions
// ============================================================================

#[test]
fn parse_nested_if() {
    let ast = common::assert_parses("if a then if b then 1 else 2 else 3");
    if let Expr::If { then_branch, .. } = ast.node {
        assert!(matches!(then_branch.node, Expr::If { .. }));
    } else {
        panic!("expected if");
    }
}

#[test]
fn parse_for_with_partial_reference() {
    let ast = common::assert_parses("for i in 0..4 return if i = 0 then 1 else i * partial[-1]");
    assert!(matches!(ast.node, Expr::For { .. }));
}

#[test]
fn parse_quantified() {
    assert!(matches!(
        common::assert_parses("some x in xs satisfies x > 3").node,
        Expr::Quantified {
            quantifier: Quantifier::Some,
            ..
        }
    ));
}

#[test]
fn parse_context_with_function_entry() {
    let ast = common::assert_parses("{foo: function(x) x + 5, bar: foo(5)}");
    if let Expr::ConstContext(entries) = ast.node {
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].1.node, Expr::FunctionDefinition { .. }));
        assert!(matches!(entries[1].1.node, Expr::FunctionInvocation { .. }));
    } else {
        panic!("expected context");
    }
}

#[test]
fn parse_filter_chain() {
    let ast = common::assert_parses("[{a:1},{a:2},{a:3}][item.a >= 2]");
    if let Expr::Filter { base, predicate } = ast.node {
        assert!(matches!(base.node, Expr::ConstList(_)));
        assert!(matches!(predicate.node, Expr::Binary { .. }));
    } else {
        panic!("expected filter");
    }
}

#[test]
fn parse_reserved_word_builtin_invocations() {
    for input in [
        r#"date and time("2021-06-01T08:00:00")"#,
        r#"years and months duration(date("2020-01-01"), date("2021-06-01"))"#,
        "get or else(x, 0)",
    ] {
        let ast = common::assert_parses(input);
        assert!(
            matches!(ast.node, Expr::FunctionInvocation { .. }),
            "for {:?}",
            input
        );
    }
}

#[test]
fn parse_named_invocation_arguments() {
    let ast = common::assert_parses(r#"duration(from: "P1D")"#);
    if let Expr::FunctionInvocation { name, args } = ast.node {
        assert_eq!(name, "duration");
        assert!(matches!(args, Args::Named(_)));
    } else {
        panic!("expected invocation");
    }
}

#[test]
fn parse_plus_is_always_addition() {
    // `a + b` in expression position is addition, never a spaced name.
    assert!(matches!(
        common::assert_parses("a + b").node,
        Expr::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

// ============================================================================
// Unary tests
// ============================================================================

#[test]
fn parse_unary_test_forms() {
    assert_eq!(common::assert_parses_tests("-").node, Expr::AnyMatch);
    assert!(matches!(
        common::assert_parses_tests("< 5").node,
        Expr::InputLessThan(_)
    ));
    assert!(matches!(
        common::assert_parses_tests("not(5)").node,
        Expr::Negation(_)
    ));
    assert!(matches!(
        common::assert_parses_tests("1, 2, 3").node,
        Expr::AtLeastOne(_)
    ));
}

#[test]
fn parse_unary_test_range_bounds() {
    if let Expr::InputInRange(range) = common::assert_parses_tests("]4..6[").node {
        assert!(matches!(
            range.node,
            Expr::ConstRange {
                start_bound: RangeBound::Open,
                end_bound: RangeBound::Open,
                ..
            }
        ));
    } else {
        panic!("expected range test");
    }
}

#[test]
fn parse_unary_test_with_expression_endpoints() {
    // Endpoints are arbitrary additive expressions.
    common::assert_parses_tests("[a + 1 .. b * 2]");
    common::assert_parses_tests(r#"< date("2021-01-01")"#);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn parse_error_cases() {
    common::assert_parse_fails("");
    common::assert_parse_fails("1 +");
    common::assert_parse_fails("(1");
    common::assert_parse_fails("{a 1}");
    common::assert_parse_fails("if a then b");
    common::assert_parse_fails(r#""unclosed"#);
}

#[test]
fn parse_error_carries_span() {
    let result = feel_parser::parse("1 + + 2");
    assert!(result.is_err());
    let err = &result.errors[0];
    assert!(err.span.start <= err.span.end);
}
