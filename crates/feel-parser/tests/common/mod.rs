use feel_parser::{parse, parse_unary_tests, SpannedExpr};

/// Parse an expression, asserting success.
pub fn assert_parses(input: &str) -> SpannedExpr {
    let result = parse(input);
    assert!(
        result.errors.is_empty(),
        "unexpected errors for {:?}: {:?}",
        input,
        result.errors
    );
    result.ast.expect("expected AST")
}

/// Parse an expression, asserting failure.
pub fn assert_parse_fails(input: &str) {
    let result = parse(input);
    assert!(result.is_err(), "expected errors for {:?}", input);
    assert!(result.ast.is_none());
}

/// Parse a unary-tests string, asserting success.
pub fn assert_parses_tests(input: &str) -> SpannedExpr {
    let result = parse_unary_tests(input);
    assert!(
        result.errors.is_empty(),
        "unexpected errors for {:?}: {:?}",
        input,
        result.errors
    );
    result.ast.expect("expected AST")
}
