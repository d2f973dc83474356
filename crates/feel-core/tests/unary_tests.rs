//! Unary-test matching through the engine facade.

use feel_core::{Engine, Value};
use serde_json::json;

fn matches(tests: &str, input: serde_json::Value) -> Value {
    matches_with(tests, input, json!(null))
}

fn matches_with(tests: &str, input: serde_json::Value, variables: serde_json::Value) -> Value {
    Engine::new()
        .evaluate_unary_tests(tests, &input, &variables)
        .unwrap_or_else(|e| panic!("matching failed for {:?}: {}", tests, e))
        .value
}

#[test]
fn dash_matches_anything() {
    assert_eq!(matches("-", json!(1)), Value::Bool(true));
    assert_eq!(matches("-", json!(null)), Value::Bool(true));
    assert_eq!(matches("-", json!("x")), Value::Bool(true));
}

#[test]
fn equality_tests() {
    assert_eq!(matches("5", json!(5)), Value::Bool(true));
    assert_eq!(matches("5", json!(6)), Value::Bool(false));
    assert_eq!(matches(r#""a""#, json!("a")), Value::Bool(true));
    // Null input only equals the null literal.
    assert_eq!(matches("null", json!(null)), Value::Bool(true));
    assert_eq!(matches("5", json!(null)), Value::Bool(false));
}

#[test]
fn ordering_tests() {
    assert_eq!(matches("> 5", json!(7)), Value::Bool(true));
    assert_eq!(matches(">= 5", json!(5)), Value::Bool(true));
    assert_eq!(matches("< 5", json!(7)), Value::Bool(false));
    assert_eq!(matches("<= 5", json!(5)), Value::Bool(true));
    // Null input makes ordering tests unanswered, not false.
    assert_eq!(matches("> 5", json!(null)), Value::Null);
    // Incomparable kinds are unanswered too.
    assert_eq!(matches("> 5", json!("a")), Value::Null);
}

#[test]
fn range_tests() {
    assert_eq!(matches("[4..6]", json!(4)), Value::Bool(true));
    assert_eq!(matches("[4..6]", json!(6)), Value::Bool(true));
    assert_eq!(matches("]4..6[", json!(4)), Value::Bool(false));
    assert_eq!(matches("]4..6[", json!(6)), Value::Bool(false));
    assert_eq!(matches("]4..6[", json!(5)), Value::Bool(true));
    assert_eq!(matches("(4..6)", json!(5)), Value::Bool(true));
    assert_eq!(matches("[4..6]", json!(null)), Value::Null);
}

#[test]
fn disjunction_tests() {
    assert_eq!(matches("1, 2, 3", json!(2)), Value::Bool(true));
    assert_eq!(matches("1, 2, 3", json!(4)), Value::Bool(false));
    assert_eq!(matches("< 2, > 10", json!(20)), Value::Bool(true));
    // An unanswered branch poisons a failed disjunction.
    assert_eq!(matches("> 10, 5", json!(null)), Value::Null);
}

#[test]
fn negation_tests() {
    assert_eq!(matches("not(5)", json!(5)), Value::Bool(false));
    assert_eq!(matches("not(5)", json!(0)), Value::Bool(true));
    assert_eq!(matches("not(1, 2)", json!(3)), Value::Bool(true));
    // An unanswered disjunction negates to false.
    assert_eq!(matches("not(> 5)", json!(null)), Value::Bool(false));
}

#[test]
fn boolean_literal_tests() {
    assert_eq!(matches("true", json!(true)), Value::Bool(true));
    assert_eq!(matches("true", json!(false)), Value::Bool(false));
    assert_eq!(matches("false", json!(false)), Value::Bool(true));
}

#[test]
fn expression_tests_bind_the_input() {
    assert_eq!(matches("? < 10", json!(5)), Value::Bool(true));
    assert_eq!(matches("? < 10", json!(15)), Value::Bool(false));
    assert_eq!(
        matches_with("? < limit", json!(5), json!({"limit": 10})),
        Value::Bool(true)
    );
}

#[test]
fn temporal_endpoint_tests() {
    assert_eq!(
        matches(r#"< date("2021-01-01")"#, json!(null)),
        Value::Null
    );
    assert_eq!(
        matches_with(
            r#"[date("2021-01-01")..date("2021-12-31")]"#,
            json!(null),
            json!(null)
        ),
        Value::Null
    );
}
