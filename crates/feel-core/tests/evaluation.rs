//! End-to-end evaluation tests through the engine facade.

use feel_core::{Engine, Value, WarningKind};
use serde_json::json;

fn eval(text: &str) -> Value {
    eval_with(text, &json!(null))
}

fn eval_with(text: &str, variables: &serde_json::Value) -> Value {
    Engine::new()
        .evaluate_expression(text, variables)
        .unwrap_or_else(|e| panic!("evaluation failed for {:?}: {}", text, e))
        .value
}

fn num(s: &str) -> Value {
    Value::Number(s.parse().unwrap())
}

// ============================================================================
// Arithmetic and null propagation
// ============================================================================

#[test]
fn arithmetic_scenarios() {
    assert_eq!(eval("2 * (3 + 5)"), num("16"));
    assert_eq!(eval("10 ** 5"), num("100000"));
    assert_eq!(eval("0.0 / 0.0"), Value::Null);
    assert_eq!(eval("1 / 0"), Value::Null);
    assert_eq!(eval(r#""a" + "b""#), Value::from("ab"));
    assert_eq!(eval(r#"1 + "a""#), Value::Null);
}

#[test]
fn arithmetic_identities() {
    for x in ["0", "1", "-3", "2.5", "1000000"] {
        let expr = format!("{x} + 0 = {x} and {x} * 1 = {x} and {x} - {x} = 0");
        assert_eq!(eval(&expr), Value::Bool(true), "for x = {x}");
    }
}

#[test]
fn number_equality_is_decimal() {
    assert_eq!(eval("0 = 0.00"), Value::Bool(true));
    assert_eq!(eval("1.0 = 1"), Value::Bool(true));
}

// ============================================================================
// Temporals
// ============================================================================

#[test]
fn temporal_scenarios() {
    assert_eq!(
        eval(r#"date("2012-12-25") - date("2012-12-24") = duration("P1D")"#),
        Value::Bool(true)
    );
    assert_eq!(
        eval(r#"date("2023-10-06") + duration("P1M") = date("2023-11-06")"#),
        Value::Bool(true)
    );
    assert_eq!(eval(r#"date("not-a-date")"#), Value::Null);
    assert_eq!(
        eval(r#"date("2012-12-24") < date("2012-12-25")"#),
        Value::Bool(true)
    );
    assert_eq!(
        eval(r#"date and time("2021-06-01T08:00:00") + duration("PT1H") = date and time("2021-06-01T09:00:00")"#),
        Value::Bool(true)
    );
}

#[test]
fn duration_families_do_not_mix() {
    assert_eq!(eval(r#"duration("P30D") = duration("P1M")"#), Value::Null);
    assert_eq!(eval(r#"duration("P30D") < duration("P1M")"#), Value::Null);
}

// ============================================================================
// Contexts, functions, closures
// ============================================================================

#[test]
fn context_function_scenario() {
    assert_eq!(
        eval("({foo: function(x) x + 5, bar: foo(5)}).bar"),
        num("10")
    );
}

#[test]
fn function_values_are_first_class() {
    assert_eq!(
        eval("({make: function(n) function(x) x + n, add2: make(2), out: add2(40)}).out"),
        num("42")
    );
}

#[test]
fn context_equality_ignores_entry_order() {
    assert_eq!(eval("{a: 1, b: 2} = {b: 2, a: 1}"), Value::Bool(true));
    assert_eq!(eval("{a: 1} = {a: 2}"), Value::Bool(false));
}

// ============================================================================
// Iteration
// ============================================================================

#[test]
fn for_with_partial_scenario() {
    assert_eq!(
        eval("for i in 0..4 return if i = 0 then 1 else i * partial[-1]"),
        eval("[1, 1, 2, 6, 24]")
    );
}

#[test]
fn range_iteration_properties() {
    assert_eq!(eval("for i in 2..5 return i"), eval("[2, 3, 4, 5]"));
    assert_eq!(eval("for i in 5..2 return i"), eval("[5, 4, 3, 2]"));
}

#[test]
fn quantifier_scenarios() {
    assert_eq!(
        eval_with("every b in a satisfies b < 10", &json!({"a": []})),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("every b in a satisfies b < 10", &json!({"a": [1, 2]})),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("some b in a satisfies b > 10", &json!({"a": [1, 20]})),
        Value::Bool(true)
    );
}

// ============================================================================
// Lists and filters
// ============================================================================

#[test]
fn list_indexing_scenarios() {
    assert_eq!(eval("[1,2,3][-1]"), num("3"));
    assert_eq!(eval("[1,2,3][0]"), Value::Null);
    assert_eq!(eval("[1,2,3][4]"), Value::Null);
    assert_eq!(eval("[1,2,3][1]"), num("1"));
}

#[test]
fn list_properties() {
    assert_eq!(eval("[1, \"a\", [2]] = [1, \"a\", [2]]"), Value::Bool(true));
    // xs[-i] = xs[|xs|-i+1]
    assert_eq!(eval("[10, 20, 30][-2] = [10, 20, 30][2]"), Value::Bool(true));
}

#[test]
fn filter_scenarios() {
    assert_eq!(
        eval("[{a:1},{a:2},{a:3}][item.a >= 2]"),
        eval("[{a:2},{a:3}]")
    );
    assert_eq!(
        eval("[{item: 1}, {item: 5}][item >= 2]"),
        eval("[{item: 5}]")
    );
}

#[test]
fn filter_by_outer_variable_index() {
    assert_eq!(
        eval_with("[10, 20, 30][n]", &json!({"n": 2})),
        num("20")
    );
}

// ============================================================================
// Logic
// ============================================================================

#[test]
fn three_valued_logic_scenarios() {
    assert_eq!(eval("false and 1"), Value::Bool(false));
    assert_eq!(eval("true and 1"), Value::Null);
    assert_eq!(eval("false or true"), Value::Bool(true));
    assert_eq!(eval("false or 1"), Value::Null);
}

// ============================================================================
// `in`
// ============================================================================

#[test]
fn in_scenarios() {
    assert_eq!(eval("5 in (> 0, <10)"), Value::Bool(true));
    assert_eq!(eval(r#""d" in null"#), Value::Bool(false));
    assert_eq!(eval("5 in [4..6]"), Value::Bool(true));
    assert_eq!(eval("{a: 1} in {a: 1}"), Value::Bool(true));
}

// ============================================================================
// Warnings and failures
// ============================================================================

#[test]
fn undeclared_variable_warns() {
    let engine = Engine::new();
    let result = engine
        .evaluate_expression("missing + 1", &json!(null))
        .unwrap();
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::NoVariableFound);
}

#[test]
fn evaluation_continues_after_a_warning() {
    let engine = Engine::new();
    let result = engine
        .evaluate_expression("[missing, 2][-1]", &json!(null))
        .unwrap();
    assert_eq!(result.value, num("2"));
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn assertion_failure_warns_and_yields_null() {
    let engine = Engine::new();
    let result = engine
        .evaluate_expression(r#"assert(1 > 2, "one exceeds two")"#, &json!(null))
        .unwrap();
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.warnings[0].kind, WarningKind::AssertionFailure);
    assert!(result.warnings[0].message.contains("one exceeds two"));
}

#[test]
fn syntax_errors_fail() {
    let engine = Engine::new();
    assert!(engine.evaluate_expression("1 +", &json!(null)).is_err());
    assert!(engine.evaluate_expression("", &json!(null)).is_err());
}

// ============================================================================
// Variables through the mapper
// ============================================================================

#[test]
fn variables_convert_recursively() {
    assert_eq!(
        eval_with(
            "order.items[price > 10].name",
            &json!({"order": {"items": [
                {"name": "a", "price": 5},
                {"name": "b", "price": 15}
            ]}}),
        ),
        eval(r#"["b"]"#)
    );
}

#[test]
fn backtick_names_reach_spaced_variables() {
    assert_eq!(
        eval_with("`order number` * 2", &json!({"order number": 21})),
        num("42")
    );
}
