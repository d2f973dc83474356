//! Built-in function catalog.
//!
//! Built-ins are ordinary [`FunctionValue`]s living in the bottom scope of
//! the environment, so user bindings may shadow them and embedders can
//! register more through the engine. The catalog here is the small set the
//! engine itself needs; temporal constructors are total and yield Null on
//! malformed input.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::scope::Scope;
use super::temporal;
use super::value::{FunctionValue, Value, YearMonthDuration};
use super::EvalError;

/// Install the standard built-ins into the given (root) scope.
pub fn install(scope: &mut Scope) {
    bind(scope, "not", &["negand"], false, |args| {
        match args.first() {
            Some(Value::Bool(b)) => Value::Bool(!b),
            _ => Value::Null,
        }
    });

    // Conjunction / disjunction over a list; these are the reserved-word
    // invocation names.
    bind(scope, "and", &["list"], false, |args| {
        fold_kleene(args.first(), true)
    });
    bind(scope, "or", &["list"], false, |args| {
        fold_kleene(args.first(), false)
    });

    bind(scope, "date", &["from"], false, |args| match args.first() {
        Some(Value::String(s)) => temporal::parse_date(s)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        Some(v @ Value::Date(_)) => v.clone(),
        Some(Value::LocalDateTime(dt)) => Value::Date(dt.date()),
        Some(Value::ZonedDateTime(dt)) => Value::Date(dt.date_naive()),
        _ => Value::Null,
    });

    bind(scope, "time", &["from"], false, |args| match args.first() {
        Some(Value::String(s)) => temporal::parse_time(s).unwrap_or(Value::Null),
        Some(v @ (Value::LocalTime(_) | Value::ZonedTime(..))) => v.clone(),
        Some(Value::LocalDateTime(dt)) => Value::LocalTime(dt.time()),
        Some(Value::ZonedDateTime(dt)) => Value::ZonedTime(dt.time(), *dt.offset()),
        _ => Value::Null,
    });

    // One argument parses a literal; a date plus a time combine.
    bind(scope, "date and time", &["from", "time"], true, |args| {
        let extra = match args.get(1) {
            Some(Value::List(rest)) => rest.first().cloned(),
            Some(Value::LocalTime(t)) => Some(Value::LocalTime(*t)),
            Some(Value::ZonedTime(t, o)) => Some(Value::ZonedTime(*t, *o)),
            _ => None,
        };

        match (args.first(), extra) {
            (Some(Value::String(s)), None) => {
                temporal::parse_date_time(s).unwrap_or(Value::Null)
            }
            (Some(v @ (Value::LocalDateTime(_) | Value::ZonedDateTime(_))), None) => v.clone(),
            (Some(Value::Date(d)), Some(Value::LocalTime(t))) => {
                Value::LocalDateTime(d.and_time(t))
            }
            (Some(Value::Date(d)), Some(Value::ZonedTime(t, offset))) => {
                use chrono::TimeZone;
                offset
                    .from_local_datetime(&d.and_time(t))
                    .single()
                    .map(Value::ZonedDateTime)
                    .unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    });

    bind(scope, "duration", &["from"], false, |args| {
        match args.first() {
            Some(Value::String(s)) => temporal::parse_duration(s).unwrap_or(Value::Null),
            Some(v @ (Value::YearMonthDuration(_) | Value::DayTimeDuration(_))) => v.clone(),
            _ => Value::Null,
        }
    });

    bind(
        scope,
        "years and months duration",
        &["from", "to"],
        false,
        |args| {
            let as_date = |v: Option<&Value>| match v {
                Some(Value::Date(d)) => Some(*d),
                Some(Value::LocalDateTime(dt)) => Some(dt.date()),
                Some(Value::ZonedDateTime(dt)) => Some(dt.date_naive()),
                _ => None,
            };
            match (as_date(args.first()), as_date(args.get(1))) {
                (Some(from), Some(to)) => Value::YearMonthDuration(
                    YearMonthDuration::from_months(temporal::months_between(from, to)),
                ),
                _ => Value::Null,
            }
        },
    );

    bind(scope, "number", &["from"], false, |args| match args.first() {
        Some(Value::String(s)) => s
            .trim()
            .parse::<Decimal>()
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(v @ Value::Number(_)) => v.clone(),
        _ => Value::Null,
    });

    bind(scope, "string", &["from"], false, |args| match args.first() {
        Some(Value::Null) | None => Value::Null,
        Some(v @ Value::String(_)) => v.clone(),
        Some(v) => Value::string(v.to_string()),
    });

    bind(scope, "count", &["list"], false, |args| match args.first() {
        Some(Value::List(items)) => Value::from(items.len() as i64),
        _ => Value::Null,
    });

    bind(scope, "append", &["list", "items"], true, |args| {
        match (args.first(), args.get(1)) {
            (Some(Value::List(items)), Some(Value::List(extra))) => {
                Value::list(items.iter().chain(extra.iter()).cloned())
            }
            _ => Value::Null,
        }
    });

    bind(scope, "contains", &["string", "match"], false, |args| {
        match (args.first(), args.get(1)) {
            (Some(Value::String(s)), Some(Value::String(needle))) => {
                Value::Bool(s.contains(needle.as_ref()))
            }
            _ => Value::Null,
        }
    });

    bind(scope, "get or else", &["value", "default"], false, |args| {
        match args.first() {
            Some(Value::Null) | None => args.get(1).cloned().unwrap_or(Value::Null),
            Some(v) => v.clone(),
        }
    });

    bind(scope, "assert", &["value", "message"], false, |args| {
        match args.first() {
            Some(Value::Bool(true)) => Value::Bool(true),
            _ => {
                let message = match args.get(1) {
                    Some(Value::String(s)) => s.to_string(),
                    _ => "assertion failure".to_string(),
                };
                Value::error(EvalError::assertion_failure(message))
            }
        }
    });
}

fn bind(
    scope: &mut Scope,
    name: &str,
    params: &[&str],
    var_args: bool,
    implementation: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
) {
    scope.bind(
        name,
        Value::Function(Arc::new(FunctionValue::native(
            params,
            var_args,
            implementation,
        ))),
    );
}

/// Three-valued fold over a list of booleans. `identity` is `true` for
/// conjunction and `false` for disjunction.
fn fold_kleene(list: Option<&Value>, identity: bool) -> Value {
    let Some(Value::List(items)) = list else {
        return Value::Null;
    };
    let mut unknown = false;
    for item in items.iter() {
        match item {
            Value::Bool(b) if *b != identity => return Value::Bool(*b),
            Value::Bool(_) => {}
            _ => unknown = true,
        }
    }
    if unknown {
        Value::Null
    } else {
        Value::Bool(identity)
    }
}
