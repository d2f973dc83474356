//! Tree-walking evaluator for FEEL expressions.
//!
//! The evaluator performs depth-first traversal of the AST against an
//! `Arc`-linked scope chain and returns a `Value`. It never panics and never
//! raises: domain mismatches yield Null, surfaced failures append to the
//! warnings buffer and yield Null, and only internal invariant violations
//! travel as `Value::Error`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::sync::Arc;

use chrono::TimeZone;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use feel_parser::{Args, BinaryOp, Expr, Iteration, Quantifier, RangeBound, SpannedExpr};

use super::scope::Scope;
use super::temporal;
use super::value::{
    ContextValue, DayTimeDuration, FunctionBody, FunctionValue, RangeBoundary, RangeValue, Value,
    YearMonthDuration,
};
use super::{EvalError, Warning};

/// The FEEL expression evaluator.
///
/// One evaluator drives one evaluation; it owns the warnings produced along
/// the way. The AST and the scope chain it walks are immutable and shareable.
#[derive(Default)]
pub struct Evaluator {
    warnings: RefCell<Vec<Warning>>,
}

impl Evaluator {
    /// Create a new evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the warnings collected so far.
    pub fn take_warnings(&self) -> Vec<Warning> {
        self.warnings.take()
    }

    /// Evaluate an expression in the given environment.
    pub fn eval(&self, expr: &SpannedExpr, env: &Arc<Scope>) -> Value {
        match &expr.node {
            // Literals
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Number(n) => Value::Number(*n),
            Expr::String(s) => Value::String(Arc::from(s.as_str())),

            // References
            Expr::Ref(parts) => self.eval_ref(parts, env),
            Expr::InputValue => match env.lookup("?") {
                Some(v) => v,
                None => self.surface(EvalError::no_variable_found("?")),
            },

            // Operations
            Expr::Neg(inner) => self.eval_neg(inner, env),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, env),
            Expr::InstanceOf { value, type_name } => self.eval_instance_of(value, type_name, env),
            Expr::In { value, tests } => self.eval_in(value, tests, env),

            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => self.eval_if(condition, then_branch, else_branch, env),
            Expr::For { iterations, body } => self.eval_for(iterations, body, env),
            Expr::Quantified {
                quantifier,
                iterations,
                condition,
            } => self.eval_quantified(*quantifier, iterations, condition, env),

            Expr::FunctionDefinition { params, body } => {
                Value::Function(Arc::new(FunctionValue::from_ast(
                    params.clone(),
                    (**body).clone(),
                    env.clone(),
                )))
            }
            Expr::FunctionInvocation { name, args } => self.eval_invocation(name, args, env),
            Expr::QualifiedFunctionInvocation { target, name, args } => {
                self.eval_qualified_invocation(target, name, args, env)
            }

            Expr::Path { base, name } => {
                let base = self.eval(base, env);
                if base.is_error() {
                    return base;
                }
                self.path_value(&base, name)
            }
            Expr::Filter { base, predicate } => self.eval_filter(base, predicate, env),

            Expr::ConstList(items) => self.eval_list(items, env),
            Expr::ConstContext(entries) => self.eval_context(entries, env),
            Expr::ConstRange {
                start_bound,
                start,
                end,
                end_bound,
            } => self.eval_range(*start_bound, start, end, *end_bound, env),

            // Unary-test forms evaluate against the input value `?` in scope.
            Expr::AnyMatch
            | Expr::InputEqualTo(_)
            | Expr::InputLessThan(_)
            | Expr::InputLessOrEqual(_)
            | Expr::InputGreaterThan(_)
            | Expr::InputGreaterOrEqual(_)
            | Expr::InputInRange(_)
            | Expr::UnaryTestExpression(_)
            | Expr::AtLeastOne(_)
            | Expr::Negation(_) => {
                let input = env.lookup("?").unwrap_or(Value::Null);
                self.match_test(expr, &input, env)
            }
        }
    }

    /// Match a unary-test AST against an input value.
    pub fn match_unary_tests(
        &self,
        tests: &SpannedExpr,
        input: &Value,
        env: &Arc<Scope>,
    ) -> Value {
        self.match_test(tests, input, env)
    }

    // === Surfaced failures ===

    /// Record a warning for a recoverable failure and yield Null; fatal
    /// errors travel on as error values.
    fn surface(&self, err: EvalError) -> Value {
        match err.to_warning() {
            Some(warning) => {
                self.warnings.borrow_mut().push(warning);
                Value::Null
            }
            None => Value::error(err),
        }
    }

    /// Run `f` with warning collection suspended, discarding anything it
    /// would have reported.
    fn suppressing_warnings<T>(&self, f: impl FnOnce() -> T) -> T {
        let saved = self.warnings.take();
        let result = f();
        *self.warnings.borrow_mut() = saved;
        result
    }

    // === References and paths ===

    fn eval_ref(&self, parts: &[String], env: &Arc<Scope>) -> Value {
        let Some(first) = parts.first() else {
            return Value::error(EvalError::internal("empty reference"));
        };
        match env.lookup(first) {
            Some(mut value) => {
                for part in &parts[1..] {
                    value = self.path_value(&value, part);
                }
                value
            }
            None => self.surface(EvalError::no_variable_found(first)),
        }
    }

    /// `base.name` projection: contexts select the entry, lists map the
    /// selection over their elements, everything else is Null.
    fn path_value(&self, base: &Value, name: &str) -> Value {
        match base {
            Value::Context(ctx) => ctx.get(name).cloned().unwrap_or(Value::Null),
            Value::List(items) => {
                Value::list(items.iter().map(|item| self.path_value(item, name)))
            }
            _ => Value::Null,
        }
    }

    // === Operators ===

    fn eval_neg(&self, inner: &SpannedExpr, env: &Arc<Scope>) -> Value {
        let value = self.eval(inner, env);
        match value {
            Value::Number(n) => Value::Number(-n),
            Value::YearMonthDuration(d) => {
                Value::YearMonthDuration(YearMonthDuration::from_months(-d.months))
            }
            Value::DayTimeDuration(d) => {
                Value::DayTimeDuration(DayTimeDuration::from_nanos(-d.nanos))
            }
            Value::Error(_) => value,
            _ => Value::Null,
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &SpannedExpr,
        right: &SpannedExpr,
        env: &Arc<Scope>,
    ) -> Value {
        // Logical connectives evaluate lazily.
        match op {
            BinaryOp::And => return self.eval_and(left, right, env),
            BinaryOp::Or => return self.eval_or(left, right, env),
            _ => {}
        }

        let left = self.eval(left, env);
        if left.is_error() {
            return left;
        }
        let right = self.eval(right, env);
        if right.is_error() {
            return right;
        }

        match op {
            BinaryOp::Add => self.eval_add(left, right),
            BinaryOp::Sub => self.eval_sub(left, right),
            BinaryOp::Mul => self.eval_mul(left, right),
            BinaryOp::Div => self.eval_div(left, right),
            BinaryOp::Exp => self.eval_exp(left, right),
            BinaryOp::Eq => match left.feel_eq(&right) {
                Some(b) => Value::Bool(b),
                None => Value::Null,
            },
            BinaryOp::Ne => match left.feel_eq(&right) {
                Some(b) => Value::Bool(!b),
                None => Value::Null,
            },
            BinaryOp::Lt => self.eval_compare(left, right, |o| o == Ordering::Less),
            BinaryOp::Le => self.eval_compare(left, right, |o| o != Ordering::Greater),
            BinaryOp::Gt => self.eval_compare(left, right, |o| o == Ordering::Greater),
            BinaryOp::Ge => self.eval_compare(left, right, |o| o != Ordering::Less),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// Three-valued conjunction. `false and x` is false no matter what `x`
    /// is; a non-boolean operand otherwise poisons the result to Null.
    fn eval_and(&self, left: &SpannedExpr, right: &SpannedExpr, env: &Arc<Scope>) -> Value {
        match self.eval(left, env) {
            Value::Bool(false) => Value::Bool(false),
            Value::Bool(true) => match self.eval(right, env) {
                Value::Bool(b) => Value::Bool(b),
                v @ Value::Error(_) => v,
                _ => Value::Null,
            },
            v @ Value::Error(_) => v,
            _ => match self.eval(right, env) {
                Value::Bool(false) => Value::Bool(false),
                v @ Value::Error(_) => v,
                _ => Value::Null,
            },
        }
    }

    /// Three-valued disjunction, mirroring [`Self::eval_and`].
    fn eval_or(&self, left: &SpannedExpr, right: &SpannedExpr, env: &Arc<Scope>) -> Value {
        match self.eval(left, env) {
            Value::Bool(true) => Value::Bool(true),
            Value::Bool(false) => match self.eval(right, env) {
                Value::Bool(b) => Value::Bool(b),
                v @ Value::Error(_) => v,
                _ => Value::Null,
            },
            v @ Value::Error(_) => v,
            _ => match self.eval(right, env) {
                Value::Bool(true) => Value::Bool(true),
                v @ Value::Error(_) => v,
                _ => Value::Null,
            },
        }
    }

    fn eval_add(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => {
                a.checked_add(*b).map(Value::Number).unwrap_or(Value::Null)
            }
            (Value::String(a), Value::String(b)) => {
                let mut result = String::with_capacity(a.len() + b.len());
                result.push_str(a);
                result.push_str(b);
                Value::String(Arc::from(result))
            }
            (Value::Date(d), Value::YearMonthDuration(m))
            | (Value::YearMonthDuration(m), Value::Date(d)) => {
                temporal::add_months(*d, m.months)
                    .map(Value::Date)
                    .unwrap_or(Value::Null)
            }
            (Value::LocalDateTime(dt), Value::YearMonthDuration(m))
            | (Value::YearMonthDuration(m), Value::LocalDateTime(dt)) => {
                temporal::add_months(dt.date(), m.months)
                    .map(|d| Value::LocalDateTime(d.and_time(dt.time())))
                    .unwrap_or(Value::Null)
            }
            (Value::ZonedDateTime(dt), Value::YearMonthDuration(m))
            | (Value::YearMonthDuration(m), Value::ZonedDateTime(dt)) => {
                temporal::add_months(dt.date_naive(), m.months)
                    .and_then(|d| {
                        dt.timezone()
                            .from_local_datetime(&d.and_time(dt.time()))
                            .single()
                    })
                    .map(Value::ZonedDateTime)
                    .unwrap_or(Value::Null)
            }
            (Value::LocalDateTime(dt), Value::DayTimeDuration(d))
            | (Value::DayTimeDuration(d), Value::LocalDateTime(dt)) => dt
                .checked_add_signed(d.to_chrono())
                .map(Value::LocalDateTime)
                .unwrap_or(Value::Null),
            (Value::ZonedDateTime(dt), Value::DayTimeDuration(d))
            | (Value::DayTimeDuration(d), Value::ZonedDateTime(dt)) => dt
                .checked_add_signed(d.to_chrono())
                .map(Value::ZonedDateTime)
                .unwrap_or(Value::Null),
            (Value::LocalTime(t), Value::DayTimeDuration(d))
            | (Value::DayTimeDuration(d), Value::LocalTime(t)) => {
                Value::LocalTime(temporal::shift_time(*t, d.nanos))
            }
            (Value::ZonedTime(t, offset), Value::DayTimeDuration(d))
            | (Value::DayTimeDuration(d), Value::ZonedTime(t, offset)) => {
                Value::ZonedTime(temporal::shift_time(*t, d.nanos), *offset)
            }
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => a
                .months
                .checked_add(b.months)
                .map(|m| Value::YearMonthDuration(YearMonthDuration::from_months(m)))
                .unwrap_or(Value::Null),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => a
                .nanos
                .checked_add(b.nanos)
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    fn eval_sub(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => {
                a.checked_sub(*b).map(Value::Number).unwrap_or(Value::Null)
            }
            (Value::Date(a), Value::Date(b)) => a
                .signed_duration_since(*b)
                .num_nanoseconds()
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            (Value::Date(d), Value::YearMonthDuration(m)) => temporal::add_months(*d, -m.months)
                .map(Value::Date)
                .unwrap_or(Value::Null),
            (Value::LocalDateTime(a), Value::LocalDateTime(b)) => a
                .signed_duration_since(*b)
                .num_nanoseconds()
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            (Value::ZonedDateTime(a), Value::ZonedDateTime(b)) => a
                .signed_duration_since(*b)
                .num_nanoseconds()
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            (Value::LocalTime(a), Value::LocalTime(b)) => a
                .signed_duration_since(*b)
                .num_nanoseconds()
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            (Value::LocalDateTime(dt), Value::YearMonthDuration(m)) => {
                temporal::add_months(dt.date(), -m.months)
                    .map(|d| Value::LocalDateTime(d.and_time(dt.time())))
                    .unwrap_or(Value::Null)
            }
            (Value::ZonedDateTime(dt), Value::YearMonthDuration(m)) => {
                temporal::add_months(dt.date_naive(), -m.months)
                    .and_then(|d| {
                        dt.timezone()
                            .from_local_datetime(&d.and_time(dt.time()))
                            .single()
                    })
                    .map(Value::ZonedDateTime)
                    .unwrap_or(Value::Null)
            }
            (Value::LocalDateTime(dt), Value::DayTimeDuration(d)) => dt
                .checked_sub_signed(d.to_chrono())
                .map(Value::LocalDateTime)
                .unwrap_or(Value::Null),
            (Value::ZonedDateTime(dt), Value::DayTimeDuration(d)) => dt
                .checked_sub_signed(d.to_chrono())
                .map(Value::ZonedDateTime)
                .unwrap_or(Value::Null),
            (Value::LocalTime(t), Value::DayTimeDuration(d)) => {
                Value::LocalTime(temporal::shift_time(*t, -d.nanos))
            }
            (Value::ZonedTime(t, offset), Value::DayTimeDuration(d)) => {
                Value::ZonedTime(temporal::shift_time(*t, -d.nanos), *offset)
            }
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => a
                .months
                .checked_sub(b.months)
                .map(|m| Value::YearMonthDuration(YearMonthDuration::from_months(m)))
                .unwrap_or(Value::Null),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => a
                .nanos
                .checked_sub(b.nanos)
                .map(|n| Value::DayTimeDuration(DayTimeDuration::from_nanos(n)))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    fn eval_mul(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => {
                a.checked_mul(*b).map(Value::Number).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn eval_div(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Number(_), Value::Number(b)) if b.is_zero() => Value::Null,
            (Value::Number(a), Value::Number(b)) => {
                a.checked_div(*b).map(Value::Number).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn eval_exp(&self, left: Value, right: Value) -> Value {
        let (Value::Number(base), Value::Number(exp)) = (&left, &right) else {
            return Value::Null;
        };

        if exp.is_integer() {
            let Some(exp) = exp.to_i64() else {
                return Value::Null;
            };
            return decimal_powi(*base, exp)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }

        // Fractional exponents route through f64; non-finite results have no
        // Number representation.
        let (Some(b), Some(e)) = (base.to_f64(), exp.to_f64()) else {
            return Value::Null;
        };
        let result = b.powf(e);
        if result.is_finite() {
            Decimal::from_f64(result)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        } else {
            Value::Null
        }
    }

    fn eval_compare(&self, left: Value, right: Value, pred: fn(Ordering) -> bool) -> Value {
        if left.is_null() || right.is_null() {
            return Value::Null;
        }
        match left.compare(&right) {
            Some(ordering) => Value::Bool(pred(ordering)),
            None => Value::Null,
        }
    }

    fn eval_instance_of(&self, value: &SpannedExpr, type_name: &str, env: &Arc<Scope>) -> Value {
        let value = self.eval(value, env);
        if value.is_error() {
            return value;
        }
        let result = match type_name {
            "Any" => !value.is_null(),
            name => value.type_name() == name,
        };
        Value::Bool(result)
    }

    // === Control forms ===

    /// `if c then a else b`: anything but Bool(true) selects the else branch.
    fn eval_if(
        &self,
        condition: &SpannedExpr,
        then_branch: &SpannedExpr,
        else_branch: &SpannedExpr,
        env: &Arc<Scope>,
    ) -> Value {
        match self.eval(condition, env) {
            Value::Bool(true) => self.eval(then_branch, env),
            v @ Value::Error(_) => v,
            _ => self.eval(else_branch, env),
        }
    }

    fn eval_for(&self, iterations: &[Iteration], body: &SpannedExpr, env: &Arc<Scope>) -> Value {
        let mut results = Vec::new();
        match self.for_rec(iterations, env, body, &mut results) {
            Ok(()) => Value::list(results),
            Err(()) => Value::Null,
        }
    }

    /// Nested-loop expansion of the iteration cross product; the rightmost
    /// iterator varies fastest. `Err` means the whole `for` is Null.
    fn for_rec(
        &self,
        iterations: &[Iteration],
        env: &Arc<Scope>,
        body: &SpannedExpr,
        results: &mut Vec<Value>,
    ) -> Result<(), ()> {
        let Some(iteration) = iterations.first() else {
            let env = Scope::child_with(
                env,
                [("partial".to_string(), Value::list(results.iter().cloned()))],
            );
            let value = self.eval(body, &env);
            results.push(value);
            return Ok(());
        };

        let source = self.eval(&iteration.source, env);
        let items = self.materialize_iteration(&source).ok_or(())?;
        for item in items {
            let env = Scope::child_with(env, [(iteration.name.clone(), item)]);
            self.for_rec(&iterations[1..], &env, body, results)?;
        }
        Ok(())
    }

    fn eval_quantified(
        &self,
        quantifier: Quantifier,
        iterations: &[Iteration],
        condition: &SpannedExpr,
        env: &Arc<Scope>,
    ) -> Value {
        match self.quantify_rec(iterations, env, condition, quantifier) {
            Err(()) => Value::Null,
            Ok(Some(decided)) => Value::Bool(decided),
            // No combination decided: `every` is vacuously true, `some` found
            // nothing.
            Ok(None) => Value::Bool(matches!(quantifier, Quantifier::Every)),
        }
    }

    fn quantify_rec(
        &self,
        iterations: &[Iteration],
        env: &Arc<Scope>,
        condition: &SpannedExpr,
        quantifier: Quantifier,
    ) -> Result<Option<bool>, ()> {
        let Some(iteration) = iterations.first() else {
            let is_true = matches!(self.eval(condition, env), Value::Bool(true));
            return Ok(match quantifier {
                Quantifier::Every if !is_true => Some(false),
                Quantifier::Some if is_true => Some(true),
                _ => None,
            });
        };

        let source = self.eval(&iteration.source, env);
        let items = self.materialize_iteration(&source).ok_or(())?;
        for item in items {
            let env = Scope::child_with(env, [(iteration.name.clone(), item)]);
            if let Some(decided) =
                self.quantify_rec(&iterations[1..], &env, condition, quantifier)?
            {
                return Ok(Some(decided));
            }
        }
        Ok(None)
    }

    /// An iteration source must be a list, or a range with integer endpoints
    /// which materialises to an ascending or descending step-one list.
    fn materialize_iteration(&self, source: &Value) -> Option<Vec<Value>> {
        match source {
            Value::List(items) => Some(items.to_vec()),
            Value::Range(range) => range_to_list(range),
            _ => None,
        }
    }

    // === Collections ===

    fn eval_list(&self, items: &[SpannedExpr], env: &Arc<Scope>) -> Value {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let value = self.eval(item, env);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }
        Value::list(values)
    }

    /// Context entries evaluate in order, with earlier entries in scope for
    /// later ones, so `{foo: function(x) x + 5, bar: foo(5)}` works.
    fn eval_context(&self, entries: &[(String, SpannedExpr)], env: &Arc<Scope>) -> Value {
        let mut scope = env.clone();
        let mut context = ContextValue::new();
        for (name, expr) in entries {
            let value = self.eval(expr, &scope);
            if value.is_error() {
                return value;
            }
            scope = Scope::child_with(&scope, [(name.clone(), value.clone())]);
            context.insert(name.clone(), value);
        }
        Value::Context(Arc::new(context))
    }

    fn eval_range(
        &self,
        start_bound: RangeBound,
        start: &SpannedExpr,
        end: &SpannedExpr,
        end_bound: RangeBound,
        env: &Arc<Scope>,
    ) -> Value {
        let start = self.eval(start, env);
        if start.is_error() {
            return start;
        }
        let end = self.eval(end, env);
        if end.is_error() {
            return end;
        }
        Value::Range(Arc::new(RangeValue::new(
            make_boundary(start_bound, start),
            make_boundary(end_bound, end),
        )))
    }

    // === Filters ===

    fn eval_filter(&self, base: &SpannedExpr, predicate: &SpannedExpr, env: &Arc<Scope>) -> Value {
        let base = self.eval(base, env);
        match base {
            Value::Error(_) => base,
            Value::Null => Value::Null,
            Value::List(items) => self.filter_list(&items, predicate, env),
            // No implicit promotion of scalars or other kinds.
            _ => Value::Null,
        }
    }

    fn filter_list(
        &self,
        items: &Arc<[Value]>,
        predicate: &SpannedExpr,
        env: &Arc<Scope>,
    ) -> Value {
        // A literal boolean keeps or drops the whole list.
        if let Expr::Bool(keep) = predicate.node {
            return if keep {
                Value::List(items.clone())
            } else {
                Value::list([])
            };
        }

        // A predicate that yields a number in the enclosing scope selects by
        // 1-based index (negative counts from the end). The probe must not
        // leak warnings from predicates meant for per-element evaluation.
        let probed = self.suppressing_warnings(|| self.eval(predicate, env));
        if let Value::Number(n) = probed {
            return index_list(items, &n);
        }

        let mut kept = Vec::new();
        for item in items.iter() {
            let mut scope = Scope::nested(env.clone());
            scope.bind("item", item.clone());
            if let Value::Context(ctx) = item {
                // Context entries come into scope; an entry named `item`
                // shadows the implicit binding.
                for (name, value) in ctx.iter() {
                    scope.bind(name.clone(), value.clone());
                }
            }
            let scope = Arc::new(scope);
            if matches!(self.eval(predicate, &scope), Value::Bool(true)) {
                kept.push(item.clone());
            }
        }
        Value::list(kept)
    }

    // === Invocation ===

    fn eval_invocation(&self, name: &str, args: &Args, env: &Arc<Scope>) -> Value {
        match env.lookup(name) {
            Some(Value::Function(func)) => self.invoke(&func, args, env),
            // Invoking a non-function value is a silent domain mismatch.
            Some(_) => Value::Null,
            None => self.surface(EvalError::no_function_found(name)),
        }
    }

    fn eval_qualified_invocation(
        &self,
        target: &SpannedExpr,
        name: &str,
        args: &Args,
        env: &Arc<Scope>,
    ) -> Value {
        let target = self.eval(target, env);
        match &target {
            Value::Context(ctx) => match ctx.get(name) {
                Some(Value::Function(func)) => {
                    let func = func.clone();
                    self.invoke(&func, args, env)
                }
                Some(_) => Value::Null,
                None => self.surface(EvalError::no_context_entry_found(name)),
            },
            Value::Error(_) => target,
            _ => Value::Null,
        }
    }

    fn invoke(&self, func: &FunctionValue, args: &Args, env: &Arc<Scope>) -> Value {
        let bound = match args {
            Args::Positional(exprs) => {
                let mut values = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    let value = self.eval(expr, env);
                    if value.is_error() {
                        return value;
                    }
                    values.push(value);
                }

                if func.var_args {
                    let fixed = func.params.len().saturating_sub(1);
                    if values.len() < fixed {
                        return Value::Null;
                    }
                    let rest = Value::list(values.split_off(fixed));
                    values.push(rest);
                    values
                } else {
                    if values.len() != func.params.len() {
                        return Value::Null;
                    }
                    values
                }
            }
            Args::Named(named) => {
                let mut supplied: Vec<(&str, Value)> = Vec::with_capacity(named.len());
                for (name, expr) in named {
                    let value = self.eval(expr, env);
                    if value.is_error() {
                        return value;
                    }
                    supplied.push((name.as_str(), value));
                }

                let mut values = Vec::with_capacity(func.params.len());
                for (idx, param) in func.params.iter().enumerate() {
                    match supplied.iter().position(|(name, _)| *name == param.as_str()) {
                        Some(found) => values.push(supplied.remove(found).1),
                        // A var-args collector left unnamed is simply empty.
                        None if func.var_args && idx + 1 == func.params.len() => {
                            values.push(Value::list([]));
                        }
                        None => {
                            return self.surface(EvalError::function_invocation_failure(
                                format!("missing parameter '{}'", param),
                            ));
                        }
                    }
                }
                values
            }
        };

        self.call(func, bound)
    }

    fn call(&self, func: &FunctionValue, args: Vec<Value>) -> Value {
        match &func.body {
            FunctionBody::Native(implementation) => {
                let result = implementation(&args);
                if let Value::Error(err) = &result {
                    return self.surface((**err).clone());
                }
                result
            }
            FunctionBody::Expr { body, closure } => {
                let env =
                    Scope::child_with(closure, func.params.iter().cloned().zip(args));
                self.eval(body, &env)
            }
        }
    }

    // === Unary-test matching ===

    fn eval_in(&self, value: &SpannedExpr, tests: &[SpannedExpr], env: &Arc<Scope>) -> Value {
        let value = self.eval(value, env);
        if value.is_error() {
            return value;
        }
        // `in` is total: an unanswered disjunction is false.
        match self.match_disjunction(tests, &value, env) {
            Value::Bool(true) => Value::Bool(true),
            _ => Value::Bool(false),
        }
    }

    fn match_test(&self, test: &SpannedExpr, input: &Value, env: &Arc<Scope>) -> Value {
        match &test.node {
            Expr::AnyMatch => Value::Bool(true),
            Expr::InputEqualTo(expr) => {
                let value = self.eval(expr, env);
                if value.is_error() {
                    return value;
                }
                match input.feel_eq(&value) {
                    Some(b) => Value::Bool(b),
                    None => Value::Null,
                }
            }
            Expr::InputLessThan(expr) => {
                self.match_ordering(input, expr, env, |o| o == Ordering::Less)
            }
            Expr::InputLessOrEqual(expr) => {
                self.match_ordering(input, expr, env, |o| o != Ordering::Greater)
            }
            Expr::InputGreaterThan(expr) => {
                self.match_ordering(input, expr, env, |o| o == Ordering::Greater)
            }
            Expr::InputGreaterOrEqual(expr) => {
                self.match_ordering(input, expr, env, |o| o != Ordering::Less)
            }
            Expr::InputInRange(range) => {
                if input.is_null() {
                    return Value::Null;
                }
                match self.eval(range, env) {
                    Value::Range(range) => match range.contains(input) {
                        Some(b) => Value::Bool(b),
                        None => Value::Null,
                    },
                    v @ Value::Error(_) => v,
                    _ => Value::Null,
                }
            }
            Expr::AtLeastOne(tests) => self.match_disjunction(tests, input, env),
            Expr::Negation(tests) => match self.match_disjunction(tests, input, env) {
                Value::Bool(b) => Value::Bool(!b),
                v @ Value::Error(_) => v,
                // An unanswered inner disjunction negates to false.
                _ => Value::Bool(false),
            },
            // Arbitrary expressions run with `?` bound to the input; a
            // non-boolean result falls back to input equality.
            Expr::UnaryTestExpression(expr) => self.match_expression(expr, input, env),
            _ => self.match_expression(test, input, env),
        }
    }

    fn match_expression(&self, expr: &SpannedExpr, input: &Value, env: &Arc<Scope>) -> Value {
        let env = Scope::child_with(env, [("?".to_string(), input.clone())]);
        let result = self.eval(expr, &env);
        match result {
            Value::Bool(b) => Value::Bool(b),
            v @ Value::Error(_) => v,
            other => match input.feel_eq(&other) {
                Some(b) => Value::Bool(b),
                None => Value::Null,
            },
        }
    }

    fn match_ordering(
        &self,
        input: &Value,
        expr: &SpannedExpr,
        env: &Arc<Scope>,
        pred: fn(Ordering) -> bool,
    ) -> Value {
        if input.is_null() {
            return Value::Null;
        }
        let value = self.eval(expr, env);
        if value.is_error() {
            return value;
        }
        match input.compare(&value) {
            Some(ordering) => Value::Bool(pred(ordering)),
            None => Value::Null,
        }
    }

    fn match_disjunction(&self, tests: &[SpannedExpr], input: &Value, env: &Arc<Scope>) -> Value {
        let mut unanswered = false;
        for test in tests {
            match self.match_test(test, input, env) {
                Value::Bool(true) => return Value::Bool(true),
                Value::Bool(false) => {}
                _ => unanswered = true,
            }
        }
        if unanswered {
            Value::Null
        } else {
            Value::Bool(false)
        }
    }
}

/// Exact decimal integer exponentiation by squaring; `None` on overflow or
/// division by zero.
fn decimal_powi(base: Decimal, exp: i64) -> Option<Decimal> {
    if exp < 0 {
        if exp == i64::MIN {
            return None;
        }
        let positive = decimal_powi(base, -exp)?;
        if positive.is_zero() {
            return None;
        }
        return Decimal::ONE.checked_div(positive);
    }

    let mut result = Decimal::ONE;
    let mut base = base;
    let mut exp = exp as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

fn make_boundary(bound: RangeBound, value: Value) -> RangeBoundary {
    match bound {
        RangeBound::Open => RangeBoundary::Open(value),
        RangeBound::Closed => RangeBoundary::Closed(value),
    }
}

/// 1-based list indexing; negative indices count from the end; zero and
/// out-of-range indices are Null.
fn index_list(items: &Arc<[Value]>, index: &Decimal) -> Value {
    if !index.is_integer() {
        return Value::Null;
    }
    let Some(index) = index.to_i64() else {
        return Value::Null;
    };
    let len = items.len() as i64;
    let resolved = if index > 0 {
        index - 1
    } else if index < 0 {
        len + index
    } else {
        return Value::Null;
    };
    if resolved < 0 || resolved >= len {
        return Value::Null;
    }
    items[resolved as usize].clone()
}

/// Integer materialisation of a range for iteration: ascending when
/// `start <= end`, descending otherwise; open bounds exclude their endpoint.
fn range_to_list(range: &RangeValue) -> Option<Vec<Value>> {
    let bound_int = |boundary: &RangeBoundary| -> Option<(i64, bool)> {
        let (value, closed) = match boundary {
            RangeBoundary::Closed(v) => (v, true),
            RangeBoundary::Open(v) => (v, false),
            RangeBoundary::Unbounded => return None,
        };
        match value {
            Value::Number(n) if n.is_integer() => n.to_i64().map(|i| (i, closed)),
            _ => None,
        }
    };

    let (mut start, start_closed) = bound_int(&range.start)?;
    let (mut end, end_closed) = bound_int(&range.end)?;
    let ascending = start <= end;
    let step: i64 = if ascending { 1 } else { -1 };
    if !start_closed {
        start += step;
    }
    if !end_closed {
        end -= step;
    }

    let mut items = Vec::new();
    let mut current = start;
    loop {
        if ascending && current > end {
            break;
        }
        if !ascending && current < end {
            break;
        }
        items.push(Value::from(current));
        current = current.checked_add(step)?;
    }
    Some(items)
}
