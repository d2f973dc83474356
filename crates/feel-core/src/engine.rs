//! Engine façade: parse and evaluate FEEL with a built-in registry.
//!
//! The [`Engine`] owns the built-in root scope (built once, read-only
//! afterwards) and the value-mapper chain. A [`ParsedExpression`] is the
//! cacheable hand-off between parsing and evaluation: it is immutable, cheap
//! to clone, and may be evaluated repeatedly and concurrently, each
//! evaluation owning its own scope stack and warnings.

use std::sync::Arc;

use thiserror::Error;

use feel_parser::SpannedExpr;

use crate::eval::{builtins, Evaluator, FunctionValue, Scope, Value, Warning};
use crate::mapper::{MapperChain, ValueMapper};

/// A successful evaluation: the value plus any suppressed failures.
#[derive(Debug, Clone)]
pub struct EvalSuccess {
    pub value: Value,
    pub warnings: Vec<Warning>,
}

/// A failed evaluation: parse errors and fatal internal failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvalFailure {
    pub message: String,
    pub warnings: Vec<Warning>,
}

/// The outcome of an engine entry point.
pub type EngineResult = Result<EvalSuccess, EvalFailure>;

/// A FEEL evaluation engine.
pub struct Engine {
    root: Arc<Scope>,
    mappers: MapperChain,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the standard built-ins installed.
    pub fn new() -> Self {
        let mut root = Scope::root();
        builtins::install(&mut root);
        Self {
            root: Arc::new(root),
            mappers: MapperChain::default(),
        }
    }

    /// Register an additional built-in function. Registration happens at
    /// engine construction time; evaluations already handed out keep the
    /// scope they were created with.
    pub fn add_builtin(
        &mut self,
        name: &str,
        params: &[&str],
        var_args: bool,
        implementation: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) {
        Arc::make_mut(&mut self.root).bind(
            name,
            Value::Function(Arc::new(FunctionValue::native(
                params,
                var_args,
                implementation,
            ))),
        );
    }

    /// Add a custom value mapper ahead of the default one.
    pub fn add_mapper(&mut self, mapper: Arc<dyn ValueMapper>) {
        self.mappers.prepend(mapper);
    }

    /// Parse an expression into a reusable hand-off.
    pub fn parse_expression(&self, text: &str) -> Result<ParsedExpression, EvalFailure> {
        match feel_parser::parse(text).into_result() {
            Ok(ast) => Ok(ParsedExpression {
                ast: Arc::new(ast),
                root: self.root.clone(),
                mappers: self.mappers.clone(),
            }),
            Err(errors) => Err(parse_failure(errors)),
        }
    }

    /// Parse and evaluate an expression against the given variables.
    ///
    /// `variables` is a JSON object (or JSON null for none); each entry is
    /// converted through the mapper chain.
    pub fn evaluate_expression(
        &self,
        text: &str,
        variables: &serde_json::Value,
    ) -> EngineResult {
        self.parse_expression(text)?.evaluate(variables)
    }

    /// Parse a unary-tests string and match it against the given input.
    pub fn evaluate_unary_tests(
        &self,
        text: &str,
        input: &serde_json::Value,
        variables: &serde_json::Value,
    ) -> EngineResult {
        let ast = feel_parser::parse_unary_tests(text)
            .into_result()
            .map_err(parse_failure)?;
        let env = variables_scope(&self.root, &self.mappers, variables)?;
        let input = self.mappers.to_value(input);

        let evaluator = Evaluator::new();
        let value = evaluator.match_unary_tests(&ast, &input, &env);
        finish(value, evaluator.take_warnings())
    }

    /// Convert an internal value to its host form.
    pub fn to_host(&self, value: &Value) -> serde_json::Value {
        self.mappers.from_value(value)
    }

    /// Convert a host value to its internal form.
    pub fn from_host(&self, host: &serde_json::Value) -> Value {
        self.mappers.to_value(host)
    }
}

/// A parsed expression ready for evaluation.
#[derive(Clone)]
pub struct ParsedExpression {
    ast: Arc<SpannedExpr>,
    root: Arc<Scope>,
    mappers: MapperChain,
}

impl ParsedExpression {
    /// The underlying AST.
    pub fn ast(&self) -> &SpannedExpr {
        &self.ast
    }

    /// Evaluate against the given variables.
    pub fn evaluate(&self, variables: &serde_json::Value) -> EngineResult {
        let env = variables_scope(&self.root, &self.mappers, variables)?;
        let evaluator = Evaluator::new();
        let value = evaluator.eval(&self.ast, &env);
        finish(value, evaluator.take_warnings())
    }
}

fn variables_scope(
    root: &Arc<Scope>,
    mappers: &MapperChain,
    variables: &serde_json::Value,
) -> Result<Arc<Scope>, EvalFailure> {
    let mut scope = Scope::nested(root.clone());
    match variables {
        serde_json::Value::Null => {}
        serde_json::Value::Object(entries) => {
            for (name, value) in entries {
                scope.bind(name.clone(), mappers.to_value(value));
            }
        }
        _ => {
            return Err(EvalFailure {
                message: "variables must be a JSON object".to_string(),
                warnings: Vec::new(),
            });
        }
    }
    Ok(Arc::new(scope))
}

fn finish(value: Value, warnings: Vec<Warning>) -> EngineResult {
    match value {
        Value::Error(err) => Err(EvalFailure {
            message: err.message.clone(),
            warnings,
        }),
        value => Ok(EvalSuccess { value, warnings }),
    }
}

fn parse_failure(errors: Vec<feel_parser::ParseError>) -> EvalFailure {
    let message = errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "parse error".to_string());
    EvalFailure {
        message,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(s: &str) -> Value {
        Value::Number(s.parse().unwrap())
    }

    #[test]
    fn evaluate_with_variables() {
        let engine = Engine::new();
        let result = engine
            .evaluate_expression("x + y", &json!({"x": 1, "y": 2}))
            .unwrap();
        assert_eq!(result.value, num("3"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn parse_errors_are_fatal() {
        let engine = Engine::new();
        let failure = engine
            .evaluate_expression("1 +", &json!(null))
            .unwrap_err();
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn undeclared_variable_is_a_warning_not_a_failure() {
        let engine = Engine::new();
        let result = engine
            .evaluate_expression("missing + 1", &json!(null))
            .unwrap();
        assert_eq!(result.value, Value::Null);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn parsed_expression_is_reusable() {
        let engine = Engine::new();
        let parsed = engine.parse_expression("x * 2").unwrap();

        let a = parsed.evaluate(&json!({"x": 5})).unwrap();
        assert_eq!(a.value, num("10"));

        let b = parsed.evaluate(&json!({"x": 21})).unwrap();
        assert_eq!(b.value, num("42"));
    }

    #[test]
    fn unary_tests_entry_point() {
        let engine = Engine::new();
        let result = engine
            .evaluate_unary_tests("[4..6]", &json!(5), &json!(null))
            .unwrap();
        assert_eq!(result.value, Value::Bool(true));

        let result = engine
            .evaluate_unary_tests("> 5", &json!(null), &json!(null))
            .unwrap();
        assert_eq!(result.value, Value::Null);
    }

    #[test]
    fn custom_builtin_is_invocable() {
        let mut engine = Engine::new();
        engine.add_builtin("twice", &["value"], false, |args| {
            match args.first() {
                Some(Value::Number(n)) => Value::Number(n + n),
                _ => Value::Null,
            }
        });

        let result = engine
            .evaluate_expression("twice(21)", &json!(null))
            .unwrap();
        assert_eq!(result.value, num("42"));
    }

    #[test]
    fn host_round_trip() {
        let engine = Engine::new();
        let result = engine
            .evaluate_expression("{a: [1, 2]}", &json!(null))
            .unwrap();
        assert_eq!(engine.to_host(&result.value), json!({"a": [1, 2]}));
    }
}
