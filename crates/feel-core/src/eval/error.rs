//! Evaluation error and warning types.

use std::fmt;

/// An error produced during FEEL evaluation.
///
/// Errors are values: built-in functions signal failure by returning
/// `Value::Error`, and the evaluator converts errors at surfacing points into
/// warnings plus Null so the rest of the expression can proceed. Only
/// `Internal` errors abort evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Reference to an undeclared variable.
    NoVariableFound,
    /// A qualified lookup did not find the named context entry.
    NoContextEntryFound,
    /// Invocation of an unknown function name.
    NoFunctionFound,
    /// A function invocation reported failure.
    FunctionInvocationFailure,
    /// An assertion did not hold.
    AssertionFailure,
    /// Internal invariant violation (malformed AST); aborts evaluation.
    Internal,
}

impl EvalError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn no_variable_found(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoVariableFound,
            format!("no variable found for name '{}'", name),
        )
    }

    pub fn no_context_entry_found(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoContextEntryFound,
            format!("no context entry found for name '{}'", name),
        )
    }

    pub fn no_function_found(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoFunctionFound,
            format!("no function found for name '{}'", name),
        )
    }

    pub fn function_invocation_failure(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::FunctionInvocationFailure, message)
    }

    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::AssertionFailure, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }

    /// Convert this error into a warning, or `None` for fatal kinds.
    pub fn to_warning(&self) -> Option<Warning> {
        let kind = match self.kind {
            EvalErrorKind::NoVariableFound => WarningKind::NoVariableFound,
            EvalErrorKind::NoContextEntryFound => WarningKind::NoContextEntryFound,
            EvalErrorKind::NoFunctionFound => WarningKind::NoFunctionFound,
            EvalErrorKind::FunctionInvocationFailure => WarningKind::FunctionInvocationFailure,
            EvalErrorKind::AssertionFailure => WarningKind::AssertionFailure,
            EvalErrorKind::Internal => return None,
        };
        Some(Warning {
            message: self.message.clone(),
            kind,
        })
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// A suppressed evaluation failure reported alongside the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Human-readable description.
    pub message: String,
    /// The warning classification.
    pub kind: WarningKind,
}

/// Classification of evaluation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    NoVariableFound,
    NoContextEntryFound,
    NoFunctionFound,
    FunctionInvocationFailure,
    AssertionFailure,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
