//! FEEL (Friendly Enough Expression Language) evaluation engine.
//!
//! This crate pairs the [`feel_parser`] AST with a tree-walking interpreter,
//! a tagged value model with FEEL's null-propagation semantics, a built-in
//! function registry, and a pluggable mapper between host (`serde_json`)
//! values and the internal value domain.
//!
//! # Quick Start
//!
//! ```
//! use feel_core::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let result = engine
//!     .evaluate_expression("2 * (x + 5)", &json!({"x": 3}))
//!     .unwrap();
//! assert_eq!(engine.to_host(&result.value), json!(16));
//! ```
//!
//! # Architecture
//!
//! - `feel-parser`: lexer, AST, and recursive-descent parser
//! - `eval`: value model, scopes, evaluator, built-ins, temporal support
//! - `mapper`: host-value conversion chain
//! - `engine`: the parse-then-evaluate façade with warning reporting
//!
//! An AST, once produced, is immutable and may be shared by concurrent
//! evaluations; each evaluation owns its scope stack and warning list.

mod engine;
pub mod eval;
mod mapper;

pub use engine::{Engine, EngineResult, EvalFailure, EvalSuccess, ParsedExpression};
pub use mapper::{DefaultMapper, MapperChain, ValueMapper};

// Re-export from the eval module
pub use eval::{
    ContextValue, DayTimeDuration, EvalError, EvalErrorKind, Evaluator, FunctionValue,
    RangeBoundary, RangeValue, Scope, Value, Warning, WarningKind, YearMonthDuration,
};

// Re-export the parser entry points
pub use feel_parser::{parse, parse_unary_tests, ParseError, ParseResult};
