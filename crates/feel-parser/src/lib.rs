//! FEEL (Friendly Enough Expression Language) parser.

pub mod ast;
pub mod lexer;
mod parser;

pub use ast::{
    Args, BinaryOp, Expr, Iteration, Quantifier, RangeBound, Span, Spanned, SpannedExpr,
};
pub use parser::Parser;

/// A parse error with source location.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Result of parsing a FEEL expression or unary tests.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed AST, if parsing succeeded.
    pub ast: Option<SpannedExpr>,
    /// Any parse errors encountered. Parse errors are fatal: when non-empty,
    /// `ast` is `None`.
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.ast.is_some()
    }

    /// Returns true if there are any parse errors.
    pub fn is_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Converts to a Result.
    pub fn into_result(self) -> Result<SpannedExpr, Vec<ParseError>> {
        if self.errors.is_empty() {
            self.ast.ok_or_else(Vec::new)
        } else {
            Err(self.errors)
        }
    }
}

/// Parse a FEEL expression from source.
pub fn parse(input: &str) -> ParseResult {
    run(input, |parser| parser.parse_expr())
}

/// Parse a FEEL unary-tests string from source.
pub fn parse_unary_tests(input: &str) -> ParseResult {
    run(input, |parser| parser.parse_unary_tests())
}

fn run(
    input: &str,
    entry: impl FnOnce(&mut Parser<'_>) -> Result<SpannedExpr, ParseError>,
) -> ParseResult {
    let tokens = match lexer::lex(input) {
        Ok(tokens) => tokens,
        Err(e) => {
            return ParseResult {
                ast: None,
                errors: vec![ParseError {
                    message: e.message,
                    span: e.span,
                }],
            };
        }
    };

    if tokens.is_empty() {
        return ParseResult {
            ast: None,
            errors: vec![ParseError {
                message: "empty input".to_string(),
                span: 0..0,
            }],
        };
    }

    let mut parser = Parser::new(input, &tokens);
    match entry(&mut parser) {
        Ok(ast) => {
            if parser.at_end() {
                ParseResult {
                    ast: Some(ast),
                    errors: vec![],
                }
            } else {
                ParseResult {
                    ast: None,
                    errors: vec![ParseError {
                        message: "unexpected tokens after expression".to_string(),
                        span: parser.current_span(),
                    }],
                }
            }
        }
        Err(e) => ParseResult {
            ast: None,
            errors: vec![e],
        },
    }
}
