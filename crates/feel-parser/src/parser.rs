//! FEEL parser - hand-written recursive descent over the token stream.
//!
//! Each precedence level is its own `parse_*` production; left recursion is
//! avoided by the usual `level := next (op next)*` layering. The parser keeps
//! the source text so context keys and whitespace-bearing names can be sliced
//! verbatim from token spans.

use crate::ast::{Args, BinaryOp, Expr, Iteration, Quantifier, RangeBound, Spanned, SpannedExpr};
use crate::lexer::{Span, SpannedToken, Token};
use crate::ParseError;

/// Built-in function names that contain reserved words. A name sequence with
/// a reserved part is only recognised as an invocation target when the joined
/// name is one of these.
const RESERVED_FUNCTION_NAMES: &[&str] = &[
    "and",
    "or",
    "date and time",
    "years and months duration",
    "get or else",
];

/// Recursive descent parser for FEEL expressions and unary tests.
pub struct Parser<'a> {
    source: &'a str,
    tokens: &'a [SpannedToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source and token stream.
    pub fn new(source: &'a str, tokens: &'a [SpannedToken]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Peek at the token `offset` positions ahead.
    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    /// The current token if it is a plain (non-reserved) name.
    fn peek_name(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Name(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the span of the current token.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// Advance to the next token, returning the current one.
    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek().is_some_and(|t| t == token)
    }

    /// Consume the current token if it matches, returning true if consumed.
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError {
                message: format!("expected '{}', found {:?}", token, self.peek()),
                span: self.peek_span(),
            })
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            span: self.peek_span(),
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The span of the current (unconsumed) token, or end-of-input.
    pub fn current_span(&self) -> Span {
        self.peek_span()
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_expression()
    }

    /// Level 1: `if`, `for`, `some`/`every`, disjunction.
    fn parse_expression(&mut self) -> Result<SpannedExpr, ParseError> {
        match self.peek_name() {
            Some("if") => self.parse_if(),
            Some("for") if self.looks_like_iteration() => self.parse_for(),
            Some("some") if self.looks_like_iteration() => {
                self.parse_quantified(Quantifier::Some)
            }
            Some("every") if self.looks_like_iteration() => {
                self.parse_quantified(Quantifier::Every)
            }
            _ => self.parse_disjunction(),
        }
    }

    /// Check for `name in` after the current token, the signature of an
    /// iteration header.
    fn looks_like_iteration(&self) -> bool {
        matches!(
            self.peek_at(1),
            Some(Token::Name(_)) | Some(Token::QuotedName(_))
        ) && matches!(self.peek_at(2), Some(Token::In))
    }

    fn parse_if(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.advance(); // 'if'
        let condition = self.parse_expression()?;
        self.expect(&Token::Then)?;
        let then_branch = self.parse_expression()?;
        self.expect(&Token::Else)?;
        let else_branch = self.parse_expression()?;
        let span = start..else_branch.span.end;

        Ok(Spanned::new(
            Expr::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn parse_for(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.advance(); // 'for'
        let iterations = self.parse_iterations()?;
        self.expect(&Token::Return)?;
        let body = self.parse_expression()?;
        let span = start..body.span.end;

        Ok(Spanned::new(
            Expr::For {
                iterations,
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_quantified(&mut self, quantifier: Quantifier) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.advance(); // 'some' / 'every'
        let iterations = self.parse_iterations()?;
        self.expect(&Token::Satisfies)?;
        let condition = self.parse_expression()?;
        let span = start..condition.span.end;

        Ok(Spanned::new(
            Expr::Quantified {
                quantifier,
                iterations,
                condition: Box::new(condition),
            },
            span,
        ))
    }

    /// Parse `name in source` iteration headers, comma-separated.
    fn parse_iterations(&mut self) -> Result<Vec<Iteration>, ParseError> {
        let mut iterations = Vec::new();
        loop {
            let name = match self.advance() {
                Some((Token::Name(name), _)) => name.clone(),
                Some((Token::QuotedName(name), _)) => name.clone(),
                other => {
                    return Err(ParseError {
                        message: format!(
                            "expected iteration variable, found {:?}",
                            other.map(|(t, _)| t)
                        ),
                        span: self.peek_span(),
                    });
                }
            };
            self.expect(&Token::In)?;
            let source = self.parse_iteration_source()?;
            iterations.push(Iteration { name, source });

            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(iterations)
    }

    /// An iteration source is an expression, optionally extended to a range
    /// by `..` (as in `for i in 1..10`).
    fn parse_iteration_source(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.parse_disjunction()?;
        if self.match_token(&Token::DotDot) {
            let end = self.parse_additive()?;
            let span = start.span.start..end.span.end;
            Ok(Spanned::new(
                Expr::ConstRange {
                    start_bound: RangeBound::Closed,
                    start: Box::new(start),
                    end: Box::new(end),
                    end_bound: RangeBound::Closed,
                },
                span,
            ))
        } else {
            Ok(start)
        }
    }

    /// Level 1 (cont.): logical OR.
    fn parse_disjunction(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_conjunction()?;

        while self.match_token(&Token::Or) {
            let right = self.parse_conjunction()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op: BinaryOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Level 2: logical AND.
    fn parse_conjunction(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.match_token(&Token::And) {
            let right = self.parse_comparison()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op: BinaryOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Level 3: comparison family. Non-chainable.
    fn parse_comparison(&mut self) -> Result<SpannedExpr, ParseError> {
        let left = self.parse_additive()?;

        if let Some(op) = self.peek_compare_op() {
            self.advance();
            let right = self.parse_additive()?;
            let span = left.span.start..right.span.end;
            return Ok(Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            ));
        }

        if self.peek_name() == Some("between") {
            return self.parse_between(left);
        }

        if self.peek_name() == Some("instance") && matches!(self.peek_at(1), Some(Token::Name(n)) if n == "of")
        {
            self.advance();
            self.advance();
            let (type_name, end) = self.parse_type_name()?;
            let span = left.span.start..end;
            return Ok(Spanned::new(
                Expr::InstanceOf {
                    value: Box::new(left),
                    type_name,
                },
                span,
            ));
        }

        if self.match_token(&Token::In) {
            let tests = self.parse_in_rhs()?;
            let end = tests.last().map(|t| t.span.end).unwrap_or(left.span.end);
            let span = left.span.start..end;
            return Ok(Spanned::new(
                Expr::In {
                    value: Box::new(left),
                    tests,
                },
                span,
            ));
        }

        Ok(left)
    }

    fn peek_compare_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    /// `x between a and b` desugars to `x >= a and x <= b`.
    fn parse_between(&mut self, value: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        self.advance(); // 'between'
        let low = self.parse_additive()?;
        self.expect(&Token::And)?;
        let high = self.parse_additive()?;
        let span = value.span.start..high.span.end;

        let ge = Spanned::new(
            Expr::Binary {
                op: BinaryOp::Ge,
                left: Box::new(value.clone()),
                right: Box::new(low),
            },
            span.clone(),
        );
        let le = Spanned::new(
            Expr::Binary {
                op: BinaryOp::Le,
                left: Box::new(value),
                right: Box::new(high),
            },
            span.clone(),
        );
        Ok(Spanned::new(
            Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(ge),
                right: Box::new(le),
            },
            span,
        ))
    }

    /// Parse a type name for `instance of`, including the multi-word
    /// temporal type names.
    fn parse_type_name(&mut self) -> Result<(String, usize), ParseError> {
        let (first, mut end) = match self.advance() {
            Some((Token::Name(name), span)) => (name.clone(), span.end),
            other => {
                return Err(ParseError {
                    message: format!("expected type name, found {:?}", other.map(|(t, _)| t)),
                    span: self.peek_span(),
                });
            }
        };

        let compound: Option<(&[&str], &str)> = match first.as_str() {
            "date" => Some((&["time"], "date and time")),
            "days" => Some((&["time", "duration"], "days and time duration")),
            "years" => Some((&["months", "duration"], "years and months duration")),
            _ => None,
        };

        if let Some((rest, full)) = compound {
            if self.check(&Token::And) {
                let mut matches = true;
                for (i, part) in rest.iter().enumerate() {
                    match self.peek_at(1 + i) {
                        Some(Token::Name(n)) if n == part => {}
                        _ => {
                            matches = false;
                            break;
                        }
                    }
                }
                if matches {
                    self.advance(); // 'and'
                    for _ in rest {
                        end = self.peek_span().end;
                        self.advance();
                    }
                    return Ok((full.to_string(), end));
                }
            }
            // `date` on its own is still a valid type name.
        }

        Ok((first, end))
    }

    /// Level 4: additive operators.
    fn parse_additive(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_multiplicative()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_exponentiation()?;

        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else {
                break;
            };

            let right = self.parse_exponentiation()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// `**` is left-associative and binds tighter than `*` and `/`.
    fn parse_exponentiation(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_unary()?;

        while self.match_token(&Token::StarStar) {
            let right = self.parse_unary()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op: BinaryOp::Exp,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;

        if self.match_token(&Token::Minus) {
            let expr = self.parse_unary()?;
            let span = start..expr.span.end;
            Ok(Spanned::new(Expr::Neg(Box::new(expr)), span))
        } else {
            self.parse_chain()
        }
    }

    /// Level 5: a value followed by a chain of path and filter operations.
    fn parse_chain(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_value()?;

        loop {
            if self.check(&Token::Dot) {
                self.advance();
                let (name, end) = match self.advance() {
                    Some((Token::Name(name), span)) => (name.clone(), span.end),
                    Some((Token::QuotedName(name), span)) => (name.clone(), span.end),
                    other => {
                        return Err(ParseError {
                            message: format!(
                                "expected name after '.', found {:?}",
                                other.map(|(t, _)| t)
                            ),
                            span: self.peek_span(),
                        });
                    }
                };

                if self.check(&Token::LParen) {
                    // Qualified invocation: target.name(args)
                    let args = self.parse_args()?;
                    let span = expr.span.start..self.previous_end();
                    expr = Spanned::new(
                        Expr::QualifiedFunctionInvocation {
                            target: Box::new(expr),
                            name,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.start..end;
                    expr = Spanned::new(
                        Expr::Path {
                            base: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
            } else if self.check(&Token::LBracket) {
                self.advance();
                let predicate = self.parse_expression()?;
                let end_span = self.expect(&Token::RBracket)?;
                let span = expr.span.start..end_span.end;
                expr = Spanned::new(
                    Expr::Filter {
                        base: Box::new(expr),
                        predicate: Box::new(predicate),
                    },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// End offset of the most recently consumed token.
    fn previous_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, s)| s.end)
            .unwrap_or(0)
    }

    /// Parse an atom: literal, `?`, function definition, parenthesised
    /// expression, list or range, context, reference, or invocation.
    fn parse_value(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let token = self.peek().cloned();

        match token {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Spanned::new(Expr::Number(n), span))
            }
            Some(Token::String(s)) => {
                self.advance();
                Ok(Spanned::new(Expr::String(s), span))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(true), span))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(false), span))
            }
            Some(Token::Null) => {
                self.advance();
                Ok(Spanned::new(Expr::Null, span))
            }
            Some(Token::Question) => {
                self.advance();
                Ok(Spanned::new(Expr::InputValue, span))
            }
            Some(Token::Function) => self.parse_function_definition(),
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => self.parse_list_or_range(),
            Some(Token::LBrace) => self.parse_context(),
            Some(Token::Name(_)) | Some(Token::QuotedName(_)) | Some(Token::And)
            | Some(Token::Or) => self.parse_name_or_invocation(),
            Some(token) => Err(ParseError {
                message: format!("unexpected token: {:?}", token),
                span,
            }),
            None => Err(ParseError {
                message: "unexpected end of input".to_string(),
                span: self.eof_span(),
            }),
        }
    }

    /// `function(p1, p2, ...) body`
    fn parse_function_definition(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.advance(); // 'function'
        self.expect(&Token::LParen)?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            params.push(self.parse_parameter_name()?);
            while self.match_token(&Token::Comma) {
                params.push(self.parse_parameter_name()?);
            }
        }
        self.expect(&Token::RParen)?;

        let body = self.parse_expression()?;
        let span = start..body.span.end;

        Ok(Spanned::new(
            Expr::FunctionDefinition {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// A parameter name: a quoted name, or one or more name words joined by
    /// single spaces (`grouping separator`).
    fn parse_parameter_name(&mut self) -> Result<String, ParseError> {
        if let Some(Token::QuotedName(name)) = self.peek() {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }

        let mut parts = Vec::new();
        while let Some(Token::Name(word)) = self.peek() {
            parts.push(word.clone());
            self.advance();
        }
        if parts.is_empty() {
            return Err(self.error("expected parameter name"));
        }
        Ok(parts.join(" "))
    }

    /// `[a, b, c]`, `[]`, or a range such as `[1..10]` / `[1..10[`.
    fn parse_list_or_range(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::LBracket)?;

        if self.check(&Token::RBracket) {
            let end_span = self.expect(&Token::RBracket)?;
            return Ok(Spanned::new(Expr::ConstList(Vec::new()), start..end_span.end));
        }

        let first = self.parse_expression()?;

        if self.match_token(&Token::DotDot) {
            let end = self.parse_additive()?;
            let end_bound = self.parse_range_end_bound()?;
            let span = start..self.previous_end();
            return Ok(Spanned::new(
                Expr::ConstRange {
                    start_bound: RangeBound::Closed,
                    start: Box::new(first),
                    end: Box::new(end),
                    end_bound,
                },
                span,
            ));
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma) {
            items.push(self.parse_expression()?);
        }
        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(Expr::ConstList(items), start..end_span.end))
    }

    fn parse_range_end_bound(&mut self) -> Result<RangeBound, ParseError> {
        match self.peek() {
            Some(Token::RBracket) => {
                self.advance();
                Ok(RangeBound::Closed)
            }
            Some(Token::LBracket) | Some(Token::RParen) => {
                self.advance();
                Ok(RangeBound::Open)
            }
            _ => Err(self.error("expected range end delimiter")),
        }
    }

    /// `{key: value, ...}` with ordered entries.
    fn parse_context(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::LBrace)?;

        let mut entries = Vec::new();
        if !self.check(&Token::RBrace) {
            loop {
                let key = self.parse_context_key()?;
                self.expect(&Token::Colon)?;
                let value = self.parse_expression()?;
                entries.push((key, value));

                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        let end_span = self.expect(&Token::RBrace)?;

        Ok(Spanned::new(Expr::ConstContext(entries), start..end_span.end))
    }

    /// A context key: a string literal, a backtick-quoted name, or a raw run
    /// of tokens up to the `:` sentinel, sliced verbatim from the source so
    /// interior spacing is preserved.
    fn parse_context_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::String(key)) => {
                let key = key.clone();
                self.advance();
                return Ok(key);
            }
            Some(Token::QuotedName(key)) => {
                let key = key.clone();
                self.advance();
                return Ok(key);
            }
            _ => {}
        }

        let start = self.peek_span().start;
        let mut end = start;
        let mut consumed = false;

        while let Some(token) = self.peek() {
            match token {
                Token::Colon => break,
                // The reserved key symbols: " { } : , [ ] `
                Token::String(_)
                | Token::QuotedName(_)
                | Token::LBrace
                | Token::RBrace
                | Token::Comma
                | Token::LBracket
                | Token::RBracket => {
                    return Err(self.error("expected ':' after context key"));
                }
                _ => {
                    end = self.peek_span().end;
                    self.advance();
                    consumed = true;
                }
            }
        }

        if !consumed {
            return Err(self.error("expected context key"));
        }
        Ok(self.source[start..end].to_string())
    }

    /// A name-led value: either a function invocation (whose name may bear
    /// spaces, and may contain reserved words only for the fixed built-in
    /// list) or a plain variable reference.
    fn parse_name_or_invocation(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;

        // Backtick-quoted names are complete on their own.
        if let Some(Token::QuotedName(name)) = self.peek() {
            let name = name.clone();
            let span = self.peek_span();
            self.advance();
            if self.check(&Token::LParen) {
                let args = self.parse_args()?;
                return Ok(Spanned::new(
                    Expr::FunctionInvocation { name, args },
                    start..self.previous_end(),
                ));
            }
            return Ok(Spanned::new(Expr::Ref(vec![name]), span));
        }

        // Scan ahead for the longest name-part sequence immediately followed
        // by '(' that forms a valid invocation target.
        let mut offset = 0;
        let mut parts: Vec<String> = Vec::new();
        let mut has_reserved = false;
        let mut best: Option<(usize, String)> = None;

        while let Some(token) = self.peek_at(offset) {
            let Some(part) = token.name_part() else { break };
            parts.push(part.to_string());
            has_reserved |= token.is_reserved();

            if matches!(self.peek_at(offset + 1), Some(Token::LParen)) {
                let joined = parts.join(" ");
                if !has_reserved || RESERVED_FUNCTION_NAMES.contains(&joined.as_str()) {
                    best = Some((offset + 1, joined));
                }
            }
            offset += 1;
        }

        if let Some((name_len, name)) = best {
            for _ in 0..name_len {
                self.advance();
            }
            let args = self.parse_args()?;
            return Ok(Spanned::new(
                Expr::FunctionInvocation { name, args },
                start..self.previous_end(),
            ));
        }

        // Plain reference: a single unquoted name. Multi-word references must
        // be backtick-quoted.
        match self.advance() {
            Some((Token::Name(name), span)) => {
                let name = name.clone();
                let span = span.clone();
                Ok(Spanned::new(Expr::Ref(vec![name]), span))
            }
            other => Err(ParseError {
                message: format!("expected name, found {:?}", other.map(|(t, _)| t)),
                span: self.peek_span(),
            }),
        }
    }

    /// Parse an argument list, positional or named.
    fn parse_args(&mut self) -> Result<Args, ParseError> {
        self.expect(&Token::LParen)?;

        if self.match_token(&Token::RParen) {
            return Ok(Args::Positional(Vec::new()));
        }

        if self.at_named_argument() {
            let mut args = Vec::new();
            loop {
                let name = self.parse_parameter_name()?;
                self.expect(&Token::Colon)?;
                let value = self.parse_expression()?;
                args.push((name, value));
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
            return Ok(Args::Named(args));
        }

        let mut args = vec![self.parse_expression()?];
        while self.match_token(&Token::Comma) {
            args.push(self.parse_expression()?);
        }
        self.expect(&Token::RParen)?;
        Ok(Args::Positional(args))
    }

    /// True when the upcoming tokens read as `name :`, the named-argument
    /// prefix.
    fn at_named_argument(&self) -> bool {
        let mut offset = 0;
        while matches!(self.peek_at(offset), Some(Token::Name(_))) {
            offset += 1;
        }
        offset > 0 && matches!(self.peek_at(offset), Some(Token::Colon))
    }

    // === Unary-Test Parsing ===

    /// Parse the unary-tests entry point.
    pub fn parse_unary_tests(&mut self) -> Result<SpannedExpr, ParseError> {
        let start_span = self.peek_span();

        // '-' on its own matches anything.
        if self.check(&Token::Minus) && self.tokens.len() == self.pos + 1 {
            self.advance();
            return Ok(Spanned::new(Expr::AnyMatch, start_span));
        }

        if self.peek_name() == Some("not") && matches!(self.peek_at(1), Some(Token::LParen)) {
            self.advance();
            self.advance();
            let tests = self.parse_positive_tests()?;
            let end_span = self.expect(&Token::RParen)?;
            return Ok(Spanned::new(
                Expr::Negation(tests),
                start_span.start..end_span.end,
            ));
        }

        let mut tests = self.parse_positive_tests()?;
        if tests.len() == 1 {
            Ok(tests.pop().expect("one test"))
        } else {
            let span = tests.first().expect("tests").span.start
                ..tests.last().expect("tests").span.end;
            Ok(Spanned::new(Expr::AtLeastOne(tests), span))
        }
    }

    fn parse_positive_tests(&mut self) -> Result<Vec<SpannedExpr>, ParseError> {
        let mut tests = vec![self.parse_positive_test()?];
        while self.match_token(&Token::Comma) {
            tests.push(self.parse_positive_test()?);
        }
        Ok(tests)
    }

    /// The right-hand side of `in`: a parenthesised disjunction of tests, or
    /// a single test.
    fn parse_in_rhs(&mut self) -> Result<Vec<SpannedExpr>, ParseError> {
        if self.check(&Token::LParen) {
            let saved = self.pos;
            self.advance();
            if let Ok(tests) = self.parse_positive_tests() {
                if self.match_token(&Token::RParen) {
                    return Ok(tests);
                }
            }
            self.pos = saved;
        }
        Ok(vec![self.parse_positive_test()?])
    }

    fn parse_positive_test(&mut self) -> Result<SpannedExpr, ParseError> {
        let start_span = self.peek_span();

        match self.peek() {
            Some(Token::Lt) => {
                self.advance();
                let e = self.parse_additive()?;
                let span = start_span.start..e.span.end;
                return Ok(Spanned::new(Expr::InputLessThan(Box::new(e)), span));
            }
            Some(Token::Le) => {
                self.advance();
                let e = self.parse_additive()?;
                let span = start_span.start..e.span.end;
                return Ok(Spanned::new(Expr::InputLessOrEqual(Box::new(e)), span));
            }
            Some(Token::Gt) => {
                self.advance();
                let e = self.parse_additive()?;
                let span = start_span.start..e.span.end;
                return Ok(Spanned::new(Expr::InputGreaterThan(Box::new(e)), span));
            }
            Some(Token::Ge) => {
                self.advance();
                let e = self.parse_additive()?;
                let span = start_span.start..e.span.end;
                return Ok(Spanned::new(Expr::InputGreaterOrEqual(Box::new(e)), span));
            }
            Some(Token::LBracket) | Some(Token::RBracket) | Some(Token::LParen) => {
                let saved = self.pos;
                if let Ok(range) = self.parse_test_range() {
                    let span = range.span.clone();
                    return Ok(Spanned::new(Expr::InputInRange(Box::new(range)), span));
                }
                self.pos = saved;
            }
            _ => {}
        }

        let e = self.parse_expression()?;
        let span = e.span.clone();
        // A boolean literal standing as the whole test is bound as
        // input-equal-to; any larger expression is a test expression.
        if matches!(e.node, Expr::Bool(_)) {
            return Ok(Spanned::new(Expr::InputEqualTo(Box::new(e)), span));
        }
        Ok(Spanned::new(Expr::UnaryTestExpression(Box::new(e)), span))
    }

    /// A range in test position: `('['|'('|']') endpoint '..' endpoint
    /// (')'|'['|']')`. A `(` or `]` on the left is an open lower bound.
    fn parse_test_range(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        let start_bound = match self.peek() {
            Some(Token::LBracket) => RangeBound::Closed,
            Some(Token::LParen) | Some(Token::RBracket) => RangeBound::Open,
            _ => return Err(self.error("expected range start delimiter")),
        };
        self.advance();

        let low = self.parse_additive()?;
        self.expect(&Token::DotDot)?;
        let high = self.parse_additive()?;
        let end_bound = self.parse_range_end_bound()?;
        let span = start..self.previous_end();

        Ok(Spanned::new(
            Expr::ConstRange {
                start_bound,
                start: Box::new(low),
                end: Box::new(high),
                end_bound,
            },
            span,
        ))
    }
}
