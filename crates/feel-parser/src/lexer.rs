//! FEEL lexer using logos.

use logos::Logos;
use rust_decimal::Decimal;

/// A span in the source input (byte offsets).
pub type Span = std::ops::Range<usize>;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// Lexer error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// FEEL tokens.
///
/// Reserved words get their own tokens; contextual keywords (`if`, `for`,
/// `some`, `every`, `between`, `instance`, `of`, `not`) lex as [`Token::Name`]
/// and are recognised by the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Token {
    // Number literal: integral[.fractional] or .fractional.
    // No scientific notation, no sign (unary minus is an operator).
    #[regex(r"[0-9]+(\.[0-9]+)?|\.[0-9]+", lex_number)]
    Number(Decimal),

    #[token("\"", lex_string)]
    String(String),

    // Backtick-quoted name: any character except backtick.
    #[token("`", lex_quoted_name)]
    QuotedName(String),

    // === Reserved Words ===
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("function")]
    Function,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("satisfies")]
    Satisfies,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    // === Name ===
    // Maximal munch keeps reserved-word-led names like `nullable` intact.
    #[regex(r"[\p{L}_][\p{L}\p{N}_]*", |lex| lex.slice().to_string(), priority = 0)]
    Name(String),

    // === Operators (multi-char first) ===
    #[token("**")]
    StarStar,
    #[token("..")]
    DotDot,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("?")]
    Question,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::QuotedName(s) => write!(f, "`{}`", s),
            Token::Null => write!(f, "null"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Function => write!(f, "function"),
            Token::In => write!(f, "in"),
            Token::Return => write!(f, "return"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::Satisfies => write!(f, "satisfies"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Name(s) => write!(f, "{}", s),
            Token::StarStar => write!(f, "**"),
            Token::DotDot => write!(f, ".."),
            Token::Ne => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Eq => write!(f, "="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Question => write!(f, "?"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
        }
    }
}

impl Token {
    /// The textual form of a token usable as a name part (identifiers and
    /// reserved words), or `None` for operators and literals.
    pub fn name_part(&self) -> Option<&str> {
        match self {
            Token::Name(s) => Some(s),
            Token::Null => Some("null"),
            Token::True => Some("true"),
            Token::False => Some("false"),
            Token::Function => Some("function"),
            Token::In => Some("in"),
            Token::Return => Some("return"),
            Token::Then => Some("then"),
            Token::Else => Some("else"),
            Token::Satisfies => Some("satisfies"),
            Token::And => Some("and"),
            Token::Or => Some("or"),
            _ => None,
        }
    }

    /// True for tokens that are reserved words of the language.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Token::Null
                | Token::True
                | Token::False
                | Token::Function
                | Token::In
                | Token::Return
                | Token::Then
                | Token::Else
                | Token::Satisfies
                | Token::And
                | Token::Or
        )
    }
}

// === Lexer Callbacks ===

fn lex_number(lex: &mut logos::Lexer<Token>) -> Option<Decimal> {
    let slice = lex.slice();
    if let Some(fraction) = slice.strip_prefix('.') {
        format!("0.{}", fraction).parse().ok()
    } else {
        slice.parse().ok()
    }
}

/// Lex a `"`-delimited string body.
///
/// Known escapes are translated; unknown escapes are preserved literally, so
/// `"\q"` lexes to the two characters `\q`. Processing is strictly
/// left-to-right: a backslash consumes exactly the next character, which makes
/// `"\\n"` the two characters `\n` rather than a backslash and a newline.
fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let remainder = lex.remainder();
    let mut chars = remainder.chars();
    let mut result = String::new();
    let mut consumed = 0;

    while let Some(c) = chars.next() {
        consumed += c.len_utf8();
        if c == '"' {
            lex.bump(consumed);
            return Some(result);
        } else if c == '\\' {
            let escape_char = chars.next()?;
            consumed += escape_char.len_utf8();
            match escape_char {
                'n' => result.push('\n'),
                'r' => result.push('\r'),
                't' => result.push('\t'),
                'b' => result.push('\x08'),
                'f' => result.push('\x0C'),
                '\'' => result.push('\''),
                '"' => result.push('"'),
                '\\' => result.push('\\'),
                other => {
                    // Unknown escape: keep it verbatim.
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }

    None // Unclosed string
}

fn lex_quoted_name(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let remainder = lex.remainder();
    let mut result = String::new();
    let mut consumed = 0;

    for c in remainder.chars() {
        consumed += c.len_utf8();
        if c == '`' {
            lex.bump(consumed);
            return Some(result);
        }
        result.push(c);
    }

    None // Unclosed name
}

// === Public Lexer API ===

/// Tokenize the input string.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", &input[span.clone()]),
                    span,
                })
            }
        }
    }

    Ok(tokens)
}
