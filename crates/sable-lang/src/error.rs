use std::fmt;

use thiserror::Error;

use crate::syntax::ast::Span;

/// Error codes prefixed by phase: L = lexer, P = parser, E = evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // malformed number

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // malformed literal
    P004, // ragged or mixed array literal
    P005, // undeclared identifier
    P006, // redeclaration in same scope
    P007, // invalid assignment target
    P008, // loop variable has the wrong type

    // Evaluation
    E001, // type mismatch
    E002, // invalid cast
    E003, // incompatible array elements
    E004, // variable read before it holds a value
    E005, // unknown function or no matching overload
    E006, // host function failed
    E007, // index out of range
    E008, // division by zero
    E009, // condition is not bool
    E010, // operator not applicable to type
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::P004 => "P004",
            Self::P005 => "P005",
            Self::P006 => "P006",
            Self::P007 => "P007",
            Self::P008 => "P008",
            Self::E001 => "E001",
            Self::E002 => "E002",
            Self::E003 => "E003",
            Self::E004 => "E004",
            Self::E005 => "E005",
            Self::E006 => "E006",
            Self::E007 => "E007",
            Self::E008 => "E008",
            Self::E009 => "E009",
            Self::E010 => "E010",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Lex / parse errors ──────────────────────────────────────────────────────

/// A lexical or parse failure. Fatal for the parse that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {span}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub span: Span,
    pub message: String,
    /// Raw text of the offending token (empty at end of input).
    pub token: String,
    /// Full text of the source line the token sits on.
    pub line_text: String,
    /// Token kind the parser wanted, when there was a single candidate.
    pub expected: Option<String>,
}

impl Error {
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            span,
            message: message.into(),
            token: String::new(),
            line_text: String::new(),
            expected: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, line_text: impl Into<String>) -> Self {
        self.token = token.into();
        self.line_text = line_text.into();
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn line(&self) -> usize { self.span.line }
    pub fn column(&self) -> usize { self.span.column }
}

// ─────────────────────────────────────────────────────────────────────────────

/// An evaluation failure, positioned at the AST node that observed it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {span}: {message}")]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub span: Span,
    pub message: String,
}

impl RuntimeError {
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self { code, span, message: message.into() }
    }

    pub fn line(&self) -> usize { self.span.line }
}
