use crate::syntax::ast::Span;
use crate::types::val_type::ScalarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Int,
    Hex,
    Float,
    Str,
    True,
    False,
    Null,
    Ident,

    // Keywords
    If,
    Then,
    Else,
    While,
    Foreach,
    In,
    For,

    /// `bool`, `int`, `float2`, ...
    Type(ScalarType),

    // Operators
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    Bang,     // !
    Eq,       // =
    EqEq,     // ==
    BangEq,   // !=
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    AndAnd,   // &&
    OrOr,     // ||
    Question, // ?

    // Punctuation
    Colon,    // :
    Comma,    // ,
    Dot,      // .
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]

    Eof,
}

impl TokenKind {
    pub fn is_type_keyword(&self) -> bool {
        matches!(self, Self::Type(_))
    }

    /// Human-readable name used in "expected ..." diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Int      => "integer literal",
            Self::Hex      => "hex literal",
            Self::Float    => "float literal",
            Self::Str      => "string literal",
            Self::True     => "`true`",
            Self::False    => "`false`",
            Self::Null     => "`null`",
            Self::Ident    => "identifier",
            Self::If       => "`if`",
            Self::Then     => "`then`",
            Self::Else     => "`else`",
            Self::While    => "`while`",
            Self::Foreach  => "`foreach`",
            Self::In       => "`in`",
            Self::For      => "`for`",
            Self::Type(_)  => "type name",
            Self::Plus     => "`+`",
            Self::Minus    => "`-`",
            Self::Star     => "`*`",
            Self::Slash    => "`/`",
            Self::Percent  => "`%`",
            Self::Bang     => "`!`",
            Self::Eq       => "`=`",
            Self::EqEq     => "`==`",
            Self::BangEq   => "`!=`",
            Self::Lt       => "`<`",
            Self::LtEq     => "`<=`",
            Self::Gt       => "`>`",
            Self::GtEq     => "`>=`",
            Self::AndAnd   => "`&&`",
            Self::OrOr     => "`||`",
            Self::Question => "`?`",
            Self::Colon    => "`:`",
            Self::Comma    => "`,`",
            Self::Dot      => "`.`",
            Self::LParen   => "`(`",
            Self::RParen   => "`)`",
            Self::LBrace   => "`{`",
            Self::RBrace   => "`}`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::Eof      => "end of input",
        }
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: &str) -> TokenKind {
    match s {
        "true"    => TokenKind::True,
        "false"   => TokenKind::False,
        "null"    => TokenKind::Null,
        "if"      => TokenKind::If,
        "then"    => TokenKind::Then,
        "else"    => TokenKind::Else,
        "while"   => TokenKind::While,
        "foreach" => TokenKind::Foreach,
        "in"      => TokenKind::In,
        "for"     => TokenKind::For,
        "bool"    => TokenKind::Type(ScalarType::Bool),
        "int"     => TokenKind::Type(ScalarType::Int),
        "float"   => TokenKind::Type(ScalarType::Float),
        "string"  => TokenKind::Type(ScalarType::String),
        "float2"  => TokenKind::Type(ScalarType::Float2),
        "float3"  => TokenKind::Type(ScalarType::Float3),
        "float4"  => TokenKind::Type(ScalarType::Float4),
        _         => TokenKind::Ident,
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token; string literals keep their quotes.
    pub text: String,
    pub span: Span,
    /// Byte offset of the start of the token's line, for `line_text`.
    pub line_start: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, line_start: usize) -> Self {
        Self { kind, text: text.into(), span, line_start }
    }
}
