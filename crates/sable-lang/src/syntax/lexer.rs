use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::Span;
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

/// Position of the first byte of a token being scanned.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
    line_start: usize,
}

/// Lazy tokenizer with one token of lookahead.
///
/// The lexer always holds a current token; `next` consumes it and scans the
/// following one. Lexical errors surface from whichever call triggers the
/// scan of the offending text.
pub struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    source: Rc<str>,
    pos: usize,
    line: usize,
    column: usize,
    line_start: usize,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// `first_line` is the 1-based line `text` starts on in its source.
    pub fn new(text: &'a str, source: &str, first_line: usize) -> Result<Self, Error> {
        let source: Rc<str> = Rc::from(source);
        let placeholder = Token::new(TokenKind::Eof, "", Span::new(source.clone(), first_line, 1), 0);
        let mut lexer = Self {
            text,
            bytes: text.as_bytes(),
            source,
            pos: 0,
            line: first_line,
            column: 1,
            line_start: 0,
            current: placeholder,
            peeked: None,
        };
        lexer.current = lexer.scan()?;
        Ok(lexer)
    }

    /// Every token in `text`, ending with `Eof`.
    pub fn tokenize(text: &str, source: &str) -> Result<Vec<Token>, Error> {
        let mut lexer = Lexer::new(text, source, 1)?;
        let mut tokens = Vec::new();
        loop {
            let done = lexer.kind() == TokenKind::Eof;
            tokens.push(lexer.next()?);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ─── Current token ───────────────────────────────────────────────────────

    pub fn current(&self) -> &Token { &self.current }
    pub fn kind(&self) -> TokenKind { self.current.kind }
    pub fn contents(&self) -> &str { &self.current.text }
    pub fn line_number(&self) -> usize { self.current.span.line }
    pub fn position(&self) -> usize { self.current.span.column }
    pub fn span(&self) -> Span { self.current.span.clone() }
    pub fn source(&self) -> &Rc<str> { &self.source }

    /// Full text of the line holding the current token.
    pub fn line_text(&self) -> &'a str {
        line_at(self.text, self.current.line_start)
    }

    pub fn line_text_of(&self, token: &Token) -> &'a str {
        line_at(self.text, token.line_start)
    }

    /// Consumes the current token and returns it.
    pub fn next(&mut self) -> Result<Token, Error> {
        let upcoming = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scan()?,
        };
        Ok(std::mem::replace(&mut self.current, upcoming))
    }

    /// The token after the current one.
    pub fn peek(&mut self) -> Result<&Token, Error> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scan()?,
        };
        Ok(self.peeked.insert(tok))
    }

    // ─── Scanning ────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Result<Token, Error> {
        self.skip_trivia();
        let mark = self.mark();

        if self.is_at_end() {
            return Ok(self.token(TokenKind::Eof, mark));
        }

        let ch = self.advance();
        let kind = match ch {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            b'=' => if self.eat(b'=') { TokenKind::EqEq } else { TokenKind::Eq },
            b'!' => if self.eat(b'=') { TokenKind::BangEq } else { TokenKind::Bang },
            b'<' => if self.eat(b'=') { TokenKind::LtEq } else { TokenKind::Lt },
            b'>' => if self.eat(b'=') { TokenKind::GtEq } else { TokenKind::Gt },
            b'&' => {
                if !self.eat(b'&') {
                    return Err(self.error(mark, ErrorCode::L001, "expected `&&`, bare `&` is not valid"));
                }
                TokenKind::AndAnd
            }
            b'|' => {
                if !self.eat(b'|') {
                    return Err(self.error(mark, ErrorCode::L001, "expected `||`, bare `|` is not valid"));
                }
                TokenKind::OrOr
            }

            b'"' => self.read_string(mark)?,
            b'0'..=b'9' => self.read_number(ch, mark)?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.read_ident();
                keyword_or_ident(self.slice(mark))
            }

            _ => {
                let c = self.text.get(mark.pos..).and_then(|s| s.chars().next()).unwrap_or('?');
                // step over the rest of a multi-byte character so the token text is whole
                while !self.is_at_end() && (self.peek_byte() & 0xC0) == 0x80 {
                    self.advance();
                }
                return Err(self.error(mark, ErrorCode::L001, format!("unexpected character `{c}`")));
            }
        };

        Ok(self.token(kind, mark))
    }

    fn token(&self, kind: TokenKind, mark: Mark) -> Token {
        Token::new(
            kind,
            self.slice(mark),
            Span::new(self.source.clone(), mark.line, mark.column),
            mark.line_start,
        )
    }

    fn error(&self, mark: Mark, code: ErrorCode, message: impl Into<String>) -> Error {
        Error::new(code, Span::new(self.source.clone(), mark.line, mark.column), message)
            .with_token(self.slice(mark), line_at(self.text, mark.line_start))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn mark(&self) -> Mark {
        Mark { pos: self.pos, line: self.line, column: self.column, line_start: self.line_start }
    }

    fn slice(&self, mark: Mark) -> &'a str {
        self.text.get(mark.pos..self.pos).unwrap_or("")
    }

    fn advance(&mut self) -> u8 {
        let ch = self.bytes[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
            self.line_start = self.pos;
        } else if (ch & 0xC0) != 0x80 {
            self.column += 1;
        }
        ch
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek_byte() == expected { self.advance(); true } else { false }
    }

    fn peek_byte(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_trivia(&mut self) {
        while !self.is_at_end() {
            match self.peek_byte() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                b'/' if self.peek_at(1) == b'/' => {
                    while !self.is_at_end() && self.peek_byte() != b'\n' { self.advance(); }
                }
                _ => break,
            }
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// `""` inside a string encodes one quote. Strings end at their line.
    fn read_string(&mut self, mark: Mark) -> Result<TokenKind, Error> {
        loop {
            if self.is_at_end() || self.peek_byte() == b'\n' {
                return Err(self.error(mark, ErrorCode::L002, "unterminated string literal"));
            }
            if self.advance() == b'"' {
                if self.peek_byte() == b'"' {
                    self.advance();
                } else {
                    return Ok(TokenKind::Str);
                }
            }
        }
    }

    fn read_number(&mut self, first: u8, mark: Mark) -> Result<TokenKind, Error> {
        if first == b'0' && matches!(self.peek_byte(), b'x' | b'X') {
            self.advance();
            let digits = self.pos;
            while self.peek_byte().is_ascii_hexdigit() { self.advance(); }
            let count = self.pos - digits;
            self.reject_suffix(mark)?;
            if count == 0 || count > 8 {
                return Err(self.error(mark, ErrorCode::L003,
                    format!("hex literal `{}` needs 1 to 8 digits", self.slice(mark))));
            }
            return Ok(TokenKind::Hex);
        }

        let mut kind = TokenKind::Int;
        while self.peek_byte().is_ascii_digit() { self.advance(); }

        // a dot only belongs to the number when a digit follows it
        if self.peek_byte() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.advance();
            while self.peek_byte().is_ascii_digit() { self.advance(); }
            kind = TokenKind::Float;
        }

        if matches!(self.peek_byte(), b'e' | b'E') {
            let signed = matches!(self.peek_at(1), b'+' | b'-');
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_ascii_digit() {
                self.advance();
                if signed { self.advance(); }
                while self.peek_byte().is_ascii_digit() { self.advance(); }
                kind = TokenKind::Float;
            }
        }

        self.reject_suffix(mark)?;
        Ok(kind)
    }

    /// Digits running straight into letters (`12ab`) are one malformed token.
    fn reject_suffix(&mut self, mark: Mark) -> Result<(), Error> {
        if self.peek_byte().is_ascii_alphanumeric() || self.peek_byte() == b'_' {
            self.read_ident();
            return Err(self.error(mark, ErrorCode::L003,
                format!("malformed number `{}`", self.slice(mark))));
        }
        Ok(())
    }

    fn read_ident(&mut self) {
        while self.peek_byte().is_ascii_alphanumeric() || self.peek_byte() == b'_' {
            self.advance();
        }
    }
}

fn line_at(text: &str, start: usize) -> &str {
    let rest = text.get(start..).unwrap_or("");
    let line = rest.split('\n').next().unwrap_or("");
    line.trim_end_matches('\r')
}

/// Strips the quotes of a string token and collapses `""` escapes.
pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    inner.replace("\"\"", "\"")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::val_type::ScalarType;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src, "test").unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> Error {
        Lexer::tokenize(src, "test").unwrap_err()
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("   \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn number_kinds() {
        assert_eq!(lex("42"), vec![TokenKind::Int, TokenKind::Eof]);
        assert_eq!(lex("0xff"), vec![TokenKind::Hex, TokenKind::Eof]);
        assert_eq!(lex("3.14"), vec![TokenKind::Float, TokenKind::Eof]);
        assert_eq!(lex("2.0e-3"), vec![TokenKind::Float, TokenKind::Eof]);
        assert_eq!(lex("3e5"), vec![TokenKind::Float, TokenKind::Eof]);
    }

    #[test]
    fn dot_not_consumed_by_number() {
        assert_eq!(lex("v.x"), vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(lex("1.x"), vec![TokenKind::Int, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn keywords_and_types() {
        assert_eq!(
            lex("if then else while foreach in for null"),
            vec![
                TokenKind::If, TokenKind::Then, TokenKind::Else, TokenKind::While,
                TokenKind::Foreach, TokenKind::In, TokenKind::For, TokenKind::Null, TokenKind::Eof,
            ]
        );
        assert_eq!(lex("float3"), vec![TokenKind::Type(ScalarType::Float3), TokenKind::Eof]);
        assert_eq!(lex("float5"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn bool_literals() {
        assert_eq!(lex("true false"), vec![TokenKind::True, TokenKind::False, TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            lex("== != <= >= && ||"),
            vec![
                TokenKind::EqEq, TokenKind::BangEq, TokenKind::LtEq,
                TokenKind::GtEq, TokenKind::AndAnd, TokenKind::OrOr, TokenKind::Eof,
            ]
        );
        assert_eq!(lex("!x"), vec![TokenKind::Bang, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn line_comment_skipped() {
        assert_eq!(lex("// comment\n42 // trailing"), vec![TokenKind::Int, TokenKind::Eof]);
        assert_eq!(lex("6 / 2"), vec![TokenKind::Int, TokenKind::Slash, TokenKind::Int, TokenKind::Eof]);
    }

    #[test]
    fn string_literal_keeps_raw_text() {
        let tokens = Lexer::tokenize(r#""say ""hi""""#, "test").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(unquote(&tokens[0].text), r#"say "hi""#);
    }

    #[test]
    fn unterminated_string_error() {
        assert_eq!(lex_err(r#""oops"#).code, ErrorCode::L002);
        assert_eq!(lex_err("\"oops\nmore\"").code, ErrorCode::L002);
    }

    #[test]
    fn malformed_numbers() {
        assert_eq!(lex_err("0x").code, ErrorCode::L003);
        assert_eq!(lex_err("0x123456789").code, ErrorCode::L003);
        let err = lex_err("12ab");
        assert_eq!(err.code, ErrorCode::L003);
        assert_eq!(err.token, "12ab");
    }

    #[test]
    fn bare_ampersand_and_pipe() {
        assert_eq!(lex_err("a & b").code, ErrorCode::L001);
        assert_eq!(lex_err("a | b").code, ErrorCode::L001);
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = lex_err("x = 1\ny = $");
        assert_eq!(err.code, ErrorCode::L001);
        assert_eq!((err.line(), err.column()), (2, 5));
        assert_eq!(err.token, "$");
        assert_eq!(err.line_text, "y = $");
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::tokenize("a\n  b", "test").unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
    }

    #[test]
    fn first_line_offsets_numbering() {
        let lexer = Lexer::new("\n\nx", "file.sbl", 10).unwrap();
        assert_eq!(lexer.line_number(), 12);
        assert_eq!(lexer.line_text(), "x");
        assert_eq!(lexer.span().to_string(), "file.sbl:12:1");
    }

    #[test]
    fn peek_does_not_advance() {
        let mut lexer = Lexer::new("a = 1", "test", 1).unwrap();
        assert_eq!(lexer.peek().unwrap().kind, TokenKind::Eq);
        assert_eq!(lexer.kind(), TokenKind::Ident);
        assert_eq!(lexer.next().unwrap().text, "a");
        assert_eq!(lexer.kind(), TokenKind::Eq);
        assert_eq!(lexer.contents(), "=");
    }
}
