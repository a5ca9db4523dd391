use crate::error::{Error, ErrorCode};
use crate::runtime::scope::{ScopeRef, Variable};
use crate::syntax::ast::*;
use crate::syntax::lexer::{Lexer, unquote};
use crate::syntax::token::{Token, TokenKind};
use crate::types::val_type::{ScalarType, ValType};

// ─── Lints ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintKind {
    Header,
    Declaration,
    Variable,
    Function,
    Type,
}

/// A token span worth highlighting, collected for tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct Lint {
    pub kind: LintKind,
    pub span: Span,
    pub text: String,
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// One expression filling the whole of `text`.
pub fn parse_expression(
    scope: &ScopeRef,
    source: &str,
    text: &str,
    lints: Option<&mut Vec<Lint>>,
) -> Result<Expr, Error> {
    let mut p = Parser::new(scope, source, text, 1, lints)?;
    let expr = p.expression()?;
    p.finish()?;
    Ok(expr)
}

/// One statement filling the whole of `text`. `line` is the line `text`
/// starts on and is moved past it on success.
pub fn parse_statement(
    scope: &ScopeRef,
    source: &str,
    text: &str,
    line: &mut usize,
    lints: Option<&mut Vec<Lint>>,
) -> Result<Stmt, Error> {
    let mut p = Parser::new(scope, source, text, *line, lints)?;
    let stmt = p.statement()?;
    p.finish()?;
    *line += newlines(text);
    Ok(stmt)
}

/// Every statement in `text`, in order.
pub fn parse_statements(
    scope: &ScopeRef,
    source: &str,
    text: &str,
    line: &mut usize,
    lints: Option<&mut Vec<Lint>>,
) -> Result<Vec<Stmt>, Error> {
    let mut p = Parser::new(scope, source, text, *line, lints)?;
    let mut stmts = Vec::new();
    while !p.at_end() {
        stmts.push(p.statement()?);
    }
    *line += newlines(text);
    Ok(stmts)
}

/// `name(type a, ...):`. Parameters are declared in `scope`.
pub fn parse_header(
    scope: &ScopeRef,
    source: &str,
    text: &str,
    line: &mut usize,
    lints: Option<&mut Vec<Lint>>,
) -> Result<Header, Error> {
    let mut p = Parser::new(scope, source, text, *line, lints)?;
    let header = p.header()?;
    p.finish()?;
    *line += newlines(text);
    Ok(header)
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

// ─── Precedence chains ───────────────────────────────────────────────────────

/// Expression levels, loosest first. Each level parses its own form and hands
/// anything else to the level after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprLevel {
    Expression,
    Ternary,
    LogicalOr,
    LogicalAnd,
    Equality,
    Relational,
    Add,
    Multiply,
    Unary,
    Indexed,
    Primary,
}

impl ExprLevel {
    pub const CHAIN: [ExprLevel; 11] = [
        ExprLevel::Expression,
        ExprLevel::Ternary,
        ExprLevel::LogicalOr,
        ExprLevel::LogicalAnd,
        ExprLevel::Equality,
        ExprLevel::Relational,
        ExprLevel::Add,
        ExprLevel::Multiply,
        ExprLevel::Unary,
        ExprLevel::Indexed,
        ExprLevel::Primary,
    ];

    pub fn next(self) -> ExprLevel {
        Self::CHAIN.get(self as usize + 1).copied().unwrap_or(ExprLevel::Primary)
    }

    /// Left-associative binary operators owned by this level.
    fn operators(self) -> &'static [(TokenKind, BinOp)] {
        match self {
            ExprLevel::LogicalOr  => &[(TokenKind::OrOr, BinOp::Or)],
            ExprLevel::LogicalAnd => &[(TokenKind::AndAnd, BinOp::And)],
            ExprLevel::Equality   => &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::BangEq, BinOp::NotEq)],
            ExprLevel::Relational => &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::LtEq, BinOp::LtEq),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::GtEq, BinOp::GtEq),
            ],
            ExprLevel::Add        => &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            ExprLevel::Multiply   => &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            _ => &[],
        }
    }
}

/// Statement forms, tried in order by their leading token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtLevel {
    Statement,
    While,
    For,
    ForEach,
    IfThenElse,
    Single,
    Assignment,
}

impl StmtLevel {
    pub const CHAIN: [StmtLevel; 7] = [
        StmtLevel::Statement,
        StmtLevel::While,
        StmtLevel::For,
        StmtLevel::ForEach,
        StmtLevel::IfThenElse,
        StmtLevel::Single,
        StmtLevel::Assignment,
    ];

    pub fn next(self) -> StmtLevel {
        Self::CHAIN.get(self as usize + 1).copied().unwrap_or(StmtLevel::Assignment)
    }
}

/// Brace group of an array literal before it is checked and flattened.
enum Group {
    Item(Expr),
    List(Vec<Group>, Span),
}

// ─── Parser ──────────────────────────────────────────────────────────────────

pub struct Parser<'a, 'l> {
    lexer: Lexer<'a>,
    scope: ScopeRef,
    lints: Option<&'l mut Vec<Lint>>,
}

impl<'a, 'l> Parser<'a, 'l> {
    pub fn new(
        scope: &ScopeRef,
        source: &str,
        text: &'a str,
        first_line: usize,
        lints: Option<&'l mut Vec<Lint>>,
    ) -> Result<Self, Error> {
        Ok(Self { lexer: Lexer::new(text, source, first_line)?, scope: scope.clone(), lints })
    }

    pub fn at_end(&self) -> bool {
        self.lexer.kind() == TokenKind::Eof
    }

    /// Fails unless every token has been consumed.
    pub fn finish(&self) -> Result<(), Error> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error_here(ErrorCode::P001, format!("unexpected `{}` after end of input", self.lexer.contents())))
        }
    }

    pub fn expression(&mut self) -> Result<Expr, Error> {
        self.parse_level(ExprLevel::Expression)
    }

    pub fn statement(&mut self) -> Result<Stmt, Error> {
        self.parse_stmt_level(StmtLevel::Statement)
    }

    pub fn header(&mut self) -> Result<Header, Error> {
        let span = self.lexer.span();
        let name = self.expect(TokenKind::Ident)?;
        self.lint(LintKind::Header, &name);

        let mut params = Vec::new();
        if self.lexer.kind() == TokenKind::LParen {
            self.lexer.next()?;
            if self.lexer.kind() != TokenKind::RParen {
                loop {
                    let ty = self.parse_type_spec()?;
                    let param = self.expect(TokenKind::Ident)?;
                    params.push(self.declare(&param, ty)?);
                    if self.lexer.kind() != TokenKind::Comma { break; }
                    self.lexer.next()?;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        self.expect(TokenKind::Colon)?;
        Ok(Header { name: name.text, params, span })
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn parse_level(&mut self, level: ExprLevel) -> Result<Expr, Error> {
        match level {
            ExprLevel::Expression => self.parse_next(level),
            ExprLevel::Ternary    => self.parse_ternary(),
            ExprLevel::Unary      => self.parse_unary(),
            ExprLevel::Indexed    => self.parse_indexed(),
            ExprLevel::Primary    => self.parse_primary(),
            binary                => self.parse_binary(binary),
        }
    }

    fn parse_next(&mut self, level: ExprLevel) -> Result<Expr, Error> {
        self.parse_level(level.next())
    }

    /// `cond ? a : b`, right-associative.
    fn parse_ternary(&mut self) -> Result<Expr, Error> {
        let condition = self.parse_next(ExprLevel::Ternary)?;
        if self.lexer.kind() != TokenKind::Question {
            return Ok(condition);
        }
        let span = self.lexer.next()?.span;
        let then_expr = self.parse_level(ExprLevel::Ternary)?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_level(ExprLevel::Ternary)?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        })
    }

    fn parse_binary(&mut self, level: ExprLevel) -> Result<Expr, Error> {
        let ops = level.operators();
        let mut left = self.parse_next(level)?;
        while let Some(&(_, op)) = ops.iter().find(|(kind, _)| *kind == self.lexer.kind()) {
            let span = self.lexer.next()?.span;
            let right = self.parse_next(level)?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    /// `-x`, `!x`. A minus directly before a decimal literal folds into it.
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.lexer.span();
        let op = match self.lexer.kind() {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Bang  => UnOp::Not,
            _ => return self.parse_next(ExprLevel::Unary),
        };
        let following = self.lexer.peek()?.kind;
        self.lexer.next()?;

        if op == UnOp::Neg {
            match following {
                TokenKind::Int => {
                    let tok = self.lexer.next()?;
                    return self.int_literal(&tok, true, span);
                }
                TokenKind::Float => {
                    let tok = self.lexer.next()?;
                    return self.float_literal(&tok, true, span);
                }
                _ => {}
            }
        }

        let operand = self.parse_level(ExprLevel::Unary)?;
        Ok(Expr::Unary { op, operand: Box::new(operand), span })
    }

    /// `a[i]`, `a[i, j]`, `a[i][j]`, `v.x`
    fn parse_indexed(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_next(ExprLevel::Indexed)?;
        loop {
            match self.lexer.kind() {
                TokenKind::LBracket => {
                    let span = self.lexer.next()?.span;
                    let mut indices = vec![self.expression()?];
                    while self.lexer.kind() == TokenKind::Comma {
                        self.lexer.next()?;
                        indices.push(self.expression()?);
                    }
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index { expr: Box::new(expr), indices, span };
                }
                TokenKind::Dot => {
                    let span = self.lexer.next()?.span;
                    let field = self.expect(TokenKind::Ident)?;
                    let index = match field.text.as_str() {
                        "x" => 0,
                        "y" => 1,
                        "z" => 2,
                        "w" => 3,
                        other => {
                            return Err(self.error_at(&field, ErrorCode::P001,
                                format!("unknown component `{other}`, expected x, y, z or w")));
                        }
                    };
                    expr = Expr::Component { expr: Box::new(expr), index, span };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let span = self.lexer.span();
        match self.lexer.kind() {
            TokenKind::True  => { self.lexer.next()?; Ok(Expr::Bool(true, span)) }
            TokenKind::False => { self.lexer.next()?; Ok(Expr::Bool(false, span)) }
            TokenKind::Null  => { self.lexer.next()?; Ok(Expr::Null(span)) }
            TokenKind::Int   => { let tok = self.lexer.next()?; self.int_literal(&tok, false, span) }
            TokenKind::Float => { let tok = self.lexer.next()?; self.float_literal(&tok, false, span) }
            TokenKind::Hex   => {
                let tok = self.lexer.next()?;
                let digits = tok.text.get(2..).unwrap_or("");
                let value = u32::from_str_radix(digits, 16)
                    .map_err(|_| self.error_at(&tok, ErrorCode::P003, format!("malformed hex literal `{}`", tok.text)))?;
                Ok(Expr::Hex(value, span))
            }
            TokenKind::Str => {
                let tok = self.lexer.next()?;
                Ok(Expr::Str(unquote(&tok.text), span))
            }
            TokenKind::LBrace => self.parse_array_literal(),
            TokenKind::LParen => {
                self.lexer.next()?;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(inner), span))
            }
            TokenKind::Ident => {
                let name = self.lexer.next()?;
                if self.lexer.kind() == TokenKind::LParen {
                    self.lint(LintKind::Function, &name);
                    let args = self.parse_args()?;
                    return Ok(Expr::Call { callee: name.text, args, span });
                }
                let var = self.resolve(&name)?;
                Ok(Expr::Var(var, span))
            }
            TokenKind::Type(ty) => {
                let tok = self.lexer.next()?;
                self.lint(LintKind::Type, &tok);
                if self.lexer.kind() != TokenKind::LParen {
                    return Err(self.error_here(ErrorCode::P002, format!("expected `(` after `{ty}`"))
                        .with_expected(TokenKind::LParen.describe()));
                }
                let args = self.parse_args()?;
                if args.is_empty() {
                    return Err(self.error_at(&tok, ErrorCode::P001, format!("`{ty}(...)` needs at least one argument")));
                }
                Ok(Expr::Cast { ty, args, span })
            }
            _ => Err(self.error_here(ErrorCode::P001, format!("expected expression, found {}", self.found()))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.lexer.kind() != TokenKind::RParen {
            args.push(self.expression()?);
            while self.lexer.kind() == TokenKind::Comma {
                self.lexer.next()?;
                args.push(self.expression()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn int_literal(&self, tok: &Token, negative: bool, span: Span) -> Result<Expr, Error> {
        let out_of_range = || self.error_at(tok, ErrorCode::P003,
            format!("integer literal `{}{}` does not fit in 32 bits", if negative { "-" } else { "" }, tok.text));
        let magnitude: i64 = tok.text.parse().map_err(|_| out_of_range())?;
        let value = if negative { -magnitude } else { magnitude };
        let value = i32::try_from(value).map_err(|_| out_of_range())?;
        Ok(Expr::Int(value, span))
    }

    fn float_literal(&self, tok: &Token, negative: bool, span: Span) -> Result<Expr, Error> {
        let value: f32 = tok.text.parse()
            .ok()
            .filter(|v: &f32| v.is_finite())
            .ok_or_else(|| self.error_at(tok, ErrorCode::P003, format!("float literal `{}` is out of range", tok.text)))?;
        Ok(Expr::Float(if negative { -value } else { value }, span))
    }

    // ─── Array literals ──────────────────────────────────────────────────────

    fn parse_array_literal(&mut self) -> Result<Expr, Error> {
        let span = self.lexer.span();
        let root = self.parse_group()?;

        // extents come from the first group at each depth
        let mut dims = Vec::new();
        let mut cursor = &root;
        while let Group::List(items, _) = cursor {
            dims.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }

        let mut elements = Vec::with_capacity(dims.iter().product());
        self.flatten(root, 0, &dims, &mut elements)?;
        Ok(Expr::Array(ArrayLiteral { dims, elements, span }))
    }

    fn parse_group(&mut self) -> Result<Group, Error> {
        let span = self.expect(TokenKind::LBrace)?.span;
        let mut items = Vec::new();
        if self.lexer.kind() != TokenKind::RBrace {
            loop {
                let item = if self.lexer.kind() == TokenKind::LBrace {
                    self.parse_group()?
                } else {
                    Group::Item(self.expression()?)
                };
                items.push(item);
                if self.lexer.kind() != TokenKind::Comma { break; }
                self.lexer.next()?;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Group::List(items, span))
    }

    /// Checks one group against the extents and appends its items row-major.
    fn flatten(&self, group: Group, depth: usize, dims: &[usize], out: &mut Vec<Expr>) -> Result<(), Error> {
        let (items, span) = match group {
            Group::List(items, span) => (items, span),
            Group::Item(expr) => {
                return Err(self.error_span(ErrorCode::P004, expr.span().clone(),
                    "array literal mixes values and nested groups at the same level"));
            }
        };
        if items.len() != dims[depth] {
            return Err(self.error_span(ErrorCode::P004, span, format!(
                "ragged array literal: group has {} items, expected {}", items.len(), dims[depth]
            )));
        }
        let leaf = depth + 1 == dims.len();
        for item in items {
            match item {
                Group::Item(expr) if leaf => out.push(expr),
                Group::List(_, span) if leaf => {
                    return Err(self.error_span(ErrorCode::P004, span,
                        "array literal mixes values and nested groups at the same level"));
                }
                group => self.flatten(group, depth + 1, dims, out)?,
            }
        }
        Ok(())
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt_level(&mut self, level: StmtLevel) -> Result<Stmt, Error> {
        let kind = self.lexer.kind();
        match level {
            StmtLevel::Statement  if kind == TokenKind::LBrace  => self.parse_block(),
            StmtLevel::While      if kind == TokenKind::While   => self.parse_while(),
            StmtLevel::For        if kind == TokenKind::For     => self.parse_for(),
            StmtLevel::ForEach    if kind == TokenKind::Foreach => self.parse_foreach(),
            StmtLevel::IfThenElse if kind == TokenKind::If      => self.parse_if(),
            StmtLevel::Single if kind.is_type_keyword() && self.lexer.peek()?.kind != TokenKind::LParen => {
                self.parse_declaration()
            }
            StmtLevel::Assignment => self.parse_assignment(),
            other => self.parse_stmt_level(other.next()),
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, Error> {
        let span = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !matches!(self.lexer.kind(), TokenKind::RBrace | TokenKind::Eof) {
            stmts.push(self.statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::Block(stmts, span))
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.expect(TokenKind::While)?.span;
        let condition = self.expression()?;
        let body = self.statement()?;
        Ok(Stmt::While { condition, body: Box::new(body), span })
    }

    /// `for i = start, end stmt`
    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.expect(TokenKind::For)?.span;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::Eq)?;
        let start = self.expression()?;
        self.expect(TokenKind::Comma)?;
        let end = self.expression()?;

        let existing = self.scope.borrow().lookup(&name.text);
        let var = match existing {
            Some(var) if var.ty == ValType::INT => {
                self.lint(LintKind::Variable, &name);
                var
            }
            Some(var) => {
                return Err(self.error_at(&name, ErrorCode::P008,
                    format!("loop variable `{}` is declared as `{}`, expected `int`", var.name, var.ty)));
            }
            None => self.declare(&name, ValType::INT)?,
        };

        let body = self.statement()?;
        Ok(Stmt::For { var, start, end, body: Box::new(body), span })
    }

    /// `foreach [type] x in expr stmt`
    fn parse_foreach(&mut self) -> Result<Stmt, Error> {
        let span = self.expect(TokenKind::Foreach)?.span;
        let declared = if self.lexer.kind().is_type_keyword() {
            Some(self.parse_type_spec()?)
        } else {
            None
        };
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::In)?;
        let iterable = self.expression()?;
        let var = match declared {
            Some(ty) => self.declare(&name, ty)?,
            None => self.resolve(&name)?,
        };
        let body = self.statement()?;
        Ok(Stmt::Foreach { var, declares: declared.is_some(), iterable, body: Box::new(body), span })
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.expect(TokenKind::If)?.span;
        let condition = self.expression()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.statement()?;
        let else_branch = if self.lexer.kind() == TokenKind::Else {
            self.lexer.next()?;
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { condition, then_branch: Box::new(then_branch), else_branch, span })
    }

    /// `type name [= expr]`; the name is visible only after the initializer.
    fn parse_declaration(&mut self) -> Result<Stmt, Error> {
        let span = self.lexer.span();
        let ty = self.parse_type_spec()?;
        let name = self.expect(TokenKind::Ident)?;
        let init = if self.lexer.kind() == TokenKind::Eq {
            self.lexer.next()?;
            Some(self.expression()?)
        } else {
            None
        };
        let var = self.declare(&name, ty)?;
        Ok(Stmt::Declare { var, init, span })
    }

    fn parse_assignment(&mut self) -> Result<Stmt, Error> {
        let span = self.lexer.span();
        let target = self.expression()?;
        if self.lexer.kind() != TokenKind::Eq {
            return Ok(Stmt::Expr(target));
        }
        let target_span = target.span().clone();
        let Some((target, indices)) = assignment_target(target) else {
            return Err(self.error_span(ErrorCode::P007, target_span,
                "left side of `=` must be a variable or an indexed variable"));
        };
        self.lexer.next()?;
        let value = self.expression()?;
        Ok(Stmt::Assign { target, indices, value, span })
    }

    /// `int`, `float[]`, `string[,]`
    fn parse_type_spec(&mut self) -> Result<ValType, Error> {
        let tok = self.lexer.next()?;
        let TokenKind::Type(scalar) = tok.kind else {
            return Err(self.error_at(&tok, ErrorCode::P002, format!("expected type name, found `{}`", tok.text))
                .with_expected(TokenKind::Type(ScalarType::Int).describe()));
        };
        self.lint(LintKind::Type, &tok);
        if self.lexer.kind() != TokenKind::LBracket {
            return Ok(ValType::Scalar(scalar));
        }
        self.lexer.next()?;
        let mut rank = 1;
        while self.lexer.kind() == TokenKind::Comma {
            self.lexer.next()?;
            rank += 1;
        }
        self.expect(TokenKind::RBracket)?;
        Ok(ValType::array(scalar, rank))
    }

    // ─── Scope ───────────────────────────────────────────────────────────────

    fn declare(&mut self, name: &Token, ty: ValType) -> Result<Variable, Error> {
        let declared = self.scope.borrow_mut().declare(&name.text, ty);
        let var = declared.map_err(|e| self.error_at(name, ErrorCode::P006, e.to_string()))?;
        self.lint(LintKind::Declaration, name);
        Ok(var)
    }

    fn resolve(&mut self, name: &Token) -> Result<Variable, Error> {
        let found = self.scope.borrow().resolve(&name.text);
        let var = found.map_err(|e| self.error_at(name, ErrorCode::P005, e.to_string()))?;
        self.lint(LintKind::Variable, name);
        Ok(var)
    }

    fn lint(&mut self, kind: LintKind, tok: &Token) {
        if let Some(lints) = self.lints.as_deref_mut() {
            lints.push(Lint { kind, span: tok.span.clone(), text: tok.text.clone() });
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.lexer.kind() == kind {
            return self.lexer.next();
        }
        Err(self.error_here(ErrorCode::P002, format!("expected {}, found {}", kind.describe(), self.found()))
            .with_expected(kind.describe()))
    }

    fn found(&self) -> String {
        match self.lexer.kind() {
            TokenKind::Eof => TokenKind::Eof.describe().to_string(),
            _ => format!("`{}`", self.lexer.contents()),
        }
    }

    fn error_here(&self, code: ErrorCode, msg: impl Into<String>) -> Error {
        Error::new(code, self.lexer.span(), msg)
            .with_token(self.lexer.contents(), self.lexer.line_text())
    }

    fn error_at(&self, tok: &Token, code: ErrorCode, msg: impl Into<String>) -> Error {
        Error::new(code, tok.span.clone(), msg)
            .with_token(tok.text.clone(), self.lexer.line_text_of(tok))
    }

    fn error_span(&self, code: ErrorCode, span: Span, msg: impl Into<String>) -> Error {
        Error::new(code, span, msg).with_token(self.lexer.contents(), self.lexer.line_text())
    }
}

/// Splits `a[i][j, k]` into the variable and its bracket groups.
fn assignment_target(expr: Expr) -> Option<(Variable, Vec<Vec<Expr>>)> {
    match expr {
        Expr::Var(var, _) => Some((var, Vec::new())),
        Expr::Index { expr, indices, .. } => {
            let (var, mut groups) = assignment_target(*expr)?;
            groups.push(indices);
            Some((var, groups))
        }
        _ => None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
