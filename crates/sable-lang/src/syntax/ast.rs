use std::fmt;
use std::rc::Rc;

use crate::runtime::scope::Variable;
use crate::types::val_type::ScalarType;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub source: Rc<str>,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(source: Rc<str>, line: usize, column: usize) -> Self {
        Self { source, line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

// ─── Header ──────────────────────────────────────────────────────────────────

/// `name(int a, float b):` introducing a script section.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub params: Vec<Variable>,
    pub span: Span,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ a b c }`
    Block(Vec<Stmt>, Span),
    /// `while cond stmt`
    While {
        condition: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// `for i = start, end stmt` over `[start, end)`
    For {
        var: Variable,
        start: Expr,
        end: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// `foreach [type] x in expr stmt`
    Foreach {
        var: Variable,
        /// The statement declared `var` itself (a type was written).
        declares: bool,
        iterable: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// `if cond then stmt [else stmt]`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// `int x = 3` or `float[] xs`
    Declare {
        var: Variable,
        init: Option<Expr>,
        span: Span,
    },
    /// `x = e`, `m[i, j] = e`, `m[i][j] = e`
    Assign {
        target: Variable,
        /// One entry per bracket group, in source order.
        indices: Vec<Vec<Expr>>,
        value: Expr,
        span: Span,
    },
    /// A bare expression. A non-null value stops the script and becomes its
    /// return value.
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Block(_, s)          => s,
            Stmt::While { span, .. }   => span,
            Stmt::For { span, .. }     => span,
            Stmt::Foreach { span, .. } => span,
            Stmt::If { span, .. }      => span,
            Stmt::Declare { span, .. } => span,
            Stmt::Assign { span, .. }  => span,
            Stmt::Expr(e)              => e.span(),
        }
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool, Span),
    Int(i32, Span),
    /// `0xff`; kept apart from `Int` so it writes back in base 16.
    Hex(u32, Span),
    Float(f32, Span),
    /// Quote-stripped contents.
    Str(String, Span),
    Null(Span),
    Array(ArrayLiteral),

    /// Reference resolved against the scope chain while parsing.
    Var(Variable, Span),

    /// `(e)`; kept so writing reproduces the grouping.
    Paren(Box<Expr>, Span),

    /// `a + b`, `a == b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `!x`, `-x`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `cond ? a : b`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },

    /// `expr[i]` or `expr[i, j]`
    Index {
        expr: Box<Expr>,
        indices: Vec<Expr>,
        span: Span,
    },

    /// `v.x` .. `v.w`
    Component {
        expr: Box<Expr>,
        index: usize,
        span: Span,
    },

    /// `name(args)`
    Call {
        callee: String,
        args: Vec<Expr>,
        span: Span,
    },

    /// `int(x)`, `float3(a, b, c)`
    Cast {
        ty: ScalarType,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Bool(_, s)            => s,
            Expr::Int(_, s)             => s,
            Expr::Hex(_, s)             => s,
            Expr::Float(_, s)           => s,
            Expr::Str(_, s)             => s,
            Expr::Null(s)               => s,
            Expr::Array(a)              => &a.span,
            Expr::Var(_, s)             => s,
            Expr::Paren(_, s)           => s,
            Expr::Binary { span, .. }    => span,
            Expr::Unary { span, .. }     => span,
            Expr::Ternary { span, .. }   => span,
            Expr::Index { span, .. }     => span,
            Expr::Component { span, .. } => span,
            Expr::Call { span, .. }      => span,
            Expr::Cast { span, .. }      => span,
        }
    }
}

/// Rectangular literal `{{1, 2}, {3, 4}}`.
///
/// `elements` holds one child per item in row-major order, so its length is
/// the product of `dims`. A zero extent at any depth leaves `elements` empty
/// while `dims` still records the brace structure (`{{}, {}}` is `[2, 0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub dims: Vec<usize>,
    pub elements: Vec<Expr>,
    pub span: Span,
}

impl ArrayLiteral {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add   => "+",
            BinOp::Sub   => "-",
            BinOp::Mul   => "*",
            BinOp::Div   => "/",
            BinOp::Mod   => "%",
            BinOp::Eq    => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt    => "<",
            BinOp::LtEq  => "<=",
            BinOp::Gt    => ">",
            BinOp::GtEq  => ">=",
            BinOp::And   => "&&",
            BinOp::Or    => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}
