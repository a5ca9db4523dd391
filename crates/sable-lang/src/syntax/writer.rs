//! Canonical source text for AST nodes. Re-parsing the output under the same
//! scope gives a tree that evaluates the same way.

use crate::runtime::value::{format_float, quote};
use crate::syntax::ast::*;

const INDENT: &str = "    ";

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_list(out: &mut String, items: &[Expr]) {
    for (i, e) in items.iter().enumerate() {
        if i > 0 { out.push_str(", "); }
        e.write(out);
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

impl Expr {
    pub fn write(&self, out: &mut String) {
        match self {
            Expr::Bool(b, _)  => out.push_str(if *b { "true" } else { "false" }),
            Expr::Int(i, _)   => out.push_str(&i.to_string()),
            Expr::Hex(h, _)   => out.push_str(&format!("0x{h:x}")),
            Expr::Float(f, _) => out.push_str(&format_float(*f)),
            Expr::Str(s, _)   => out.push_str(&quote(s)),
            Expr::Null(_)     => out.push_str("null"),
            Expr::Array(a)    => write_array(out, &a.dims, &a.elements),
            Expr::Var(v, _)   => out.push_str(&v.name),
            Expr::Paren(inner, _) => {
                out.push('(');
                inner.write(out);
                out.push(')');
            }
            Expr::Binary { left, op, right, .. } => {
                left.write(out);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                right.write(out);
            }
            Expr::Unary { op, operand, .. } => {
                out.push_str(op.symbol());
                operand.write(out);
            }
            Expr::Ternary { condition, then_expr, else_expr, .. } => {
                condition.write(out);
                out.push_str(" ? ");
                then_expr.write(out);
                out.push_str(" : ");
                else_expr.write(out);
            }
            Expr::Index { expr, indices, .. } => {
                expr.write(out);
                out.push('[');
                write_list(out, indices);
                out.push(']');
            }
            Expr::Component { expr, index, .. } => {
                expr.write(out);
                out.push('.');
                out.push(['x', 'y', 'z', 'w'][(*index).min(3)]);
            }
            Expr::Call { callee, args, .. } => {
                out.push_str(callee);
                out.push('(');
                write_list(out, args);
                out.push(')');
            }
            Expr::Cast { ty, args, .. } => {
                out.push_str(ty.name());
                out.push('(');
                write_list(out, args);
                out.push(')');
            }
        }
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }
}

/// Rebuilds the brace nesting from the extents, so zero-length groups survive.
fn write_array(out: &mut String, dims: &[usize], elements: &[Expr]) {
    out.push('{');
    match dims {
        [] | [_] => write_list(out, elements),
        [n, rest @ ..] => {
            let stride: usize = rest.iter().product();
            for i in 0..*n {
                if i > 0 { out.push_str(", "); }
                let block = elements.get(i * stride..(i + 1) * stride).unwrap_or(&[]);
                write_array(out, rest, block);
            }
        }
    }
    out.push('}');
}

// ─── Statements ──────────────────────────────────────────────────────────────

impl Stmt {
    /// Writes without leading indentation or a trailing newline. Nested lines
    /// are indented relative to `depth`.
    pub fn write(&self, out: &mut String, depth: usize) {
        match self {
            Stmt::Block(stmts, _) => {
                if stmts.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                for s in stmts {
                    push_indent(out, depth + 1);
                    s.write(out, depth + 1);
                    out.push('\n');
                }
                push_indent(out, depth);
                out.push('}');
            }
            Stmt::While { condition, body, .. } => {
                out.push_str("while ");
                condition.write(out);
                write_body(out, body, depth);
            }
            Stmt::For { var, start, end, body, .. } => {
                out.push_str("for ");
                out.push_str(&var.name);
                out.push_str(" = ");
                start.write(out);
                out.push_str(", ");
                end.write(out);
                write_body(out, body, depth);
            }
            Stmt::Foreach { var, declares, iterable, body, .. } => {
                out.push_str("foreach ");
                if *declares {
                    out.push_str(&var.ty.to_string());
                    out.push(' ');
                }
                out.push_str(&var.name);
                out.push_str(" in ");
                iterable.write(out);
                write_body(out, body, depth);
            }
            Stmt::If { condition, then_branch, else_branch, .. } => {
                out.push_str("if ");
                condition.write(out);
                out.push_str(" then");
                write_body(out, then_branch, depth);
                if let Some(else_branch) = else_branch {
                    if matches!(**then_branch, Stmt::Block(..)) {
                        out.push(' ');
                    } else {
                        out.push('\n');
                        push_indent(out, depth);
                    }
                    out.push_str("else");
                    write_body(out, else_branch, depth);
                }
            }
            Stmt::Declare { var, init, .. } => {
                out.push_str(&var.ty.to_string());
                out.push(' ');
                out.push_str(&var.name);
                if let Some(init) = init {
                    out.push_str(" = ");
                    init.write(out);
                }
            }
            Stmt::Assign { target, indices, value, .. } => {
                out.push_str(&target.name);
                for group in indices {
                    out.push('[');
                    write_list(out, group);
                    out.push(']');
                }
                out.push_str(" = ");
                value.write(out);
            }
            Stmt::Expr(e) => e.write(out),
        }
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }
}

/// Blocks stay on the keyword's line; anything else goes on its own line one
/// level deeper.
fn write_body(out: &mut String, body: &Stmt, depth: usize) {
    if matches!(body, Stmt::Block(..)) {
        out.push(' ');
        body.write(out, depth);
    } else {
        out.push('\n');
        push_indent(out, depth + 1);
        body.write(out, depth + 1);
    }
}

// ─── Header ──────────────────────────────────────────────────────────────────

impl Header {
    pub fn write(&self, out: &mut String) {
        out.push_str(&self.name);
        if !self.params.is_empty() {
            out.push('(');
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 { out.push_str(", "); }
                out.push_str(&p.ty.to_string());
                out.push(' ');
                out.push_str(&p.name);
            }
            out.push(')');
        }
        out.push(':');
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }
}
