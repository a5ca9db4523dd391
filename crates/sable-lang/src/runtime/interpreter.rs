//! Tree-walking evaluator. Nodes hold no runtime state: every value lives in
//! the `Context`, so one parsed script can run any number of times.

use std::rc::Rc;

use crate::error::{ErrorCode, RuntimeError};
use crate::runtime::context::Context;
use crate::runtime::scope::Variable;
use crate::runtime::value::{Val, ValError};
use crate::syntax::ast::*;
use crate::types::binop_registry::binops;
use crate::types::conversion::common_scalar;
use crate::types::val_type::{ScalarType, ValType};

fn fail(span: &Span, e: ValError) -> RuntimeError {
    RuntimeError::new(e.code(), span.clone(), e.to_string())
}

// ─── Expressions ─────────────────────────────────────────────────────────────

impl Expr {
    pub fn evaluate(&self, ctx: &mut Context) -> Result<Val, RuntimeError> {
        match self {
            Expr::Bool(b, _)  => Ok(Val::Bool(*b)),
            Expr::Int(i, _)   => Ok(Val::Int(*i)),
            Expr::Hex(h, _)   => Ok(Val::Int(*h as i32)),
            Expr::Float(f, _) => Ok(Val::Float(*f)),
            Expr::Str(s, _)   => Ok(Val::String(s.clone())),
            Expr::Null(_)     => Ok(Val::NULL),
            Expr::Array(a)    => a.evaluate(ctx),
            Expr::Var(var, span)  => read_var(ctx, var, span),
            Expr::Paren(inner, _) => inner.evaluate(ctx),

            Expr::Binary { left, op: op @ (BinOp::And | BinOp::Or), right, span } => {
                let l = left.evaluate(ctx)?;
                // short-circuit: `false && _`, `true || _`
                if let Val::Bool(b) = l {
                    if b == (*op == BinOp::Or) {
                        return Ok(Val::Bool(b));
                    }
                }
                let r = right.evaluate(ctx)?;
                binops().eval(*op, l, r).map_err(|e| fail(span, e))
            }
            Expr::Binary { left, op, right, span } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                binops().eval(*op, l, r).map_err(|e| fail(span, e))
            }
            Expr::Unary { op, operand, span } => {
                let v = operand.evaluate(ctx)?;
                binops().eval_unary(*op, v).map_err(|e| fail(span, e))
            }

            Expr::Ternary { condition, then_expr, else_expr, .. } => {
                if truth(ctx, condition, "?:")? {
                    then_expr.evaluate(ctx)
                } else {
                    else_expr.evaluate(ctx)
                }
            }

            Expr::Index { expr, indices, span } => {
                let base = expr.evaluate(ctx)?;
                let idx = eval_indices(ctx, indices)?;
                index_value(&base, &idx).map_err(|e| fail(span, e))
            }
            Expr::Component { expr, index, span } => {
                let base = expr.evaluate(ctx)?;
                index_value(&base, &[*index as i32]).map_err(|e| fail(span, e))
            }

            Expr::Call { callee, args, span } => {
                let args = eval_args(ctx, args)?;
                tracing::trace!(function = %callee, args = args.len(), "host call");
                ctx.call(callee, &args)
                    .map_err(|e| RuntimeError::new(e.code(), span.clone(), e.to_string()))
            }
            Expr::Cast { ty, args, span } => {
                let args = eval_args(ctx, args)?;
                Val::construct(*ty, &args).map_err(|e| fail(span, e))
            }
        }
    }
}

fn read_var(ctx: &Context, var: &Variable, span: &Span) -> Result<Val, RuntimeError> {
    ctx.get(var).cloned().ok_or_else(|| {
        RuntimeError::new(ErrorCode::E004, span.clone(), format!("`{}` is read before it holds a value", var.name))
    })
}

fn eval_args(ctx: &mut Context, args: &[Expr]) -> Result<Vec<Val>, RuntimeError> {
    args.iter().map(|a| a.evaluate(ctx)).collect()
}

/// Evaluates a condition that must produce a bool.
fn truth(ctx: &mut Context, cond: &Expr, construct: &str) -> Result<bool, RuntimeError> {
    match cond.evaluate(ctx)? {
        Val::Bool(b) => Ok(b),
        other => Err(RuntimeError::new(
            ErrorCode::E009,
            cond.span().clone(),
            format!("condition of `{construct}` must be bool, got {}", other.describe()),
        )),
    }
}

fn eval_indices(ctx: &mut Context, indices: &[Expr]) -> Result<Vec<i32>, RuntimeError> {
    indices.iter()
        .map(|e| match e.evaluate(ctx)? {
            Val::Int(i) => Ok(i),
            other => Err(RuntimeError::new(
                ErrorCode::E001,
                e.span().clone(),
                format!("index must be int, got {}", other.describe()),
            )),
        })
        .collect()
}

/// Array elements or sub-arrays, or a single vector component.
fn index_value(base: &Val, idx: &[i32]) -> Result<Val, ValError> {
    if let Val::Array(a) = base {
        return a.get(idx);
    }
    let Some(c) = base.components() else {
        return Err(ValError::UnsupportedOperator { op: "[]", operand: base.describe() });
    };
    match idx {
        [i] => usize::try_from(*i).ok()
            .and_then(|i| c.get(i))
            .map(|x| Val::Float(*x))
            .ok_or(ValError::IndexOutOfRange { index: *i as i64, len: c.len() }),
        _ => Err(ValError::BadIndex(format!("{} takes one index, got {}", base.type_name(), idx.len()))),
    }
}

// ─── Array literals ──────────────────────────────────────────────────────────

impl ArrayLiteral {
    /// Evaluates into a fresh buffer, then widens every element to the
    /// common element type. `null` elements take that type's default.
    pub fn evaluate(&self, ctx: &mut Context) -> Result<Val, RuntimeError> {
        let mut items = Vec::with_capacity(self.elements.len());
        let mut elem: Option<ScalarType> = None;

        for e in &self.elements {
            let v = e.evaluate(ctx)?;
            if v.is_null() {
                items.push(v);
                continue;
            }
            let Some(ValType::Scalar(ty)) = v.val_type() else {
                return Err(RuntimeError::new(
                    ErrorCode::E003,
                    e.span().clone(),
                    format!("array element must be a scalar value, got {}", v.describe()),
                ));
            };
            elem = Some(match elem {
                None => ty,
                Some(prev) => common_scalar(prev, ty).ok_or_else(|| fail(e.span(), ValError::IncompatibleElements {
                    first: prev.to_string(),
                    second: ty.to_string(),
                }))?,
            });
            items.push(v);
        }

        let elem = elem.unwrap_or(ScalarType::Int);
        let items = items.into_iter()
            .map(|v| match v {
                Val::Null => Ok(Val::default_for(ValType::Scalar(elem))),
                v => v.convert_to(ValType::Scalar(elem)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fail(&self.span, e))?;
        Val::array(elem, self.dims.clone(), items).map_err(|e| fail(&self.span, e))
    }
}

// ─── Statements ──────────────────────────────────────────────────────────────

impl Stmt {
    /// Runs the statement. `Ok(true)` means the script stops here with its
    /// result in `ret`.
    pub fn evaluate(&self, ctx: &mut Context, ret: &mut Val) -> Result<bool, RuntimeError> {
        match self {
            Stmt::Block(stmts, _) => {
                for s in stmts {
                    if s.evaluate(ctx, ret)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Stmt::While { condition, body, .. } => {
                while truth(ctx, condition, "while")? {
                    if body.evaluate(ctx, ret)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Stmt::For { var, start, end, body, span } => {
                let from = int_bound(ctx, start, "start")?;
                let to = int_bound(ctx, end, "end")?;
                ctx.assign(var, Val::Int(from)).map_err(|e| fail(span, e))?;
                loop {
                    // re-read so the body may move the counter
                    let i = match ctx.get(var) {
                        Some(Val::Int(i)) => *i,
                        _ => return Err(RuntimeError::new(ErrorCode::E004, span.clone(),
                            format!("loop variable `{}` lost its value", var.name))),
                    };
                    if i >= to {
                        return Ok(false);
                    }
                    if body.evaluate(ctx, ret)? {
                        return Ok(true);
                    }
                    let next = match ctx.get(var) {
                        Some(Val::Int(i)) => i.saturating_add(1),
                        _ => to,
                    };
                    ctx.assign(var, Val::Int(next)).map_err(|e| fail(span, e))?;
                }
            }

            Stmt::Foreach { var, iterable, body, span, .. } => {
                let items = match iterable.evaluate(ctx)? {
                    Val::Array(a) => a.items().to_vec(),
                    Val::String(s) => s.chars().map(|c| Val::String(c.to_string())).collect(),
                    other => match other.components() {
                        Some(c) => c.iter().map(|x| Val::Float(*x)).collect(),
                        None => return Err(fail(iterable.span(), ValError::UnsupportedOperator {
                            op: "foreach",
                            operand: other.describe(),
                        })),
                    },
                };
                for item in items {
                    ctx.assign(var, item).map_err(|e| fail(span, e))?;
                    if body.evaluate(ctx, ret)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Stmt::If { condition, then_branch, else_branch, .. } => {
                if truth(ctx, condition, "if")? {
                    then_branch.evaluate(ctx, ret)
                } else if let Some(else_branch) = else_branch {
                    else_branch.evaluate(ctx, ret)
                } else {
                    Ok(false)
                }
            }

            Stmt::Declare { var, init, span } => {
                let v = match init {
                    Some(e) => e.evaluate(ctx)?,
                    None => Val::default_for(var.ty),
                };
                ctx.assign(var, v).map_err(|e| fail(span, e))?;
                Ok(false)
            }

            Stmt::Assign { target, indices, value, span } => {
                let mut idx = Vec::new();
                for group in indices {
                    idx.extend(eval_indices(ctx, group)?);
                }
                let v = value.evaluate(ctx)?;
                if idx.is_empty() {
                    ctx.assign(target, v).map_err(|e| fail(span, e))?;
                } else {
                    assign_indexed(ctx, target, &idx, v, span)?;
                }
                Ok(false)
            }

            Stmt::Expr(e) => {
                let v = e.evaluate(ctx)?;
                if v.is_null() {
                    return Ok(false);
                }
                *ret = v;
                Ok(true)
            }
        }
    }
}

fn int_bound(ctx: &mut Context, e: &Expr, which: &str) -> Result<i32, RuntimeError> {
    match e.evaluate(ctx)?.convert_to(ValType::INT) {
        Ok(Val::Int(i)) => Ok(i),
        _ => Err(RuntimeError::new(ErrorCode::E001, e.span().clone(), format!("`for` {which} must be int"))),
    }
}

/// `a[i, j] = v` on arrays (copy-on-write through the `Rc`) and `v[i] = x` on
/// vectors.
fn assign_indexed(ctx: &mut Context, target: &Variable, idx: &[i32], v: Val, span: &Span) -> Result<(), RuntimeError> {
    let Some(slot) = ctx.get_mut(target) else {
        return Err(RuntimeError::new(ErrorCode::E004, span.clone(),
            format!("`{}` is indexed before it holds a value", target.name)));
    };
    let result = match slot {
        Val::Array(a) => Rc::make_mut(a).set(idx, v),
        other => set_component(other, idx, v),
    };
    result.map_err(|e| fail(span, e))
}

fn set_component(target: &mut Val, idx: &[i32], v: Val) -> Result<(), ValError> {
    let x = match v.convert_to(ValType::FLOAT)? {
        Val::Float(x) => x,
        other => return Err(ValError::NoConversion { from: other.describe(), to: ValType::FLOAT }),
    };
    let operand = target.describe();
    let c: &mut [f32] = match target {
        Val::Float2(c) => c,
        Val::Float3(c) => c,
        Val::Float4(c) => c,
        _ => return Err(ValError::UnsupportedOperator { op: "[]", operand }),
    };
    let [i] = idx else {
        return Err(ValError::BadIndex(format!("vector takes one index, got {}", idx.len())));
    };
    let len = c.len();
    let cell = usize::try_from(*i).ok()
        .and_then(|i| c.get_mut(i))
        .ok_or(ValError::IndexOutOfRange { index: *i as i64, len })?;
    *cell = x;
    Ok(())
}

// ─── Header ──────────────────────────────────────────────────────────────────

impl Header {
    /// Headers are metadata; evaluating one yields `null`.
    pub fn evaluate(&self, _ctx: &mut Context) -> Val {
        Val::NULL
    }
}
