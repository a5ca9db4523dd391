//! Operator registry: maps (BinOp, operand type) to an implementation.
//!
//! Operands are first widened to their common type, so each entry only sees
//! two values of the same scalar kind. Supporting an operator for a new type
//! is a `register()` call here; the evaluator never changes.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::runtime::value::{Val, ValError};
use crate::syntax::ast::{BinOp, UnOp};
use crate::types::conversion::common_type;
use crate::types::val_type::{ScalarType, ValType};

// ─── Function pointer ─────────────────────────────────────────────────────────

pub type BinopFn = fn(Val, Val) -> Result<Val, ValError>;

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct BinopRegistry {
    ops: HashMap<(BinOp, ScalarType), BinopFn>,
}

/// The process-wide operator table.
pub fn binops() -> &'static BinopRegistry {
    static REGISTRY: OnceLock<BinopRegistry> = OnceLock::new();
    REGISTRY.get_or_init(BinopRegistry::default)
}

impl BinopRegistry {
    pub fn new() -> Self {
        Self { ops: HashMap::new() }
    }

    pub fn register(&mut self, op: BinOp, ty: ScalarType, f: BinopFn) {
        self.ops.insert((op, ty), f);
    }

    /// Evaluate `l op r` after unifying both sides to their common type.
    pub fn eval(&self, op: BinOp, l: Val, r: Val) -> Result<Val, ValError> {
        if matches!(op, BinOp::Eq | BinOp::NotEq) && (l.is_null() || r.is_null()) {
            let same = l.is_null() && r.is_null();
            return Ok(Val::Bool(same == (op == BinOp::Eq)));
        }

        let mismatch = |l: &Val, r: &Val| ValError::TypeMismatch {
            op: op.symbol(),
            left: l.describe(),
            right: r.describe(),
        };
        let (Some(lt), Some(rt)) = (l.val_type(), r.val_type()) else {
            return Err(mismatch(&l, &r));
        };
        let Some(common) = common_type(lt, rt) else {
            return Err(mismatch(&l, &r));
        };
        let l = l.convert_to(common)?;
        let r = r.convert_to(common)?;

        match common {
            ValType::Array(..) => match op {
                BinOp::Eq    => Ok(Val::Bool(l == r)),
                BinOp::NotEq => Ok(Val::Bool(l != r)),
                _ => Err(ValError::UnsupportedOperator { op: op.symbol(), operand: l.describe() }),
            },
            ValType::Scalar(s) => match self.ops.get(&(op, s)) {
                Some(f) => f(l, r),
                None => Err(ValError::UnsupportedOperator { op: op.symbol(), operand: l.describe() }),
            },
        }
    }

    pub fn eval_unary(&self, op: UnOp, v: Val) -> Result<Val, ValError> {
        let out = match (op, &v) {
            (UnOp::Neg, Val::Int(i))    => Val::Int(i.wrapping_neg()),
            (UnOp::Neg, Val::Float(f))  => Val::Float(-f),
            (UnOp::Neg, Val::Float2(c)) => Val::Float2(c.map(|x| -x)),
            (UnOp::Neg, Val::Float3(c)) => Val::Float3(c.map(|x| -x)),
            (UnOp::Neg, Val::Float4(c)) => Val::Float4(c.map(|x| -x)),
            (UnOp::Not, Val::Bool(b))   => Val::Bool(!b),
            _ => return Err(ValError::UnsupportedOperator { op: op.symbol(), operand: v.describe() }),
        };
        Ok(out)
    }
}

// ─── float2 / float3 / float4 ─────────────────────────────────────────────────

/// Component-wise arithmetic and equality for one vector kind.
macro_rules! register_vector {
    ($r:expr, $kind:ident) => {{
        use BinOp::*;
        let ty = ScalarType::$kind;
        $r.register(Add, ty, |l, r| { let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() }; Ok(Val::$kind(zip(a, b, |x, y| x + y))) });
        $r.register(Sub, ty, |l, r| { let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() }; Ok(Val::$kind(zip(a, b, |x, y| x - y))) });
        $r.register(Mul, ty, |l, r| { let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() }; Ok(Val::$kind(zip(a, b, |x, y| x * y))) });
        $r.register(Div, ty, |l, r| {
            let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() };
            if b.contains(&0.0) { Err(ValError::DivisionByZero) } else { Ok(Val::$kind(zip(a, b, |x, y| x / y))) }
        });
        $r.register(Eq,    ty, |l, r| { let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a == b)) });
        $r.register(NotEq, ty, |l, r| { let (Val::$kind(a), Val::$kind(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a != b)) });
    }};
}

impl Default for BinopRegistry {
    fn default() -> Self {
        let mut r = Self::new();
        register_int(&mut r);
        register_float(&mut r);
        register_string(&mut r);
        register_bool(&mut r);
        register_vector!(r, Float2);
        register_vector!(r, Float3);
        register_vector!(r, Float4);
        r
    }
}

fn zip<const N: usize>(a: [f32; N], b: [f32; N], f: impl Fn(f32, f32) -> f32) -> [f32; N] {
    std::array::from_fn(|i| f(a[i], b[i]))
}

// ─── int ──────────────────────────────────────────────────────────────────────

fn register_int(r: &mut BinopRegistry) {
    use BinOp::*;
    let ty = ScalarType::Int;
    r.register(Add, ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Int(a.wrapping_add(b))) });
    r.register(Sub, ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Int(a.wrapping_sub(b))) });
    r.register(Mul, ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Int(a.wrapping_mul(b))) });
    r.register(Div, ty, |l, r| {
        let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() };
        if b == 0 { Err(ValError::DivisionByZero) } else { Ok(Val::Int(a.wrapping_div(b))) }
    });
    r.register(Mod, ty, |l, r| {
        let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() };
        if b == 0 { Err(ValError::DivisionByZero) } else { Ok(Val::Int(a.wrapping_rem(b))) }
    });
    r.register(Lt,    ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <  b)) });
    r.register(LtEq,  ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <= b)) });
    r.register(Gt,    ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >  b)) });
    r.register(GtEq,  ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >= b)) });
    r.register(Eq,    ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a == b)) });
    r.register(NotEq, ty, |l, r| { let (Val::Int(a), Val::Int(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a != b)) });
}

// ─── float ────────────────────────────────────────────────────────────────────

fn register_float(r: &mut BinopRegistry) {
    use BinOp::*;
    let ty = ScalarType::Float;
    r.register(Add, ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Float(a + b)) });
    r.register(Sub, ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Float(a - b)) });
    r.register(Mul, ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Float(a * b)) });
    r.register(Div, ty, |l, r| {
        let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() };
        if b == 0.0 { Err(ValError::DivisionByZero) } else { Ok(Val::Float(a / b)) }
    });
    r.register(Mod, ty, |l, r| {
        let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() };
        if b == 0.0 { Err(ValError::DivisionByZero) } else { Ok(Val::Float(a % b)) }
    });
    r.register(Lt,    ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <  b)) });
    r.register(LtEq,  ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <= b)) });
    r.register(Gt,    ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >  b)) });
    r.register(GtEq,  ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >= b)) });
    r.register(Eq,    ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a == b)) });
    r.register(NotEq, ty, |l, r| { let (Val::Float(a), Val::Float(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a != b)) });
}

// ─── string ───────────────────────────────────────────────────────────────────

fn register_string(r: &mut BinopRegistry) {
    use BinOp::*;
    let ty = ScalarType::String;
    r.register(Add, ty, |l, r| {
        let (Val::String(mut a), Val::String(b)) = (l, r) else { unreachable!() };
        a.push_str(&b);
        Ok(Val::String(a))
    });
    r.register(Lt,    ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <  b)) });
    r.register(LtEq,  ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a <= b)) });
    r.register(Gt,    ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >  b)) });
    r.register(GtEq,  ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a >= b)) });
    r.register(Eq,    ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a == b)) });
    r.register(NotEq, ty, |l, r| { let (Val::String(a), Val::String(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a != b)) });
}

// ─── bool ─────────────────────────────────────────────────────────────────────

fn register_bool(r: &mut BinopRegistry) {
    use BinOp::*;
    let ty = ScalarType::Bool;
    r.register(And,   ty, |l, r| { let (Val::Bool(a), Val::Bool(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a && b)) });
    r.register(Or,    ty, |l, r| { let (Val::Bool(a), Val::Bool(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a || b)) });
    r.register(Eq,    ty, |l, r| { let (Val::Bool(a), Val::Bool(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a == b)) });
    r.register(NotEq, ty, |l, r| { let (Val::Bool(a), Val::Bool(b)) = (l, r) else { unreachable!() }; Ok(Val::Bool(a != b)) });
}
