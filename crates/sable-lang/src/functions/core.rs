//! Always-available built-ins: math, string helpers, introspection and
//! assertions. Installed by `FunctionRegistry::standard()`.

use crate::runtime::value::Val;
use crate::types::val_type::{ScalarType, ValType};

use super::{FunctionRegistry, Library, as_float, as_int, check_argc};

pub struct CoreLibrary;

impl Library for CoreLibrary {
    fn name(&self) -> &'static str { "core" }

    fn install(&self, r: &mut FunctionRegistry) {
        register_math(r);
        register_vector(r);
        register_string(r);
        register_misc(r);
    }
}

// ─── Math ─────────────────────────────────────────────────────────────────────

fn register_math(r: &mut FunctionRegistry) {
    use ValType as T;

    // 1-arg float math
    let unary: [(&str, fn(f32) -> f32); 8] = [
        ("sqrt",  f32::sqrt),
        ("sin",   f32::sin),
        ("cos",   f32::cos),
        ("tan",   f32::tan),
        ("floor", f32::floor),
        ("ceil",  f32::ceil),
        ("round", f32::round),
        ("exp",   f32::exp),
    ];
    for (name, f) in unary {
        r.register(name, vec![T::FLOAT], move |a| Ok(Val::Float(f(as_float(&a[0])?))));
    }

    r.register("abs", vec![T::INT],   |a| Ok(Val::Int(as_int(&a[0])?.wrapping_abs())));
    r.register("abs", vec![T::FLOAT], |a| Ok(Val::Float(as_float(&a[0])?.abs())));

    r.register("min", vec![T::INT, T::INT],     |a| Ok(Val::Int(as_int(&a[0])?.min(as_int(&a[1])?))));
    r.register("min", vec![T::FLOAT, T::FLOAT], |a| Ok(Val::Float(as_float(&a[0])?.min(as_float(&a[1])?))));
    r.register("max", vec![T::INT, T::INT],     |a| Ok(Val::Int(as_int(&a[0])?.max(as_int(&a[1])?))));
    r.register("max", vec![T::FLOAT, T::FLOAT], |a| Ok(Val::Float(as_float(&a[0])?.max(as_float(&a[1])?))));

    r.register("pow", vec![T::FLOAT, T::FLOAT], |a| Ok(Val::Float(as_float(&a[0])?.powf(as_float(&a[1])?))));
    r.register("clamp", vec![T::FLOAT, T::FLOAT, T::FLOAT], |a| {
        let (x, lo, hi) = (as_float(&a[0])?, as_float(&a[1])?, as_float(&a[2])?);
        if lo > hi {
            return Err(format!("lower bound {lo} exceeds upper bound {hi}"));
        }
        Ok(Val::Float(x.clamp(lo, hi)))
    });
    r.register("lerp", vec![T::FLOAT, T::FLOAT, T::FLOAT], |a| {
        let (x, y, t) = (as_float(&a[0])?, as_float(&a[1])?, as_float(&a[2])?);
        Ok(Val::Float(x + (y - x) * t))
    });
}

// ─── Vectors ──────────────────────────────────────────────────────────────────

fn register_vector(r: &mut FunctionRegistry) {
    for ty in [ScalarType::Float2, ScalarType::Float3, ScalarType::Float4] {
        let t = ValType::Scalar(ty);
        r.register("dot", vec![t, t], |a| Ok(Val::Float(dot(&a[0], &a[1]))));
        r.register("length", vec![t], |a| Ok(Val::Float(dot(&a[0], &a[0]).sqrt())));
    }
}

fn dot(a: &Val, b: &Val) -> f32 {
    match (a.components(), b.components()) {
        (Some(x), Some(y)) => x.iter().zip(y).map(|(p, q)| p * q).sum(),
        _ => 0.0,
    }
}

// ─── Strings ──────────────────────────────────────────────────────────────────

fn register_string(r: &mut FunctionRegistry) {
    use ValType as T;
    r.register("upper", vec![T::STRING], |a| Ok(Val::String(a[0].to_string().to_uppercase())));
    r.register("lower", vec![T::STRING], |a| Ok(Val::String(a[0].to_string().to_lowercase())));
    r.register("trim",  vec![T::STRING], |a| Ok(Val::String(a[0].to_string().trim().to_string())));
    r.register("contains", vec![T::STRING, T::STRING], |a| {
        Ok(Val::Bool(a[0].to_string().contains(&a[1].to_string())))
    });
}

// ─── Introspection / misc ─────────────────────────────────────────────────────

fn register_misc(r: &mut FunctionRegistry) {
    r.register_variadic("len", |a| {
        check_argc("len", a, 1)?;
        let n = match &a[0] {
            Val::String(s) => s.chars().count(),
            Val::Array(arr) => arr.dims().first().copied().unwrap_or(0),
            other => match other.components() {
                Some(c) => c.len(),
                None => return Err(format!("`len` is not defined for {}", other.type_name())),
            },
        };
        Ok(Val::Int(n as i32))
    });

    r.register_variadic("dims", |a| {
        check_argc("dims", a, 1)?;
        let Val::Array(arr) = &a[0] else {
            return Err(format!("`dims` expects an array, got {}", a[0].type_name()));
        };
        let extents = arr.dims().iter().map(|&d| Val::Int(d as i32)).collect::<Vec<_>>();
        Val::array(ScalarType::Int, vec![extents.len()], extents).map_err(|e| e.to_string())
    });

    r.register_variadic("typeof", |a| {
        check_argc("typeof", a, 1)?;
        Ok(Val::String(a[0].type_name()))
    });

    r.register_variadic("print", |a| {
        let line = a.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        tracing::info!(target: "sable::script", "{line}");
        Ok(Val::NULL)
    });

    r.register("assert", vec![ValType::BOOL], |a| match a[0] {
        Val::Bool(true) => Ok(Val::NULL),
        _ => Err("assertion failed".to_string()),
    });
    r.register("assert", vec![ValType::BOOL, ValType::STRING], |a| match a[0] {
        Val::Bool(true) => Ok(Val::NULL),
        _ => Err(format!("assertion failed: {}", a[1])),
    });
}
