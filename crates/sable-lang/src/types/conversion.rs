//! Implicit conversion table.
//!
//! One row per allowed widening. The relation is kept closed under
//! transitivity by listing every reachable pair, so adding a vector type is a
//! table edit. Identity is implicit and not listed.

use super::val_type::{ScalarType, ValType};

use ScalarType::*;

pub const IMPLICIT_CONVERSIONS: &[(ScalarType, ScalarType)] = &[
    (Int,   Float),
    (Int,   Float2),
    (Int,   Float3),
    (Int,   Float4),
    (Float, Float2),
    (Float, Float3),
    (Float, Float4),
];

pub fn scalar_converts(from: ScalarType, to: ScalarType) -> bool {
    from == to || IMPLICIT_CONVERSIONS.iter().any(|&(f, t)| f == from && t == to)
}

/// Arrays convert element-wise between equal ranks.
pub fn has_implicit_conversion(from: ValType, to: ValType) -> bool {
    match (from, to) {
        (ValType::Scalar(a), ValType::Scalar(b)) => scalar_converts(a, b),
        (ValType::Array(a, ra), ValType::Array(b, rb)) => ra == rb && scalar_converts(a, b),
        _ => false,
    }
}

/// The type both operands can be widened to, preferring `b` when `a` widens
/// into it.
pub fn common_type(a: ValType, b: ValType) -> Option<ValType> {
    if has_implicit_conversion(a, b) {
        Some(b)
    } else if has_implicit_conversion(b, a) {
        Some(a)
    } else {
        None
    }
}

pub fn common_scalar(a: ScalarType, b: ScalarType) -> Option<ScalarType> {
    common_type(a.into(), b.into()).map(|t| t.element())
}
