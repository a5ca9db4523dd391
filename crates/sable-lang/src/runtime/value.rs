use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

use crate::error::ErrorCode;
use crate::types::conversion::has_implicit_conversion;
use crate::types::val_type::{ScalarType, ValType};

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Value-level failure. Carries no position; the evaluating node attaches one
/// when converting into a `RuntimeError`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValError {
    #[error("operator `{op}` cannot combine {left} and {right}")]
    TypeMismatch { op: &'static str, left: String, right: String },

    #[error("operator `{op}` is not defined for {operand}")]
    UnsupportedOperator { op: &'static str, operand: String },

    #[error("cannot convert {from} to `{to}`")]
    NoConversion { from: String, to: ValType },

    #[error("invalid cast to `{target}` from {actual}")]
    InvalidCast { target: String, actual: String },

    #[error("array elements of type `{first}` and `{second}` have no common type")]
    IncompatibleElements { first: String, second: String },

    #[error("index {index} is out of range for dimension of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{0}")]
    BadIndex(String),

    #[error("division by zero")]
    DivisionByZero,
}

impl ValError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValError::TypeMismatch { .. }         => ErrorCode::E001,
            ValError::NoConversion { .. }         => ErrorCode::E001,
            ValError::UnsupportedOperator { .. }  => ErrorCode::E010,
            ValError::InvalidCast { .. }          => ErrorCode::E002,
            ValError::IncompatibleElements { .. } => ErrorCode::E003,
            ValError::IndexOutOfRange { .. }      => ErrorCode::E007,
            ValError::BadIndex(_)                 => ErrorCode::E007,
            ValError::DivisionByZero              => ErrorCode::E008,
        }
    }

    pub(crate) fn invalid_cast(target: impl Into<String>, v: &Val) -> Self {
        ValError::InvalidCast { target: target.into(), actual: v.describe() }
    }
}

// ─── Array ────────────────────────────────────────────────────────────────────

/// Dense, rectangular, row-major array. Every item has the scalar type `elem`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    elem: ScalarType,
    dims: Vec<usize>,
    items: Vec<Val>,
}

impl Array {
    pub fn new(elem: ScalarType, dims: Vec<usize>, items: Vec<Val>) -> Result<Self, ValError> {
        if dims.is_empty() {
            return Err(ValError::BadIndex("array needs at least one dimension".into()));
        }
        let count: usize = dims.iter().product();
        if count != items.len() {
            return Err(ValError::BadIndex(format!(
                "{} items do not fill dimensions {:?}", items.len(), dims
            )));
        }
        if let Some(bad) = items.iter().find(|v| v.val_type() != Some(ValType::Scalar(elem))) {
            return Err(ValError::IncompatibleElements {
                first: elem.to_string(),
                second: bad.type_name(),
            });
        }
        Ok(Self { elem, dims, items })
    }

    pub fn empty(elem: ScalarType, rank: usize) -> Self {
        Self { elem, dims: vec![0; rank.max(1)], items: Vec::new() }
    }

    pub fn elem(&self) -> ScalarType { self.elem }
    pub fn dims(&self) -> &[usize] { &self.dims }
    pub fn rank(&self) -> usize { self.dims.len() }
    pub fn items(&self) -> &[Val] { &self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn val_type(&self) -> ValType {
        ValType::Array(self.elem, self.rank())
    }

    /// Validated offset of the first item addressed by `indices` plus the
    /// number of items in that block.
    fn locate(&self, indices: &[i32]) -> Result<(usize, usize), ValError> {
        if indices.len() > self.rank() {
            return Err(ValError::BadIndex(format!(
                "{} indices given for an array of rank {}", indices.len(), self.rank()
            )));
        }
        let mut offset = 0;
        let mut block = self.items.len();
        for (&i, &dim) in indices.iter().zip(&self.dims) {
            if i < 0 || i as usize >= dim {
                return Err(ValError::IndexOutOfRange { index: i as i64, len: dim });
            }
            block /= dim;
            offset += i as usize * block;
        }
        Ok((offset, block))
    }

    /// Full indexing yields an element; partial indexing yields the sub-array.
    pub fn get(&self, indices: &[i32]) -> Result<Val, ValError> {
        let (offset, block) = self.locate(indices)?;
        if indices.len() == self.rank() {
            return Ok(self.items[offset].clone());
        }
        let sub = Array {
            elem: self.elem,
            dims: self.dims[indices.len()..].to_vec(),
            items: self.items[offset..offset + block].to_vec(),
        };
        Ok(Val::Array(Rc::new(sub)))
    }

    pub fn set(&mut self, indices: &[i32], val: Val) -> Result<(), ValError> {
        if indices.len() != self.rank() {
            return Err(ValError::BadIndex(format!(
                "assignment needs {} indices, got {}", self.rank(), indices.len()
            )));
        }
        let (offset, _) = self.locate(indices)?;
        let to = ValType::Scalar(self.elem);
        if val.is_null() {
            return Err(ValError::NoConversion { from: val.describe(), to });
        }
        self.items[offset] = val.convert_to(to)?;
        Ok(())
    }
}

// ─── Val ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Val {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Array(Rc<Array>),
}

impl Val {
    pub const NULL: Val = Val::Null;

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// `None` only for `NULL`.
    pub fn val_type(&self) -> Option<ValType> {
        let s = match self {
            Val::Null      => return None,
            Val::Bool(_)   => ScalarType::Bool,
            Val::Int(_)    => ScalarType::Int,
            Val::Float(_)  => ScalarType::Float,
            Val::String(_) => ScalarType::String,
            Val::Float2(_) => ScalarType::Float2,
            Val::Float3(_) => ScalarType::Float3,
            Val::Float4(_) => ScalarType::Float4,
            Val::Array(a)  => return Some(a.val_type()),
        };
        Some(ValType::Scalar(s))
    }

    pub fn type_name(&self) -> String {
        self.val_type().map_or_else(|| "null".to_string(), |t| t.to_string())
    }

    /// Type and literal text, used in diagnostics: "int `3`".
    pub fn describe(&self) -> String {
        if self.is_null() {
            return "`null`".to_string();
        }
        let mut text = self.to_literal();
        if text.len() > 40 {
            text.truncate(37);
            text.push_str("...");
        }
        format!("{} `{}`", self.type_name(), text)
    }

    pub fn array(elem: ScalarType, dims: Vec<usize>, items: Vec<Val>) -> Result<Val, ValError> {
        Ok(Val::Array(Rc::new(Array::new(elem, dims, items)?)))
    }

    /// Builds a one-dimensional array, picking the element type from the items.
    pub fn from_items(items: Vec<Val>) -> Result<Val, ValError> {
        let Some(first) = items.first() else {
            return Ok(Val::Array(Rc::new(Array::empty(ScalarType::Int, 1))));
        };
        let elem = match first.val_type() {
            Some(ValType::Scalar(s)) => s,
            _ => return Err(ValError::IncompatibleElements {
                first: first.type_name(),
                second: first.type_name(),
            }),
        };
        let n = items.len();
        Val::array(elem, vec![n], items)
    }

    /// Default value of a declared type.
    pub fn default_for(ty: ValType) -> Val {
        match ty {
            ValType::Scalar(ScalarType::Bool)   => Val::Bool(false),
            ValType::Scalar(ScalarType::Int)    => Val::Int(0),
            ValType::Scalar(ScalarType::Float)  => Val::Float(0.0),
            ValType::Scalar(ScalarType::String) => Val::String(String::new()),
            ValType::Scalar(ScalarType::Float2) => Val::Float2([0.0; 2]),
            ValType::Scalar(ScalarType::Float3) => Val::Float3([0.0; 3]),
            ValType::Scalar(ScalarType::Float4) => Val::Float4([0.0; 4]),
            ValType::Array(elem, rank) => Val::Array(Rc::new(Array::empty(elem, rank))),
        }
    }

    // ─── Conversions ──────────────────────────────────────────────────────────

    /// Implicit widening along the conversion table. `NULL` passes through.
    pub fn convert_to(&self, to: ValType) -> Result<Val, ValError> {
        let Some(from) = self.val_type() else { return Ok(Val::Null) };
        if from == to {
            return Ok(self.clone());
        }
        let fail = || ValError::NoConversion { from: self.describe(), to };
        match (self, to) {
            // an empty array takes on any element type of the same rank
            (Val::Array(a), ValType::Array(elem, rank)) if a.is_empty() && a.rank() == rank => {
                Ok(Val::Array(Rc::new(Array { elem, dims: a.dims.clone(), items: Vec::new() })))
            }
            (Val::Array(a), ValType::Array(elem, _)) if has_implicit_conversion(from, to) => {
                let items = a.items.iter()
                    .map(|v| widen_scalar(v, elem).ok_or_else(fail))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Val::Array(Rc::new(Array { elem, dims: a.dims.clone(), items })))
            }
            (_, ValType::Scalar(s)) if has_implicit_conversion(from, to) => {
                widen_scalar(self, s).ok_or_else(fail)
            }
            _ => Err(fail()),
        }
    }

    /// Explicit conversion, `int(x)` in source. Allows narrowing, parsing and
    /// stringification on top of the implicit table.
    pub fn cast(&self, to: ScalarType) -> Result<Val, ValError> {
        if let Some(v) = widen_scalar(self, to) {
            return Ok(v);
        }
        let bad = || ValError::invalid_cast(to.name(), self);
        let v = match (self, to) {
            (Val::Float(f), ScalarType::Int)    => Val::Int(*f as i32),
            (Val::Bool(b), ScalarType::Int)     => Val::Int(*b as i32),
            (Val::Bool(b), ScalarType::Float)   => Val::Float(if *b { 1.0 } else { 0.0 }),
            (Val::Int(i), ScalarType::Bool)     => Val::Bool(*i != 0),
            (Val::Float(f), ScalarType::Bool)   => Val::Bool(*f != 0.0),

            (Val::String(s), ScalarType::Int)   => Val::Int(s.trim().parse().map_err(|_| bad())?),
            (Val::String(s), ScalarType::Float) => Val::Float(s.trim().parse().map_err(|_| bad())?),
            (Val::String(s), ScalarType::Bool)  => match s.trim() {
                "true"  => Val::Bool(true),
                "false" => Val::Bool(false),
                _ => return Err(bad()),
            },

            (Val::Null | Val::Array(_), _) => return Err(bad()),
            (other, ScalarType::String) => Val::String(other.to_string()),

            (v, target) => match (v.components(), target.arity()) {
                (Some(c), Some(n)) => vector_from(c.iter().copied().chain(std::iter::repeat(0.0)).take(n).collect())
                    .ok_or_else(bad)?,
                _ => return Err(bad()),
            },
        };
        Ok(v)
    }

    /// `floatN(a, b, ...)` with one float per component.
    pub fn construct(to: ScalarType, args: &[Val]) -> Result<Val, ValError> {
        if args.len() == 1 {
            return args[0].cast(to);
        }
        let target = to.name();
        match to.arity() {
            Some(n) if n == args.len() => {
                let parts = args.iter()
                    .map(|a| match a.convert_to(ValType::FLOAT)? {
                        Val::Float(f) => Ok(f),
                        other => Err(ValError::invalid_cast(target, &other)),
                    })
                    .collect::<Result<Vec<f32>, _>>()?;
                vector_from(parts).ok_or_else(|| ValError::BadIndex(format!("`{target}` needs {n} components")))
            }
            Some(n) => Err(ValError::BadIndex(format!(
                "`{target}` takes 1 or {n} arguments, got {}", args.len()
            ))),
            None => Err(ValError::BadIndex(format!(
                "`{target}` takes exactly 1 argument, got {}", args.len()
            ))),
        }
    }

    /// Vector components as a slice, `None` for non-vectors.
    pub fn components(&self) -> Option<&[f32]> {
        match self {
            Val::Float2(c) => Some(c),
            Val::Float3(c) => Some(c),
            Val::Float4(c) => Some(c),
            _ => None,
        }
    }

    /// Source text that evaluates back to this value.
    pub fn to_literal(&self) -> String {
        match self {
            Val::String(s) => quote(s),
            other => other.to_string(),
        }
    }
}

/// Scalar widening for one value, or `None` when the table has no such row.
fn widen_scalar(v: &Val, to: ScalarType) -> Option<Val> {
    let from = match v.val_type()? {
        ValType::Scalar(s) => s,
        ValType::Array(..) => return None,
    };
    if from == to {
        return Some(v.clone());
    }
    if !crate::types::conversion::scalar_converts(from, to) {
        return None;
    }
    let x = match v {
        Val::Int(i)   => *i as f32,
        Val::Float(f) => *f,
        _ => return None,
    };
    match to {
        ScalarType::Float => Some(Val::Float(x)),
        other => vector_from(vec![x; other.arity()?]),
    }
}

fn vector_from(c: Vec<f32>) -> Option<Val> {
    match c.as_slice() {
        [x, y]       => Some(Val::Float2([*x, *y])),
        [x, y, z]    => Some(Val::Float3([*x, *y, *z])),
        [x, y, z, w] => Some(Val::Float4([*x, *y, *z, *w])),
        _ => None,
    }
}

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Float text that always re-lexes as a float literal.
pub(crate) fn format_float(f: f32) -> String {
    let s = format!("{f}");
    if s.contains(['.', 'e', 'E']) || !f.is_finite() { s } else { format!("{s}.0") }
}

// ─── Display ──────────────────────────────────────────────────────────────────

/// Strings print raw; everything else prints as its literal spelling.
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null      => f.write_str("null"),
            Val::Bool(b)   => write!(f, "{b}"),
            Val::Int(i)    => write!(f, "{i}"),
            Val::Float(x)  => f.write_str(&format_float(*x)),
            Val::String(s) => f.write_str(s),
            Val::Float2(_) | Val::Float3(_) | Val::Float4(_) => {
                let Some(c) = self.components() else { return Ok(()) };
                write!(f, "float{}(", c.len())?;
                for (i, x) in c.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    f.write_str(&format_float(*x))?;
                }
                f.write_str(")")
            }
            Val::Array(a) => write_nested(f, &a.dims, &a.items),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, dims: &[usize], items: &[Val]) -> fmt::Result {
    f.write_str("{")?;
    if dims.len() <= 1 {
        for (i, v) in items.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            f.write_str(&v.to_literal())?;
        }
    } else {
        let stride = dims[1..].iter().product::<usize>();
        for i in 0..dims[0] {
            if i > 0 { f.write_str(", ")?; }
            write_nested(f, &dims[1..], &items[i * stride..(i + 1) * stride])?;
        }
    }
    f.write_str("}")
}

// ─── Serialize ────────────────────────────────────────────────────────────────

impl Serialize for Val {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Val::Null      => s.serialize_unit(),
            Val::Bool(b)   => s.serialize_bool(*b),
            Val::Int(i)    => s.serialize_i32(*i),
            Val::Float(x)  => s.serialize_f32(*x),
            Val::String(t) => s.serialize_str(t),
            Val::Float2(c) => c.serialize(s),
            Val::Float3(c) => c.serialize(s),
            Val::Float4(c) => c.serialize(s),
            Val::Array(a)  => Nested { dims: &a.dims, items: &a.items }.serialize(s),
        }
    }
}

/// Serializes a row-major block as nested sequences, one level per dimension.
struct Nested<'a> {
    dims: &'a [usize],
    items: &'a [Val],
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if self.dims.len() <= 1 {
            return self.items.serialize(s);
        }
        let stride = self.dims[1..].iter().product::<usize>();
        let mut seq = s.serialize_seq(Some(self.dims[0]))?;
        for i in 0..self.dims[0] {
            seq.serialize_element(&Nested {
                dims: &self.dims[1..],
                items: &self.items[i * stride..(i + 1) * stride],
            })?;
        }
        seq.end()
    }
}

// ─── Host conversions ─────────────────────────────────────────────────────────

impl From<bool> for Val { fn from(v: bool) -> Self { Val::Bool(v) } }
impl From<i32> for Val { fn from(v: i32) -> Self { Val::Int(v) } }
impl From<f32> for Val { fn from(v: f32) -> Self { Val::Float(v) } }
impl From<&str> for Val { fn from(v: &str) -> Self { Val::String(v.to_string()) } }
impl From<String> for Val { fn from(v: String) -> Self { Val::String(v) } }
impl From<[f32; 2]> for Val { fn from(v: [f32; 2]) -> Self { Val::Float2(v) } }
impl From<[f32; 3]> for Val { fn from(v: [f32; 3]) -> Self { Val::Float3(v) } }
impl From<[f32; 4]> for Val { fn from(v: [f32; 4]) -> Self { Val::Float4(v) } }

macro_rules! try_from_val {
    ($host:ty, $name:literal, $pat:pat => $out:expr) => {
        impl TryFrom<&Val> for $host {
            type Error = ValError;

            fn try_from(v: &Val) -> Result<Self, ValError> {
                match v {
                    $pat => Ok($out),
                    other => Err(ValError::invalid_cast($name, other)),
                }
            }
        }
    };
}

try_from_val!(bool, "bool", Val::Bool(b) => *b);
try_from_val!(i32, "i32", Val::Int(i) => *i);
try_from_val!(f32, "f32", Val::Float(f) => *f);
try_from_val!(String, "String", Val::String(s) => s.clone());
try_from_val!([f32; 2], "[f32; 2]", Val::Float2(c) => *c);
try_from_val!([f32; 3], "[f32; 3]", Val::Float3(c) => *c);
try_from_val!([f32; 4], "[f32; 4]", Val::Float4(c) => *c);

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(dims: Vec<usize>, values: &[i32]) -> Val {
        Val::array(ScalarType::Int, dims, values.iter().map(|&i| Val::Int(i)).collect()).unwrap()
    }

    #[test]
    fn null_has_no_type() {
        assert!(Val::NULL.is_null());
        assert_eq!(Val::NULL.val_type(), None);
        assert_eq!(Val::NULL.type_name(), "null");
        assert_eq!(Val::default(), Val::NULL);
    }

    #[test]
    fn int_widens_to_float_and_vectors() {
        assert_eq!(Val::Int(3).convert_to(ValType::FLOAT), Ok(Val::Float(3.0)));
        assert_eq!(Val::Float(2.0).convert_to(ValType::FLOAT3), Ok(Val::Float3([2.0; 3])));
    }

    #[test]
    fn float_does_not_narrow_implicitly() {
        let err = Val::Float(1.5).convert_to(ValType::INT).unwrap_err();
        assert_eq!(err.code(), ErrorCode::E001);
    }

    #[test]
    fn null_converts_to_anything() {
        assert_eq!(Val::NULL.convert_to(ValType::STRING), Ok(Val::NULL));
    }

    #[test]
    fn array_converts_elementwise() {
        let v = ints(vec![2], &[1, 2]).convert_to(ValType::array(ScalarType::Float, 1)).unwrap();
        assert_eq!(v.to_string(), "{1.0, 2.0}");
    }

    #[test]
    fn empty_array_takes_any_element_type() {
        let v = Val::default_for(ValType::array(ScalarType::Int, 1));
        let s = v.convert_to(ValType::array(ScalarType::String, 1)).unwrap();
        assert_eq!(s.val_type(), Some(ValType::array(ScalarType::String, 1)));
    }

    #[test]
    fn explicit_casts() {
        assert_eq!(Val::Float(2.9).cast(ScalarType::Int), Ok(Val::Int(2)));
        assert_eq!(Val::Int(0).cast(ScalarType::Bool), Ok(Val::Bool(false)));
        assert_eq!(Val::Int(7).cast(ScalarType::String), Ok(Val::String("7".into())));
        assert_eq!(Val::String(" 42 ".into()).cast(ScalarType::Int), Ok(Val::Int(42)));
        assert_eq!(Val::Float4([1.0, 2.0, 3.0, 4.0]).cast(ScalarType::Float2), Ok(Val::Float2([1.0, 2.0])));
        assert_eq!(Val::Float2([1.0, 2.0]).cast(ScalarType::Float3), Ok(Val::Float3([1.0, 2.0, 0.0])));
    }

    #[test]
    fn bad_string_cast_names_both_types() {
        let err = Val::String("abc".into()).cast(ScalarType::Int).unwrap_err();
        assert_eq!(err.code(), ErrorCode::E002);
        let msg = err.to_string();
        assert!(msg.contains("int"));
        assert!(msg.contains("string"));
    }

    #[test]
    fn construct_vector_from_components() {
        let v = Val::construct(ScalarType::Float3, &[Val::Int(1), Val::Float(2.5), Val::Int(3)]).unwrap();
        assert_eq!(v, Val::Float3([1.0, 2.5, 3.0]));
        assert!(Val::construct(ScalarType::Float3, &[Val::Int(1), Val::Int(2)]).is_err());
    }

    #[test]
    fn host_extraction_reports_actual_type() {
        assert_eq!(i32::try_from(&Val::Int(5)), Ok(5));
        let err = i32::try_from(&Val::Float(1.0)).unwrap_err();
        assert_eq!(err, ValError::InvalidCast { target: "i32".into(), actual: "float `1.0`".into() });
    }

    #[test]
    fn array_full_and_partial_indexing() {
        let m = ints(vec![2, 3], &[1, 2, 3, 4, 5, 6]);
        let Val::Array(a) = &m else { panic!("expected array") };
        assert_eq!(a.get(&[1, 2]), Ok(Val::Int(6)));
        assert_eq!(a.get(&[1]).unwrap().to_string(), "{4, 5, 6}");
        assert!(matches!(a.get(&[2, 0]), Err(ValError::IndexOutOfRange { index: 2, len: 2 })));
        assert!(a.get(&[0, 0, 0]).is_err());
    }

    #[test]
    fn array_set_converts_element() {
        let v = Val::array(ScalarType::Float, vec![2], vec![Val::Float(0.0), Val::Float(0.0)]).unwrap();
        let Val::Array(rc) = v else { panic!("expected array") };
        let mut a = (*rc).clone();
        a.set(&[1], Val::Int(4)).unwrap();
        assert_eq!(a.items()[1], Val::Float(4.0));
    }

    #[test]
    fn array_rejects_mixed_items() {
        let err = Val::array(ScalarType::Int, vec![2], vec![Val::Int(1), Val::Float(1.0)]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::E003);
    }

    #[test]
    fn display_and_literal_text() {
        assert_eq!(Val::Float(1.0).to_string(), "1.0");
        assert_eq!(Val::Float(0.00001).to_string(), "0.00001");
        assert_eq!(Val::String("a\"b".into()).to_literal(), "\"a\"\"b\"");
        assert_eq!(ints(vec![2, 2], &[1, 2, 3, 4]).to_string(), "{{1, 2}, {3, 4}}");
        assert_eq!(Val::Float2([1.0, 0.5]).to_string(), "float2(1.0, 0.5)");
    }

    #[test]
    fn serializes_arrays_as_nested_json() {
        let json = serde_json::to_string(&ints(vec![2, 2], &[1, 2, 3, 4])).unwrap();
        assert_eq!(json, "[[1,2],[3,4]]");
        assert_eq!(serde_json::to_string(&Val::NULL).unwrap(), "null");
    }
}
