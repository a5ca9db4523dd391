//! Static description of runtime value kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element kinds a `Val` may hold directly or inside an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    String,
    Float2,
    Float3,
    Float4,
}

impl ScalarType {
    pub const ALL: [ScalarType; 7] = [
        ScalarType::Bool,
        ScalarType::Int,
        ScalarType::Float,
        ScalarType::String,
        ScalarType::Float2,
        ScalarType::Float3,
        ScalarType::Float4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool   => "bool",
            ScalarType::Int    => "int",
            ScalarType::Float  => "float",
            ScalarType::String => "string",
            ScalarType::Float2 => "float2",
            ScalarType::Float3 => "float3",
            ScalarType::Float4 => "float4",
        }
    }

    /// Component count of the float vectors, `None` for everything else.
    pub fn arity(&self) -> Option<usize> {
        match self {
            ScalarType::Float2 => Some(2),
            ScalarType::Float3 => Some(3),
            ScalarType::Float4 => Some(4),
            _ => None,
        }
    }

    pub fn vector_of(arity: usize) -> Option<ScalarType> {
        match arity {
            2 => Some(ScalarType::Float2),
            3 => Some(ScalarType::Float3),
            4 => Some(ScalarType::Float4),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── ValType ──────────────────────────────────────────────────────────────────

/// The type carried by every non-null `Val`: a scalar or an n-dimensional array
/// of one scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    Scalar(ScalarType),
    /// Element kind and rank (number of dimensions, at least 1).
    Array(ScalarType, usize),
}

impl ValType {
    pub const BOOL: ValType   = ValType::Scalar(ScalarType::Bool);
    pub const INT: ValType    = ValType::Scalar(ScalarType::Int);
    pub const FLOAT: ValType  = ValType::Scalar(ScalarType::Float);
    pub const STRING: ValType = ValType::Scalar(ScalarType::String);
    pub const FLOAT2: ValType = ValType::Scalar(ScalarType::Float2);
    pub const FLOAT3: ValType = ValType::Scalar(ScalarType::Float3);
    pub const FLOAT4: ValType = ValType::Scalar(ScalarType::Float4);

    pub fn array(elem: ScalarType, rank: usize) -> Self {
        ValType::Array(elem, rank.max(1))
    }

    /// The scalar kind itself, or the element kind of an array.
    pub fn element(&self) -> ScalarType {
        match self {
            ValType::Scalar(s) | ValType::Array(s, _) => *s,
        }
    }

    /// 0 for scalars.
    pub fn rank(&self) -> usize {
        match self {
            ValType::Scalar(_) => 0,
            ValType::Array(_, r) => *r,
        }
    }
}

impl From<ScalarType> for ValType {
    fn from(s: ScalarType) -> Self { ValType::Scalar(s) }
}

/// Source spelling: `int`, `float[]`, `string[,]`.
impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValType::Scalar(s) => write!(f, "{s}"),
            ValType::Array(s, rank) => {
                write!(f, "{s}[")?;
                for _ in 1..*rank { f.write_str(",")?; }
                f.write_str("]")
            }
        }
    }
}
