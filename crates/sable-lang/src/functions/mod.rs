use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::error::ErrorCode;
use crate::runtime::value::Val;
use crate::types::val_type::ValType;

pub mod core;

// ─── Host functions ───────────────────────────────────────────────────────────

/// A host callable. `Err` carries a message shown to the script author.
pub type HostFn = Rc<dyn Fn(&[Val]) -> Result<Val, String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Fixed(Vec<ValType>),
    /// Accepts any number of arguments of any type.
    Variadic,
}

#[derive(Clone)]
pub struct Overload {
    pub params: Params,
    pub func: HostFn,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("unknown function `{0}`")]
    Unknown(String),

    #[error("no overload of `{name}` accepts ({args})")]
    NoOverload { name: String, args: String },

    #[error("`{name}` failed: {message}")]
    Failed { name: String, message: String },
}

impl CallError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CallError::Unknown(_) | CallError::NoOverload { .. } => ErrorCode::E005,
            CallError::Failed { .. } => ErrorCode::E006,
        }
    }
}

// ─── Library ──────────────────────────────────────────────────────────────────

/// A named group of host functions installed into a registry in one go.
pub trait Library {
    fn name(&self) -> &'static str;
    fn install(&self, registry: &mut FunctionRegistry);
}

// ─── Registry ─────────────────────────────────────────────────────────────────

#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<Overload>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the core library.
    pub fn standard() -> Self {
        let mut r = Self::new();
        r.install(&core::CoreLibrary);
        r
    }

    pub fn install(&mut self, library: &dyn Library) {
        library.install(self);
        tracing::debug!(library = library.name(), functions = self.functions.len(), "installed library");
    }

    pub fn register<F>(&mut self, name: &str, params: Vec<ValType>, f: F)
    where
        F: Fn(&[Val]) -> Result<Val, String> + 'static,
    {
        self.push(name, Overload { params: Params::Fixed(params), func: Rc::new(f) });
    }

    pub fn register_variadic<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Val]) -> Result<Val, String> + 'static,
    {
        self.push(name, Overload { params: Params::Variadic, func: Rc::new(f) });
    }

    fn push(&mut self, name: &str, overload: Overload) {
        self.functions.entry(name.to_string()).or_default().push(overload);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Every callable name, sorted. Used by tooling.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Picks an overload: exact parameter types first, then a match through
    /// implicit conversions, then a variadic entry. Returns the arguments
    /// converted to the chosen parameter types.
    pub fn resolve(&self, name: &str, args: &[Val]) -> Result<(&Overload, Vec<Val>), CallError> {
        let overloads = self.functions.get(name).ok_or_else(|| CallError::Unknown(name.to_string()))?;

        let exact = overloads.iter().find(|o| match &o.params {
            Params::Fixed(ps) => ps.len() == args.len()
                && ps.iter().zip(args).all(|(p, a)| a.val_type() == Some(*p)),
            Params::Variadic => false,
        });
        if let Some(o) = exact {
            return Ok((o, args.to_vec()));
        }

        for o in overloads {
            let Params::Fixed(ps) = &o.params else { continue };
            if ps.len() != args.len() {
                continue;
            }
            let converted: Result<Vec<Val>, _> = ps.iter().zip(args).map(|(p, a)| a.convert_to(*p)).collect();
            if let Ok(converted) = converted {
                return Ok((o, converted));
            }
        }

        if let Some(o) = overloads.iter().find(|o| o.params == Params::Variadic) {
            return Ok((o, args.to_vec()));
        }

        let args = args.iter().map(|a| a.type_name()).collect::<Vec<_>>().join(", ");
        Err(CallError::NoOverload { name: name.to_string(), args })
    }

    pub fn call(&self, name: &str, args: &[Val]) -> Result<Val, CallError> {
        let (overload, args) = self.resolve(name, args)?;
        (overload.func)(&args).map_err(|message| CallError::Failed { name: name.to_string(), message })
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn check_argc(name: &str, args: &[Val], n: usize) -> Result<(), String> {
    if args.len() != n {
        Err(format!("`{name}` expects {n} args, got {}", args.len()))
    } else {
        Ok(())
    }
}

pub(crate) fn as_float(v: &Val) -> Result<f32, String> {
    match v.convert_to(ValType::FLOAT) {
        Ok(Val::Float(x)) => Ok(x),
        _ => Err(format!("expected float, got {}", v.type_name())),
    }
}

pub(crate) fn as_int(v: &Val) -> Result<i32, String> {
    i32::try_from(v).map_err(|e| e.to_string())
}
