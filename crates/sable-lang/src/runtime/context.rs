use std::collections::HashMap;

use crate::functions::{CallError, FunctionRegistry};
use crate::runtime::scope::{Slot, Variable};
use crate::runtime::value::{Val, ValError};

/// Host-side runtime state: callable functions plus the value of every
/// variable, keyed by its declaration slot. Scripts themselves hold no state,
/// so the same parsed script can run against different contexts.
pub struct Context {
    functions: FunctionRegistry,
    values: HashMap<Slot, Val>,
}

impl Context {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self { functions, values: HashMap::new() }
    }

    /// Context with the core library installed.
    pub fn standard() -> Self {
        Self::new(FunctionRegistry::standard())
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.names()
    }

    pub fn call(&self, name: &str, args: &[Val]) -> Result<Val, CallError> {
        self.functions.call(name, args)
    }

    /// `None` until the variable has been given a value.
    pub fn get(&self, var: &Variable) -> Option<&Val> {
        self.values.get(&var.slot)
    }

    pub(crate) fn get_mut(&mut self, var: &Variable) -> Option<&mut Val> {
        self.values.get_mut(&var.slot)
    }

    /// Stores `v` after converting it to the variable's declared type.
    pub fn assign(&mut self, var: &Variable, v: Val) -> Result<(), ValError> {
        let v = v.convert_to(var.ty)?;
        self.values.insert(var.slot, v);
        Ok(())
    }

    /// Forgets every stored value. Functions stay registered.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::scope::ContextScope;
    use crate::types::val_type::ValType;

    #[test]
    fn assign_converts_to_declared_type() {
        let scope = ContextScope::root();
        let x = scope.borrow_mut().declare("x", ValType::FLOAT).unwrap();
        let mut ctx = Context::standard();
        assert_eq!(ctx.get(&x), None);
        ctx.assign(&x, Val::Int(2)).unwrap();
        assert_eq!(ctx.get(&x), Some(&Val::Float(2.0)));
    }

    #[test]
    fn assign_rejects_narrowing() {
        let scope = ContextScope::root();
        let n = scope.borrow_mut().declare("n", ValType::INT).unwrap();
        let mut ctx = Context::standard();
        assert!(ctx.assign(&n, Val::Float(1.5)).is_err());
        assert!(ctx.assign(&n, Val::NULL).is_ok());
    }

    #[test]
    fn reset_keeps_functions() {
        let scope = ContextScope::root();
        let x = scope.borrow_mut().declare("x", ValType::INT).unwrap();
        let mut ctx = Context::standard();
        ctx.assign(&x, Val::Int(1)).unwrap();
        ctx.reset();
        assert_eq!(ctx.get(&x), None);
        assert!(ctx.function_names().contains(&"abs".to_string()));
    }
}
