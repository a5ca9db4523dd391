use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::types::val_type::ValType;

pub type ScopeRef = Rc<RefCell<ContextScope>>;

/// Identity of one scope frame. Two frames never share an id, even after a
/// `clear()`, so slots from different frames cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        ScopeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Storage cell of a variable inside a `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub scope: ScopeId,
    pub index: u32,
}

// ─── Variable ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: ValType,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("`{0}` is already declared in this scope")]
    Redeclared(String),

    #[error("`{0}` is not declared")]
    Undeclared(String),
}

// ─── ContextScope ─────────────────────────────────────────────────────────────

/// One frame of variable declarations, linked to the frame it extends.
#[derive(Debug)]
pub struct ContextScope {
    id: ScopeId,
    vars: HashMap<String, Variable>,
    next_index: u32,
    next: Option<ScopeRef>,
}

impl ContextScope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Self::with_parent(None)))
    }

    /// A frame whose lookups fall through to `parent`.
    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Self::with_parent(Some(parent.clone()))))
    }

    fn with_parent(next: Option<ScopeRef>) -> Self {
        Self { id: ScopeId::fresh(), vars: HashMap::new(), next_index: 0, next }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.next.clone()
    }

    /// Adds a binding to this frame. Shadowing a parent binding is allowed.
    pub fn declare(&mut self, name: &str, ty: ValType) -> Result<Variable, ScopeError> {
        if self.vars.contains_key(name) {
            return Err(ScopeError::Redeclared(name.to_string()));
        }
        let var = Variable {
            name: name.to_string(),
            ty,
            slot: Slot { scope: self.id, index: self.next_index },
        };
        self.next_index += 1;
        self.vars.insert(name.to_string(), var.clone());
        Ok(var)
    }

    /// Searches this frame, then each parent in turn.
    pub fn lookup(&self, name: &str) -> Option<Variable> {
        match self.vars.get(name) {
            Some(var) => Some(var.clone()),
            None => self.next.as_ref().and_then(|p| p.borrow().lookup(name)),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Variable, ScopeError> {
        self.lookup(name).ok_or_else(|| ScopeError::Undeclared(name.to_string()))
    }

    /// Drops every local binding whose name is not in `keep`.
    pub fn retain_names(&mut self, keep: &[String]) {
        self.vars.retain(|name, _| keep.contains(name));
    }

    /// Drops this frame's bindings. Parents are untouched and slot indices keep
    /// counting up, so stale slots are never handed out again.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Local names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }
}
