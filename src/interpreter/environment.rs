use anyhow::{Result, bail};

use crate::{
    error::EvalError,
    value::{Scope, Value, new_scope},
};

/// A stack of scopes, innermost last. Starts with a single global scope.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![new_scope()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn push_empty_scope(&mut self) {
        self.push_scope(new_scope());
    }

    /// Remove and return the most recently pushed scope.
    pub fn pop_scope(&mut self) -> Result<Scope> {
        match self.scopes.pop() {
            Some(scope) => Ok(scope),
            None => bail!(EvalError::ScopeUnderflow),
        }
    }

    fn find(&self, name: &str) -> Option<&Scope> {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.borrow().contains_key(name))
    }

    pub fn lookup(&self, name: &str) -> Result<Value> {
        match self.find(name).and_then(|scope| scope.borrow().get(name).cloned()) {
            Some(value) => Ok(value),
            None => bail!(EvalError::Unbound(name.to_string())),
        }
    }

    /// Reassign `name` in the innermost scope that already binds it.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.find(name) {
            Some(scope) => {
                scope.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            None => bail!(EvalError::Unbound(name.to_string())),
        }
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) -> Result<()> {
        match self.scopes.last() {
            Some(scope) => {
                scope.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            None => bail!(EvalError::ScopeUnderflow),
        }
    }
}
