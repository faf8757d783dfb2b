//! # Environments
//!
//! An environment maps identifiers to types (checker phase) or values
//! (interpreter phase). Lookup is by exact name; `add_name` replaces any
//! prior entry, so the newest binding always wins. Entering a scope takes a
//! [`snapshot`](Environment::snapshot) of the mapping, which is why
//! rebinding inside a scope never leaks back out, while a plain `clone`
//! aliases the same mapping (used where a nested program deliberately
//! registers declarations in the enclosing scope).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::ty::TypePtr;

pub struct Environment<V> {
    bindings: Rc<RefCell<HashMap<String, V>>>,
}

/// Checker-phase environment, identifier to type.
pub type TypeEnvironment = Environment<TypePtr>;

impl<V: Clone> Environment<V> {
    pub fn new() -> Self {
        Self {
            bindings: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// A deep copy of the mapping. Mutations of the snapshot do not affect
    /// this environment and vice versa.
    pub fn snapshot(&self) -> Self {
        Self {
            bindings: Rc::new(RefCell::new(self.bindings.borrow().clone())),
        }
    }

    /// Bind `name`, removing any prior binding first.
    pub fn add_name(&self, name: impl Into<String>, value: V) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn remove_name(&self, name: &str) {
        self.bindings.borrow_mut().remove(name);
    }

    pub fn get_name(&self, name: &str) -> Option<V> {
        self.bindings.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// All bindings, cloned out. Used when a closure's captured environment
    /// is layered over a call environment.
    pub fn entries(&self) -> Vec<(String, V)> {
        self.bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl<V> Clone for Environment<V> {
    /// Aliasing clone: both handles share one mapping.
    fn clone(&self) -> Self {
        Self {
            bindings: Rc::clone(&self.bindings),
        }
    }
}

impl<V: Clone> Default for Environment<V> {
    fn default() -> Self {
        Self::new()
    }
}
