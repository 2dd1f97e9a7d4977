use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::object::Object;

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Object>,
    parent: Option<Environment>,
}

/// Lexical scope chain.
///
/// Cloning an `Environment` yields another handle to the same scope, so a
/// closure and the code that created it observe each other's updates.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh scope whose lookups fall back to `outer`
    pub fn new_enclosed(outer: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(outer.clone()),
        })))
    }

    /// Resolve `name` by walking outward through the chain.
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut current = self.clone();
        loop {
            let parent = {
                let scope = current.0.borrow();
                if let Some(value) = scope.bindings.get(name) {
                    return Some(value.clone());
                }
                scope.parent.clone()
            };
            current = parent?;
        }
    }

    /// Assign `name`.
    ///
    /// Rebinds in the nearest scope that already defines the name; when no
    /// scope does, the binding is created here.
    pub fn set(&self, name: &str, value: Object) -> Object {
        let target = self.scope_defining(name).unwrap_or_else(|| self.clone());
        target
            .0
            .borrow_mut()
            .bindings
            .insert(name.to_owned(), value.clone());
        value
    }

    /// Bind `name` in this scope only, shadowing any outer binding.
    pub fn define(&self, name: &str, value: Object) {
        self.0.borrow_mut().bindings.insert(name.to_owned(), value);
    }

    /// Whether this scope itself (not an ancestor) binds `name`
    pub fn has_local(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Whether both handles refer to the same scope
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Get all variable bindings visible from this scope, innermost first.
    /// Shadowed outer bindings are omitted.
    pub fn get_all_bindings(&self) -> Vec<(String, Object)> {
        let mut bindings: Vec<(String, Object)> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let scope = env.0.borrow();
            let mut local: Vec<_> = scope
                .bindings
                .iter()
                .filter(|(name, _)| !bindings.iter().any(|(seen, _)| seen == *name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            local.sort_by(|a, b| a.0.cmp(&b.0));
            bindings.extend(local);
            current = scope.parent.clone();
        }
        bindings
    }

    fn scope_defining(&self, name: &str) -> Option<Environment> {
        let mut current = self.clone();
        loop {
            if current.has_local(name) {
                return Some(current);
            }
            let parent = current.0.borrow().parent.clone();
            current = parent?;
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<_> = scope.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}
