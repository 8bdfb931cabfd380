use std::collections::HashMap;

use crate::ast::Type;

/// Compile-time symbol table: a stack of scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, Type>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
        tracing::trace!(depth = self.scopes.len(), "enter scope");
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
        tracing::trace!(depth = self.scopes.len(), "exit scope");
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare `name` in the innermost scope. Returns `false` if the name is
    /// already declared there (or no scope is open), leaving the table unchanged.
    pub fn declare(&mut self, name: &str, ty: Type) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), ty);
        true
    }

    /// Innermost declaration of `name` across all open scopes.
    pub fn lookup(&self, name: &str) -> Option<Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_lookup() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", Type::Int));
        assert_eq!(scopes.lookup("x"), Some(Type::Int));
        assert_eq!(scopes.lookup("y"), None);
    }

    #[test]
    fn duplicate_in_same_scope_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", Type::Int));
        assert!(!scopes.declare("x", Type::String));
        assert_eq!(scopes.lookup("x"), Some(Type::Int));
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.declare("x", Type::Int);
        scopes.push();
        assert!(scopes.declare("x", Type::Bool));
        assert_eq!(scopes.lookup("x"), Some(Type::Bool));
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(Type::Int));
    }

    #[test]
    fn outer_names_visible_inside() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.declare("s", Type::String);
        scopes.push();
        scopes.push();
        assert_eq!(scopes.lookup("s"), Some(Type::String));
        assert_eq!(scopes.depth(), 3);
    }

    #[test]
    fn declare_without_scope_fails() {
        let mut scopes = ScopeStack::new();
        assert!(!scopes.declare("x", Type::Int));
    }
}
