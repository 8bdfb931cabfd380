use std::collections::HashMap;

use crate::interpreter::value::Value;

/// Flat runtime variable table shared by a whole run. Blocks do not open new
/// scopes here: an inner declaration overwrites the outer binding.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Overwrite an existing binding. Returns `false` if `name` was never defined.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All bindings, sorted by name.
    pub fn bindings(&self) -> Vec<(&str, &Value)> {
        let mut bindings: Vec<_> = self
            .values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        bindings
    }
}
