//! Numeric variable table.
//!
//! Used both as the per-evaluator local scope and, by the reference host, as
//! the global registry.  Names are case-sensitive.

use std::collections::HashMap;

use crate::expr::resolve::VariableProvider;

/// Name → value store for simulation variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarTable {
    vars: HashMap<String, f64>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for VarTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut table = VarTable::new();
        for (k, v) in iter {
            table.set(k, v);
        }
        table
    }
}

impl VariableProvider for VarTable {
    fn variable_exists(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn get_variable(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut vars = VarTable::new();
        vars.set("speed", 12.5);
        assert_eq!(vars.get("speed"), Some(12.5));
    }

    #[test]
    fn overwrite() {
        let mut vars = VarTable::new();
        vars.set("x", 1.0);
        vars.set("x", 2.0);
        assert_eq!(vars.get("x"), Some(2.0));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut vars = VarTable::new();
        vars.set("Speed", 1.0);
        assert!(vars.contains("Speed"));
        assert!(!vars.contains("speed"));
    }

    #[test]
    fn unset() {
        let mut vars = VarTable::new();
        vars.set("gone", 3.0);
        assert!(vars.unset("gone"));
        assert_eq!(vars.get("gone"), None);
        assert!(!vars.unset("gone")); // already gone
    }

    #[test]
    fn provider_defaults_missing_to_zero() {
        let vars: VarTable = [("gap", 40.0)].into_iter().collect();
        assert!(vars.variable_exists("gap"));
        assert_eq!(vars.get_variable("gap"), 40.0);
        assert!(!vars.variable_exists("nope"));
        assert_eq!(vars.get_variable("nope"), 0.0);
    }
}
